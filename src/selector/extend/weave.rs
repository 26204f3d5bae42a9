//! Selector weaving: the combinatorial interleaving behind `@extend`.
//!
//! Given several parent sequences that must each stay in order, weaving
//! produces every interleaving that matches the intersection of the inputs,
//! eliding merged compounds that would only blow up the output.

use std::collections::VecDeque;

use super::super::{
    Combinator, ComplexSelector, ComplexSelectorComponent, CompoundSelector, Pseudo, SimpleSelector,
};

type Component = ComplexSelectorComponent;
type Components = Vec<Component>;

/// A window over a component sequence with cheap removal at both ends.
struct Window {
    items: Components,
    lo: usize,
    hi: usize,
}

impl Window {
    fn new(items: Components) -> Self {
        let hi = items.len();
        Self { items, lo: 0, hi }
    }

    fn is_empty(&self) -> bool {
        self.lo >= self.hi
    }

    fn first(&self) -> Option<&Component> {
        self.items[self.lo..self.hi].first()
    }

    fn last(&self) -> Option<&Component> {
        self.items[self.lo..self.hi].last()
    }

    fn take_first(&mut self) -> Option<Component> {
        if self.is_empty() {
            return None;
        }
        self.lo += 1;
        Some(self.items[self.lo - 1].clone())
    }

    fn take_last(&mut self) -> Option<Component> {
        if self.is_empty() {
            return None;
        }
        self.hi -= 1;
        Some(self.items[self.hi].clone())
    }

    fn push_back(&mut self, component: Component) {
        // Only ever called after `take_last`, so the slot is free.
        debug_assert!(self.hi < self.items.len());
        self.items[self.hi] = component;
        self.hi += 1;
    }

    fn remaining(self) -> Components {
        self.items[self.lo..self.hi].to_vec()
    }
}

/// Returns the contents of a selector list matching only elements matched by
/// every selector in `complexes`, or `None` if no such list exists.
///
/// All the trailing compounds unify into a single base; the remaining
/// prefixes weave in front of it.
pub(crate) fn unify_complex(complexes: Vec<Components>) -> Option<Vec<Components>> {
    debug_assert!(!complexes.is_empty());

    if complexes.len() == 1 {
        return Some(complexes);
    }

    let mut base: Option<Vec<SimpleSelector>> = None;

    for complex in &complexes {
        let tail = match complex.last()? {
            Component::Compound(compound) => compound,
            Component::Combinator(..) => return None,
        };

        base = Some(match base {
            None => tail.components.clone(),
            Some(mut unified) => {
                for simple in tail.components.clone() {
                    unified = simple.unify(unified)?;
                }
                unified
            }
        });
    }

    let mut prefixes: Vec<Components> = complexes
        .into_iter()
        .map(|mut complex| {
            complex.pop();
            complex
        })
        .collect();

    prefixes
        .last_mut()
        .unwrap()
        .push(Component::Compound(CompoundSelector {
            components: base?,
        }));

    Some(weave(prefixes))
}

/// Folds each parent sequence into the accumulated set of woven prefixes.
pub(crate) fn weave(mut complexes: Vec<Components>) -> Vec<Components> {
    let mut woven: Vec<Components> = vec![complexes.remove(0)];

    for mut complex in complexes {
        let target = match complex.pop() {
            Some(target) => target,
            None => continue,
        };

        if complex.is_empty() {
            for prefix in &mut woven {
                prefix.push(target.clone());
            }
            continue;
        }

        let mut next: Vec<Components> = Vec::new();

        for prefix in woven {
            if let Some(interleavings) = interleave_parents(prefix, complex.clone()) {
                for mut interleaved in interleavings {
                    interleaved.push(target.clone());
                    next.push(interleaved);
                }
            }
        }

        woven = next;
    }

    woven
}

/// All orderings of `lhs` and `rhs` as parents of one target selector that
/// preserve each input's internal order, unifying where CSS demands it.
fn interleave_parents(lhs: Components, rhs: Components) -> Option<Vec<Components>> {
    let mut lhs = Window::new(lhs);
    let mut rhs = Window::new(rhs);

    let lead = merge_leading_combinators(&mut lhs, &mut rhs)?;
    let mut trail = merge_trailing(&mut lhs, &mut rhs)?;

    // A `:root` can only match one element, so leading compounds containing
    // one must unify.
    match (split_root(&mut lhs), split_root(&mut rhs)) {
        (Some(left_root), Some(right_root)) => {
            let unified = Component::Compound(left_root.unify(right_root)?);
            // Re-seed both windows with the shared root.
            let mut l = vec![unified.clone()];
            l.extend(lhs.remaining());
            lhs = Window::new(l);
            let mut r = vec![unified];
            r.extend(rhs.remaining());
            rhs = Window::new(r);
        }
        (Some(left_root), None) => {
            let mut r = vec![Component::Compound(left_root)];
            r.extend(rhs.remaining());
            rhs = Window::new(r);
        }
        (None, Some(right_root)) => {
            let mut l = vec![Component::Compound(right_root)];
            l.extend(lhs.remaining());
            lhs = Window::new(l);
        }
        (None, None) => {}
    }

    let mut left_groups = group_compounds(lhs.remaining());
    let mut right_groups = group_compounds(rhs.remaining());

    let spine = common_spine(&right_groups, &left_groups);

    let mut choices: Vec<Vec<Components>> = vec![vec![lead
        .into_iter()
        .map(Component::Combinator)
        .collect::<Components>()]];

    for group in spine {
        let prelude = take_until(&mut left_groups, &mut right_groups, |queue| {
            match queue.front() {
                Some(head) => covers_as_parent(head.clone(), group.clone()),
                None => true,
            }
        });

        choices.push(
            prelude
                .into_iter()
                .map(|chunk| chunk.into_iter().flatten().collect())
                .collect(),
        );
        choices.push(vec![group]);
        left_groups.pop_front();
        right_groups.pop_front();
    }

    let coda = take_until(&mut left_groups, &mut right_groups, VecDeque::is_empty);
    choices.push(
        coda.into_iter()
            .map(|chunk| chunk.into_iter().flatten().collect())
            .collect(),
    );

    choices.append(&mut trail);

    Some(
        cartesian(
            choices
                .into_iter()
                .filter(|choice| !choice.is_empty())
                .collect(),
        )
        .into_iter()
        .map(|path| path.into_iter().flatten().collect())
        .collect(),
    )
}

/// Strips the leading combinators of both windows and merges them; fails
/// unless one side's run is a subsequence of the other's.
fn merge_leading_combinators(lhs: &mut Window, rhs: &mut Window) -> Option<Vec<Combinator>> {
    let left = strip_leading_combinators(lhs);
    let right = strip_leading_combinators(rhs);

    if is_subsequence(&left, &right) {
        Some(right)
    } else if is_subsequence(&right, &left) {
        Some(left)
    } else {
        None
    }
}

fn strip_leading_combinators(window: &mut Window) -> Vec<Combinator> {
    let mut combinators = Vec::new();

    while let Some(Component::Combinator(c)) = window.first() {
        combinators.push(*c);
        window.take_first();
    }

    combinators
}

fn is_subsequence<T: PartialEq>(needle: &[T], haystack: &[T]) -> bool {
    let mut iter = haystack.iter();
    needle.iter().all(|item| iter.any(|other| other == item))
}

fn strip_trailing_combinators(window: &mut Window) -> Vec<Combinator> {
    let mut combinators = Vec::new();

    while let Some(Component::Combinator(c)) = window.last() {
        combinators.push(*c);
        window.take_last();
    }

    combinators
}

/// Peels trailing `(compound, combinator)` pairs off both windows, merging
/// them into choice groups. The groups are collected back-to-front and
/// reversed once at the end.
fn merge_trailing(lhs: &mut Window, rhs: &mut Window) -> Option<Vec<Vec<Components>>> {
    let mut groups_rev: Vec<Vec<Components>> = Vec::new();

    loop {
        let left_tail = strip_trailing_combinators(lhs);
        let right_tail = strip_trailing_combinators(rhs);

        if left_tail.is_empty() && right_tail.is_empty() {
            break;
        }

        // Multiple combinators in a row is a CSS hack: keep the
        // supersequence if there is one, otherwise give up.
        if left_tail.len() > 1 || right_tail.len() > 1 {
            let keep = if is_subsequence(&left_tail, &right_tail) {
                right_tail
            } else if is_subsequence(&right_tail, &left_tail) {
                left_tail
            } else {
                return None;
            };

            groups_rev.push(vec![keep
                .into_iter()
                .map(Component::Combinator)
                .rev()
                .collect()]);
            break;
        }

        match (left_tail.first(), right_tail.first()) {
            (Some(&left_comb), Some(&right_comb)) => {
                let left_compound = match lhs.take_last() {
                    Some(Component::Compound(c)) => c,
                    _ => unreachable!(),
                };
                let right_compound = match rhs.take_last() {
                    Some(Component::Compound(c)) => c,
                    _ => unreachable!(),
                };

                groups_rev.push(merge_trailing_pair(
                    lhs,
                    rhs,
                    left_compound,
                    left_comb,
                    right_compound,
                    right_comb,
                )?);
            }
            (Some(&comb), None) => {
                if comb == Combinator::Child && !rhs.is_empty() {
                    if let (Some(Component::Compound(l)), Some(Component::Compound(r))) =
                        (lhs.last(), rhs.last())
                    {
                        if r.is_superselector(l, &None) {
                            rhs.take_last();
                        }
                    }
                }

                let compound = lhs.take_last().unwrap();
                groups_rev.push(vec![vec![compound, Component::Combinator(comb)]]);
            }
            (None, Some(&comb)) => {
                if comb == Combinator::Child && !lhs.is_empty() {
                    if let (Some(Component::Compound(l)), Some(Component::Compound(r))) =
                        (lhs.last(), rhs.last())
                    {
                        if l.is_superselector(r, &None) {
                            lhs.take_last();
                        }
                    }
                }

                let compound = rhs.take_last().unwrap();
                groups_rev.push(vec![vec![compound, Component::Combinator(comb)]]);
            }
            (None, None) => unreachable!(),
        }
    }

    groups_rev.reverse();
    Some(groups_rev)
}

/// One trailing `(compound, combinator)` from each side: the table of
/// combinator interactions.
fn merge_trailing_pair(
    lhs: &mut Window,
    rhs: &mut Window,
    left: CompoundSelector,
    left_comb: Combinator,
    right: CompoundSelector,
    right_comb: Combinator,
) -> Option<Vec<Components>> {
    use Combinator::{Child, FollowingSibling, NextSibling};

    let pair =
        |compound: CompoundSelector, comb: Combinator| -> Components {
            vec![Component::Compound(compound), Component::Combinator(comb)]
        };

    Some(match (left_comb, right_comb) {
        (FollowingSibling, FollowingSibling) => {
            if left.is_superselector(&right, &None) {
                vec![pair(right, FollowingSibling)]
            } else if right.is_superselector(&left, &None) {
                vec![pair(left, FollowingSibling)]
            } else {
                let mut choices = vec![
                    [
                        pair(left.clone(), FollowingSibling),
                        pair(right.clone(), FollowingSibling),
                    ]
                    .concat(),
                    [
                        pair(right.clone(), FollowingSibling),
                        pair(left.clone(), FollowingSibling),
                    ]
                    .concat(),
                ];

                if let Some(unified) = left.unify(right) {
                    choices.push(pair(unified, FollowingSibling));
                }

                choices
            }
        }
        (FollowingSibling, NextSibling) | (NextSibling, FollowingSibling) => {
            let (following, next) = if left_comb == FollowingSibling {
                (left, right)
            } else {
                (right, left)
            };

            if following.is_superselector(&next, &None) {
                vec![pair(next, NextSibling)]
            } else {
                let mut choices = vec![[
                    pair(following.clone(), FollowingSibling),
                    pair(next.clone(), NextSibling),
                ]
                .concat()];

                if let Some(unified) = following.unify(next) {
                    choices.push(pair(unified, NextSibling));
                }

                choices
            }
        }
        (Child, NextSibling | FollowingSibling) => {
            lhs.push_back(Component::Compound(left));
            lhs.push_back(Component::Combinator(Child));
            vec![pair(right, right_comb)]
        }
        (NextSibling | FollowingSibling, Child) => {
            rhs.push_back(Component::Compound(right));
            rhs.push_back(Component::Combinator(Child));
            vec![pair(left, left_comb)]
        }
        _ => {
            if left_comb != right_comb {
                return None;
            }

            vec![pair(left.unify(right)?, left_comb)]
        }
    })
}

/// Removes the leading compound if it contains `:root`.
fn split_root(window: &mut Window) -> Option<CompoundSelector> {
    match window.first() {
        Some(Component::Compound(compound)) if contains_root(compound) => {
            match window.take_first() {
                Some(Component::Compound(compound)) => Some(compound),
                _ => unreachable!(),
            }
        }
        _ => None,
    }
}

fn contains_root(compound: &CompoundSelector) -> bool {
    compound.components.iter().any(|simple| {
        matches!(
            simple,
            SimpleSelector::Pseudo(pseudo) if pseudo.is_class && pseudo.normalized_name() == "root"
        )
    })
}

/// Groups a sequence so that no group contains two adjacent compounds:
/// `(A B > C D + E ~ > G)` becomes `[(A) (B > C) (D + E ~ > G)]`.
fn group_compounds(components: Components) -> VecDeque<Components> {
    let mut groups: VecDeque<Components> = VecDeque::new();
    let mut current: Components = Vec::new();

    for component in components {
        let extends_group = current
            .last()
            .map_or(false, Component::is_combinator)
            || component.is_combinator();

        if !current.is_empty() && !extends_group {
            groups.push_back(std::mem::take(&mut current));
        }

        current.push(component);
    }

    if !current.is_empty() {
        groups.push_back(current);
    }

    groups
}

/// The longest common subsequence of the two group lists, where two groups
/// match if they are equal, one parent-covers the other, or they must (and
/// can) unify.
fn common_spine(
    list_one: &VecDeque<Components>,
    list_two: &VecDeque<Components>,
) -> Vec<Components> {
    let one: Vec<&Components> = list_one.iter().collect();
    let two: Vec<&Components> = list_two.iter().collect();

    let select = |a: &Components, b: &Components| -> Option<Components> {
        if a == b {
            return Some(a.clone());
        }

        if matches!(a.first(), Some(Component::Combinator(..)))
            || matches!(b.first(), Some(Component::Combinator(..)))
        {
            return None;
        }

        if covers_as_parent(a.clone(), b.clone()) {
            return Some(b.clone());
        }
        if covers_as_parent(b.clone(), a.clone()) {
            return Some(a.clone());
        }

        if !shares_unique_simple(a, b) {
            return None;
        }

        let unified = unify_complex(vec![a.clone(), b.clone()])?;
        match unified.as_slice() {
            [single] => Some(single.clone()),
            _ => None,
        }
    };

    // Standard dynamic program; `picks[i][j]` records the matched group so
    // the walk back needs no re-derivation.
    let mut lengths = vec![vec![0_u32; two.len() + 1]; one.len() + 1];
    let mut picks: Vec<Vec<Option<Components>>> = vec![vec![None; two.len()]; one.len()];

    for i in 0..one.len() {
        for j in 0..two.len() {
            picks[i][j] = select(one[i], two[j]);
            lengths[i + 1][j + 1] = if picks[i][j].is_some() {
                lengths[i][j] + 1
            } else {
                lengths[i + 1][j].max(lengths[i][j + 1])
            };
        }
    }

    // Iterative backtrack from the bottom-right corner.
    let mut spine_rev = Vec::new();
    let (mut i, mut j) = (one.len(), two.len());

    while i > 0 && j > 0 {
        if let Some(pick) = &picks[i - 1][j - 1] {
            spine_rev.push(pick.clone());
            i -= 1;
            j -= 1;
        } else if lengths[i][j - 1] > lengths[i - 1][j] {
            j -= 1;
        } else {
            i -= 1;
        }
    }

    spine_rev.reverse();
    spine_rev
}

/// Takes initial subsequences of both queues up to where `done` first holds,
/// returning both orderings of the two chunks.
fn take_until(
    left: &mut VecDeque<Components>,
    right: &mut VecDeque<Components>,
    done: impl Fn(&VecDeque<Components>) -> bool,
) -> Vec<Vec<Components>> {
    let mut left_chunk = Vec::new();
    while !done(left) {
        left_chunk.push(left.pop_front().unwrap());
    }

    let mut right_chunk = Vec::new();
    while !done(right) {
        right_chunk.push(right.pop_front().unwrap());
    }

    match (left_chunk.is_empty(), right_chunk.is_empty()) {
        (true, true) => Vec::new(),
        (true, false) => vec![right_chunk],
        (false, true) => vec![left_chunk],
        (false, false) => {
            let ordered_one = [left_chunk.as_slice(), right_chunk.as_slice()].concat();
            let ordered_two = [right_chunk.as_slice(), left_chunk.as_slice()].concat();
            vec![ordered_one, ordered_two]
        }
    }
}

/// Like a superselector check, but comparing the sequences as though they
/// shared an implicit trailing base: `B` parent-covers `B A` because `B X`
/// is a superselector of `B A X`.
fn covers_as_parent(mut lhs: Components, mut rhs: Components) -> bool {
    if matches!(lhs.first(), Some(Component::Combinator(..)))
        || matches!(rhs.first(), Some(Component::Combinator(..)))
    {
        return false;
    }
    if lhs.len() > rhs.len() {
        return false;
    }

    let base = Component::Compound(CompoundSelector {
        components: vec![SimpleSelector::Placeholder(String::new())],
    });
    lhs.push(base.clone());
    rhs.push(base);

    ComplexSelector::new(lhs, false).is_superselector(&ComplexSelector::new(rhs, false))
}

/// Every path through `choices`, with the first axis varying fastest:
/// `[[1, 2], [3, 4], [5]]` yields `[1,3,5] [2,3,5] [1,4,5] [2,4,5]`.
pub(crate) fn cartesian<T: Clone>(choices: Vec<Vec<T>>) -> Vec<Vec<T>> {
    if choices.iter().any(Vec::is_empty) {
        return Vec::new();
    }

    let mut paths = Vec::new();
    let mut odometer = vec![0_usize; choices.len()];

    'outer: loop {
        paths.push(
            odometer
                .iter()
                .zip(&choices)
                .map(|(&idx, axis)| axis[idx].clone())
                .collect(),
        );

        // Increment the first axis, carrying rightward.
        for (digit, axis) in odometer.iter_mut().zip(&choices) {
            *digit += 1;
            if *digit < axis.len() {
                continue 'outer;
            }
            *digit = 0;
        }

        return paths;
    }
}

/// Whether the two sequences contain the same unique simple selector (an id
/// or pseudo-element) and therefore must be unified to produce a valid
/// combined selector.
fn shares_unique_simple(lhs: &Components, rhs: &Components) -> bool {
    let unique_in_lhs: Vec<&SimpleSelector> = lhs
        .iter()
        .filter_map(|component| match component {
            Component::Compound(compound) => Some(compound),
            Component::Combinator(..) => None,
        })
        .flat_map(|compound| compound.components.iter().filter(|s| is_unique_kind(s)))
        .collect();

    if unique_in_lhs.is_empty() {
        return false;
    }

    rhs.iter().any(|component| match component {
        Component::Compound(compound) => compound
            .components
            .iter()
            .any(|simple| is_unique_kind(simple) && unique_in_lhs.contains(&simple)),
        Component::Combinator(..) => false,
    })
}

/// Whether a compound may contain only one simple selector of this kind.
fn is_unique_kind(simple: &SimpleSelector) -> bool {
    matches!(
        simple,
        SimpleSelector::Id(..)
            | SimpleSelector::Pseudo(Pseudo {
                is_class: false,
                ..
            })
    )
}
