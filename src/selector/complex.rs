use std::{
    collections::HashSet,
    fmt::{self, Display, Write},
    hash::{Hash, Hasher},
    sync::atomic::{AtomicU32, Ordering as AtomicOrdering},
};

use super::{CompoundSelector, Pseudo, Specificity, SimpleSelector};

static NEXT_COMPLEX_SELECTOR_ID: AtomicU32 = AtomicU32::new(0);

/// Tracks complex selectors by identity rather than structure, standing in
/// for the pointer-equality sets the reference implementation relies on.
#[derive(Clone, Debug)]
pub struct ComplexSelectorSet(HashSet<u32>);

impl ComplexSelectorSet {
    pub fn new() -> Self {
        Self(HashSet::new())
    }

    pub fn insert(&mut self, complex: &ComplexSelector) -> bool {
        self.0.insert(complex.unique_id)
    }

    pub fn contains(&self, complex: &ComplexSelector) -> bool {
        self.0.contains(&complex.unique_id)
    }

    pub fn extend<'a>(&mut self, complexes: impl Iterator<Item = &'a ComplexSelector>) {
        self.0.extend(complexes.map(|complex| complex.unique_id));
    }
}

/// A sequence of compound selectors separated by combinators.
///
/// Descendant combinators are implicit: two adjacent compounds are separated
/// by one. Adjacent explicit combinators aren't valid CSS but are preserved
/// for CSS-hack compatibility.
#[derive(Clone, Debug)]
pub struct ComplexSelector {
    /// Never empty.
    pub components: Vec<ComplexSelectorComponent>,

    /// Whether a line break should be emitted *before* this selector.
    pub line_break: bool,

    /// Identity token for [`ComplexSelectorSet`].
    unique_id: u32,
}

impl PartialEq for ComplexSelector {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for ComplexSelector {}

impl Hash for ComplexSelector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

impl fmt::Display for ComplexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;

        for component in &self.components {
            if !first {
                f.write_char(' ')?;
            }
            write!(f, "{}", component)?;
            first = false;
        }
        Ok(())
    }
}

impl ComplexSelector {
    pub fn new(components: Vec<ComplexSelectorComponent>, line_break: bool) -> Self {
        Self {
            components,
            line_break,
            unique_id: NEXT_COMPLEX_SELECTOR_ID.fetch_add(1, AtomicOrdering::Relaxed),
        }
    }

    pub fn min_specificity(&self) -> i32 {
        self.specificity().min
    }

    pub fn max_specificity(&self) -> i32 {
        self.specificity().max
    }

    pub fn specificity(&self) -> Specificity {
        let mut min = 0;
        let mut max = 0;
        for component in &self.components {
            if let ComplexSelectorComponent::Compound(compound) = component {
                min += compound.min_specificity();
                max += compound.max_specificity();
            }
        }
        Specificity::new(min, max)
    }

    pub fn is_invisible(&self) -> bool {
        self.components
            .iter()
            .any(ComplexSelectorComponent::is_invisible)
    }

    /// Whether `self` matches every element `other` matches.
    ///
    /// Walks both component lists in lockstep: every compound of `self` must
    /// cover some compound of `other`, in order, with compatible combinators
    /// between them.
    pub fn is_superselector(&self, other: &Self) -> bool {
        let mut ours = self.components.as_slice();
        let mut theirs = other.components.as_slice();

        if matches!(ours.last(), Some(ComplexSelectorComponent::Combinator(..)))
            || matches!(theirs.last(), Some(ComplexSelectorComponent::Combinator(..)))
        {
            return false;
        }

        loop {
            if ours.is_empty() || ours.len() > theirs.len() {
                return false;
            }

            let compound = match &ours[0] {
                ComplexSelectorComponent::Compound(compound) => compound,
                ComplexSelectorComponent::Combinator(..) => return false,
            };

            if theirs[0].is_combinator() {
                return false;
            }

            // The final compound may match anywhere in the remaining tail.
            if ours.len() == 1 {
                let parents = theirs[..theirs.len() - 1].to_vec();
                return compound
                    .is_superselector(theirs.last().unwrap().as_compound(), &Some(parents));
            }

            // The first compound of `theirs` that `compound` covers, given
            // the components crossed to reach it.
            let candidates = theirs.len() - 1;
            let covered = (0..candidates).find(|&i| match &theirs[i] {
                ComplexSelectorComponent::Compound(candidate) => {
                    let crossed = if i <= 1 {
                        Vec::new()
                    } else {
                        theirs[1..i].to_vec()
                    };
                    compound.is_superselector(candidate, &Some(crossed))
                }
                ComplexSelectorComponent::Combinator(..) => false,
            });

            let covered = match covered {
                Some(i) => i,
                None => return false,
            };

            match (&ours[1], theirs.get(covered + 1)) {
                (
                    ComplexSelectorComponent::Combinator(combinator1),
                    Some(ComplexSelectorComponent::Combinator(combinator2)),
                ) => {
                    // `~` covers both `~` and `+`; everything else must
                    // match exactly.
                    if *combinator1 == Combinator::FollowingSibling {
                        if *combinator2 == Combinator::Child {
                            return false;
                        }
                    } else if combinator1 != combinator2 {
                        return false;
                    }

                    // A trailing `<compound> <combinator> <compound>` can
                    // only cover a tail of the same length.
                    if ours.len() == 3 && theirs.len() > 3 {
                        return false;
                    }

                    ours = &ours[2..];
                    theirs = &theirs[covered + 2..];
                }
                (ComplexSelectorComponent::Combinator(..), _) => return false,
                (_, Some(ComplexSelectorComponent::Combinator(combinator2))) => {
                    if *combinator2 != Combinator::Child {
                        return false;
                    }
                    ours = &ours[1..];
                    theirs = &theirs[covered + 2..];
                }
                _ => {
                    ours = &ours[1..];
                    theirs = &theirs[covered + 1..];
                }
            }
        }
    }

    pub fn contains_parent_selector(&self) -> bool {
        self.components.iter().any(|c| {
            if let ComplexSelectorComponent::Compound(compound) = c {
                compound.components.iter().any(|simple| {
                    if simple.is_parent() {
                        return true;
                    }
                    if let SimpleSelector::Pseudo(Pseudo {
                        selector: Some(sel),
                        ..
                    }) = simple
                    {
                        return sel.contains_parent_selector();
                    }
                    false
                })
            } else {
                false
            }
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Copy, Hash)]
pub enum Combinator {
    /// `+`: the right-hand selector is immediately adjacent to the left.
    NextSibling,

    /// `>`: the right-hand selector is a direct child of the left.
    Child,

    /// `~`: the right-hand selector comes after the left.
    FollowingSibling,
}

impl Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char(match self {
            Self::NextSibling => '+',
            Self::Child => '>',
            Self::FollowingSibling => '~',
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ComplexSelectorComponent {
    Combinator(Combinator),
    Compound(CompoundSelector),
}

impl ComplexSelectorComponent {
    pub fn is_invisible(&self) -> bool {
        match self {
            Self::Combinator(..) => false,
            Self::Compound(c) => c.is_invisible(),
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Self::Compound(..))
    }

    pub fn is_combinator(&self) -> bool {
        matches!(self, Self::Combinator(..))
    }

    pub fn as_compound(&self) -> &CompoundSelector {
        match self {
            Self::Compound(c) => c,
            Self::Combinator(..) => unreachable!(),
        }
    }
}

impl Display for ComplexSelectorComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compound(c) => write!(f, "{}", c),
            Self::Combinator(c) => write!(f, "{}", c),
        }
    }
}
