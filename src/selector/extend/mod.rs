use std::collections::{HashMap, HashSet, VecDeque};

use codemap::Span;

use indexmap::IndexMap;

use crate::{
    ast::MediaQuery,
    error::{CompileResult, Error, ErrorKind},
};

use super::{
    ComplexSelector, ComplexSelectorComponent, ComplexSelectorSet, CompoundSelector, Pseudo,
    SelectorList, SimpleSelector,
};

pub(crate) use extended_selector::ExtendedSelector;
use extended_selector::SelectorSet;
pub(crate) use extension::{ExtendRule, Extension};
pub(crate) use weave::unify_complex;
use weave::{cartesian, weave};

mod extended_selector;
mod extension;
mod weave;

/// Extensions aimed at simple selectors, keyed by target and then by
/// extender. Insertion order is contractual: it fixes output order.
type ExtensionIndex = HashMap<SimpleSelector, IndexMap<ComplexSelector, Extension>>;

/// The inputs of one selector-rewriting pass: which extension index applies
/// (the store's own, unless a re-extension supplies a narrower one) and the
/// media context of the selector being rewritten.
struct RewriteCtx<'a> {
    overrides: Option<&'a ExtensionIndex>,
    media: &'a Option<Vec<MediaQuery>>,
}

impl<'a> RewriteCtx<'a> {
    fn with_media(media: &'a Option<Vec<MediaQuery>>) -> Self {
        Self {
            overrides: None,
            media,
        }
    }
}

/// Modes in which selector extension can run.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
enum ExtendMode {
    /// The `@extend` rule: existing selectors are preserved and each target
    /// is extended individually.
    #[default]
    Normal,

    /// `selector-replace()`: existing selectors are replaced, and every
    /// target must match to rewrite a compound.
    Replace,

    /// `selector-extend()`: existing selectors are preserved, and every
    /// target must match.
    AllTargets,
}

/// Tracks the `@extend` relations of one compilation (or one module) and
/// rewrites selectors as rules and extensions arrive in either order.
#[derive(Clone, Debug)]
pub struct Extender {
    /// Index from every simple selector appearing in the stylesheet to the
    /// (live) selector lists containing it. Used to find which rules an
    /// `@extend` applies to.
    rules_by_simple: HashMap<SimpleSelector, SelectorSet>,

    /// The registered extensions, by target.
    extensions: ExtensionIndex,

    /// Index from the simple selectors appearing in extenders to the
    /// extensions those extenders define, for transitive extension.
    by_extender_simple: HashMap<SimpleSelector, Vec<Extension>>,

    /// The media query context each registered selector was defined in.
    /// Top-level selectors have no entry.
    media_contexts: HashMap<SelectorList, Vec<MediaQuery>>,

    /// The maximum specificity of the complex selector that originally
    /// contained each simple selector. Guards trimming: a generated
    /// selector must never be trimmed below the specificity its sources
    /// demand.
    source_specificity: HashMap<SimpleSelector, i32>,

    /// The complex selectors that appeared in the source document, as
    /// opposed to being generated by `@extend`. Originals are never
    /// trimmed.
    originals: ComplexSelectorSet,

    mode: ExtendMode,

    span: Span,
}

impl Extender {
    pub fn new(span: Span) -> Self {
        Self {
            rules_by_simple: HashMap::new(),
            extensions: HashMap::new(),
            by_extender_simple: HashMap::new(),
            media_contexts: HashMap::new(),
            source_specificity: HashMap::new(),
            originals: ComplexSelectorSet::new(),
            mode: ExtendMode::Normal,
            span,
        }
    }

    fn with_mode(mode: ExtendMode, span: Span) -> Self {
        Self {
            mode,
            ..Extender::new(span)
        }
    }

    /// One-off extension for `selector-extend()`.
    pub fn extend(
        selector: SelectorList,
        source: SelectorList,
        targets: SelectorList,
        span: Span,
    ) -> CompileResult<SelectorList> {
        Self::one_shot(selector, source, targets, ExtendMode::AllTargets, span)
    }

    /// One-off replacement for `selector-replace()`.
    pub fn replace(
        selector: SelectorList,
        source: SelectorList,
        targets: SelectorList,
        span: Span,
    ) -> CompileResult<SelectorList> {
        Self::one_shot(selector, source, targets, ExtendMode::Replace, span)
    }

    fn one_shot(
        selector: SelectorList,
        source: SelectorList,
        targets: SelectorList,
        mode: ExtendMode,
        span: Span,
    ) -> CompileResult<SelectorList> {
        let extenders: IndexMap<ComplexSelector, Extension> = source
            .components
            .into_iter()
            .map(|complex| {
                (
                    complex.clone(),
                    Extension::one_off(complex, None, false, span),
                )
            })
            .collect();

        let mut index = ExtensionIndex::new();

        for complex in targets.components {
            let compound = match complex.components.as_slice() {
                [ComplexSelectorComponent::Compound(compound)] => compound.clone(),
                _ => {
                    return Err(Error::raw(
                        ErrorKind::InvalidSyntax,
                        format!("Can't extend complex selector {}.", complex),
                        span,
                    ))
                }
            };

            for simple in compound.components {
                index.insert(simple, extenders.clone());
            }
        }

        let mut extender = Extender::with_mode(mode, span);

        if !selector.is_invisible() {
            extender.originals.extend(selector.components.iter());
        }

        let media = None;
        extender.rewrite_list(
            selector,
            &RewriteCtx {
                overrides: Some(&index),
                media: &media,
            },
        )
    }

    /// Adds `selector` to the store, rewriting it with all registered
    /// extensions. The returned handle is updated in place if more relevant
    /// extensions arrive later.
    pub fn add_selector(
        &mut self,
        mut selector: SelectorList,
        media: &Option<Vec<MediaQuery>>,
    ) -> CompileResult<ExtendedSelector> {
        if !selector.is_invisible() {
            for complex in selector.components.clone() {
                self.originals.insert(&complex);
            }
        }

        if !self.extensions.is_empty() {
            selector = self.rewrite_list(selector, &RewriteCtx::with_media(media))?;
        }

        if let Some(media) = media {
            self.media_contexts.insert(selector.clone(), media.clone());
        }

        let handle = ExtendedSelector::new(selector.clone());
        self.index_rule(selector, &handle);
        Ok(handle)
    }

    /// Points every simple selector in `list` at `handle` so later
    /// extensions can find and rewrite the rule.
    fn index_rule(&mut self, list: SelectorList, handle: &ExtendedSelector) {
        for complex in list.components {
            for component in complex.components {
                if let ComplexSelectorComponent::Compound(compound) = component {
                    for simple in compound.components {
                        self.rules_by_simple
                            .entry(simple.clone())
                            .or_insert_with(SelectorSet::new)
                            .insert(handle.clone());

                        if let SimpleSelector::Pseudo(Pseudo {
                            selector: Some(inner),
                            ..
                        }) = simple
                        {
                            self.index_rule(*inner, handle);
                        }
                    }
                }
            }
        }
    }

    /// Records an `@extend` and re-extends every already-registered rule
    /// and extension the new one is relevant to.
    pub fn add_extension(
        &mut self,
        extender: SelectorList,
        target: &SimpleSelector,
        extend: &ExtendRule,
        media: &Option<Vec<MediaQuery>>,
        span: Span,
    ) -> CompileResult<()> {
        let affected_rules = self.rules_by_simple.get(target).cloned();
        let existing_extensions = self.by_extender_simple.get(target).cloned();

        let mut fresh: Option<IndexMap<ComplexSelector, Extension>> = None;

        for complex in extender.components {
            let extension = Extension {
                specificity: complex.max_specificity(),
                extender: complex.clone(),
                target: Some(target.clone()),
                span,
                media_context: media.clone(),
                is_optional: extend.is_optional,
                is_original: false,
            };

            let sources = self
                .extensions
                .entry(target.clone())
                .or_insert_with(IndexMap::new);

            if let Some(existing) = sources.get(&complex) {
                // An extend from this extender to this target already
                // exists; merging may still strengthen optionality or the
                // media context.
                let merged = Extension::merge(existing.clone(), extension)?;
                sources.insert(complex.clone(), merged);
                continue;
            }

            sources.insert(complex.clone(), extension.clone());

            for component in complex.components.clone() {
                if let ComplexSelectorComponent::Compound(compound) = component {
                    for simple in compound.components {
                        self.by_extender_simple
                            .entry(simple.clone())
                            .or_insert_with(Vec::new)
                            .push(extension.clone());
                        // Only the original selector's source specificity is
                        // relevant; selectors generated by `@extend` don't
                        // gain new specificity.
                        self.source_specificity
                            .entry(simple.clone())
                            .or_insert_with(|| complex.max_specificity());
                    }
                }
            }

            if affected_rules.is_some() || existing_extensions.is_some() {
                fresh
                    .get_or_insert_with(IndexMap::new)
                    .insert(complex.clone(), extension);
            }
        }

        let fresh = match fresh {
            Some(fresh) => fresh,
            None => return Ok(()),
        };

        let mut fresh_by_target = ExtensionIndex::new();
        fresh_by_target.insert(target.clone(), fresh);

        if let Some(existing_extensions) = existing_extensions {
            let additional = self.reextend_extenders(existing_extensions, &fresh_by_target)?;
            if let Some(additional) = additional {
                merge_extension_indexes(&mut fresh_by_target, additional);
            }
        }

        if let Some(rules) = affected_rules {
            self.reextend_rules(rules, &fresh_by_target)?;
        }

        Ok(())
    }

    /// After evaluation, every non-optional extension must have found its
    /// target in some rule. Returns the first violation.
    pub fn check_unsatisfied_extensions(&self) -> Option<(String, Span)> {
        for (target, sources) in &self.extensions {
            if self.rules_by_simple.contains_key(target) {
                continue;
            }

            for extension in sources.values() {
                if !extension.is_optional {
                    return Some((
                        format!(
                            "The target selector was not found.\nUse \"@extend {} !optional\" to avoid this error.",
                            target
                        ),
                        extension.span,
                    ));
                }
            }
        }

        None
    }

    /// Extends the extenders of `extensions` using `fresh`, producing the
    /// transitive extensions needed for loops such as:
    ///
    /// ```text
    ///     .c {x: y; @extend .a}
    ///     .x.y.a {@extend .b}
    ///     .z.b {@extend .c}
    /// ```
    fn reextend_extenders(
        &mut self,
        extensions: Vec<Extension>,
        fresh: &ExtensionIndex,
    ) -> CompileResult<Option<ExtensionIndex>> {
        let mut additional: Option<ExtensionIndex> = None;

        for extension in extensions {
            let target = extension.target.clone().unwrap();
            let mut sources = self.extensions.get(&target).unwrap().clone();

            let ctx = RewriteCtx {
                overrides: Some(fresh),
                media: &extension.media_context,
            };

            let rewritten = match self.rewrite_complex(extension.extender.clone(), &ctx)? {
                Some(rewritten) => rewritten,
                None => continue,
            };

            let kept_original = rewritten.first() == Some(&extension.extender);

            let mut skip_first = kept_original;
            for complex in rewritten {
                // The output contains the original complex selector; no
                // need to recreate it.
                if skip_first {
                    skip_first = false;
                    continue;
                }

                let derived = extension.with_extender(complex.clone());
                match sources.get(&complex) {
                    Some(existing) => {
                        let merged = Extension::merge(existing.clone(), derived)?;
                        sources.insert(complex.clone(), merged);
                    }
                    None => {
                        sources.insert(complex.clone(), derived.clone());

                        for component in complex.components.clone() {
                            if let ComplexSelectorComponent::Compound(compound) = component {
                                for simple in compound.components {
                                    self.by_extender_simple
                                        .entry(simple)
                                        .or_insert_with(Vec::new)
                                        .push(derived.clone());
                                }
                            }
                        }

                        if fresh.contains_key(&target) {
                            additional
                                .get_or_insert_with(ExtensionIndex::new)
                                .entry(target.clone())
                                .or_insert_with(IndexMap::new)
                                .insert(complex.clone(), derived);
                        }
                    }
                }
            }

            // If the extender was replaced (e.g. by `:not()` expansion),
            // drop the old version.
            if !kept_original {
                sources.shift_remove(&extension.extender);
            }

            self.extensions.insert(target, sources);
        }

        Ok(additional)
    }

    /// Rewrites registered rules in place using `fresh`.
    fn reextend_rules(&mut self, rules: SelectorSet, fresh: &ExtensionIndex) -> CompileResult<()> {
        for mut handle in rules {
            let old_list = handle.clone().into_selector().0;
            let media = self.media_contexts.get(&old_list).cloned();

            let new_list = self.rewrite_list(
                old_list.clone(),
                &RewriteCtx {
                    overrides: Some(fresh),
                    media: &media,
                },
            )?;

            handle.set_inner(new_list.clone());

            // If no extend actually applied (e.g. because unification
            // failed), the rule is unchanged and needn't be re-indexed.
            if old_list == new_list {
                continue;
            }

            if let Some(media) = media {
                self.media_contexts.insert(new_list.clone(), media);
            }

            self.index_rule(new_list, &handle);
        }

        Ok(())
    }

    // ===================== the rewriting pass =====================

    fn rewrite_list(
        &mut self,
        list: SelectorList,
        ctx: &RewriteCtx,
    ) -> CompileResult<SelectorList> {
        // Avoid allocating in the common case where no extends apply.
        let mut changed: Option<Vec<ComplexSelector>> = None;

        for (i, complex) in list.components.iter().enumerate() {
            match self.rewrite_complex(complex.clone(), ctx)? {
                Some(rewritten) => {
                    let acc = changed.get_or_insert_with(|| list.components[..i].to_vec());
                    acc.extend(rewritten);
                }
                None => {
                    if let Some(acc) = changed.as_mut() {
                        acc.push(complex.clone());
                    }
                }
            }
        }

        Ok(match changed {
            Some(rewritten) => SelectorList {
                components: self.trim(rewritten, &|complex| self.originals.contains(complex)),
                span: self.span,
            },
            None => list,
        })
    }

    /// Rewrites one complex selector; `None` means no extension applied.
    fn rewrite_complex(
        &mut self,
        complex: ComplexSelector,
        ctx: &RewriteCtx,
    ) -> CompileResult<Option<Vec<ComplexSelector>>> {
        // The alternatives each compound can expand to. Given
        //
        //     .a .b {...}
        //     .x .y {@extend .b}
        //
        // this is
        //
        //     [
        //       [.a],
        //       [.b, .x .y]
        //     ]
        let mut alternatives: Option<Vec<Vec<ComplexSelector>>> = None;

        let had_line_break = complex.line_break;
        let is_original = self.originals.contains(&complex);

        for (i, component) in complex.components.iter().enumerate() {
            let expanded = match component {
                ComplexSelectorComponent::Compound(compound) => {
                    self.rewrite_compound(compound, ctx, is_original)?
                }
                ComplexSelectorComponent::Combinator(..) => None,
            };

            match expanded {
                Some(expanded) => {
                    // First divergence: seed with the untouched prefix.
                    let acc = alternatives.get_or_insert_with(|| {
                        complex.components[..i]
                            .iter()
                            .map(|component| {
                                vec![ComplexSelector::new(
                                    vec![component.clone()],
                                    had_line_break,
                                )]
                            })
                            .collect()
                    });
                    acc.push(expanded);
                }
                None => {
                    if let Some(acc) = alternatives.as_mut() {
                        acc.push(vec![ComplexSelector::new(vec![component.clone()], false)]);
                    }
                }
            }
        }

        let alternatives = match alternatives {
            Some(alternatives) => alternatives,
            None => return Ok(None),
        };

        let mut result: Vec<ComplexSelector> = Vec::new();
        let mut first = true;

        for path in cartesian(alternatives) {
            for components in weave(path.iter().map(|complex| complex.components.clone()).collect())
            {
                let woven = ComplexSelector::new(
                    components,
                    had_line_break || path.iter().any(|complex| complex.line_break),
                );

                // Copies of the original complex selector keep their status
                // as originals, including ones modified because a `:not()`
                // was extended into.
                if first && is_original {
                    self.originals.insert(&woven);
                }
                first = false;

                result.push(woven);
            }
        }

        Ok(Some(result))
    }

    /// Rewrites one compound selector, returning every complex selector it
    /// can expand to. `in_original` marks compounds inside original complex
    /// selectors, which must survive trimming.
    fn rewrite_compound(
        &mut self,
        compound: &CompoundSelector,
        ctx: &RewriteCtx,
        in_original: bool,
    ) -> CompileResult<Option<Vec<ComplexSelector>>> {
        // In Replace/AllTargets modes, track which targets were actually
        // hit.
        let mut targets_hit: HashSet<SimpleSelector> = HashSet::new();

        let mut options: Option<Vec<Vec<Extension>>> = None;

        for (i, simple) in compound.components.iter().enumerate() {
            match self.rewrite_simple(simple.clone(), ctx, &mut targets_hit)? {
                Some(expanded) => {
                    let acc = options.get_or_insert_with(|| {
                        if i == 0 {
                            Vec::new()
                        } else {
                            vec![vec![
                                self.one_off_for_compound(compound.components[..i].to_vec())
                            ]]
                        }
                    });
                    acc.extend(expanded);
                }
                None => {
                    if let Some(acc) = options.as_mut() {
                        acc.push(vec![self.one_off_for_simple(simple.clone())]);
                    }
                }
            }
        }

        let options = match options {
            Some(options) => options,
            None => return Ok(None),
        };

        // Outside Normal mode, every target must have been hit for the
        // rewrite to apply at all.
        if !targets_hit.is_empty()
            && self.mode != ExtendMode::Normal
            && targets_hit.len() != ctx.overrides.map_or(self.extensions.len(), HashMap::len)
        {
            return Ok(None);
        }

        // Simple case: a single simple selector needs no unification.
        if let [only] = options.as_slice() {
            let mut result = Vec::with_capacity(only.len());
            for extension in only {
                extension.assert_compatible_media_context(ctx.media)?;
                result.push(extension.extender.clone());
            }
            return Ok(Some(result));
        }

        // Each path through `options` is one unification of the base
        // selector. Given
        //
        //     .a.b {...}
        //     .w .x {@extend .a}
        //     .y .z {@extend .b}
        //
        // `options` is `[[.a, .w .x], [.b, .y .z]]` and its paths unify to
        //
        //     [
        //       [.a.b],
        //       [.y .a.z],
        //       [.w .x.b],
        //       [.w .y .x.z, .y .w .x.z]
        //     ]
        let mut first = self.mode != ExtendMode::Replace;

        let mut unified: Vec<ComplexSelector> = Vec::new();

        for path in cartesian(options) {
            let complexes: Vec<Vec<ComplexSelectorComponent>> = if first {
                // The first path is always the original selector. Pseudo
                // selectors may have been modified, so it can't be returned
                // directly, but it needs no unification.
                first = false;

                let originals = path
                    .iter()
                    .flat_map(|extension| {
                        debug_assert!(extension.extender.components.len() == 1);
                        match extension.extender.components.last() {
                            Some(ComplexSelectorComponent::Compound(c)) => {
                                c.components.iter().cloned()
                            }
                            _ => unreachable!(),
                        }
                    })
                    .collect();

                vec![vec![ComplexSelectorComponent::Compound(CompoundSelector {
                    components: originals,
                })]]
            } else {
                let mut to_unify: VecDeque<Vec<ComplexSelectorComponent>> = VecDeque::new();
                let mut originals: Vec<SimpleSelector> = Vec::new();

                for extension in &path {
                    if extension.is_original {
                        originals.extend(match extension.extender.components.last() {
                            Some(ComplexSelectorComponent::Compound(c)) => {
                                c.components.iter().cloned()
                            }
                            _ => unreachable!(),
                        });
                    } else {
                        to_unify.push_back(extension.extender.components.clone());
                    }
                }

                if !originals.is_empty() {
                    to_unify.push_front(vec![ComplexSelectorComponent::Compound(
                        CompoundSelector {
                            components: originals,
                        },
                    )]);
                }

                match unify_complex(Vec::from(to_unify)) {
                    Some(complexes) => complexes,
                    None => continue,
                }
            };

            let mut line_break = false;

            for extension in &path {
                extension.assert_compatible_media_context(ctx.media)?;
                line_break = line_break || extension.extender.line_break;
            }

            unified.extend(
                complexes
                    .into_iter()
                    .map(|components| ComplexSelector::new(components, line_break)),
            );
        }

        Ok(Some(if in_original && self.mode != ExtendMode::Replace {
            let original = unified.first().cloned();
            self.trim(unified, &|complex| Some(complex) == original.as_ref())
        } else {
            self.trim(unified, &|_| false)
        }))
    }

    fn rewrite_simple(
        &mut self,
        simple: SimpleSelector,
        ctx: &RewriteCtx,
        targets_hit: &mut HashSet<SimpleSelector>,
    ) -> CompileResult<Option<Vec<Vec<Extension>>>> {
        if let SimpleSelector::Pseudo(
            pseudo @ Pseudo {
                selector: Some(..), ..
            },
        ) = simple.clone()
        {
            if let Some(rewritten) = self.rewrite_pseudo(pseudo, ctx)? {
                let mut result = Vec::with_capacity(rewritten.len());
                for inner in rewritten {
                    let simple = SimpleSelector::Pseudo(inner);
                    result.push(
                        self.extensions_for(simple.clone(), ctx, targets_hit)
                            .unwrap_or_else(|| vec![self.one_off_for_simple(simple)]),
                    );
                }
                return Ok(Some(result));
            }
        }

        Ok(self
            .extensions_for(simple, ctx, targets_hit)
            .map(|extensions| vec![extensions]))
    }

    /// The alternatives for `simple` itself, without touching any selector
    /// pseudos it contains: the simple selector plus its extenders.
    fn extensions_for(
        &self,
        simple: SimpleSelector,
        ctx: &RewriteCtx,
        targets_hit: &mut HashSet<SimpleSelector>,
    ) -> Option<Vec<Extension>> {
        let extenders = ctx.overrides.unwrap_or(&self.extensions).get(&simple)?;

        targets_hit.insert(simple.clone());

        if self.mode == ExtendMode::Replace {
            return Some(extenders.values().cloned().collect());
        }

        let mut result = Vec::with_capacity(extenders.len() + 1);
        result.push(self.one_off_for_simple(simple));
        result.extend(extenders.values().cloned());

        Some(result)
    }

    /// Rewrites the selector argument of `pseudo`, returning the rewritten
    /// pseudos or `None` if nothing changed.
    fn rewrite_pseudo(
        &mut self,
        pseudo: Pseudo,
        ctx: &RewriteCtx,
    ) -> CompileResult<Option<Vec<Pseudo>>> {
        let inner = pseudo
            .selector
            .as_deref()
            .cloned()
            .unwrap_or_else(|| SelectorList::new(self.span));

        let rewritten = self.rewrite_list(inner, ctx)?;

        if Some(&rewritten) == pseudo.selector.as_deref() {
            return Ok(None);
        }

        // Meaningful `:not()` content should stay a single complex selector
        // for browser compatibility, unless the original already contained a
        // complex selector or the rewrite produced only complex selectors.
        let mut complexes = if pseudo.normalized_name() == "not"
            && !pseudo
                .selector
                .as_deref()
                .unwrap()
                .components
                .iter()
                .any(|complex| complex.components.len() > 1)
            && rewritten
                .components
                .iter()
                .any(|complex| complex.components.len() == 1)
        {
            rewritten
                .components
                .into_iter()
                .filter(|complex| complex.components.len() <= 1)
                .collect()
        } else {
            rewritten.components
        };

        complexes = complexes
            .into_iter()
            .flat_map(|complex| self.flatten_nested_pseudo(&pseudo, complex))
            .collect();

        // Older browsers support only a single complex selector inside
        // `:not()`; break the contents up unless the source already had a
        // selector list.
        if pseudo.normalized_name() == "not"
            && pseudo.selector.as_deref().unwrap().components.len() == 1
        {
            let result: Vec<Pseudo> = complexes
                .into_iter()
                .map(|complex| {
                    pseudo.clone().with_selector(Some(Box::new(SelectorList {
                        components: vec![complex],
                        span: self.span,
                    })))
                })
                .collect();

            Ok(if result.is_empty() { None } else { Some(result) })
        } else {
            Ok(Some(vec![pseudo.with_selector(Some(Box::new(
                SelectorList {
                    components: complexes,
                    span: self.span,
                },
            )))]))
        }
    }

    /// Collapses a pseudo-in-pseudo produced by rewriting, where the
    /// semantics allow it.
    fn flatten_nested_pseudo(
        &self,
        outer: &Pseudo,
        complex: ComplexSelector,
    ) -> Vec<ComplexSelector> {
        let inner = match complex.components.as_slice() {
            [ComplexSelectorComponent::Compound(compound)] => match compound.components.as_slice()
            {
                [SimpleSelector::Pseudo(
                    inner @ Pseudo {
                        selector: Some(..), ..
                    },
                )] => inner,
                _ => return vec![complex],
            },
            _ => return vec![complex],
        };

        match outer.normalized_name() {
            "not" => {
                // A `:not()` inside a `:not()` would semantically reverse;
                // the inner result collapses to nothing rather than
                // supporting that narrow edge case.
                if ["matches", "is", "where"].contains(&inner.normalized_name()) {
                    inner.selector.as_deref().unwrap().components.clone()
                } else {
                    Vec::new()
                }
            }
            "matches" | "where" | "is" | "any" | "current" | "nth-child" | "nth-last-child" => {
                if inner.name != outer.name || inner.argument != outer.argument {
                    Vec::new()
                } else {
                    inner.selector.as_deref().unwrap().components.clone()
                }
            }
            "has" | "host" | "host-context" | "slotted" => {
                // Nested selectors here add a layer of semantics:
                // `:has(:has(img))` is not `:has(img)`. Leave them.
                vec![complex]
            }
            _ => Vec::new(),
        }
    }

    /// A one-off extension whose extender is just `simple`.
    fn one_off_for_simple(&self, simple: SimpleSelector) -> Extension {
        let specificity = Some(*self.source_specificity.get(&simple).unwrap_or(&0));
        Extension::one_off(
            ComplexSelector::new(
                vec![ComplexSelectorComponent::Compound(CompoundSelector {
                    components: vec![simple],
                })],
                false,
            ),
            specificity,
            true,
            self.span,
        )
    }

    /// A one-off extension whose extender is the compound of `simples`.
    fn one_off_for_compound(&self, simples: Vec<SimpleSelector>) -> Extension {
        let compound = CompoundSelector {
            components: simples,
        };
        let specificity = Some(self.source_specificity_for(&compound));
        Extension::one_off(
            ComplexSelector::new(vec![ComplexSelectorComponent::Compound(compound)], false),
            specificity,
            true,
            self.span,
        )
    }

    /// The maximum source specificity of the simples in `compound`.
    fn source_specificity_for(&self, compound: &CompoundSelector) -> i32 {
        compound
            .components
            .iter()
            .map(|simple| *self.source_specificity.get(simple).unwrap_or(&0))
            .max()
            .unwrap_or(0)
    }

    /// Removes selectors that are redundant: each one covered by a
    /// superselector of equal-or-higher specificity elsewhere in the list.
    /// Originals are never removed; on a run of duplicates the first is
    /// kept.
    fn trim(
        &self,
        selectors: Vec<ComplexSelector>,
        is_original: &dyn Fn(&ComplexSelector) -> bool,
    ) -> Vec<ComplexSelector> {
        // Past this size the quadratic scan becomes pathological; emitting
        // redundant selectors beats hanging.
        if selectors.len() > 100 {
            return selectors;
        }

        // `kept` is in final order; iterating the input back-to-front and
        // inserting at the front means that of two identical selectors the
        // first survives.
        let mut kept: Vec<ComplexSelector> = Vec::new();
        let mut num_originals = 0;

        'outer: for i in (0..selectors.len()).rev() {
            let candidate = &selectors[i];

            if is_original(candidate) {
                // Don't keep two copies of the same original, which happens
                // when a rule extends a component of its own selector; move
                // the kept copy to the front of the originals run instead.
                for j in 0..num_originals {
                    if &kept[j] == candidate {
                        let duplicate = kept.remove(j);
                        kept.insert(0, duplicate);
                        continue 'outer;
                    }
                }
                num_originals += 1;
                kept.insert(0, candidate.clone());
                continue;
            }

            // The maximum specificity of the sources that generated
            // `candidate`. A selector that covers it must be at least this
            // specific for `candidate` to be removable.
            let max_source_specificity = candidate
                .components
                .iter()
                .filter_map(|component| match component {
                    ComplexSelectorComponent::Compound(compound) => {
                        Some(self.source_specificity_for(compound))
                    }
                    ComplexSelectorComponent::Combinator(..) => None,
                })
                .max()
                .unwrap_or(0);

            let covered_by = |other: &ComplexSelector| {
                other.min_specificity() >= max_source_specificity
                    && other.is_superselector(candidate)
            };

            // Check what's already kept (so nothing compares against an
            // already-trimmed selector) and then the untouched prefix.
            if kept.iter().any(covered_by) || selectors[..i].iter().any(covered_by) {
                continue;
            }

            kept.insert(0, candidate.clone());
        }

        kept
    }
}

/// `HashMap::extend` for two-layer maps, reusing inner maps when possible.
fn merge_extension_indexes(destination: &mut ExtensionIndex, source: ExtensionIndex) {
    for (key, inner) in source {
        match destination.get_mut(&key) {
            Some(existing) => existing.extend(inner),
            None => {
                destination.insert(key, inner);
            }
        }
    }
}
