use std::{
    fmt::{self, Write},
    hash::{Hash, Hasher},
    mem,
};

use codemap::Span;

use super::{unify_complex, ComplexSelector, ComplexSelectorComponent};

use crate::{
    common::{Brackets, ListSeparator, QuoteKind},
    error::{CompileResult, ErrorKind},
    value::Value,
};

/// A comma-separated selector list. Matches an element that matches any of
/// its complex selectors.
#[derive(Clone, Debug)]
pub struct SelectorList {
    /// Never empty after parsing.
    pub components: Vec<ComplexSelector>,
    pub span: Span,
}

impl PartialEq for SelectorList {
    fn eq(&self, other: &SelectorList) -> bool {
        self.components == other.components
    }
}

impl Eq for SelectorList {}

impl Hash for SelectorList {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote_any = false;

        for complex in &self.components {
            if complex.is_invisible() {
                continue;
            }

            if wrote_any {
                f.write_char(',')?;
                f.write_char(if complex.line_break { '\n' } else { ' ' })?;
            }
            wrote_any = true;

            write!(f, "{}", complex)?;
        }

        Ok(())
    }
}

impl SelectorList {
    pub const fn new(span: Span) -> Self {
        Self {
            components: Vec::new(),
            span,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn is_invisible(&self) -> bool {
        self.components.iter().all(ComplexSelector::is_invisible)
    }

    pub fn contains_parent_selector(&self) -> bool {
        self.components
            .iter()
            .any(ComplexSelector::contains_parent_selector)
    }

    /// The list-of-lists representation returned by `selector-parse()`.
    pub fn to_sass_list(self) -> Value {
        let complexes = self
            .components
            .into_iter()
            .map(|complex| {
                let parts = complex
                    .components
                    .into_iter()
                    .map(|component| Value::String(component.to_string(), QuoteKind::None))
                    .collect();

                Value::List(parts, ListSeparator::Space, Brackets::None)
            })
            .collect();

        Value::List(complexes, ListSeparator::Comma, Brackets::None)
    }

    /// Produces the list matching only elements matched by both `self` and
    /// `other`, or `None` if no such list exists.
    pub fn unify(self, other: &Self) -> Option<Self> {
        let mut contents = Vec::new();

        for c1 in self.components {
            for c2 in &other.components {
                if let Some(unified) =
                    unify_complex(vec![c1.components.clone(), c2.components.clone()])
                {
                    contents.extend(
                        unified
                            .into_iter()
                            .map(|components| ComplexSelector::new(components, false)),
                    );
                }
            }
        }

        if contents.is_empty() {
            return None;
        }

        Some(Self {
            components: contents,
            span: self.span.merge(other.span),
        })
    }

    /// Returns a new list with all parent selectors replaced by `parent`.
    ///
    /// If `implicit_parent` is `true`, complex selectors without an explicit
    /// `&` are treated as though they began with one. A `None` parent makes
    /// an explicit `&` an error.
    pub fn resolve_parent_selectors(
        self,
        parent: Option<Self>,
        implicit_parent: bool,
    ) -> CompileResult<Self> {
        let span = self.span;

        let parent = match parent {
            Some(parent) => parent,
            None => {
                if !self.contains_parent_selector() {
                    return Ok(self);
                }
                return Err((
                    ErrorKind::TopLevelParent,
                    "Top-level selectors may not contain the parent selector \"&\".",
                    span,
                )
                    .into());
            }
        };

        let mut groups = Vec::with_capacity(self.components.len());
        for complex in self.components {
            groups.push(resolve_one_complex(complex, &parent, implicit_parent, span)?);
        }

        Ok(Self {
            components: flatten_vertically(groups),
            span,
        })
    }

    pub fn is_superselector(&self, other: &Self) -> bool {
        other.components.iter().all(|complex1| {
            self.components
                .iter()
                .any(|complex2| complex2.is_superselector(complex1))
        })
    }
}

/// Resolves the parent selectors of a single complex selector, producing
/// every combination of the parent's complexes with the resolved compounds.
fn resolve_one_complex(
    complex: ComplexSelector,
    parent: &SelectorList,
    implicit_parent: bool,
    span: Span,
) -> CompileResult<Vec<ComplexSelector>> {
    if !complex.contains_parent_selector() {
        if !implicit_parent {
            return Ok(vec![complex]);
        }

        // No explicit `&`: nest under every parent complex.
        return Ok(parent
            .components
            .iter()
            .cloned()
            .map(|parent_complex| {
                let line_break = complex.line_break || parent_complex.line_break;
                let mut components = parent_complex.components;
                components.extend(complex.components.iter().cloned());

                ComplexSelector::new(components, line_break)
            })
            .collect());
    }

    // Each component either appends to every partial prefix (combinators
    // and plain compounds), or multiplies the prefix set (compounds that
    // resolved to several selectors).
    let mut partials: Vec<(Vec<ComplexSelectorComponent>, bool)> = vec![(Vec::new(), false)];

    for component in complex.components {
        let resolved = match &component {
            ComplexSelectorComponent::Compound(compound) => compound
                .clone()
                .resolve_parent_selectors(span, parent.clone())?,
            ComplexSelectorComponent::Combinator(..) => None,
        };

        match resolved {
            None => {
                for (partial, _) in &mut partials {
                    partial.push(component.clone());
                }
            }
            Some(resolved) => {
                for (prefix, line_break) in mem::take(&mut partials) {
                    for resolved_complex in &resolved {
                        let mut combined = prefix.clone();
                        combined.extend(resolved_complex.components.iter().cloned());
                        partials.push((combined, line_break || resolved_complex.line_break));
                    }
                }
            }
        }
    }

    Ok(partials
        .into_iter()
        .map(|(components, line_break)| ComplexSelector::new(components, line_break))
        .collect())
}

/// Interleaves the inner vectors round-robin, preserving each one's order.
fn flatten_vertically<A>(lists: Vec<Vec<A>>) -> Vec<A> {
    let mut columns: Vec<std::vec::IntoIter<A>> = lists.into_iter().map(Vec::into_iter).collect();

    let mut result = Vec::new();

    loop {
        let mut took_any = false;

        for column in &mut columns {
            if let Some(item) = column.next() {
                result.push(item);
                took_any = true;
            }
        }

        if !took_any {
            return result;
        }
    }
}
