use std::fmt::{self, Write};

use codemap::Span;

use crate::error::CompileResult;

use super::{
    ComplexSelector, ComplexSelectorComponent, Pseudo, SelectorList, SimpleSelector, Specificity,
};

/// A sequence of simple selectors with no combinators between them.
///
/// Never empty.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CompoundSelector {
    pub components: Vec<SimpleSelector>,
}

impl fmt::Display for CompoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(ToString::to_string).collect();

        // If every component optimized away (they all match everything),
        // emit the universal selector rather than nothing.
        if parts.iter().all(String::is_empty) {
            return f.write_char('*');
        }

        for part in parts {
            f.write_str(&part)?;
        }

        Ok(())
    }
}

impl CompoundSelector {
    pub fn specificity(&self) -> Specificity {
        self.components
            .iter()
            .fold(Specificity::new(0, 0), |sum, simple| {
                Specificity::new(
                    sum.min + simple.min_specificity(),
                    sum.max + simple.max_specificity(),
                )
            })
    }

    pub fn max_specificity(&self) -> i32 {
        self.specificity().max
    }

    pub fn min_specificity(&self) -> i32 {
        self.specificity().min
    }

    pub fn is_invisible(&self) -> bool {
        self.components.iter().any(SimpleSelector::is_invisible)
    }

    /// Whether `self` matches every element `other` matches.
    ///
    /// `parents` is the prefix of the complex selector containing `other`,
    /// relevant for pseudos with selector arguments.
    pub fn is_superselector(
        &self,
        other: &Self,
        parents: &Option<Vec<ComplexSelectorComponent>>,
    ) -> bool {
        let covers_other = |simple: &SimpleSelector| match simple {
            SimpleSelector::Pseudo(
                pseudo @ Pseudo {
                    selector: Some(..), ..
                },
            ) => pseudo.is_superselector(other, parents.clone()),
            _ => simple.is_superselector_of_compound(other),
        };

        if !self.components.iter().all(covers_other) {
            return false;
        }

        // Pseudo-elements in `other` must be matched exactly.
        other.components.iter().all(|simple| match simple {
            SimpleSelector::Pseudo(Pseudo {
                is_class: false,
                selector: None,
                ..
            }) => simple.is_superselector_of_compound(self),
            _ => true,
        })
    }

    fn contains_parent_in_pseudo(&self) -> bool {
        self.components.iter().any(|simple| match simple {
            SimpleSelector::Pseudo(Pseudo {
                selector: Some(sel),
                ..
            }) => sel.contains_parent_selector(),
            _ => false,
        })
    }

    /// Rewrites pseudo arguments so their own `&`s refer to `parent`.
    fn resolve_pseudo_members(
        &self,
        parent: &SelectorList,
    ) -> CompileResult<Vec<SimpleSelector>> {
        self.components
            .iter()
            .cloned()
            .map(|simple| {
                let mut pseudo = match simple {
                    SimpleSelector::Pseudo(pseudo) => pseudo,
                    _ => return Ok(simple),
                };

                if let Some(sel) = pseudo.selector.clone() {
                    if sel.contains_parent_selector() {
                        pseudo.selector = Some(Box::new(
                            sel.resolve_parent_selectors(Some(parent.clone()), false)?,
                        ));
                    }
                }

                Ok(SimpleSelector::Pseudo(pseudo))
            })
            .collect()
    }

    /// Replaces `SimpleSelector::Parent`s in this compound with `parent`.
    ///
    /// Returns `None` if the compound contains no parent selector.
    pub fn resolve_parent_selectors(
        self,
        span: Span,
        parent: SelectorList,
    ) -> CompileResult<Option<Vec<ComplexSelector>>> {
        let parent_in_pseudo = self.contains_parent_in_pseudo();

        // A leading `&` attaches the whole parent; one anywhere else is
        // rejected by the selector parser.
        let leading_suffix = match self.components.first() {
            Some(SimpleSelector::Parent(suffix)) => Some(suffix.clone()),
            _ => None,
        };

        if leading_suffix.is_none() && !parent_in_pseudo {
            return Ok(None);
        }

        let members = if parent_in_pseudo {
            self.resolve_pseudo_members(&parent)?
        } else {
            self.components.clone()
        };

        let suffix = match leading_suffix {
            Some(suffix) => suffix,
            // Only pseudo arguments mentioned the parent; the compound
            // itself stays a single unit.
            None => {
                return Ok(Some(vec![ComplexSelector::new(
                    vec![ComplexSelectorComponent::Compound(CompoundSelector {
                        components: members,
                    })],
                    false,
                )]))
            }
        };

        if self.components.len() == 1 && suffix.is_none() {
            return Ok(Some(parent.components));
        }

        let parent_span = parent.span;

        // Splice the rest of the compound onto the final compound of each
        // parent complex selector.
        parent
            .components
            .into_iter()
            .map(|mut complex| {
                let tail = match complex.components.last() {
                    Some(ComplexSelectorComponent::Compound(compound)) => compound.clone(),
                    _ => {
                        return Err((
                            crate::error::ErrorKind::InvalidParent,
                            format!("Parent \"{}\" is incompatible with this selector.", complex),
                            span,
                        )
                            .into())
                    }
                };

                let mut simples = tail.components;

                if let Some(suffix) = &suffix {
                    let mut end = simples.pop().unwrap();
                    end.add_suffix(suffix, parent_span)?;
                    simples.push(end);
                }

                simples.extend(members.iter().skip(1).cloned());

                complex.components.pop();
                complex
                    .components
                    .push(ComplexSelectorComponent::Compound(CompoundSelector {
                        components: simples,
                    }));

                Ok(ComplexSelector::new(complex.components, complex.line_break))
            })
            .collect::<CompileResult<Vec<ComplexSelector>>>()
            .map(Some)
    }

    /// Produces the compound matching both `self` and `other`, or `None` if
    /// that's impossible.
    pub fn unify(self, other: Self) -> Option<Self> {
        let mut components = other.components;
        for simple in self.components {
            components = simple.unify(std::mem::take(&mut components))?;
        }

        Some(Self { components })
    }

    /// Prepends a parent selector, or returns `None` if the result would not
    /// be a valid selector.
    pub fn prepend_parent(mut self) -> Option<Self> {
        let head = match self.components.first()? {
            SimpleSelector::Universal(..) => return None,
            SimpleSelector::Type(name) => {
                if name.namespace != super::Namespace::None {
                    return None;
                }
                let ident = name.ident.clone();
                self.components.remove(0);
                SimpleSelector::Parent(Some(ident))
            }
            _ => SimpleSelector::Parent(None),
        };

        let mut components = Vec::with_capacity(self.components.len() + 1);
        components.push(head);
        components.append(&mut self.components);

        Some(Self { components })
    }
}
