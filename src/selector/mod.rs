use std::fmt::{self, Display};

use codemap::Span;

use crate::{error::CompileResult, value::Value};

pub(crate) use attribute::Attribute;
pub(crate) use complex::*;
pub(crate) use compound::*;
pub(crate) use extend::*;
pub(crate) use list::*;
pub(crate) use parse::*;
pub(crate) use simple::*;

mod attribute;
mod complex;
mod compound;
mod extend;
mod list;
mod parse;
mod simple;

/// The namespace of a type, universal, or attribute selector.
///
/// `None` matches elements in the default namespace, `Empty` those in no
/// namespace, `Asterisk` any namespace, and `Other` a specific one.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Namespace {
    Empty,
    Asterisk,
    Other(Box<str>),
    None,
}

impl Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "|"),
            Self::Asterisk => write!(f, "*|"),
            Self::Other(namespace) => write!(f, "{}|", namespace),
            Self::None => Ok(()),
        }
    }
}

/// An identifier qualified by a [`Namespace`].
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct QualifiedName {
    pub ident: String,
    pub namespace: Namespace,
}

impl Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.namespace)?;
        f.write_str(&self.ident)
    }
}

/// Specificity bounds of a selector.
///
/// Min and max differ only for selectors containing `:not()`/`:matches()`
/// whose argument specificities differ.
#[derive(Debug, Copy, Clone)]
pub struct Specificity {
    pub min: i32,
    pub max: i32,
}

impl Specificity {
    pub const fn new(min: i32, max: i32) -> Self {
        Specificity { min, max }
    }
}

/// A resolved selector list, as exposed to built-in functions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Selector(pub SelectorList);

impl Selector {
    /// Replaces `&` in this selector with `parent`, treating an empty parent
    /// selector as no parent at all.
    pub fn resolve_parent_selectors(
        &self,
        parent: &Self,
        implicit_parent: bool,
    ) -> CompileResult<Self> {
        Ok(Self(self.0.clone().resolve_parent_selectors(
            if parent.is_empty() {
                None
            } else {
                Some(parent.0.clone())
            },
            implicit_parent,
        )?))
    }

    pub fn is_superselector(&self, other: &Self) -> bool {
        self.0.is_superselector(&other.0)
    }

    pub fn contains_parent_selector(&self) -> bool {
        self.0.contains_parent_selector()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub const fn new(span: Span) -> Selector {
        Selector(SelectorList::new(span))
    }

    pub fn into_value(self) -> Value {
        self.0.to_sass_list()
    }

    pub fn unify(self, other: &Self) -> Option<Self> {
        Some(Selector(self.0.unify(&other.0)?))
    }
}
