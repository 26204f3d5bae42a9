use std::{
    fmt::{self, Write},
    hash::{Hash, Hasher},
};

use codemap::Span;

use crate::{common::unvendor, error::CompileResult};

use super::{
    Attribute, ComplexSelector, ComplexSelectorComponent, CompoundSelector, Namespace,
    QualifiedName, SelectorList, Specificity,
};

/// Pseudo-classes whose selector argument means "this compound also matches
/// the inner selector", which lets them participate in superselector checks.
const SUBSELECTOR_PSEUDOS: [&str; 6] = [
    "matches",
    "where",
    "is",
    "any",
    "nth-child",
    "nth-last-child",
];

const BASE_SPECIFICITY: i32 = 1000;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum SimpleSelector {
    /// `*`, possibly qualified by a namespace.
    Universal(Namespace),

    /// A pseudo-class or pseudo-element selector.
    ///
    /// Pseudo selectors that take selector arguments get bespoke handling so
    /// that extension and superselector computations work through them.
    Pseudo(Pseudo),

    /// A type selector: `a`, `svg|rect`.
    Type(QualifiedName),

    /// `%name`. Matches nothing; exists to be extended, and is stripped from
    /// the output.
    Placeholder(String),

    /// `&`, with an optional suffix appended to the resolved parent.
    ///
    /// Resolved away before the selector reaches the resolved tree.
    Parent(Option<String>),

    /// `#name`
    Id(String),

    /// `.name`
    Class(String),

    /// `[attr...]`
    Attribute(Box<Attribute>),
}

impl fmt::Display for SimpleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(name) => write!(f, "#{}", name),
            Self::Class(name) => write!(f, ".{}", name),
            Self::Placeholder(name) => write!(f, "%{}", name),
            Self::Universal(namespace) => write!(f, "{}*", namespace),
            Self::Pseudo(pseudo) => write!(f, "{}", pseudo),
            Self::Type(name) => write!(f, "{}", name),
            Self::Attribute(attr) => write!(f, "{}", attr),
            Self::Parent(..) => unreachable!("`&` should never be formatted"),
        }
    }
}

impl SimpleSelector {
    /// The lowest specificity this selector can contribute.
    ///
    /// Specificity is counted in base 1000: no realistic compound contains a
    /// thousand simple selectors, so the three CSS tiers never carry.
    pub fn min_specificity(&self) -> i32 {
        match self {
            Self::Universal(..) => 0,
            Self::Type(..) => 1,
            Self::Pseudo(pseudo) => pseudo.specificity().min,
            Self::Id(..) => BASE_SPECIFICITY.pow(2),
            _ => BASE_SPECIFICITY,
        }
    }

    pub fn max_specificity(&self) -> i32 {
        match self {
            Self::Universal(..) => 0,
            Self::Pseudo(pseudo) => pseudo.specificity().max,
            _ => self.min_specificity(),
        }
    }

    pub fn is_invisible(&self) -> bool {
        match self {
            Self::Universal(..)
            | Self::Type(..)
            | Self::Id(..)
            | Self::Class(..)
            | Self::Attribute(..) => false,
            Self::Pseudo(Pseudo { name, selector, .. }) => {
                name != "not" && selector.as_ref().map_or(false, |sel| sel.is_invisible())
            }
            Self::Placeholder(..) => true,
            Self::Parent(..) => unreachable!("parent selectors are resolved before visibility"),
        }
    }

    /// Appends a `&suffix` identifier fragment to this selector's name.
    pub fn add_suffix(&mut self, suffix: &str, span: Span) -> CompileResult<()> {
        match self {
            Self::Type(name) => name.ident.push_str(suffix),
            Self::Placeholder(name)
            | Self::Id(name)
            | Self::Class(name)
            | Self::Pseudo(Pseudo {
                name,
                argument: None,
                selector: None,
                ..
            }) => name.push_str(suffix),
            _ => return Err((format!("Invalid parent selector \"{}\"", self), span).into()),
        };
        Ok(())
    }

    pub fn is_universal(&self) -> bool {
        matches!(self, Self::Universal(..))
    }

    pub fn is_pseudo(&self) -> bool {
        matches!(self, Self::Pseudo { .. })
    }

    pub fn is_parent(&self) -> bool {
        matches!(self, Self::Parent(..))
    }

    pub fn is_id(&self) -> bool {
        matches!(self, Self::Id(..))
    }

    pub fn is_type(&self) -> bool {
        matches!(self, Self::Type(..))
    }

    /// Adds this selector to the components of `compound`, producing the
    /// components matching their intersection, or `None` if the result can't
    /// match anything.
    pub fn unify(self, compound: Vec<Self>) -> Option<Vec<Self>> {
        match self {
            Self::Type(..) => self.unify_type(compound),
            Self::Universal(..) => self.unify_universal(compound),
            Self::Pseudo { .. } => self.unify_pseudo(compound),
            Self::Id(..) => {
                if compound
                    .iter()
                    .any(|simple| simple.is_id() && simple != &self)
                {
                    return None;
                }

                self.unify_default(compound)
            }
            _ => self.unify_default(compound),
        }
    }

    /// Appends `self` to `compound` unless it's already present, keeping
    /// pseudo selectors last.
    fn unify_default(self, mut compound: Vec<Self>) -> Option<Vec<Self>> {
        if compound.len() == 1 && compound[0].is_universal() {
            return compound.swap_remove(0).unify(vec![self]);
        }
        if compound.contains(&self) {
            return Some(compound);
        }

        let at = compound
            .iter()
            .position(Self::is_pseudo)
            .unwrap_or(compound.len());
        compound.insert(at, self);

        Some(compound)
    }

    fn unify_universal(self, mut compound: Vec<Self>) -> Option<Vec<Self>> {
        if let Some(Self::Universal(..) | Self::Type(..)) = compound.first() {
            let mut unified = vec![self.unify_universal_and_element(&compound[0])?];
            unified.extend(compound.into_iter().skip(1));
            return Some(unified);
        }

        if self != Self::Universal(Namespace::Asterisk) && self != Self::Universal(Namespace::None)
        {
            let mut v = vec![self];
            v.append(&mut compound);
            return Some(v);
        }

        if !compound.is_empty() {
            return Some(compound);
        }

        Some(vec![self])
    }

    /// Unifies two selectors which must each be either universal or a type
    /// selector, combining namespaces with the usual empty/star rules.
    fn unify_universal_and_element(&self, other: &Self) -> Option<Self> {
        // A universal selector is treated as a type selector with an empty
        // name.
        fn parts(selector: &SimpleSelector) -> (Namespace, String) {
            match selector.clone() {
                SimpleSelector::Type(name) => (name.namespace, name.ident),
                SimpleSelector::Universal(namespace) => (namespace, String::new()),
                other => unreachable!("{:?} must be a universal or type selector", other),
            }
        }

        let (namespace1, name1) = parts(self);
        let (namespace2, name2) = parts(other);

        let namespace = if namespace1 == namespace2 || namespace2 == Namespace::Asterisk {
            namespace1
        } else if namespace1 == Namespace::Asterisk {
            namespace2
        } else {
            return None;
        };

        let name = if name1 == name2 || name2.is_empty() {
            name1
        } else if name1.is_empty() || name1 == "*" {
            name2
        } else {
            return None;
        };

        Some(if name.is_empty() {
            SimpleSelector::Universal(namespace)
        } else {
            SimpleSelector::Type(QualifiedName {
                namespace,
                ident: name,
            })
        })
    }

    fn unify_type(self, mut compound: Vec<Self>) -> Option<Vec<Self>> {
        if let Some(Self::Universal(..) | Self::Type(..)) = compound.first() {
            let mut unified = vec![self.unify_universal_and_element(&compound[0])?];
            unified.extend(compound.into_iter().skip(1));
            Some(unified)
        } else {
            let mut unified = vec![self];
            unified.append(&mut compound);
            Some(unified)
        }
    }

    fn unify_pseudo(self, mut compound: Vec<Self>) -> Option<Vec<Self>> {
        if compound.len() == 1 && compound[0].is_universal() {
            return compound.remove(0).unify(vec![self]);
        }
        if compound.contains(&self) {
            return Some(compound);
        }

        let is_pseudo_element =
            |simple: &Self| matches!(simple, Self::Pseudo(Pseudo { is_class: false, .. }));

        match compound.iter().position(is_pseudo_element) {
            // A compound may contain at most one pseudo-element. Two
            // distinct ones cannot unify; a pseudo-class belongs before
            // the pseudo-element.
            Some(at) => {
                if is_pseudo_element(&self) {
                    return None;
                }
                compound.insert(at, self);
            }
            None => compound.push(self),
        }

        Some(compound)
    }

    /// Whether `self` covers `compound`: it appears in it directly, or is
    /// implied by one of its subselector pseudos.
    pub fn is_superselector_of_compound(&self, compound: &CompoundSelector) -> bool {
        compound.components.iter().any(|their_simple| {
            if self == their_simple {
                return true;
            }
            if let SimpleSelector::Pseudo(Pseudo {
                selector: Some(sel),
                name,
                ..
            }) = their_simple
            {
                if SUBSELECTOR_PSEUDOS.contains(&unvendor(name)) {
                    return sel.components.iter().all(|complex| {
                        if complex.components.len() != 1 {
                            return false;
                        }
                        complex
                            .components
                            .first()
                            .unwrap()
                            .as_compound()
                            .components
                            .contains(self)
                    });
                }
            }
            false
        })
    }
}

/// A pseudo-class or pseudo-element selector, possibly carrying an argument
/// and/or a selector argument.
#[derive(Clone, Debug)]
pub struct Pseudo {
    pub name: String,

    /// Whether this is a pseudo-class; if `false` it's a pseudo-element.
    pub is_class: bool,

    /// Whether this was *written* with one colon. Pseudo-elements with
    /// legacy single-colon syntax (`:before`, `:after`, `:first-line`,
    /// `:first-letter`) keep that spelling in the output.
    pub is_syntactic_class: bool,

    /// A non-selector argument. When both `argument` and `selector` are
    /// present, the selector follows the argument (`:nth-child(2n of .a)`).
    pub argument: Option<Box<str>>,

    /// A selector argument, e.g. the contents of `:not(...)`.
    pub selector: Option<Box<SelectorList>>,

    pub span: Span,
}

impl PartialEq for Pseudo {
    fn eq(&self, other: &Pseudo) -> bool {
        self.name == other.name
            && self.is_class == other.is_class
            && self.argument == other.argument
            && self.selector == other.selector
    }
}

impl Eq for Pseudo {}

impl Hash for Pseudo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.is_class.hash(state);
        self.argument.hash(state);
        self.selector.hash(state);
    }
}

impl fmt::Display for Pseudo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sel) = &self.selector {
            if self.name == "not" && sel.is_invisible() {
                return Ok(());
            }
        }

        f.write_char(':')?;

        if !self.is_syntactic_class {
            f.write_char(':')?;
        }

        f.write_str(&self.name)?;

        if self.argument.is_none() && self.selector.is_none() {
            return Ok(());
        }

        f.write_char('(')?;
        if let Some(arg) = &self.argument {
            f.write_str(arg)?;
            if self.selector.is_some() {
                f.write_char(' ')?;
            }
        }

        if let Some(sel) = &self.selector {
            write!(f, "{}", sel)?;
        }

        f.write_char(')')
    }
}

impl Pseudo {
    /// Whether this pseudo (whose `selector` must be present) matches every
    /// element `compound` matches.
    ///
    /// `parents` is the prefix of the complex selector containing `compound`,
    /// needed when the selector argument itself spans multiple compounds.
    pub fn is_superselector(
        &self,
        compound: &CompoundSelector,
        parents: Option<Vec<ComplexSelectorComponent>>,
    ) -> bool {
        debug_assert!(self.selector.is_some());
        let sel = self.selector.as_ref().unwrap();

        match self.normalized_name() {
            "matches" | "is" | "any" | "where" => {
                selector_pseudos_named(compound.clone(), &self.name, true)
                    .any(|pseudo2| sel.is_superselector(&pseudo2.selector.unwrap()))
                    || sel.components.iter().any(|complex1| {
                        let mut components = parents.clone().unwrap_or_default();
                        components.push(ComplexSelectorComponent::Compound(compound.clone()));
                        complex1.is_superselector(&ComplexSelector::new(components, false))
                    })
            }
            "has" | "host" | "host-context" => {
                selector_pseudos_named(compound.clone(), &self.name, true)
                    .any(|pseudo2| sel.is_superselector(&pseudo2.selector.unwrap()))
            }
            "slotted" => selector_pseudos_named(compound.clone(), &self.name, false)
                .any(|pseudo2| sel.is_superselector(pseudo2.selector.as_ref().unwrap())),
            "not" => sel.components.iter().all(|complex| {
                compound.components.iter().any(|simple2| {
                    let last_compound = match complex.components.last() {
                        Some(ComplexSelectorComponent::Compound(c)) => Some(c),
                        _ => None,
                    };

                    match simple2 {
                        SimpleSelector::Type(..) => last_compound.map_or(false, |c| {
                            c.components
                                .iter()
                                .any(|simple1| simple1.is_type() && simple1 != simple2)
                        }),
                        SimpleSelector::Id(..) => last_compound.map_or(false, |c| {
                            c.components
                                .iter()
                                .any(|simple1| simple1.is_id() && simple1 != simple2)
                        }),
                        SimpleSelector::Pseudo(Pseudo {
                            selector: Some(sel2),
                            name,
                            ..
                        }) => {
                            name == &self.name
                                && sel2.is_superselector(&SelectorList {
                                    components: vec![complex.clone()],
                                    span: self.span,
                                })
                        }
                        _ => false,
                    }
                })
            }),
            "current" => selector_pseudos_named(compound.clone(), &self.name, self.is_class)
                .any(|pseudo2| self.selector == pseudo2.selector),
            "nth-child" | "nth-last-child" => compound.components.iter().any(|simple2| {
                if let SimpleSelector::Pseudo(
                    pseudo @ Pseudo {
                        selector: Some(..), ..
                    },
                ) = simple2
                {
                    pseudo.name == self.name
                        && pseudo.argument == self.argument
                        && sel.is_superselector(pseudo.selector.as_ref().unwrap())
                } else {
                    false
                }
            }),
            _ => unreachable!(),
        }
    }

    pub fn with_selector(self, selector: Option<Box<SelectorList>>) -> Self {
        Self { selector, ..self }
    }

    pub fn specificity(&self) -> Specificity {
        if !self.is_class {
            return Specificity { min: 1, max: 1 };
        }

        let selector = match &self.selector {
            Some(sel) => sel,
            None => {
                return Specificity {
                    min: BASE_SPECIFICITY,
                    max: BASE_SPECIFICITY,
                }
            }
        };

        if self.name == "not" {
            let mut min = 0;
            let mut max = 0;
            for complex in &selector.components {
                min = min.max(complex.min_specificity());
                max = max.max(complex.max_specificity());
            }
            Specificity { min, max }
        } else {
            // Higher than any real selector's specificity.
            let mut min = BASE_SPECIFICITY.pow(3);
            let mut max = 0;
            for complex in &selector.components {
                min = min.min(complex.min_specificity());
                max = max.max(complex.max_specificity());
            }
            Specificity { min, max }
        }
    }

    /// Like `name`, but without any vendor prefix.
    pub fn normalized_name(&self) -> &str {
        unvendor(&self.name)
    }
}

/// All pseudo selectors in `compound` with a selector argument and the given
/// `name`.
fn selector_pseudos_named(
    compound: CompoundSelector,
    name: &str,
    is_class: bool,
) -> impl Iterator<Item = Pseudo> + '_ {
    compound
        .components
        .into_iter()
        .filter_map(|c| {
            if let SimpleSelector::Pseudo(p) = c {
                Some(p)
            } else {
                None
            }
        })
        .filter(move |p| p.is_class == is_class && p.selector.is_some() && p.name == name)
}
