use std::{
    cell::RefCell,
    collections::{hash_set::IntoIter, HashSet},
    hash::{Hash, Hasher},
    ops::Deref,
    ptr,
    rc::Rc,
};

use crate::selector::{Selector, SelectorList};

/// A selector shared between a style rule in the resolved tree and the
/// extension store, so later `@extend`s can rewrite it in place.
#[derive(Debug, Clone)]
pub struct ExtendedSelector(Rc<RefCell<SelectorList>>);

impl ExtendedSelector {
    pub fn new(selector: SelectorList) -> Self {
        Self(Rc::new(RefCell::new(selector)))
    }

    pub fn is_invisible(&self) -> bool {
        (*self.0).borrow().is_invisible()
    }

    pub fn as_selector_list(&self) -> impl Deref<Target = SelectorList> + '_ {
        self.0.borrow()
    }

    pub fn set_inner(&mut self, selector: SelectorList) {
        self.0.replace(selector);
    }

    /// Unwraps the shared list, cloning only if another handle is alive.
    pub fn into_selector(self) -> Selector {
        Selector(match Rc::try_unwrap(self.0) {
            Ok(cell) => cell.into_inner(),
            Err(shared) => shared.borrow().clone(),
        })
    }
}

impl PartialEq for ExtendedSelector {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for ExtendedSelector {}

impl Hash for ExtendedSelector {
    // Hash by pointer: the inner list is mutated as extensions arrive, and
    // two distinct rules must never collapse into one set entry.
    fn hash<H: Hasher>(&self, state: &mut H) {
        ptr::hash(&*self.0, state);
    }
}

/// A set of [`ExtendedSelector`]s, deduplicated by identity.
#[derive(Clone, Debug)]
pub struct SelectorSet(HashSet<ExtendedSelector>);

impl SelectorSet {
    pub fn new() -> Self {
        Self(HashSet::new())
    }

    pub fn insert(&mut self, selector: ExtendedSelector) {
        self.0.insert(selector);
    }
}

impl IntoIterator for SelectorSet {
    type Item = ExtendedSelector;
    type IntoIter = IntoIter<ExtendedSelector>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
