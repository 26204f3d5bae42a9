use std::cell::RefCell;
use std::fmt::{self, Display};

use lasso::{Rodeo, Spur};

thread_local!(static STRINGS: RefCell<Rodeo<Spur>> = RefCell::new(Rodeo::default()));

/// A handle to a string stored in the thread-local interner.
///
/// Interned strings are cheap to copy and compare, which matters for
/// identifiers and units that are hashed and compared constantly during
/// evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct InternedString(Spur);

impl InternedString {
    pub fn get_or_intern<T: AsRef<str>>(s: T) -> Self {
        Self(STRINGS.with(|interner| interner.borrow_mut().get_or_intern(s)))
    }

    pub fn resolve_ref<'a>(self) -> &'a str {
        // Strings are never removed from the interner, so the reference is
        // valid for the life of the thread.
        unsafe { STRINGS.with(|interner| interner.as_ptr().as_ref().unwrap().resolve(&self.0)) }
    }

    #[allow(dead_code)]
    pub fn is_empty(self) -> bool {
        self.resolve_ref().is_empty()
    }
}

impl Display for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        STRINGS.with(|interner| write!(f, "{}", interner.borrow().resolve(&self.0)))
    }
}
