use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{ast::ArgumentResult, error::CompileResult, evaluate::Evaluator, value::Value};

pub(crate) use functions::GLOBAL_FUNCTIONS;

mod functions;
pub(crate) mod modules;

static FUNCTION_COUNT: AtomicUsize = AtomicUsize::new(0);

/// A built-in function: a native callback taking the evaluated arguments and
/// a handle to the evaluator.
///
/// The id exists only so two registrations of the same callback compare
/// unequal, mirroring reference semantics for `get-function()` equality.
#[derive(Clone)]
pub struct Builtin(
    fn(ArgumentResult, &mut Evaluator) -> CompileResult<Value>,
    usize,
);

impl Builtin {
    pub fn new(body: fn(ArgumentResult, &mut Evaluator) -> CompileResult<Value>) -> Builtin {
        let count = FUNCTION_COUNT.fetch_add(1, Ordering::Relaxed);
        Self(body, count)
    }

    pub fn call(&self, args: ArgumentResult, evaluator: &mut Evaluator) -> CompileResult<Value> {
        (self.0)(args, evaluator)
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.1 == other.1
    }
}

impl Eq for Builtin {}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin").field("id", &self.1).finish()
    }
}

/// Imports common to the builtin function modules.
mod builtin_imports {
    pub(crate) use codemap::{Span, Spanned};

    pub(crate) use crate::{
        ast::ArgumentResult,
        color::Color,
        common::{Brackets, Identifier, ListSeparator, QuoteKind},
        error::{CompileResult, ErrorKind},
        evaluate::Evaluator,
        unit::Unit,
        value::{Dimension, Function, Number, Value, ValueMap},
    };

    pub(crate) use std::sync::Arc;

    pub(crate) use super::functions::GlobalFunctionMap;
}
