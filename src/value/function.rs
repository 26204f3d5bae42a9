use std::{fmt, sync::Arc};

use crate::{
    ast::{AstFunctionDecl, AstMixin, ArgumentResult},
    builtin::Builtin,
    common::Identifier,
    error::CompileResult,
    evaluate::{Environment, Evaluator},
};

/// A first-class function value.
///
/// The name is kept for `inspect()` and `get-function()` round-tripping.
#[derive(Clone, Eq, PartialEq)]
pub enum Function {
    /// A function implemented in Rust and registered declaratively.
    Builtin(Builtin, Identifier),

    /// A function declared with `@function`.
    UserDefined(UserDefinedFunction),

    /// An unrecognized name, which compiles to a plain CSS function call.
    Plain { name: Identifier },
}

#[derive(Debug, Clone)]
pub struct UserDefinedFunction {
    pub function: Arc<AstFunctionDecl>,
    pub name: Identifier,
    pub env: Environment,
}

impl PartialEq for UserDefinedFunction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.function, &other.function) && self.name == other.name
    }
}

impl Eq for UserDefinedFunction {}

impl Function {
    pub fn name(&self) -> Identifier {
        match self {
            Self::Builtin(_, name)
            | Self::UserDefined(UserDefinedFunction { name, .. })
            | Self::Plain { name } => *name,
        }
    }

    fn kind(&self) -> &'static str {
        match &self {
            Self::Plain { .. } => "Plain",
            Self::Builtin(..) => "Builtin",
            Self::UserDefined { .. } => "UserDefined",
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

pub(crate) type BuiltinMixin = fn(ArgumentResult, &mut Evaluator) -> CompileResult<()>;

/// A mixin: either user-declared or built in.
#[derive(Clone)]
pub enum Mixin {
    UserDefined(AstMixin, Environment),
    Builtin(BuiltinMixin),
}

impl Mixin {
    pub fn accepts_content(&self) -> bool {
        match self {
            Self::UserDefined(mixin, ..) => mixin.has_content,
            Self::Builtin(..) => false,
        }
    }
}

impl fmt::Debug for Mixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserDefined(m, ..) => f
                .debug_struct("Mixin")
                .field("name", &m.name)
                .field("has_content", &m.has_content)
                .finish(),
            Self::Builtin(..) => f.debug_struct("BuiltinMixin").finish(),
        }
    }
}

/// A mixin reference returned by `meta.get-mixin()`.
///
/// Compared by name, like function references.
#[derive(Debug, Clone)]
pub struct MixinRef {
    pub name: Identifier,
    pub mixin: Mixin,
}

impl PartialEq for MixinRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for MixinRef {}
