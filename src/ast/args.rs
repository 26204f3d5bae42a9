use std::{
    collections::{BTreeMap, BTreeSet},
    mem,
};

use codemap::{Span, Spanned};

use crate::{
    common::{Identifier, ListSeparator},
    error::{CompileResult, ErrorKind},
    utils::to_sentence,
    value::Value,
};

use super::AstExpr;

/// A single declared parameter: `$name` or `$name: default`.
#[derive(Debug, Clone)]
pub struct Argument {
    pub name: Identifier,
    pub default: Option<AstExpr>,
}

/// The parameter list of a function, mixin, or content block.
#[derive(Debug, Clone)]
pub struct ArgumentDeclaration {
    pub args: Vec<Argument>,
    pub rest: Option<Identifier>,
}

impl ArgumentDeclaration {
    pub fn empty() -> Self {
        Self {
            args: Vec::new(),
            rest: None,
        }
    }

    /// Checks an invocation's shape against this declaration before binding:
    /// no argument passed twice, no missing mandatory argument, no excess
    /// positional or unknown named arguments.
    pub fn verify<T>(
        &self,
        num_positional: usize,
        names: &BTreeMap<Identifier, T>,
        span: Span,
    ) -> CompileResult<()> {
        let mut named_used = 0;

        for i in 0..self.args.len() {
            let argument = &self.args[i];

            if i < num_positional {
                if names.contains_key(&argument.name) {
                    return Err((
                        format!(
                            "Argument ${} was passed both by position and by name.",
                            argument.name
                        ),
                        span,
                    )
                        .into());
                }
            } else if names.contains_key(&argument.name) {
                named_used += 1;
            } else if argument.default.is_none() {
                return Err((
                    ErrorKind::MissingArgument,
                    format!("Missing argument ${}.", argument.name),
                    span,
                )
                    .into());
            }
        }

        if self.rest.is_some() {
            return Ok(());
        }

        if num_positional > self.args.len() {
            return Err((
                format!(
                    "Only {} {}{} allowed, but {num_positional} {} passed.",
                    self.args.len(),
                    if names.is_empty() { "" } else { "positional " },
                    if self.args.len() == 1 {
                        "argument"
                    } else {
                        "arguments"
                    },
                    if num_positional == 1 { "was" } else { "were" },
                    num_positional = num_positional,
                ),
                span,
            )
                .into());
        }

        if named_used < names.len() {
            let mut unknown_names = names.keys().copied().collect::<BTreeSet<_>>();

            for arg in &self.args {
                unknown_names.remove(&arg.name);
            }

            if unknown_names.len() == 1 {
                return Err((
                    format!(
                        "No argument named ${}.",
                        unknown_names.iter().next().unwrap()
                    ),
                    span,
                )
                    .into());
            }

            if unknown_names.len() > 1 {
                return Err((
                    format!(
                        "No arguments named {}.",
                        to_sentence(
                            unknown_names
                                .into_iter()
                                .map(|name| format!("${name}", name = name))
                                .collect(),
                            "or"
                        )
                    ),
                    span,
                )
                    .into());
            }
        }

        Ok(())
    }
}

/// The syntactic arguments at a call site, before evaluation.
#[derive(Debug, Clone)]
pub struct ArgumentInvocation {
    pub positional: Vec<AstExpr>,
    pub named: BTreeMap<Identifier, AstExpr>,
    pub rest: Option<AstExpr>,
    pub keyword_rest: Option<AstExpr>,
    pub span: Span,
}

impl ArgumentInvocation {
    pub fn empty(span: Span) -> Self {
        Self {
            positional: Vec::new(),
            named: BTreeMap::new(),
            rest: None,
            keyword_rest: None,
            span,
        }
    }
}

/// Call-site arguments that may or may not have been evaluated yet.
/// `call()` passes already-evaluated arguments through.
#[derive(Debug, Clone)]
pub enum CallArgs {
    Unevaluated(ArgumentInvocation),
    Evaluated(ArgumentResult),
}

impl From<ArgumentInvocation> for CallArgs {
    fn from(invocation: ArgumentInvocation) -> Self {
        CallArgs::Unevaluated(invocation)
    }
}

/// Evaluated call-site arguments: positional values plus named values with
/// normalized keys.
#[derive(Debug, Clone)]
pub struct ArgumentResult {
    pub positional: Vec<Value>,
    pub named: BTreeMap<Identifier, Value>,
    pub separator: ListSeparator,
    pub span: Span,
    pub(crate) touched: BTreeSet<usize>,
}

impl ArgumentResult {
    pub(crate) fn new(
        positional: Vec<Value>,
        named: BTreeMap<Identifier, Value>,
        separator: ListSeparator,
        span: Span,
    ) -> Self {
        Self {
            positional,
            named,
            separator,
            span,
            touched: BTreeSet::new(),
        }
    }

    /// Remove and return the named argument, if present.
    pub fn get_named<T: Into<Identifier>>(&mut self, val: T) -> Option<Spanned<Value>> {
        self.named.remove(&val.into()).map(|n| Spanned {
            node: n,
            span: self.span,
        })
    }

    /// Take the positional argument at `idx`, leaving a null gravestone.
    pub fn get_positional(&mut self, idx: usize) -> Option<Spanned<Value>> {
        let val = match self.positional.get_mut(idx) {
            Some(v) => Some(Spanned {
                node: mem::replace(v, Value::Null),
                span: self.span,
            }),
            None => None,
        };

        self.touched.insert(idx);
        val
    }

    /// Take an argument by name, falling back to position.
    pub fn get<T: Into<Identifier>>(&mut self, position: usize, name: T) -> Option<Spanned<Value>> {
        match self.get_named(name) {
            Some(v) => Some(v),
            None => self.get_positional(position),
        }
    }

    /// Like [`ArgumentResult::get`], but errors if the argument is absent.
    pub fn get_err(&mut self, position: usize, name: &str) -> CompileResult<Value> {
        match self.get_named(name) {
            Some(v) => Ok(v.node),
            None => match self.get_positional(position) {
                Some(v) => Ok(v.node),
                None => Err((
                    ErrorKind::MissingArgument,
                    format!("Missing argument ${}.", name),
                    self.span(),
                )
                    .into()),
            },
        }
    }

    pub const fn span(&self) -> Span {
        self.span
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn min_args(&self, min: usize) -> CompileResult<()> {
        let len = self.len();
        if len < min {
            let phrase = match min {
                1 => "one argument",
                2 => "two arguments",
                3 => "three arguments",
                _ => unreachable!("builtins take at most three mandatory arguments"),
            };

            return Err((
                ErrorKind::MissingArgument,
                format!("At least {phrase} must be passed."),
                self.span(),
            )
                .into());
        }
        Ok(())
    }

    pub fn max_args(&self, max: usize) -> CompileResult<()> {
        let len = self.len();
        if len > max {
            let args = if max == 1 { "argument" } else { "arguments" };
            let passed = if len == 1 { "was" } else { "were" };
            return Err((
                format!("Only {max} {args} allowed, but {len} {passed} passed."),
                self.span(),
            )
                .into());
        }
        Ok(())
    }

    /// Take an argument by name or position, or use `default` if absent.
    pub fn default_arg(&mut self, position: usize, name: &'static str, default: Value) -> Value {
        match self.get(position, name) {
            Some(val) => val.node,
            None => default,
        }
    }

    pub(crate) fn remove_positional(&mut self, position: usize) -> Option<Value> {
        if self.positional.len() > position {
            Some(self.positional.remove(position))
        } else {
            None
        }
    }

    /// All remaining positional arguments, for variadic builtins. Errors if
    /// any named argument is left over.
    pub fn get_variadic(self) -> CompileResult<Vec<Spanned<Value>>> {
        if let Some((name, _)) = self.named.iter().next() {
            return Err((format!("No argument named ${}.", name), self.span).into());
        }

        let Self {
            positional,
            span,
            touched,
            ..
        } = self;

        let args = positional
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| !touched.contains(idx))
            .map(|(_, node)| Spanned { node, span })
            .collect();

        Ok(args)
    }
}
