//! Callable invocation: evaluating call-site arguments, binding them to
//! declared parameters in a fresh frame, and running function, mixin, and
//! content-block bodies with backtrace frames and the recursion guard.

use std::{collections::BTreeMap, rc::Rc, sync::Arc};

use codemap::{Span, Spanned};

use crate::{
    ast::{
        ArgumentDeclaration, ArgumentInvocation, ArgumentResult, AstContentRule, AstInclude,
        CallArgs,
    },
    common::{Identifier, ListSeparator, QuoteKind},
    context_flags::ContextFlags,
    error::{CompileResult, ErrorKind},
    utils::to_sentence,
    value::{ArgList, Function, KeywordArgs, Mixin, MixinRef, UserDefinedFunction, Value, ValueMap},
};

use super::{
    env::Environment,
    evaluator::{ContentBlock, Evaluator, Flow},
};

impl<'a> Evaluator<'a> {
    // ===================== call-site arguments =====================

    pub(crate) fn eval_call_args(
        &mut self,
        invocation: ArgumentInvocation,
        fallback_span: Span,
    ) -> CompileResult<ArgumentResult> {
        let span = invocation.span;

        let mut positional = Vec::with_capacity(invocation.positional.len());
        for expr in invocation.positional {
            positional.push(self.eval(expr)?.without_slash());
        }

        let mut named = BTreeMap::new();
        for (name, expr) in invocation.named {
            named.insert(name, self.eval(expr)?.without_slash());
        }

        let mut separator = ListSeparator::Undecided;

        if let Some(rest_expr) = invocation.rest {
            match self.eval(rest_expr)? {
                Value::Map(map) => self.spread_keyword_map(map, &mut named)?,
                Value::List(elems, list_separator, _) => {
                    positional.extend(elems.into_iter().map(Value::without_slash));
                    separator = list_separator;
                }
                Value::ArgList(arglist) => {
                    for (&name, value) in arglist.keywords() {
                        named.insert(name, value.clone().without_slash());
                    }
                    separator = arglist.separator;
                    positional.extend(arglist.elems.into_iter().map(Value::without_slash));
                }
                single => positional.push(single.without_slash()),
            }

            if let Some(keyword_rest) = invocation.keyword_rest {
                match self.eval(keyword_rest)? {
                    Value::Map(map) => self.spread_keyword_map(map, &mut named)?,
                    other => {
                        return Err((
                            ErrorKind::InvalidVarKwdType,
                            format!(
                                "Variable keyword arguments must be a map (was {}).",
                                other.inspect(span)?
                            ),
                            span,
                        )
                            .into());
                    }
                }
            }
        }

        Ok(ArgumentResult::new(
            positional,
            named,
            separator,
            if span.len() == 0 { fallback_span } else { span },
        ))
    }

    fn spread_keyword_map(
        &mut self,
        map: ValueMap,
        named: &mut BTreeMap<Identifier, Value>,
    ) -> CompileResult<()> {
        for (key, value) in map {
            match key.0.node {
                Value::String(name, ..) => {
                    named.insert(Identifier::from(name), value.without_slash());
                }
                _ => {
                    return Err((
                        ErrorKind::InvalidVarKwdType,
                        "Variable keyword argument map must have string keys.",
                        key.0.span,
                    )
                        .into());
                }
            }
        }

        Ok(())
    }

    fn resolve_call_args(&mut self, args: CallArgs, span: Span) -> CompileResult<ArgumentResult> {
        match args {
            CallArgs::Unevaluated(invocation) => self.eval_call_args(invocation, span),
            CallArgs::Evaluated(evaluated) => Ok(evaluated),
        }
    }

    // ===================== parameter binding =====================

    /// Binds evaluated arguments to `params` in the current (innermost)
    /// frame: positionally, then by name, then into a `...` rest argument.
    ///
    /// Returns the shared keyword store when a rest argument captured
    /// keywords, so the caller can verify they were actually read.
    fn bind_parameters(
        &mut self,
        params: &ArgumentDeclaration,
        mut args: ArgumentResult,
    ) -> CompileResult<Option<Rc<KeywordArgs>>> {
        params.verify(args.positional.len(), &args.named, args.span)?;

        let bound_by_position = args.positional.len().min(params.args.len());
        let mut positional = args.positional.drain(..).collect::<Vec<_>>().into_iter();

        for param in &params.args[..bound_by_position] {
            let value = positional.next().unwrap();
            self.env.scopes_mut().insert_var_last(param.name, value);
        }

        for param in &params.args[bound_by_position..] {
            let value = match args.named.remove(&param.name) {
                Some(value) => value,
                // Defaults may reference parameters bound just above.
                None => {
                    let default = param.default.clone().unwrap();
                    self.eval(default)?.without_slash()
                }
            };
            self.env.scopes_mut().insert_var_last(param.name, value);
        }

        let rest_name = match params.rest {
            Some(rest_name) => rest_name,
            None => return Ok(None),
        };

        let keywords = KeywordArgs::new(args.named);

        let separator = if args.separator == ListSeparator::Undecided {
            ListSeparator::Comma
        } else {
            args.separator
        };

        self.env.scopes_mut().insert_var_last(
            rest_name,
            Value::ArgList(ArgList::new(
                positional.collect(),
                separator,
                Rc::clone(&keywords),
            )),
        );

        Ok(Some(keywords))
    }

    fn assert_keywords_consumed(
        keywords: Option<Rc<KeywordArgs>>,
        span: Span,
    ) -> CompileResult<()> {
        let keywords = match keywords {
            Some(keywords) if !keywords.was_accessed() && !keywords.is_empty() => keywords,
            _ => return Ok(()),
        };

        let names = keywords
            .names()
            .into_iter()
            .map(|name| format!("${name}", name = name))
            .collect::<Vec<String>>();

        let word = if names.len() == 1 {
            "argument"
        } else {
            "arguments"
        };

        Err((
            format!("No {} named {}.", word, to_sentence(names, "or")),
            span,
        )
            .into())
    }

    /// Runs `body` in `closure`'s environment with a fresh frame holding the
    /// bound parameters, guarded by the recursion limit and recorded in the
    /// backtrace as `label`.
    fn in_call_frame<T>(
        &mut self,
        label: String,
        closure: &Environment,
        params: &ArgumentDeclaration,
        args: ArgumentResult,
        span: Span,
        body: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<T> {
        self.depth += 1;
        if let Err(e) = self.check_depth(span) {
            self.depth -= 1;
            return Err(e);
        }

        let (result, _) = self.with_env(closure.new_closure(), |ev| {
            ev.scoped(false, |ev| {
                let keywords = ev.bind_parameters(params, args)?;
                let value = body(ev)?;
                Self::assert_keywords_consumed(keywords, span)?;
                Ok(value)
            })
        });

        self.depth -= 1;

        result.map_err(|e: Box<crate::error::Error>| e.with_frame(label, span))
    }

    // ===================== functions =====================

    pub(crate) fn resolve_function(
        &mut self,
        name: Identifier,
        namespace: Option<Spanned<Identifier>>,
        span: Span,
    ) -> CompileResult<Function> {
        if let Some(func) = self.env.get_fn(name, namespace)? {
            return Ok(func);
        }

        if let Some(builtin) = crate::builtin::GLOBAL_FUNCTIONS.get(name.as_str()) {
            return Ok(Function::Builtin(builtin.clone(), name));
        }

        if namespace.is_some() {
            return Err(("Undefined function.", span).into());
        }

        Ok(Function::Plain { name })
    }

    pub(crate) fn call_function(
        &mut self,
        func: Function,
        args: CallArgs,
        span: Span,
    ) -> CompileResult<Value> {
        match func {
            Function::Builtin(builtin, _name) => {
                let evaluated = self.resolve_call_args(args, span)?;
                let value = builtin.call(evaluated, self)?;
                Ok(value.without_slash())
            }
            Function::UserDefined(func) => self.call_user_function(func, args, span),
            Function::Plain { name } => {
                let rendered = self.render_plain_args(args, span)?;
                Ok(Value::String(
                    format!("{}({})", name.as_str(), rendered),
                    QuoteKind::None,
                ))
            }
        }
    }

    fn call_user_function(
        &mut self,
        func: UserDefinedFunction,
        args: CallArgs,
        span: Span,
    ) -> CompileResult<Value> {
        let UserDefinedFunction { function, env, .. } = func;
        let args = self.resolve_call_args(args, span)?;

        let label = format!("function {}()", function.name.node);

        self.in_call_frame(label, &env, &function.arguments, args, span, |ev| {
            match ev.exec_body(function.body.clone())? {
                Flow::Return(value) => Ok(value),
                Flow::Continue => Err(("Function finished without @return.", span).into()),
            }
        })
    }

    /// Serializes arguments for a plain CSS function call such as
    /// `blur(2px)`.
    fn render_plain_args(&mut self, args: CallArgs, span: Span) -> CompileResult<String> {
        let mut rendered = Vec::new();

        match args {
            CallArgs::Unevaluated(invocation) => {
                if !invocation.named.is_empty() || invocation.keyword_rest.is_some() {
                    return Err(
                        ("Plain CSS functions don't support keyword arguments.", span).into(),
                    );
                }

                for arg in invocation.positional {
                    rendered.push(self.eval_to_css(arg, QuoteKind::Quoted, span)?);
                }

                if let Some(rest) = invocation.rest {
                    let value = self.eval(rest)?;
                    rendered.push(self.serialize(value, QuoteKind::Quoted, span)?);
                }
            }
            CallArgs::Evaluated(evaluated) => {
                if !evaluated.named.is_empty() {
                    return Err(
                        ("Plain CSS functions don't support keyword arguments.", span).into(),
                    );
                }

                for value in evaluated.positional {
                    rendered.push(value.to_css_string(span, self.options.is_compressed())?);
                }
            }
        }

        Ok(rendered.join(", "))
    }

    /// A plain CSS call whose name was interpolated, e.g. `#{$f}(...)`.
    pub(crate) fn render_plain_call(
        &mut self,
        name: String,
        invocation: ArgumentInvocation,
        span: Span,
    ) -> CompileResult<Value> {
        let rendered = self.render_plain_args(CallArgs::Unevaluated(invocation), span)?;

        Ok(Value::String(
            format!("{}({})", name, rendered),
            QuoteKind::None,
        ))
    }

    // ===================== mixins and content =====================

    pub(super) fn exec_include(&mut self, include: AstInclude) -> CompileResult<Flow> {
        let mixin = self.env.get_mixin(include.name, include.namespace)?;

        match mixin {
            Mixin::Builtin(builtin) => {
                if include.content.is_some() {
                    return Err(("Mixin doesn't accept a content block.", include.span).into());
                }

                let args = self.eval_call_args(include.args, include.name.span)?;
                builtin(args, self)?;
            }
            Mixin::UserDefined(decl, closure) => {
                if include.content.is_some() && !decl.has_content {
                    return Err(("Mixin doesn't accept a content block.", include.span).into());
                }

                let content = include.content.map(|block| {
                    Arc::new(ContentBlock {
                        block,
                        scope: self.env.new_closure(),
                    })
                });

                let args = self.eval_call_args(include.args, include.name.span)?;
                let span = include.name.span;

                let was_in_mixin = self.flags.in_mixin();
                self.flags.set(ContextFlags::IN_MIXIN, true);

                let label = format!("mixin {}()", decl.name);
                let result =
                    self.in_call_frame(label, &closure, &decl.args, args, span, |ev| {
                        ev.with_content_block(content, |ev| {
                            let flow = ev.exec_body(decl.body.clone())?;
                            debug_assert!(flow.is_continue());
                            Ok(())
                        })
                    });

                self.flags.set(ContextFlags::IN_MIXIN, was_in_mixin);

                result?;
            }
        }

        Ok(Flow::Continue)
    }

    pub(super) fn exec_content_rule(&mut self, content: AstContentRule) -> CompileResult<Flow> {
        let block = match self.env.content.clone() {
            Some(block) => block,
            None => return Ok(Flow::Continue),
        };

        let span = content.args.span;
        let args = self.eval_call_args(content.args, span)?;
        let scope = block.scope.clone();

        self.in_call_frame(
            "@content".to_owned(),
            &scope,
            &block.block.args,
            args,
            span,
            |ev| {
                let flow = ev.exec_body(block.block.body.clone())?;
                debug_assert!(flow.is_continue());
                Ok(())
            },
        )?;

        Ok(Flow::Continue)
    }

    // ===================== hooks for builtins =====================

    /// Whether a `@content` block is available, for `content-exists()`.
    pub fn content_exists(&self) -> bool {
        self.env.content.is_some()
    }

    pub fn current_mixin_ref(
        &self,
        name: Spanned<Identifier>,
        namespace: Option<Spanned<Identifier>>,
    ) -> CompileResult<MixinRef> {
        let mixin = self.env.get_mixin(name, namespace)?;

        Ok(MixinRef {
            name: name.node,
            mixin,
        })
    }
}
