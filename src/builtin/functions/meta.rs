use crate::{ast::CallArgs, builtin::builtin_imports::*};

use super::{Builtin, GlobalFunctionMap, GLOBAL_FUNCTIONS};

pub(crate) fn inspect(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();

    Ok(Value::String(
        args.get_err(0, "value")?.inspect(span)?,
        QuoteKind::None,
    ))
}

pub(crate) fn type_of(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;

    Ok(Value::String(
        args.get_err(0, "value")?.kind().to_owned(),
        QuoteKind::None,
    ))
}

pub(crate) fn variable_exists(
    mut args: ArgumentResult,
    evaluator: &mut Evaluator,
) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();
    let (name, _) = args
        .get_err(0, "name")?
        .assert_string_with_name("name", span)?;

    Ok(Value::bool(
        evaluator.env.var_exists(Identifier::from(name), None)?,
    ))
}

pub(crate) fn global_variable_exists(
    mut args: ArgumentResult,
    evaluator: &mut Evaluator,
) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let (name, _) = args
        .get_err(0, "name")?
        .assert_string_with_name("name", span)?;

    let module = match args.default_arg(1, "module", Value::Null) {
        Value::String(module, ..) => Some(module),
        Value::Null => None,
        v => {
            return Err((
                ErrorKind::InvalidArgumentType,
                format!("$module: {} is not a string.", v.inspect(span)?),
                span,
            )
                .into())
        }
    };

    let name = Identifier::from(name);

    Ok(Value::bool(match module {
        Some(module) => evaluator.env.var_exists(
            name,
            Some(Spanned {
                node: Identifier::from(module),
                span,
            }),
        )?,
        None => (*evaluator.env.scopes.global_variables())
            .borrow()
            .contains_key(&name),
    }))
}

pub(crate) fn function_exists(
    mut args: ArgumentResult,
    evaluator: &mut Evaluator,
) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let (name, _) = args
        .get_err(0, "name")?
        .assert_string_with_name("name", span)?;

    let name = Identifier::from(name);

    Ok(Value::bool(
        evaluator.env.fn_exists(name) || GLOBAL_FUNCTIONS.contains_key(name.as_str()),
    ))
}

pub(crate) fn mixin_exists(
    mut args: ArgumentResult,
    evaluator: &mut Evaluator,
) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let (name, _) = args
        .get_err(0, "name")?
        .assert_string_with_name("name", span)?;

    Ok(Value::bool(evaluator.env.mixin_exists(Identifier::from(name))))
}

pub(crate) fn content_exists(
    args: ArgumentResult,
    evaluator: &mut Evaluator,
) -> CompileResult<Value> {
    args.max_args(0)?;

    Ok(Value::bool(evaluator.content_exists()))
}

pub(crate) fn feature_exists(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();
    let (feature, _) = args
        .get_err(0, "feature")?
        .assert_string_with_name("feature", span)?;

    Ok(Value::bool(matches!(
        feature.as_str(),
        "at-error" | "global-variable-shadowing" | "extend-selector-pseudoclass" | "units-level-3"
    )))
}

pub(crate) fn get_function(
    mut args: ArgumentResult,
    evaluator: &mut Evaluator,
) -> CompileResult<Value> {
    args.max_args(3)?;
    let span = args.span();
    let (name, _) = args
        .get_err(0, "name")?
        .assert_string_with_name("name", span)?;

    let css = args.default_arg(1, "css", Value::False).is_truthy();

    let module = match args.default_arg(2, "module", Value::Null) {
        Value::String(module, ..) => Some(module),
        Value::Null => None,
        v => {
            return Err((
                ErrorKind::InvalidArgumentType,
                format!("$module: {} is not a string.", v.inspect(span)?),
                span,
            )
                .into())
        }
    };

    if css && module.is_some() {
        return Err(("$css and $module may not both be passed at once.", span).into());
    }

    let name = Identifier::from(name);

    let func = if css {
        Some(Function::Plain { name })
    } else {
        let namespace = module.map(|module| Spanned {
            node: Identifier::from(module),
            span,
        });

        evaluator.env.get_fn(name, namespace)?.or_else(|| {
            GLOBAL_FUNCTIONS
                .get(name.as_str())
                .map(|f| Function::Builtin(f.clone(), name))
        })
    };

    match func {
        Some(func) => Ok(Value::FunctionRef(Box::new(func))),
        None => Err((format!("Function not found: {}", name), span).into()),
    }
}

pub(crate) fn get_mixin(
    mut args: ArgumentResult,
    evaluator: &mut Evaluator,
) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let (name, _) = args
        .get_err(0, "name")?
        .assert_string_with_name("name", span)?;

    let module = match args.default_arg(1, "module", Value::Null) {
        Value::String(module, ..) => Some(Spanned {
            node: Identifier::from(module),
            span,
        }),
        Value::Null => None,
        v => {
            return Err((
                ErrorKind::InvalidArgumentType,
                format!("$module: {} is not a string.", v.inspect(span)?),
                span,
            )
                .into())
        }
    };

    let name = Spanned {
        node: Identifier::from(name),
        span,
    };

    let mixin = evaluator.current_mixin_ref(name, module)?;

    Ok(Value::MixinRef(Box::new(mixin)))
}

pub(crate) fn call(mut args: ArgumentResult, evaluator: &mut Evaluator) -> CompileResult<Value> {
    let span = args.span();
    let func = match args.get_err(0, "function")? {
        Value::FunctionRef(func) => *func,
        v @ Value::String(..) => {
            // Passing a function's name rather than a reference is the
            // legacy calling convention.
            let name = Identifier::from(v.assert_string_with_name("function", span)?.0);
            match evaluator.env.get_fn(name, None)? {
                Some(func) => func,
                None => match GLOBAL_FUNCTIONS.get(name.as_str()) {
                    Some(f) => Function::Builtin(f.clone(), name),
                    None => Function::Plain { name },
                },
            }
        }
        v => {
            return Err((
                ErrorKind::InvalidArgumentType,
                format!(
                    "$function: {} is not a function reference.",
                    v.inspect(span)?
                ),
                span,
            )
                .into())
        }
    };

    args.remove_positional(0);

    evaluator.call_function(func, CallArgs::Evaluated(args), span)
}

pub(crate) fn keywords(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();

    let args = match args.get_err(0, "args")? {
        Value::ArgList(args) => args,
        v => {
            return Err((
                ErrorKind::InvalidArgumentType,
                format!("$args: {} is not an argument list.", v.inspect(span)?),
                span,
            )
                .into())
        }
    };

    Ok(Value::Map(ValueMap::new_with(
        args.keywords()
            .iter()
            .map(|(name, val)| {
                (
                    Value::String(name.to_string(), QuoteKind::None).span(span),
                    val.clone(),
                )
            })
            .collect::<Vec<(Spanned<Value>, Value)>>(),
    )))
}

pub(crate) fn declare(f: &mut GlobalFunctionMap) {
    f.insert("inspect", Builtin::new(inspect));
    f.insert("type-of", Builtin::new(type_of));
    f.insert("variable-exists", Builtin::new(variable_exists));
    f.insert(
        "global-variable-exists",
        Builtin::new(global_variable_exists),
    );
    f.insert("function-exists", Builtin::new(function_exists));
    f.insert("mixin-exists", Builtin::new(mixin_exists));
    f.insert("content-exists", Builtin::new(content_exists));
    f.insert("feature-exists", Builtin::new(feature_exists));
    f.insert("get-function", Builtin::new(get_function));
    f.insert("call", Builtin::new(call));
    f.insert("keywords", Builtin::new(keywords));
}
