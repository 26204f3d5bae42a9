use crate::{
    builtin::builtin_imports::*,
    selector::{
        ComplexSelector, ComplexSelectorComponent, Extender, Selector, SelectorList,
    },
};

use super::{Builtin, GlobalFunctionMap};

pub(crate) fn selector_parse(
    mut args: ArgumentResult,
    evaluator: &mut Evaluator,
) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();

    Ok(args
        .get_err(0, "selector")?
        .to_selector(evaluator, "selector", false, span)?
        .into_value())
}

pub(crate) fn selector_nest(
    args: ArgumentResult,
    evaluator: &mut Evaluator,
) -> CompileResult<Value> {
    let span = args.span();
    let selectors = args.get_variadic()?;
    if selectors.is_empty() {
        return Err((
            ErrorKind::MissingArgument,
            "$selectors: At least one selector must be passed.",
            span,
        )
            .into());
    }

    let mut parsed = Vec::with_capacity(selectors.len());
    for (i, sel) in selectors.into_iter().enumerate() {
        parsed.push(sel.node.to_selector(evaluator, "selectors", i != 0, span)?);
    }

    let mut result: Option<Selector> = None;

    for child in parsed {
        result = Some(match result {
            None => child,
            Some(parent) => Selector(
                child
                    .0
                    .resolve_parent_selectors(Some(parent.0), true)?,
            ),
        });
    }

    Ok(result.unwrap().into_value())
}

pub(crate) fn selector_append(
    args: ArgumentResult,
    evaluator: &mut Evaluator,
) -> CompileResult<Value> {
    let span = args.span();
    let selectors = args.get_variadic()?;
    if selectors.is_empty() {
        return Err((
            ErrorKind::MissingArgument,
            "$selectors: At least one selector must be passed.",
            span,
        )
            .into());
    }

    let mut parsed = Vec::with_capacity(selectors.len());
    for sel in selectors {
        parsed.push(sel.node.to_selector(evaluator, "selectors", false, span)?);
    }

    let mut result: Option<Selector> = None;

    for child in parsed {
        result = Some(match result {
            None => child,
            Some(parent) => {
                let components = child
                    .0
                    .components
                    .into_iter()
                    .map(|complex| {
                        // Gluing selectors together means the child's first
                        // compound grows a parent selector prefix.
                        let mut components = complex.components.into_iter();
                        match components.next() {
                            Some(ComplexSelectorComponent::Compound(compound)) => {
                                let mut prefixed = match compound.prepend_parent() {
                                    Some(v) => vec![ComplexSelectorComponent::Compound(v)],
                                    None => {
                                        return Err((
                                            format!("Can't append to {}.", parent.0),
                                            span,
                                        )
                                            .into())
                                    }
                                };
                                prefixed.extend(components);
                                Ok(ComplexSelector::new(prefixed, false))
                            }
                            Some(..) | None => {
                                Err((format!("Can't append to {}.", parent.0), span).into())
                            }
                        }
                    })
                    .collect::<CompileResult<Vec<ComplexSelector>>>()?;

                Selector(
                    SelectorList {
                        components,
                        span,
                    }
                    .resolve_parent_selectors(Some(parent.0), false)?,
                )
            }
        });
    }

    Ok(result.unwrap().into_value())
}

pub(crate) fn selector_unify(
    mut args: ArgumentResult,
    evaluator: &mut Evaluator,
) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();

    let selector1 = args
        .get_err(0, "selector1")?
        .to_selector(evaluator, "selector1", false, span)?;
    let selector2 = args
        .get_err(1, "selector2")?
        .to_selector(evaluator, "selector2", false, span)?;

    Ok(match selector1.unify(&selector2) {
        Some(sel) => sel.into_value(),
        None => Value::Null,
    })
}

pub(crate) fn is_superselector(
    mut args: ArgumentResult,
    evaluator: &mut Evaluator,
) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();

    let super_selector = args
        .get_err(0, "super")?
        .to_selector(evaluator, "super", false, span)?;
    let sub_selector = args
        .get_err(1, "sub")?
        .to_selector(evaluator, "sub", false, span)?;

    Ok(Value::bool(super_selector.is_superselector(&sub_selector)))
}

pub(crate) fn simple_selectors(
    mut args: ArgumentResult,
    _: &mut Evaluator,
) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();

    let (string, _) = args
        .get_err(0, "selector")?
        .assert_string_with_name("selector", span)?;

    // The argument must be a compound selector, so splitting on simple
    // selector boundaries is enough.
    let mut simples = Vec::new();
    let mut current = String::new();
    let mut in_brackets = 0_i32;

    for c in string.chars() {
        match c {
            '[' | '(' => in_brackets += 1,
            ']' | ')' => in_brackets -= 1,
            '.' | '#' | '%' | ':' if in_brackets == 0 && !current.is_empty() => {
                simples.push(std::mem::take(&mut current));
            }
            _ => {}
        }
        current.push(c);
    }

    if !current.is_empty() {
        simples.push(current);
    }

    Ok(Value::List(
        simples
            .into_iter()
            .map(|s| Value::String(s, QuoteKind::None))
            .collect(),
        ListSeparator::Comma,
        Brackets::None,
    ))
}

pub(crate) fn selector_extend(
    mut args: ArgumentResult,
    evaluator: &mut Evaluator,
) -> CompileResult<Value> {
    args.max_args(3)?;
    let span = args.span();

    let selector = args
        .get_err(0, "selector")?
        .to_selector(evaluator, "selector", false, span)?;
    let target = args
        .get_err(1, "extendee")?
        .to_selector(evaluator, "extendee", false, span)?;
    let source = args
        .get_err(2, "extender")?
        .to_selector(evaluator, "extender", false, span)?;

    Ok(Selector(Extender::extend(selector.0, source.0, target.0, span)?).into_value())
}

pub(crate) fn selector_replace(
    mut args: ArgumentResult,
    evaluator: &mut Evaluator,
) -> CompileResult<Value> {
    args.max_args(3)?;
    let span = args.span();

    let selector = args
        .get_err(0, "selector")?
        .to_selector(evaluator, "selector", false, span)?;
    let target = args
        .get_err(1, "original")?
        .to_selector(evaluator, "original", false, span)?;
    let source = args
        .get_err(2, "replacement")?
        .to_selector(evaluator, "replacement", false, span)?;

    Ok(Selector(Extender::replace(selector.0, source.0, target.0, span)?).into_value())
}

pub(crate) fn declare(f: &mut GlobalFunctionMap) {
    f.insert("selector-parse", Builtin::new(selector_parse));
    f.insert("selector-nest", Builtin::new(selector_nest));
    f.insert("selector-append", Builtin::new(selector_append));
    f.insert("selector-unify", Builtin::new(selector_unify));
    f.insert("is-superselector", Builtin::new(is_superselector));
    f.insert("simple-selectors", Builtin::new(simple_selectors));
    f.insert("selector-extend", Builtin::new(selector_extend));
    f.insert("selector-replace", Builtin::new(selector_replace));
}
