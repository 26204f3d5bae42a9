use crate::builtin::builtin_imports::*;

use super::{Builtin, GlobalFunctionMap};

/// 1-based index into a list, with negative indices counting from the end.
fn list_index(len: usize, n: &Dimension, name: &str, span: Span) -> CompileResult<usize> {
    let n_int = n.assert_int_with_name(name, span)?;

    if n_int == 0 {
        return Err((
            ErrorKind::InvalidArgumentType,
            format!("${}: List index may not be 0.", name),
            span,
        )
            .into());
    }

    let idx = if n_int < 0 {
        len as i64 + n_int
    } else {
        n_int - 1
    };

    if idx < 0 || idx >= len as i64 {
        return Err((
            ErrorKind::InvalidArgumentType,
            format!(
                "${}: Invalid index {} for a list with {} elements.",
                name, n_int, len
            ),
            span,
        )
            .into());
    }

    Ok(idx as usize)
}

pub(crate) fn length(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let len = args.get_err(0, "list")?.as_list().len();

    Ok(Value::Dimension(Dimension::new_unitless(len as i64)))
}

pub(crate) fn nth(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let list = args.get_err(0, "list")?.as_list();
    let n = args
        .get_err(1, "n")?
        .assert_number_with_name("n", span)?;

    let idx = list_index(list.len(), &n, "n", span)?;

    Ok(list.into_iter().nth(idx).unwrap())
}

pub(crate) fn set_nth(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(3)?;
    let span = args.span();
    let (mut list, sep, brackets) = match args.get_err(0, "list")? {
        Value::List(v, sep, b) => (v, sep, b),
        Value::Map(m) => (m.as_list(), ListSeparator::Comma, Brackets::None),
        Value::ArgList(v) => (v.elems, ListSeparator::Comma, Brackets::None),
        v => (vec![v], ListSeparator::Space, Brackets::None),
    };
    let n = args
        .get_err(1, "n")?
        .assert_number_with_name("n", span)?;
    let value = args.get_err(2, "value")?;

    let idx = list_index(list.len(), &n, "n", span)?;

    list[idx] = value;

    Ok(Value::List(list, sep, brackets))
}

pub(crate) fn join(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(4)?;
    let span = args.span();
    let list1 = args.get_err(0, "list1")?;
    let list2 = args.get_err(1, "list2")?;
    let separator_arg = args.default_arg(2, "separator", Value::String("auto".to_owned(), QuoteKind::None));
    let brackets_arg = args.default_arg(3, "bracketed", Value::String("auto".to_owned(), QuoteKind::None));

    let separator = match &separator_arg {
        Value::String(s, ..) => match s.as_str() {
            "auto" => {
                if list1.separator() == ListSeparator::Undecided {
                    list2.separator()
                } else {
                    list1.separator()
                }
            }
            "comma" => ListSeparator::Comma,
            "space" => ListSeparator::Space,
            "slash" => ListSeparator::Slash,
            _ => {
                return Err((
                    ErrorKind::InvalidArgumentType,
                    "$separator: Must be \"space\", \"comma\", \"slash\", or \"auto\".",
                    span,
                )
                    .into())
            }
        },
        _ => {
            return Err((
                ErrorKind::InvalidArgumentType,
                "$separator: Must be \"space\", \"comma\", \"slash\", or \"auto\".",
                span,
            )
                .into())
        }
    };

    let brackets = match &brackets_arg {
        Value::String(s, ..) if s == "auto" => match &list1 {
            Value::List(.., brackets) => *brackets,
            _ => Brackets::None,
        },
        v => {
            if v.is_truthy() {
                Brackets::Bracketed
            } else {
                Brackets::None
            }
        }
    };

    let mut elems = list1.as_list();
    elems.append(&mut list2.as_list());

    Ok(Value::List(elems, separator, brackets))
}

pub(crate) fn append(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(3)?;
    let span = args.span();
    let list = args.get_err(0, "list")?;
    let value = args.get_err(1, "val")?;
    let separator_arg = args.default_arg(2, "separator", Value::String("auto".to_owned(), QuoteKind::None));

    let (mut elems, current_sep, brackets) = match list {
        Value::List(v, sep, b) => (v, sep, b),
        v => (vec![v], ListSeparator::Undecided, Brackets::None),
    };

    let separator = match &separator_arg {
        Value::String(s, ..) => match s.as_str() {
            "auto" => {
                if current_sep == ListSeparator::Undecided {
                    ListSeparator::Space
                } else {
                    current_sep
                }
            }
            "comma" => ListSeparator::Comma,
            "space" => ListSeparator::Space,
            "slash" => ListSeparator::Slash,
            _ => {
                return Err((
                    ErrorKind::InvalidArgumentType,
                    "$separator: Must be \"space\", \"comma\", \"slash\", or \"auto\".",
                    span,
                )
                    .into())
            }
        },
        _ => {
            return Err((
                ErrorKind::InvalidArgumentType,
                "$separator: Must be \"space\", \"comma\", \"slash\", or \"auto\".",
                span,
            )
                .into())
        }
    };

    elems.push(value);

    Ok(Value::List(elems, separator, brackets))
}

pub(crate) fn zip(args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    let lists: Vec<Vec<Value>> = args
        .get_variadic()?
        .into_iter()
        .map(|x| x.node.as_list())
        .collect();

    let len = lists.iter().map(Vec::len).min().unwrap_or(0);

    let result = (0..len)
        .map(|i| {
            Value::List(
                lists.iter().map(|list| list[i].clone()).collect(),
                ListSeparator::Space,
                Brackets::None,
            )
        })
        .collect();

    Ok(Value::List(result, ListSeparator::Comma, Brackets::None))
}

pub(crate) fn index(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let list = args.get_err(0, "list")?.as_list();
    let value = args.get_err(1, "value")?;

    Ok(match list.into_iter().position(|v| v == value) {
        Some(position) => Value::Dimension(Dimension::new_unitless(position as i64 + 1)),
        None => Value::Null,
    })
}

pub(crate) fn list_separator(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;

    Ok(Value::String(
        args.get_err(0, "list")?.separator().name().to_owned(),
        QuoteKind::None,
    ))
}

pub(crate) fn is_bracketed(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;

    Ok(Value::bool(matches!(
        args.get_err(0, "list")?,
        Value::List(.., Brackets::Bracketed)
    )))
}

pub(crate) fn declare(f: &mut GlobalFunctionMap) {
    f.insert("length", Builtin::new(length));
    f.insert("nth", Builtin::new(nth));
    f.insert("set-nth", Builtin::new(set_nth));
    f.insert("join", Builtin::new(join));
    f.insert("append", Builtin::new(append));
    f.insert("zip", Builtin::new(zip));
    f.insert("index", Builtin::new(index));
    f.insert("list-separator", Builtin::new(list_separator));
    f.insert("is-bracketed", Builtin::new(is_bracketed));
}
