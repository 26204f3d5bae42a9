use crate::builtin::builtin_imports::*;

use super::{Builtin, GlobalFunctionMap};

pub(crate) fn unquote(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();

    match args.get_err(0, "string")? {
        v @ Value::String(..) => Ok(v.unquote()),
        v => Err((
            ErrorKind::InvalidArgumentType,
            format!("$string: {} is not a string.", v.inspect(span)?),
            span,
        )
            .into()),
    }
}

pub(crate) fn quote(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();
    let (string, _) = args
        .get_err(0, "string")?
        .assert_string_with_name("string", span)?;

    Ok(Value::String(string, QuoteKind::Quoted))
}

pub(crate) fn str_length(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();
    let (string, _) = args
        .get_err(0, "string")?
        .assert_string_with_name("string", span)?;

    Ok(Value::Dimension(Dimension::new_unitless(
        string.chars().count() as i64,
    )))
}

pub(crate) fn to_upper_case(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();
    let (string, quotes) = args
        .get_err(0, "string")?
        .assert_string_with_name("string", span)?;

    Ok(Value::String(string.to_ascii_uppercase(), quotes))
}

pub(crate) fn to_lower_case(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();
    let (string, quotes) = args
        .get_err(0, "string")?
        .assert_string_with_name("string", span)?;

    Ok(Value::String(string.to_ascii_lowercase(), quotes))
}

pub(crate) fn str_index(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let (string, _) = args
        .get_err(0, "string")?
        .assert_string_with_name("string", span)?;
    let (substring, _) = args
        .get_err(1, "substring")?
        .assert_string_with_name("substring", span)?;

    Ok(match string.find(&substring) {
        Some(byte_idx) => Value::Dimension(Dimension::new_unitless(
            string[..byte_idx].chars().count() as i64 + 1,
        )),
        None => Value::Null,
    })
}

pub(crate) fn str_insert(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(3)?;
    let span = args.span();
    let (string, quotes) = args
        .get_err(0, "string")?
        .assert_string_with_name("string", span)?;
    let (insert, _) = args
        .get_err(1, "insert")?
        .assert_string_with_name("insert", span)?;
    let index = args
        .get_err(2, "index")?
        .assert_number_with_name("index", span)?;
    index.assert_no_units("index", span)?;
    let index = index.assert_int_with_name("index", span)?;

    let chars: Vec<char> = string.chars().collect();
    let len = chars.len() as i64;

    // Positive indices are 1-based from the front; negative count from the
    // back, with -1 inserting before the final character.
    let insertion_point = if index == 0 {
        0
    } else if index > 0 {
        (index - 1).min(len)
    } else {
        (len + index + 1).max(0)
    } as usize;

    let mut result: String = chars[..insertion_point].iter().collect();
    result.push_str(&insert);
    result.extend(&chars[insertion_point..]);

    Ok(Value::String(result, quotes))
}

pub(crate) fn str_slice(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(3)?;
    let span = args.span();
    let (string, quotes) = args
        .get_err(0, "string")?
        .assert_string_with_name("string", span)?;

    let start_at = args
        .get_err(1, "start-at")?
        .assert_number_with_name("start-at", span)?;
    start_at.assert_no_units("start-at", span)?;
    let start_at = start_at.assert_int_with_name("start-at", span)?;

    let end_at = match args.default_arg(2, "end-at", Value::Dimension(Dimension::new_unitless(-1))) {
        Value::Dimension(n) => {
            n.assert_no_units("end-at", span)?;
            n.assert_int_with_name("end-at", span)?
        }
        v => {
            return Err((
                ErrorKind::InvalidArgumentType,
                format!("$end-at: {} is not a number.", v.inspect(span)?),
                span,
            )
                .into())
        }
    };

    let chars: Vec<char> = string.chars().collect();
    let len = chars.len() as i64;

    let start = if start_at > 0 {
        start_at - 1
    } else if start_at == 0 {
        0
    } else {
        (len + start_at).max(0)
    };

    let end = if end_at > 0 {
        end_at
    } else if end_at == 0 {
        0
    } else {
        (len + end_at + 1).max(0)
    };

    let end = end.min(len);

    let result: String = if start >= end {
        String::new()
    } else {
        chars[start as usize..end as usize].iter().collect()
    };

    Ok(Value::String(result, quotes))
}

pub(crate) fn declare(f: &mut GlobalFunctionMap) {
    f.insert("unquote", Builtin::new(unquote));
    f.insert("quote", Builtin::new(quote));
    f.insert("str-length", Builtin::new(str_length));
    f.insert("str-index", Builtin::new(str_index));
    f.insert("str-insert", Builtin::new(str_insert));
    f.insert("str-slice", Builtin::new(str_slice));
    f.insert("to-upper-case", Builtin::new(to_upper_case));
    f.insert("to-lower-case", Builtin::new(to_lower_case));
}
