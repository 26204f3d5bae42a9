use std::cmp::Ordering;

use codemap::Span;

use crate::{
    common::{BinaryOp, QuoteKind},
    error::{CompileResult, ErrorKind},
    unit::Unit,
    value::{Dimension, Value},
    Options,
};

fn undefined_operation(
    left: &Value,
    op: BinaryOp,
    right: &Value,
    span: Span,
) -> Box<crate::error::Error> {
    let kind = if matches!(left, Value::Null) || matches!(right, Value::Null) {
        ErrorKind::InvalidNullOperation
    } else {
        ErrorKind::UndefinedOperation
    };

    match (left.inspect(span), right.inspect(span)) {
        (Ok(left), Ok(right)) => crate::error::Error::raw(
            kind,
            format!("Undefined operation \"{} {} {}\".", left, op, right),
            span,
        ),
        (Err(e), _) | (_, Err(e)) => e,
    }
}

pub(crate) fn add(left: Value, right: Value, options: &Options, span: Span) -> CompileResult<Value> {
    Ok(match left {
        Value::Map(..) | Value::FunctionRef(..) | Value::MixinRef(..) => {
            return Err((
                format!("{} isn't a valid CSS value.", left.inspect(span)?),
                span,
            )
                .into())
        }
        Value::True | Value::False => match right {
            Value::String(s, QuoteKind::Quoted) => Value::String(
                format!(
                    "{}{}",
                    left.to_css_string(span, options.is_compressed())?,
                    s
                ),
                QuoteKind::Quoted,
            ),
            _ => Value::String(
                format!(
                    "{}{}",
                    left.to_css_string(span, options.is_compressed())?,
                    right.to_css_string(span, options.is_compressed())?
                ),
                QuoteKind::None,
            ),
        },
        Value::Null => match right {
            Value::Null => Value::Null,
            _ => Value::String(
                right.to_css_string(span, options.is_compressed())?,
                QuoteKind::None,
            ),
        },
        Value::Dimension(dimension) => match right {
            Value::Dimension(dimension2) => {
                if !dimension.unit.comparable(&dimension2.unit) {
                    return Err((
                        ErrorKind::IncompatibleUnits,
                        format!(
                            "Incompatible units {} and {}.",
                            dimension2.unit, dimension.unit
                        ),
                        span,
                    )
                        .into());
                }
                Value::Dimension(dimension + dimension2)
            }
            Value::String(s, q) => Value::String(
                format!(
                    "{}{}",
                    Value::Dimension(dimension).to_css_string(span, options.is_compressed())?,
                    s
                ),
                q,
            ),
            Value::Null => Value::String(
                Value::Dimension(dimension).to_css_string(span, options.is_compressed())?,
                QuoteKind::None,
            ),
            Value::True | Value::False | Value::List(..) | Value::ArgList(..) => Value::String(
                format!(
                    "{}{}",
                    Value::Dimension(dimension).to_css_string(span, options.is_compressed())?,
                    right.to_css_string(span, options.is_compressed())?
                ),
                QuoteKind::None,
            ),
            Value::Map(..) | Value::FunctionRef(..) | Value::MixinRef(..) => {
                return Err((
                    format!("{} isn't a valid CSS value.", right.inspect(span)?),
                    span,
                )
                    .into())
            }
            Value::Color(..) => {
                return Err(undefined_operation(
                    &Value::Dimension(dimension),
                    BinaryOp::Plus,
                    &right,
                    span,
                ))
            }
        },
        c @ Value::Color(..) => match right {
            Value::String(..) | Value::Null | Value::List(..) => Value::String(
                format!(
                    "{}{}",
                    c.to_css_string(span, options.is_compressed())?,
                    right.to_css_string(span, options.is_compressed())?,
                ),
                QuoteKind::None,
            ),
            _ => return Err(undefined_operation(&c, BinaryOp::Plus, &right, span)),
        },
        Value::String(text, quotes) => match right {
            Value::String(text2, ..) => Value::String(text + &text2, quotes),
            _ => Value::String(
                text + &right.to_css_string(span, options.is_compressed())?,
                quotes,
            ),
        },
        Value::List(..) | Value::ArgList(..) => match right {
            Value::String(s, q) => Value::String(
                format!(
                    "{}{}",
                    left.to_css_string(span, options.is_compressed())?,
                    s
                ),
                q,
            ),
            _ => Value::String(
                format!(
                    "{}{}",
                    left.to_css_string(span, options.is_compressed())?,
                    right.to_css_string(span, options.is_compressed())?
                ),
                QuoteKind::None,
            ),
        },
    })
}

pub(crate) fn sub(left: Value, right: Value, options: &Options, span: Span) -> CompileResult<Value> {
    Ok(match left {
        Value::Map(..) | Value::FunctionRef(..) | Value::MixinRef(..) => {
            return Err((
                format!("{} isn't a valid CSS value.", left.inspect(span)?),
                span,
            )
                .into())
        }
        Value::Null => Value::String(
            format!("-{}", right.to_css_string(span, options.is_compressed())?),
            QuoteKind::None,
        ),
        Value::Dimension(dimension) => match right {
            Value::Dimension(dimension2) => {
                if !dimension.unit.comparable(&dimension2.unit) {
                    return Err((
                        ErrorKind::IncompatibleUnits,
                        format!(
                            "Incompatible units {} and {}.",
                            dimension2.unit, dimension.unit
                        ),
                        span,
                    )
                        .into());
                }
                Value::Dimension(dimension - dimension2)
            }
            Value::List(..) | Value::String(..) | Value::ArgList(..) => Value::String(
                format!(
                    "{}-{}",
                    Value::Dimension(dimension).to_css_string(span, options.is_compressed())?,
                    right.to_css_string(span, options.is_compressed())?
                ),
                QuoteKind::None,
            ),
            Value::Null => Value::String(
                format!(
                    "{}-",
                    Value::Dimension(dimension).to_css_string(span, options.is_compressed())?
                ),
                QuoteKind::None,
            ),
            _ => {
                return Err(undefined_operation(
                    &Value::Dimension(dimension),
                    BinaryOp::Minus,
                    &right,
                    span,
                ))
            }
        },
        c @ Value::Color(..) => match right {
            Value::String(..) | Value::Null | Value::List(..) => Value::String(
                format!(
                    "{}-{}",
                    c.to_css_string(span, options.is_compressed())?,
                    right.to_css_string(span, options.is_compressed())?,
                ),
                QuoteKind::None,
            ),
            _ => return Err(undefined_operation(&c, BinaryOp::Minus, &right, span)),
        },
        _ => match right {
            Value::Map(..) | Value::FunctionRef(..) | Value::MixinRef(..) => {
                return Err((
                    format!("{} isn't a valid CSS value.", right.inspect(span)?),
                    span,
                )
                    .into())
            }
            _ => Value::String(
                format!(
                    "{}-{}",
                    left.to_css_string(span, options.is_compressed())?,
                    right.to_css_string(span, options.is_compressed())?
                ),
                QuoteKind::None,
            ),
        },
    })
}

pub(crate) fn mul(left: Value, right: Value, _options: &Options, span: Span) -> CompileResult<Value> {
    match left {
        Value::Dimension(dimension) => match right {
            Value::Dimension(dimension2) => Ok(Value::Dimension(dimension * dimension2)),
            _ => Err(undefined_operation(
                &Value::Dimension(dimension),
                BinaryOp::Mul,
                &right,
                span,
            )),
        },
        _ => Err(undefined_operation(&left, BinaryOp::Mul, &right, span)),
    }
}

pub(crate) fn div(left: Value, right: Value, options: &Options, span: Span) -> CompileResult<Value> {
    Ok(match left {
        Value::Map(..) | Value::FunctionRef(..) | Value::MixinRef(..) => {
            return Err((
                format!("{} isn't a valid CSS value.", left.inspect(span)?),
                span,
            )
                .into())
        }
        Value::Dimension(dimension) => match right {
            Value::Dimension(dimension2) => {
                if dimension2.num.is_zero() {
                    return Err((ErrorKind::ZeroDivision, "Division by zero.", span).into());
                }

                Value::Dimension(dimension / dimension2)
            }
            _ => Value::String(
                format!(
                    "{}/{}",
                    Value::Dimension(dimension).to_css_string(span, options.is_compressed())?,
                    right.to_css_string(span, options.is_compressed())?
                ),
                QuoteKind::None,
            ),
        },
        _ => Value::String(
            format!(
                "{}/{}",
                left.to_css_string(span, options.is_compressed())?,
                right.to_css_string(span, options.is_compressed())?
            ),
            QuoteKind::None,
        ),
    })
}

pub(crate) fn rem(left: Value, right: Value, _options: &Options, span: Span) -> CompileResult<Value> {
    match (left, right) {
        (Value::Dimension(l), Value::Dimension(r)) => {
            if r.num.is_zero() {
                return Err((ErrorKind::ZeroDivision, "Modulo by zero.", span).into());
            }

            if !l.unit.comparable(&r.unit) {
                return Err((
                    ErrorKind::IncompatibleUnits,
                    format!("Incompatible units {} and {}.", r.unit, l.unit),
                    span,
                )
                    .into());
            }

            let converted = r.num.convert(&r.unit, &l.unit);
            let unit = if l.unit == Unit::None { r.unit } else { l.unit };

            Ok(Value::Dimension(Dimension::new(l.num % converted, unit)))
        }
        (left, right) => Err(undefined_operation(&left, BinaryOp::Rem, &right, span)),
    }
}

pub(crate) fn cmp(
    left: &Value,
    right: &Value,
    _options: &Options,
    span: Span,
    op: BinaryOp,
) -> CompileResult<Value> {
    let ordering = left.cmp(right, span, op)?;

    Ok(match op {
        BinaryOp::GreaterThan => Value::bool(ordering == Some(Ordering::Greater)),
        BinaryOp::GreaterThanEqual => {
            Value::bool(matches!(ordering, Some(Ordering::Greater | Ordering::Equal)))
        }
        BinaryOp::LessThan => Value::bool(ordering == Some(Ordering::Less)),
        BinaryOp::LessThanEqual => {
            Value::bool(matches!(ordering, Some(Ordering::Less | Ordering::Equal)))
        }
        _ => unreachable!(),
    })
}

/// The `=` operator inside media queries and other plain-CSS contexts
/// serializes both sides.
pub(crate) fn single_eq(
    left: &Value,
    right: &Value,
    options: &Options,
    span: Span,
) -> CompileResult<Value> {
    Ok(Value::String(
        format!(
            "{}={}",
            left.to_css_string(span, options.is_compressed())?,
            right.to_css_string(span, options.is_compressed())?
        ),
        QuoteKind::None,
    ))
}
