use crate::builtin::builtin_imports::*;

use super::{Builtin, GlobalFunctionMap};

pub(crate) fn percentage(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let num = args
        .get_err(0, "number")?
        .assert_number_with_name("number", args.span())?;

    num.assert_no_units("number", args.span())?;

    Ok(Value::Dimension(Dimension::new(
        num.num * Number::from(100),
        Unit::Percent,
    )))
}

pub(crate) fn round(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let num = args
        .get_err(0, "number")?
        .assert_number_with_name("number", args.span())?;

    Ok(Value::Dimension(Dimension::new(num.num.round(), num.unit)))
}

pub(crate) fn ceil(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let num = args
        .get_err(0, "number")?
        .assert_number_with_name("number", args.span())?;

    Ok(Value::Dimension(Dimension::new(num.num.ceil(), num.unit)))
}

pub(crate) fn floor(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let num = args
        .get_err(0, "number")?
        .assert_number_with_name("number", args.span())?;

    Ok(Value::Dimension(Dimension::new(num.num.floor(), num.unit)))
}

pub(crate) fn abs(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let num = args
        .get_err(0, "number")?
        .assert_number_with_name("number", args.span())?;

    Ok(Value::Dimension(Dimension::new(num.num.abs(), num.unit)))
}

pub(crate) fn comparable(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let number1 = args
        .get_err(0, "number1")?
        .assert_number_with_name("number1", args.span())?;
    let number2 = args
        .get_err(1, "number2")?
        .assert_number_with_name("number2", args.span())?;

    Ok(Value::bool(number1.is_comparable_to(&number2)))
}

pub(crate) fn unitless(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let number = args
        .get_err(0, "number")?
        .assert_number_with_name("number", args.span())?;

    Ok(Value::bool(number.unit == Unit::None))
}

pub(crate) fn unit(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let number = args
        .get_err(0, "number")?
        .assert_number_with_name("number", args.span())?;

    Ok(Value::String(number.unit.to_string(), QuoteKind::Quoted))
}

fn min_or_max(args: ArgumentResult, is_min: bool) -> CompileResult<Value> {
    let span = args.span();
    let nums = args.get_variadic()?;

    if nums.is_empty() {
        return Err((
            ErrorKind::MissingArgument,
            "At least one argument must be passed.",
            span,
        )
            .into());
    }

    let mut best: Option<Dimension> = None;

    for num in nums {
        let candidate = num.node.assert_number(span)?;

        best = Some(match best {
            None => candidate,
            Some(best) => {
                if !best.is_comparable_to(&candidate) {
                    return Err((
                        ErrorKind::IncompatibleUnits,
                        format!("Incompatible units {} and {}.", best.unit, candidate.unit),
                        span,
                    )
                        .into());
                }

                let candidate_converted = candidate.num.convert(&candidate.unit, &best.unit);
                let replace = if is_min {
                    candidate_converted < best.num
                } else {
                    candidate_converted > best.num
                };

                if replace {
                    candidate
                } else {
                    best
                }
            }
        });
    }

    Ok(Value::Dimension(best.unwrap()))
}

pub(crate) fn min(args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    min_or_max(args, true)
}

pub(crate) fn max(args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    min_or_max(args, false)
}

/// `math.div`: always plain division, no deprecation, no slash semantics.
pub(crate) fn div(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let number1 = args
        .get_err(0, "number1")?
        .assert_number_with_name("number1", span)?;
    let number2 = args
        .get_err(1, "number2")?
        .assert_number_with_name("number2", span)?;

    if number2.num.is_zero() {
        return Err((ErrorKind::ZeroDivision, "Division by zero.", span).into());
    }

    Ok(Value::Dimension(number1 / number2))
}

pub(crate) fn declare(f: &mut GlobalFunctionMap) {
    f.insert("percentage", Builtin::new(percentage));
    f.insert("round", Builtin::new(round));
    f.insert("ceil", Builtin::new(ceil));
    f.insert("floor", Builtin::new(floor));
    f.insert("abs", Builtin::new(abs));
    f.insert("min", Builtin::new(min));
    f.insert("max", Builtin::new(max));
    f.insert("comparable", Builtin::new(comparable));
    f.insert("unitless", Builtin::new(unitless));
    f.insert("unit", Builtin::new(unit));
}
