use crate::{builtin::builtin_imports::*, color::ColorFormat};

use super::{Builtin, GlobalFunctionMap};

/// A channel given as a percentage maps onto `0..=max`.
fn channel_value(value: Dimension, max: f64, name: &str, span: Span) -> CompileResult<Number> {
    Ok(match value.unit {
        Unit::Percent => Number(value.num.0 / 100.0 * max),
        Unit::None => value.num,
        _ => {
            return Err((
                ErrorKind::InvalidArgumentType,
                format!("${}: Expected {} to have no units or \"%\".", name, value.num.0),
                span,
            )
                .into())
        }
    })
}

fn alpha_value(value: Value, span: Span) -> CompileResult<Number> {
    let alpha = value.assert_number_with_name("alpha", span)?;
    Ok(match alpha.unit {
        Unit::Percent => Number(alpha.num.0 / 100.0),
        _ => alpha.num,
    })
}

fn rgb_impl(mut args: ArgumentResult) -> CompileResult<Value> {
    args.max_args(4)?;
    let span = args.span();

    // The one-argument form takes a slash- or space-separated list.
    let (red, green, blue, alpha) = if args.len() == 1 {
        let list = args.get_err(0, "channels")?.as_list();
        if list.len() < 3 {
            return Err((
                ErrorKind::MissingArgument,
                "Missing element $green.",
                span,
            )
                .into());
        }

        let mut iter = list.into_iter();
        let red = iter.next().unwrap();
        let green = iter.next().unwrap();
        let blue = iter.next().unwrap();
        let alpha = iter.next();

        (red, green, blue, alpha)
    } else {
        let red = args.get_err(0, "red")?;
        let green = args.get_err(1, "green")?;
        let blue = args.get_err(2, "blue")?;
        let alpha = args.get(3, "alpha").map(|v| v.node);

        (red, green, blue, alpha)
    };

    let red = channel_value(red.assert_number_with_name("red", span)?, 255.0, "red", span)?;
    let green = channel_value(
        green.assert_number_with_name("green", span)?,
        255.0,
        "green",
        span,
    )?;
    let blue = channel_value(
        blue.assert_number_with_name("blue", span)?,
        255.0,
        "blue",
        span,
    )?;

    let alpha = match alpha {
        Some(alpha) => alpha_value(alpha, span)?,
        None => Number(1.0),
    };

    Ok(Value::Color(Arc::new(Color::new_rgba(
        red,
        green,
        blue,
        alpha,
        ColorFormat::Infer,
    ))))
}

pub(crate) fn rgb(args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    rgb_impl(args)
}

pub(crate) fn rgba(args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    rgb_impl(args)
}

fn hsl_impl(mut args: ArgumentResult) -> CompileResult<Value> {
    args.max_args(4)?;
    let span = args.span();

    let (hue, saturation, lightness, alpha) = if args.len() == 1 {
        let list = args.get_err(0, "channels")?.as_list();
        if list.len() < 3 {
            return Err((
                ErrorKind::MissingArgument,
                "Missing element $saturation.".to_owned(),
                span,
            )
                .into());
        }

        let mut iter = list.into_iter();
        (
            iter.next().unwrap(),
            iter.next().unwrap(),
            iter.next().unwrap(),
            iter.next(),
        )
    } else {
        (
            args.get_err(0, "hue")?,
            args.get_err(1, "saturation")?,
            args.get_err(2, "lightness")?,
            args.get(3, "alpha").map(|v| v.node),
        )
    };

    let hue = hue.assert_number_with_name("hue", span)?.num;
    let saturation = saturation
        .assert_number_with_name("saturation", span)?
        .num;
    let lightness = lightness.assert_number_with_name("lightness", span)?.num;

    let alpha = match alpha {
        Some(alpha) => alpha_value(alpha, span)?,
        None => Number(1.0),
    };

    Ok(Value::Color(Arc::new(Color::from_hsla(
        hue, saturation, lightness, alpha,
    ))))
}

pub(crate) fn hsl(args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    hsl_impl(args)
}

pub(crate) fn hsla(args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    hsl_impl(args)
}

macro_rules! channel_fn {
    ($name:ident, $channel:ident, $unit:expr) => {
        pub(crate) fn $name(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
            args.max_args(1)?;
            let span = args.span();
            let color = args
                .get_err(0, "color")?
                .assert_color_with_name("color", span)?;

            Ok(Value::Dimension(Dimension::new(color.$channel(), $unit)))
        }
    };
}

channel_fn!(red, red, Unit::None);
channel_fn!(green, green, Unit::None);
channel_fn!(blue, blue, Unit::None);
channel_fn!(hue, hue, Unit::Deg);
channel_fn!(saturation, saturation, Unit::Percent);
channel_fn!(lightness, lightness, Unit::Percent);

pub(crate) fn alpha(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();
    let color = args
        .get_err(0, "color")?
        .assert_color_with_name("color", span)?;

    Ok(Value::Dimension(Dimension::new(color.alpha(), Unit::None)))
}

pub(crate) fn opacity(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();

    match args.get_err(0, "color")? {
        Value::Color(color) => Ok(Value::Dimension(Dimension::new(color.alpha(), Unit::None))),
        // `opacity(0.5)` is a plain CSS filter function.
        Value::Dimension(dimension) => Ok(Value::String(
            format!(
                "opacity({}{})",
                dimension.num.0, dimension.unit
            ),
            QuoteKind::None,
        )),
        v => Err((
            ErrorKind::InvalidArgumentType,
            format!("$color: {} is not a color.", v.inspect(span)?),
            span,
        )
            .into()),
    }
}

fn percentage_amount(args: &mut ArgumentResult, name: &str) -> CompileResult<Number> {
    let span = args.span();
    let amount = args
        .get_err(1, "amount")?
        .assert_number_with_name("amount", span)?;
    amount.assert_bounds(name, 0.0, 100.0, span)?;

    Ok(amount.num)
}

pub(crate) fn lighten(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let color = args
        .get_err(0, "color")?
        .assert_color_with_name("color", span)?;
    let amount = percentage_amount(&mut args, "amount")?;

    Ok(Value::Color(Arc::new(color.lighten(amount))))
}

pub(crate) fn darken(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let color = args
        .get_err(0, "color")?
        .assert_color_with_name("color", span)?;
    let amount = percentage_amount(&mut args, "amount")?;

    Ok(Value::Color(Arc::new(color.darken(amount))))
}

pub(crate) fn saturate(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();

    // Like `opacity`, `saturate(50%)` passes through as plain CSS.
    if args.len() == 1 {
        if let Value::Dimension(dimension) = args.get_err(0, "amount")? {
            return Ok(Value::String(
                format!("saturate({}{})", dimension.num.0, dimension.unit),
                QuoteKind::None,
            ));
        }

        return Err((
            ErrorKind::MissingArgument,
            "Missing argument $amount.",
            span,
        )
            .into());
    }

    let color = args
        .get_err(0, "color")?
        .assert_color_with_name("color", span)?;
    let amount = percentage_amount(&mut args, "amount")?;

    Ok(Value::Color(Arc::new(color.saturate(amount))))
}

pub(crate) fn desaturate(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let color = args
        .get_err(0, "color")?
        .assert_color_with_name("color", span)?;
    let amount = percentage_amount(&mut args, "amount")?;

    Ok(Value::Color(Arc::new(color.desaturate(amount))))
}

pub(crate) fn grayscale(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();

    match args.get_err(0, "color")? {
        Value::Color(color) => Ok(Value::Color(Arc::new(color.grayscale()))),
        Value::Dimension(dimension) => Ok(Value::String(
            format!("grayscale({}{})", dimension.num.0, dimension.unit),
            QuoteKind::None,
        )),
        v => Err((
            ErrorKind::InvalidArgumentType,
            format!("$color: {} is not a color.", v.inspect(span)?),
            span,
        )
            .into()),
    }
}

pub(crate) fn invert(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();

    let weight = match args.get(1, "weight") {
        Some(weight) => {
            let weight = weight.node.assert_number_with_name("weight", span)?;
            weight.assert_bounds("weight", 0.0, 100.0, span)?;
            weight.num
        }
        None => Number(100.0),
    };

    match args.get_err(0, "color")? {
        Value::Color(color) => Ok(Value::Color(Arc::new(color.invert(weight)))),
        Value::Dimension(dimension) => Ok(Value::String(
            format!("invert({}{})", dimension.num.0, dimension.unit),
            QuoteKind::None,
        )),
        v => Err((
            ErrorKind::InvalidArgumentType,
            format!("$color: {} is not a color.", v.inspect(span)?),
            span,
        )
            .into()),
    }
}

pub(crate) fn mix(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(3)?;
    let span = args.span();
    let color1 = args
        .get_err(0, "color1")?
        .assert_color_with_name("color1", span)?;
    let color2 = args
        .get_err(1, "color2")?
        .assert_color_with_name("color2", span)?;

    let weight = match args.get(2, "weight") {
        Some(weight) => {
            let weight = weight.node.assert_number_with_name("weight", span)?;
            weight.assert_bounds("weight", 0.0, 100.0, span)?;
            weight.num
        }
        None => Number(50.0),
    };

    Ok(Value::Color(Arc::new(color1.mix(&color2, weight))))
}

pub(crate) fn opacify(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let color = args
        .get_err(0, "color")?
        .assert_color_with_name("color", span)?;
    let amount = args
        .get_err(1, "amount")?
        .assert_number_with_name("amount", span)?;
    amount.assert_bounds("amount", 0.0, 1.0, span)?;

    Ok(Value::Color(Arc::new(
        color.with_alpha(color.alpha() + amount.num),
    )))
}

pub(crate) fn transparentize(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let color = args
        .get_err(0, "color")?
        .assert_color_with_name("color", span)?;
    let amount = args
        .get_err(1, "amount")?
        .assert_number_with_name("amount", span)?;
    amount.assert_bounds("amount", 0.0, 1.0, span)?;

    Ok(Value::Color(Arc::new(
        color.with_alpha(color.alpha() - amount.num),
    )))
}

pub(crate) fn adjust_hue(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let color = args
        .get_err(0, "color")?
        .assert_color_with_name("color", span)?;
    let degrees = args
        .get_err(1, "degrees")?
        .assert_number_with_name("degrees", span)?
        .num;

    Ok(Value::Color(Arc::new(color.with_hsl(
        Some(color.hue() + degrees),
        None,
        None,
    ))))
}

pub(crate) fn complement(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();
    let color = args
        .get_err(0, "color")?
        .assert_color_with_name("color", span)?;

    Ok(Value::Color(Arc::new(color.with_hsl(
        Some(color.hue() + Number(180.0)),
        None,
        None,
    ))))
}

pub(crate) fn declare(f: &mut GlobalFunctionMap) {
    f.insert("rgb", Builtin::new(rgb));
    f.insert("rgba", Builtin::new(rgba));
    f.insert("hsl", Builtin::new(hsl));
    f.insert("hsla", Builtin::new(hsla));
    f.insert("red", Builtin::new(red));
    f.insert("green", Builtin::new(green));
    f.insert("blue", Builtin::new(blue));
    f.insert("hue", Builtin::new(hue));
    f.insert("saturation", Builtin::new(saturation));
    f.insert("lightness", Builtin::new(lightness));
    f.insert("alpha", Builtin::new(alpha));
    f.insert("opacity", Builtin::new(opacity));
    f.insert("lighten", Builtin::new(lighten));
    f.insert("darken", Builtin::new(darken));
    f.insert("saturate", Builtin::new(saturate));
    f.insert("desaturate", Builtin::new(desaturate));
    f.insert("grayscale", Builtin::new(grayscale));
    f.insert("invert", Builtin::new(invert));
    f.insert("mix", Builtin::new(mix));
    f.insert("opacify", Builtin::new(opacify));
    f.insert("fade-in", Builtin::new(opacify));
    f.insert("transparentize", Builtin::new(transparentize));
    f.insert("fade-out", Builtin::new(transparentize));
    f.insert("adjust-hue", Builtin::new(adjust_hue));
    f.insert("complement", Builtin::new(complement));
}
