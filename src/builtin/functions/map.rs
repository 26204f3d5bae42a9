use crate::builtin::builtin_imports::*;

use super::{Builtin, GlobalFunctionMap};

pub(crate) fn map_get(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let map = args
        .get_err(0, "map")?
        .assert_map_with_name("map", span)?;
    let key = Spanned {
        node: args.get_err(1, "key")?,
        span,
    };

    // Missing keys are not an error; `null` is the "not found" value.
    Ok(map.get(&key).unwrap_or(Value::Null))
}

pub(crate) fn map_has_key(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let map = args
        .get_err(0, "map")?
        .assert_map_with_name("map", span)?;
    let key = Spanned {
        node: args.get_err(1, "key")?,
        span,
    };

    Ok(Value::bool(map.key_exists(&key)))
}

pub(crate) fn map_keys(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();
    let map = args
        .get_err(0, "map")?
        .assert_map_with_name("map", span)?;

    Ok(Value::List(
        map.keys(),
        ListSeparator::Comma,
        Brackets::None,
    ))
}

pub(crate) fn map_values(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(1)?;
    let span = args.span();
    let map = args
        .get_err(0, "map")?
        .assert_map_with_name("map", span)?;

    Ok(Value::List(
        map.values(),
        ListSeparator::Comma,
        Brackets::None,
    ))
}

pub(crate) fn map_merge(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let mut map1 = args
        .get_err(0, "map1")?
        .assert_map_with_name("map1", span)?;
    let map2 = args
        .get_err(1, "map2")?
        .assert_map_with_name("map2", span)?;

    map1.merge(map2);

    Ok(Value::Map(map1))
}

pub(crate) fn map_remove(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    let span = args.span();
    let mut map = args
        .get_err(0, "map")?
        .assert_map_with_name("map", span)?;

    let keys = args.get_variadic()?;

    for key in keys {
        map.remove(&key);
    }

    Ok(Value::Map(map))
}

/// `map.deep-merge`: merges recursively where both values are maps; any
/// other collision lets the second map's value win.
pub(crate) fn map_deep_merge(mut args: ArgumentResult, _: &mut Evaluator) -> CompileResult<Value> {
    args.max_args(2)?;
    let span = args.span();
    let map1 = args
        .get_err(0, "map1")?
        .assert_map_with_name("map1", span)?;
    let map2 = args
        .get_err(1, "map2")?
        .assert_map_with_name("map2", span)?;

    Ok(Value::Map(deep_merge_impl(map1, map2)))
}

fn deep_merge_impl(mut map1: ValueMap, map2: ValueMap) -> ValueMap {
    for (key, value) in map2 {
        let merged = match (map1.get(&key.0), value) {
            (Some(Value::Map(inner1)), Value::Map(inner2)) => {
                Value::Map(deep_merge_impl(inner1, inner2))
            }
            (_, value) => value,
        };

        map1.insert(key.0, merged);
    }

    map1
}

pub(crate) fn declare(f: &mut GlobalFunctionMap) {
    f.insert("map-get", Builtin::new(map_get));
    f.insert("map-has-key", Builtin::new(map_has_key));
    f.insert("map-keys", Builtin::new(map_keys));
    f.insert("map-values", Builtin::new(map_values));
    f.insert("map-merge", Builtin::new(map_merge));
    f.insert("map-remove", Builtin::new(map_remove));
}
