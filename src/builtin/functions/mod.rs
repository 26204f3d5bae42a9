use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::Builtin;

pub(crate) mod color;
pub(crate) mod list;
pub(crate) mod map;
pub(crate) mod math;
pub(crate) mod meta;
pub(crate) mod selector;
pub(crate) mod string;

pub(crate) type GlobalFunctionMap = HashMap<&'static str, Builtin>;

/// The classic global function namespace: every function reachable without
/// `@use "sass:..."`.
pub(crate) static GLOBAL_FUNCTIONS: Lazy<GlobalFunctionMap> = Lazy::new(|| {
    let mut m = HashMap::new();
    color::declare(&mut m);
    list::declare(&mut m);
    map::declare(&mut m);
    math::declare(&mut m);
    meta::declare(&mut m);
    selector::declare(&mut m);
    string::declare(&mut m);
    m
});
