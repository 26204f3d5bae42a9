use crate::{
    evaluate::Module,
    unit::Unit,
    value::{Dimension, Number, Value},
};

use super::functions::{color, list, map, math, meta, selector, string};

/// The built-in `sass:` modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinModule {
    Color,
    List,
    Map,
    Math,
    Meta,
    Selector,
    String,
}

pub(crate) fn is_builtin_module_url(url: &str) -> Option<BuiltinModule> {
    Some(match url {
        "sass:color" => BuiltinModule::Color,
        "sass:list" => BuiltinModule::List,
        "sass:map" => BuiltinModule::Map,
        "sass:math" => BuiltinModule::Math,
        "sass:meta" => BuiltinModule::Meta,
        "sass:selector" => BuiltinModule::Selector,
        "sass:string" => BuiltinModule::String,
        _ => return None,
    })
}

pub(crate) fn declare_builtin_module(which: BuiltinModule) -> Module {
    let mut module = Module::new_builtin();

    match which {
        BuiltinModule::Color => {
            module.insert_builtin("red", color::red);
            module.insert_builtin("green", color::green);
            module.insert_builtin("blue", color::blue);
            module.insert_builtin("hue", color::hue);
            module.insert_builtin("saturation", color::saturation);
            module.insert_builtin("lightness", color::lightness);
            module.insert_builtin("alpha", color::alpha);
            module.insert_builtin("mix", color::mix);
            module.insert_builtin("invert", color::invert);
            module.insert_builtin("grayscale", color::grayscale);
            module.insert_builtin("complement", color::complement);
        }
        BuiltinModule::List => {
            module.insert_builtin("length", list::length);
            module.insert_builtin("nth", list::nth);
            module.insert_builtin("set-nth", list::set_nth);
            module.insert_builtin("join", list::join);
            module.insert_builtin("append", list::append);
            module.insert_builtin("zip", list::zip);
            module.insert_builtin("index", list::index);
            module.insert_builtin("separator", list::list_separator);
            module.insert_builtin("is-bracketed", list::is_bracketed);
        }
        BuiltinModule::Map => {
            module.insert_builtin("get", map::map_get);
            module.insert_builtin("has-key", map::map_has_key);
            module.insert_builtin("keys", map::map_keys);
            module.insert_builtin("values", map::map_values);
            module.insert_builtin("merge", map::map_merge);
            module.insert_builtin("remove", map::map_remove);
            module.insert_builtin("deep-merge", map::map_deep_merge);
        }
        BuiltinModule::Math => {
            module.insert_builtin("percentage", math::percentage);
            module.insert_builtin("round", math::round);
            module.insert_builtin("ceil", math::ceil);
            module.insert_builtin("floor", math::floor);
            module.insert_builtin("abs", math::abs);
            module.insert_builtin("min", math::min);
            module.insert_builtin("max", math::max);
            module.insert_builtin("compatible", math::comparable);
            module.insert_builtin("is-unitless", math::unitless);
            module.insert_builtin("unit", math::unit);
            module.insert_builtin("div", math::div);
            module.insert_builtin_var(
                "pi",
                Value::Dimension(Dimension::new(
                    Number(std::f64::consts::PI),
                    Unit::None,
                )),
            );
            module.insert_builtin_var(
                "e",
                Value::Dimension(Dimension::new(Number(std::f64::consts::E), Unit::None)),
            );
            module.insert_builtin_var(
                "epsilon",
                Value::Dimension(Dimension::new(Number(f64::EPSILON), Unit::None)),
            );
        }
        BuiltinModule::Meta => {
            module.insert_builtin("inspect", meta::inspect);
            module.insert_builtin("type-of", meta::type_of);
            module.insert_builtin("variable-exists", meta::variable_exists);
            module.insert_builtin("global-variable-exists", meta::global_variable_exists);
            module.insert_builtin("function-exists", meta::function_exists);
            module.insert_builtin("mixin-exists", meta::mixin_exists);
            module.insert_builtin("content-exists", meta::content_exists);
            module.insert_builtin("feature-exists", meta::feature_exists);
            module.insert_builtin("get-function", meta::get_function);
            module.insert_builtin("get-mixin", meta::get_mixin);
            module.insert_builtin("call", meta::call);
            module.insert_builtin("keywords", meta::keywords);
        }
        BuiltinModule::Selector => {
            module.insert_builtin("parse", selector::selector_parse);
            module.insert_builtin("nest", selector::selector_nest);
            module.insert_builtin("append", selector::selector_append);
            module.insert_builtin("unify", selector::selector_unify);
            module.insert_builtin("is-superselector", selector::is_superselector);
            module.insert_builtin("simple-selectors", selector::simple_selectors);
            module.insert_builtin("extend", selector::selector_extend);
            module.insert_builtin("replace", selector::selector_replace);
        }
        BuiltinModule::String => {
            module.insert_builtin("unquote", string::unquote);
            module.insert_builtin("quote", string::quote);
            module.insert_builtin("length", string::str_length);
            module.insert_builtin("index", string::str_index);
            module.insert_builtin("insert", string::str_insert);
            module.insert_builtin("slice", string::str_slice);
            module.insert_builtin("to-upper-case", string::to_upper_case);
            module.insert_builtin("to-lower-case", string::to_lower_case);
        }
    }

    module
}
