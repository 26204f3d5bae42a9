use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
    mem,
    sync::Arc,
};

use codemap::{Span, Spanned};

use crate::{
    color::Color,
    common::{BinaryOp, Brackets, ListSeparator, QuoteKind},
    error::{CompileResult, ErrorKind},
    evaluate::Evaluator,
    selector::Selector,
    serializer::{inspect_value, serialize_value},
    unit::Unit,
    utils::is_special_function,
    Options, OutputStyle,
};

pub(crate) use arglist::{ArgList, KeywordArgs};
pub(crate) use dimension::{conversion_factor, Dimension};
pub(crate) use function::{BuiltinMixin, Function, Mixin, MixinRef, UserDefinedFunction};
pub(crate) use map::ValueMap;
pub(crate) use number::{fuzzy_as_int, fuzzy_equals, Number};

mod arglist;
mod dimension;
mod function;
mod map;
mod number;

/// A Sass runtime value.
///
/// Values are immutable; operations that appear to modify a value build a
/// new one.
#[derive(Debug, Clone)]
pub enum Value {
    True,
    False,
    Null,
    Dimension(Dimension),
    List(Vec<Value>, ListSeparator, Brackets),
    Color(Arc<Color>),
    String(String, QuoteKind),
    Map(ValueMap),
    ArgList(ArgList),
    /// Returned by `get-function()`
    FunctionRef(Box<Function>),
    /// Returned by `meta.get-mixin()`
    MixinRef(Box<MixinRef>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(s1, ..), Value::String(s2, ..)) => s1 == s2,
            (Value::Dimension(n1), Value::Dimension(n2)) => n1 == n2,
            (Value::List(list1, sep1, brackets1), Value::List(list2, sep2, brackets2)) => {
                sep1 == sep2 && brackets1 == brackets2 && list1 == list2
            }
            (Value::Null, Value::Null) => true,
            (Value::True, Value::True) => true,
            (Value::False, Value::False) => true,
            (Value::FunctionRef(fn1), Value::FunctionRef(fn2)) => fn1 == fn2,
            (Value::MixinRef(m1), Value::MixinRef(m2)) => m1 == m2,
            (Value::Map(map1), Value::Map(map2)) => map1 == map2,
            (Value::Color(color1), Value::Color(color2)) => color1 == color2,
            (Value::ArgList(list1), Value::ArgList(list2)) => list1 == list2,
            (Value::ArgList(list1), Value::List(list2, ListSeparator::Comma, ..)) => {
                list1.elems == *list2
            }
            (Value::List(list1, ListSeparator::Comma, ..), Value::ArgList(list2)) => {
                *list1 == list2.elems
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            Value::True | Value::False | Value::Null => {}
            Value::Dimension(dimension) => {
                dimension.num.0.to_bits().hash(state);
                dimension.unit.hash(state);
            }
            Value::List(elems, sep, brackets) => {
                elems.hash(state);
                sep.hash(state);
                brackets.hash(state);
            }
            Value::Color(color) => {
                color.red().0.to_bits().hash(state);
                color.green().0.to_bits().hash(state);
                color.blue().0.to_bits().hash(state);
                color.alpha().0.to_bits().hash(state);
            }
            Value::String(s, quotes) => {
                s.hash(state);
                quotes.hash(state);
            }
            Value::Map(map) => {
                for (key, value) in map.iter() {
                    key.node.hash(state);
                    value.hash(state);
                }
            }
            Value::ArgList(arglist) => arglist.elems.hash(state),
            Value::FunctionRef(func) => func.name().hash(state),
            Value::MixinRef(mixin) => mixin.name.hash(state),
        }
    }
}

impl Value {
    pub fn bool(b: bool) -> Self {
        if b {
            Value::True
        } else {
            Value::False
        }
    }

    /// Convenience constructor for loop counters and similar evaluator-made
    /// numbers.
    pub fn dimension(value: i64, unit: Unit) -> Self {
        Value::Dimension(Dimension::new(Number::from(value), unit))
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::False)
    }

    /// Whether this value would produce no output in a declaration.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(i, QuoteKind::None) if i.is_empty() => true,
            Value::List(_, _, Brackets::Bracketed) => false,
            Value::List(v, ..) => v.iter().all(Value::is_blank),
            Value::ArgList(v) => v.is_blank(),
            _ => false,
        }
    }

    pub fn is_empty_list(&self) -> bool {
        match self {
            Value::List(v, ..) => v.is_empty(),
            Value::Map(m) => m.is_empty(),
            Value::ArgList(v) => v.elems.is_empty(),
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Color(..) => "color",
            Value::String(..) => "string",
            Value::Dimension(..) => "number",
            Value::List(..) => "list",
            Value::FunctionRef(..) => "function",
            Value::MixinRef(..) => "mixin",
            Value::ArgList(..) => "arglist",
            Value::True | Value::False => "bool",
            Value::Null => "null",
            Value::Map(..) => "map",
        }
    }

    pub fn unquote(self) -> Self {
        match self {
            Value::String(s, _) => Value::String(s, QuoteKind::None),
            Value::List(v, sep, bracket) => {
                Value::List(v.into_iter().map(Value::unquote).collect(), sep, bracket)
            }
            v => v,
        }
    }

    pub const fn span(self, span: Span) -> Spanned<Self> {
        Spanned { node: self, span }
    }

    pub fn to_css_string(&self, span: Span, is_compressed: bool) -> CompileResult<String> {
        serialize_value(
            self,
            &Options::default().style(if is_compressed {
                OutputStyle::Compressed
            } else {
                OutputStyle::Expanded
            }),
            span,
        )
    }

    /// Serializes as `inspect()` would: a form that parses back to the same
    /// value, including nulls, empty lists, and maps.
    pub fn inspect(&self, span: Span) -> CompileResult<String> {
        inspect_value(self, &Options::default(), span)
    }

    pub fn as_slash(&self) -> Option<Arc<(Dimension, Dimension)>> {
        match self {
            Value::Dimension(Dimension { as_slash, .. }) => as_slash.clone(),
            _ => None,
        }
    }

    pub fn without_slash(self) -> Self {
        match self {
            Value::Dimension(dimension) => Value::Dimension(Dimension {
                as_slash: None,
                ..dimension
            }),
            _ => self,
        }
    }

    pub fn with_slash(
        self,
        numerator: Dimension,
        denom: Dimension,
        span: Span,
    ) -> CompileResult<Self> {
        let mut dimension = self.assert_number(span)?;
        dimension.as_slash = Some(Arc::new((numerator, denom)));
        Ok(Value::Dimension(dimension))
    }

    pub fn is_special_function(&self) -> bool {
        match self {
            Value::String(s, QuoteKind::None) => is_special_function(s),
            _ => false,
        }
    }

    pub fn assert_number(self, span: Span) -> CompileResult<Dimension> {
        match self {
            Value::Dimension(n) => Ok(n),
            _ => Err((
                ErrorKind::InvalidArgumentType,
                format!("{} is not a number.", self.inspect(span)?),
                span,
            )
                .into()),
        }
    }

    pub fn assert_number_with_name(self, name: &str, span: Span) -> CompileResult<Dimension> {
        match self {
            Value::Dimension(n) => Ok(n),
            _ => Err((
                ErrorKind::InvalidArgumentType,
                format!(
                    "${name}: {} is not a number.",
                    self.inspect(span)?,
                    name = name,
                ),
                span,
            )
                .into()),
        }
    }

    pub fn assert_color_with_name(self, name: &str, span: Span) -> CompileResult<Arc<Color>> {
        match self {
            Value::Color(c) => Ok(c),
            _ => Err((
                ErrorKind::InvalidArgumentType,
                format!(
                    "${name}: {} is not a color.",
                    self.inspect(span)?,
                    name = name,
                ),
                span,
            )
                .into()),
        }
    }

    pub fn assert_string_with_name(
        self,
        name: &str,
        span: Span,
    ) -> CompileResult<(String, QuoteKind)> {
        match self {
            Value::String(s, quotes) => Ok((s, quotes)),
            _ => Err((
                ErrorKind::InvalidArgumentType,
                format!(
                    "${name}: {} is not a string.",
                    self.inspect(span)?,
                    name = name,
                ),
                span,
            )
                .into()),
        }
    }

    pub fn assert_map_with_name(self, name: &str, span: Span) -> CompileResult<ValueMap> {
        match self {
            Value::Map(m) => Ok(m),
            Value::List(v, ..) if v.is_empty() => Ok(ValueMap::new()),
            Value::ArgList(v) if v.is_empty() => Ok(ValueMap::new()),
            _ => Err((
                ErrorKind::InvalidArgumentType,
                format!("${name}: {} is not a map.", self.inspect(span)?, name = name),
                span,
            )
                .into()),
        }
    }

    pub fn cmp(&self, other: &Self, span: Span, op: BinaryOp) -> CompileResult<Option<Ordering>> {
        match (self, other) {
            (
                Value::Dimension(Dimension { num, unit, .. }),
                Value::Dimension(Dimension {
                    num: num2,
                    unit: unit2,
                    ..
                }),
            ) => {
                if !unit.comparable(unit2) {
                    return Err((
                        ErrorKind::IncompatibleUnits,
                        format!("Incompatible units {} and {}.", unit2, unit),
                        span,
                    )
                        .into());
                }
                Ok(if unit == unit2 || unit == &Unit::None || unit2 == &Unit::None {
                    num.partial_cmp(num2)
                } else {
                    num.partial_cmp(&num2.convert(unit2, unit))
                })
            }
            _ => Err((
                ErrorKind::UndefinedOperation,
                format!(
                    "Undefined operation \"{} {} {}\".",
                    self.inspect(span)?,
                    op,
                    other.inspect(span)?
                ),
                span,
            )
                .into()),
        }
    }

    pub fn as_list(self) -> Vec<Value> {
        match self {
            Value::List(v, ..) => v,
            Value::Map(m) => m.as_list(),
            Value::ArgList(v) => v.elems,
            v => vec![v],
        }
    }

    pub fn separator(&self) -> ListSeparator {
        match self {
            Value::List(_, separator, _) => *separator,
            Value::Map(..) | Value::ArgList(..) => ListSeparator::Comma,
            _ => ListSeparator::Space,
        }
    }

    /// Parses `self` as a selector list, as `selector-parse()` does.
    ///
    /// `name` is the argument name, used for error reporting.
    pub fn to_selector(
        self,
        evaluator: &mut Evaluator,
        name: &str,
        allows_parent: bool,
        span: Span,
    ) -> CompileResult<Selector> {
        let string = match self.clone().selector_string()? {
            Some(v) => v,
            None => {
                return Err((
                    ErrorKind::InvalidArgumentType,
                    format!(
                        "${}: {} is not a valid selector: it must be a string,\n\
                         a list of strings, or a list of lists of strings.",
                        name,
                        self.inspect(span)?
                    ),
                    span,
                )
                    .into())
            }
        };
        Ok(Selector(evaluator.selector_from_text(
            &string,
            allows_parent,
            true,
            span,
        )?))
    }

    fn selector_string(self) -> CompileResult<Option<String>> {
        Ok(Some(match self {
            Value::String(text, ..) => text,
            Value::List(list, sep, ..) if !list.is_empty() => {
                let mut result = Vec::new();
                match sep {
                    ListSeparator::Comma => {
                        for complex in list {
                            if let Value::String(text, ..) = complex {
                                result.push(text);
                            } else if let Value::List(
                                _,
                                ListSeparator::Space | ListSeparator::Undecided,
                                ..,
                            ) = complex
                            {
                                result.push(match complex.selector_string()? {
                                    Some(v) => v,
                                    None => return Ok(None),
                                });
                            } else {
                                return Ok(None);
                            }
                        }
                    }
                    ListSeparator::Slash => return Ok(None),
                    ListSeparator::Space | ListSeparator::Undecided => {
                        for compound in list {
                            if let Value::String(text, ..) = compound {
                                result.push(text);
                            } else {
                                return Ok(None);
                            }
                        }
                    }
                }

                result.join(sep.as_str())
            }
            _ => return Ok(None),
        }))
    }

    pub fn unary_plus(self, options: &Options, span: Span) -> CompileResult<Self> {
        Ok(match self {
            Self::Dimension(..) => self,
            _ => Self::String(
                format!("+{}", self.to_css_string(span, options.is_compressed())?),
                QuoteKind::None,
            ),
        })
    }

    pub fn unary_neg(self, options: &Options, span: Span) -> CompileResult<Self> {
        Ok(match self {
            Self::Dimension(dimension) => Self::Dimension(Dimension {
                num: -dimension.num,
                ..dimension
            }),
            _ => Self::String(
                format!("-{}", self.to_css_string(span, options.is_compressed())?),
                QuoteKind::None,
            ),
        })
    }

    pub fn unary_div(self, options: &Options, span: Span) -> CompileResult<Self> {
        Ok(Self::String(
            format!("/{}", self.to_css_string(span, options.is_compressed())?),
            QuoteKind::None,
        ))
    }

    pub fn unary_not(self) -> Self {
        match self {
            Self::False | Self::Null => Self::True,
            _ => Self::False,
        }
    }
}
