use std::{
    fmt,
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, Sub, SubAssign},
};

use codemap::Span;

use crate::{
    error::CompileResult,
    unit::{Unit, UNIT_CONVERSION_TABLE},
};

const PRECISION: i32 = 10;

fn epsilon() -> f64 {
    10.0_f64.powi(-PRECISION - 1)
}

fn inverse_epsilon() -> f64 {
    10.0_f64.powi(PRECISION + 1)
}

pub(crate) fn fuzzy_equals(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }

    (a - b).abs() <= epsilon() && (a * inverse_epsilon()).round() == (b * inverse_epsilon()).round()
}

pub(crate) fn fuzzy_as_int(num: f64) -> Option<i64> {
    if !num.is_finite() {
        return None;
    }

    let rounded = num.round();

    if fuzzy_equals(num, rounded) {
        Some(rounded as i64)
    } else {
        None
    }
}

/// Thin wrapper around `f64` providing fuzzy comparison and a
/// Sass-compatible modulo.
#[derive(Clone, Copy, PartialOrd)]
#[repr(transparent)]
pub struct Number(pub f64);

impl Number {
    pub fn is_nan(self) -> bool {
        self.0.is_nan()
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    pub fn is_positive(self) -> bool {
        self.0.is_sign_positive() && !self.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.is_zero()
    }

    pub fn is_decimal(self) -> bool {
        self.0.fract() != 0.0
    }

    pub fn assert_int(self, span: Span) -> CompileResult<i64> {
        fuzzy_as_int(self.0).ok_or_else(|| (format!("{} is not an int.", self.0), span).into())
    }

    pub fn to_integer(self) -> i64 {
        self.0 as i64
    }

    /// `std::cmp::min` mishandles NaN; this matches dart semantics.
    pub fn min(self, other: Self) -> Self {
        if self < other {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self > other {
            self
        } else {
            other
        }
    }

    /// Converts `self` from `from` units into `to` units.
    ///
    /// The caller must have checked `from.comparable(to)`.
    pub fn convert(self, from: &Unit, to: &Unit) -> Self {
        if from == &Unit::None || to == &Unit::None || from == to {
            return self;
        }

        debug_assert!(from.comparable(to), "from: {:?}, to: {:?}", from, to);

        Number(self.0 * UNIT_CONVERSION_TABLE[to][from])
    }
}

/// Forwarded `f64` operations that stay in `Number`.
macro_rules! forward_f64 {
    ($($name:ident)*) => {
        impl Number {
            $(
                pub fn $name(self) -> Self {
                    Self(self.0.$name())
                }
            )*
        }
    };
}

forward_f64!(round ceil floor abs sqrt);

macro_rules! arith {
    ($($imp:ident / $method:ident / $assign_imp:ident / $assign_method:ident: $op:tt)*) => {
        $(
            impl $imp for Number {
                type Output = Self;

                fn $method(self, rhs: Self) -> Self {
                    Number(self.0 $op rhs.0)
                }
            }

            impl $assign_imp for Number {
                fn $assign_method(&mut self, rhs: Self) {
                    self.0 = self.0 $op rhs.0;
                }
            }
        )*
    };
}

arith! {
    Add / add / AddAssign / add_assign: +
    Sub / sub / SubAssign / sub_assign: -
    Mul / mul / MulAssign / mul_assign: *
    Div / div / DivAssign / div_assign: /
}

impl Rem for Number {
    type Output = Self;

    /// Sass's `%` follows the sign of the right-hand operand, unlike Rust's.
    fn rem(self, other: Self) -> Self {
        let result = self.0 % other.0;

        if result != 0.0 && (result < 0.0) != (other.0 < 0.0) {
            Number(result + other.0)
        } else {
            Number(result)
        }
    }
}

impl Neg for Number {
    type Output = Self;

    fn neg(self) -> Self {
        Number(-self.0)
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        fuzzy_equals(self.0, other.0)
    }
}

impl Eq for Number {}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number(n as f64)
    }
}

impl From<f64> for Number {
    fn from(n: f64) -> Self {
        Number(n)
    }
}

impl fmt::Debug for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Number({})", self.0)
    }
}
