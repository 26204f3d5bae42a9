use std::{
    ops::{Add, Div, Mul, Sub},
    sync::Arc,
};

use codemap::Span;

use crate::{
    error::{CompileResult, ErrorKind},
    serializer::inspect_dimension,
    unit::{are_any_convertible, Unit, UNIT_CONVERSION_TABLE},
    Options,
};

use super::{fuzzy_as_int, Number};

/// A number together with its unit, plus the slash-separated original pair
/// when the value was written as `a/b` and never touched by arithmetic.
#[derive(Debug, Clone)]
pub struct Dimension {
    pub num: Number,
    pub unit: Unit,
    pub as_slash: Option<Arc<(Dimension, Dimension)>>,
}

pub(crate) fn conversion_factor(from: &Unit, to: &Unit) -> Option<f64> {
    if from == to {
        return Some(1.0);
    }

    UNIT_CONVERSION_TABLE.get(to)?.get(from).copied()
}

impl Dimension {
    pub fn new(num: Number, unit: Unit) -> Self {
        Self {
            num,
            unit,
            as_slash: None,
        }
    }

    pub fn new_unitless<N: Into<Number>>(n: N) -> Self {
        Self {
            num: n.into(),
            unit: Unit::None,
            as_slash: None,
        }
    }

    pub fn has_comparable_units(&self, other_unit: &Unit) -> bool {
        self.unit.comparable(other_unit)
    }

    pub fn is_comparable_to(&self, other: &Self) -> bool {
        self.unit.comparable(&other.unit)
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Multiplies out the numerator/denominator multisets of both operands,
    /// cancelling convertible pairs.
    pub fn multiply_units(&self, mut num: f64, other_unit: Unit) -> Dimension {
        let (numer_units, denom_units) = self.unit.clone().numer_and_denom();
        let (other_numer, other_denom) = other_unit.numer_and_denom();

        if numer_units.is_empty() {
            if other_denom.is_empty() && !are_any_convertible(&denom_units, &other_numer) {
                return Dimension::new(Number(num), Unit::new(other_numer, denom_units));
            } else if denom_units.is_empty() {
                return Dimension::new(Number(num), Unit::new(other_numer, other_denom));
            }
        } else if other_numer.is_empty()
            && (other_denom.is_empty()
                || (denom_units.is_empty() && !are_any_convertible(&numer_units, &other_denom)))
        {
            return Dimension::new(Number(num), Unit::new(numer_units, other_denom));
        }

        let mut new_numer = Vec::new();

        let mut mutable_other_denom = other_denom;

        for numer in numer_units {
            let mut has_removed = false;
            mutable_other_denom.retain(|denom| {
                if has_removed {
                    return true;
                }

                if let Some(factor) = conversion_factor(denom, &numer) {
                    num /= factor;
                    has_removed = true;
                    return false;
                }

                true
            });

            if !has_removed {
                new_numer.push(numer);
            }
        }

        let mut mutable_denom = denom_units;
        for numer in other_numer {
            let mut has_removed = false;
            mutable_denom.retain(|denom| {
                if has_removed {
                    return true;
                }

                if let Some(factor) = conversion_factor(denom, &numer) {
                    num /= factor;
                    has_removed = true;
                    return false;
                }

                true
            });

            if !has_removed {
                new_numer.push(numer);
            }
        }

        mutable_denom.append(&mut mutable_other_denom);

        Dimension::new(Number(num), Unit::new(new_numer, mutable_denom))
    }

    pub fn assert_no_units(&self, name: &str, span: Span) -> CompileResult<()> {
        if self.unit == Unit::None {
            Ok(())
        } else {
            Err((
                ErrorKind::InvalidArgumentType,
                format!(
                    "${name}: Expected {} to have no units.",
                    inspect_dimension(self, &Options::default(), span)?,
                    name = name,
                ),
                span,
            )
                .into())
        }
    }

    pub fn assert_unit(&self, unit: &Unit, name: &str, span: Span) -> CompileResult<()> {
        if self.unit == *unit {
            Ok(())
        } else {
            Err((
                ErrorKind::InvalidArgumentType,
                format!(
                    "${name}: Expected {} to have unit \"{unit}\".",
                    inspect_dimension(self, &Options::default(), span)?,
                    name = name,
                    unit = unit,
                ),
                span,
            )
                .into())
        }
    }

    pub fn assert_int_with_name(&self, name: &str, span: Span) -> CompileResult<i64> {
        match fuzzy_as_int(self.num.0) {
            Some(i) => Ok(i),
            None => Err((
                ErrorKind::InvalidArgumentType,
                format!(
                    "${name}: {} is not an int.",
                    inspect_dimension(self, &Options::default(), span)?,
                    name = name,
                ),
                span,
            )
                .into()),
        }
    }

    pub fn assert_bounds(&self, name: &str, min: f64, max: f64, span: Span) -> CompileResult<()> {
        if !(self.num.0 >= min && self.num.0 <= max) {
            return Err((
                ErrorKind::InvalidArgumentType,
                format!(
                    "${}: Expected {} to be within {}{} and {}{}.",
                    name,
                    inspect_dimension(self, &Options::default(), span)?,
                    min,
                    self.unit,
                    max,
                    self.unit,
                ),
                span,
            )
                .into());
        }

        Ok(())
    }
}

impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        if !self.unit.comparable(&other.unit) {
            return false;
        }

        if (other.unit == Unit::None || self.unit == Unit::None) && self.unit != other.unit {
            return false;
        }

        self.num == other.num.convert(&other.unit, &self.unit)
    }
}

impl Eq for Dimension {}

impl Add<Dimension> for Dimension {
    type Output = Dimension;

    fn add(self, rhs: Dimension) -> Self::Output {
        if self.unit == rhs.unit {
            Dimension::new(self.num + rhs.num, self.unit)
        } else if self.unit == Unit::None {
            Dimension::new(self.num + rhs.num, rhs.unit)
        } else if rhs.unit == Unit::None {
            Dimension::new(self.num + rhs.num, self.unit)
        } else {
            Dimension::new(self.num + rhs.num.convert(&rhs.unit, &self.unit), self.unit)
        }
    }
}

impl Sub<Dimension> for Dimension {
    type Output = Dimension;

    fn sub(self, rhs: Dimension) -> Self::Output {
        if self.unit == rhs.unit {
            Dimension::new(self.num - rhs.num, self.unit)
        } else if self.unit == Unit::None {
            Dimension::new(self.num - rhs.num, rhs.unit)
        } else if rhs.unit == Unit::None {
            Dimension::new(self.num - rhs.num, self.unit)
        } else {
            Dimension::new(self.num - rhs.num.convert(&rhs.unit, &self.unit), self.unit)
        }
    }
}

impl Mul<Dimension> for Dimension {
    type Output = Dimension;

    fn mul(self, rhs: Dimension) -> Self::Output {
        if rhs.unit == Unit::None {
            return Dimension::new(self.num * rhs.num, self.unit);
        }

        self.multiply_units(self.num.0 * rhs.num.0, rhs.unit)
    }
}

impl Div<Dimension> for Dimension {
    type Output = Dimension;

    fn div(self, rhs: Dimension) -> Self::Output {
        if rhs.unit == Unit::None {
            return Dimension::new(self.num / rhs.num, self.unit);
        }

        self.multiply_units(self.num.0 / rhs.num.0, rhs.unit.invert())
    }
}
