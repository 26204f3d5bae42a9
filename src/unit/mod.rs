use std::{fmt, sync::Arc};

use crate::interner::InternedString;

pub(crate) use conversion::UNIT_CONVERSION_TABLE;

mod conversion;

/// Numerator and denominator unit lists of a compound unit.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComplexUnit {
    pub numer: Vec<Unit>,
    pub denom: Vec<Unit>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum UnitKind {
    Absolute,
    FontRelative,
    ViewportRelative,
    Angle,
    Time,
    Frequency,
    Resolution,
    Other,
    None,
}

/// One row per recognized unit: the variant, its lowercase spelling for
/// parsing, its canonical CSS spelling, and its conversion group.
macro_rules! known_units {
    ($($variant:ident => $parse:literal, $display:literal, $kind:ident;)*) => {
        /// A CSS unit, or a product/quotient of units produced by arithmetic.
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub enum Unit {
            $($variant,)*

            /// A unit the compiler doesn't recognize. Passed through
            /// untouched.
            Unknown(InternedString),

            /// No unit.
            None,

            /// A compound unit such as `px*px` or `px/s`, produced by
            /// multiplication and division. Not a valid CSS value; only
            /// `inspect()` can print it.
            Complex(Arc<ComplexUnit>),
        }

        impl Unit {
            fn from_name(name: &str) -> Option<Unit> {
                match name {
                    $($parse => Some(Unit::$variant),)*
                    _ => None,
                }
            }

            fn as_known_str(&self) -> Option<&'static str> {
                match self {
                    $(Unit::$variant => Some($display),)*
                    _ => None,
                }
            }

            fn kind(&self) -> UnitKind {
                match self {
                    $(Unit::$variant => UnitKind::$kind,)*
                    Unit::None => UnitKind::None,
                    Unit::Unknown(..) | Unit::Complex(..) => UnitKind::Other,
                }
            }
        }
    };
}

known_units! {
    Px => "px", "px", Absolute;
    Mm => "mm", "mm", Absolute;
    In => "in", "in", Absolute;
    Cm => "cm", "cm", Absolute;
    Q => "q", "q", Absolute;
    Pt => "pt", "pt", Absolute;
    Pc => "pc", "pc", Absolute;
    Em => "em", "em", FontRelative;
    Rem => "rem", "rem", FontRelative;
    Ex => "ex", "ex", FontRelative;
    Ch => "ch", "ch", FontRelative;
    Vw => "vw", "vw", ViewportRelative;
    Vh => "vh", "vh", ViewportRelative;
    Vmin => "vmin", "vmin", ViewportRelative;
    Vmax => "vmax", "vmax", ViewportRelative;
    Deg => "deg", "deg", Angle;
    Grad => "grad", "grad", Angle;
    Rad => "rad", "rad", Angle;
    Turn => "turn", "turn", Angle;
    S => "s", "s", Time;
    Ms => "ms", "ms", Time;
    Hz => "hz", "Hz", Frequency;
    Khz => "khz", "kHz", Frequency;
    Dpi => "dpi", "dpi", Resolution;
    Dpcm => "dpcm", "dpcm", Resolution;
    Dppx => "dppx", "dppx", Resolution;
    Fr => "fr", "fr", Other;
    Percent => "%", "%", Other;
}

pub(crate) fn are_any_convertible(units1: &[Unit], units2: &[Unit]) -> bool {
    units1
        .iter()
        .any(|unit1| units2.iter().any(|unit2| unit1.comparable(unit2)))
}

impl Unit {
    /// Simplifies a numerator/denominator pair into the canonical `Unit`
    /// representation.
    pub fn new(mut numer: Vec<Self>, denom: Vec<Self>) -> Self {
        if denom.is_empty() && numer.is_empty() {
            Unit::None
        } else if denom.is_empty() && numer.len() == 1 {
            numer.pop().unwrap()
        } else {
            Unit::Complex(Arc::new(ComplexUnit { numer, denom }))
        }
    }

    pub fn numer_and_denom(self) -> (Vec<Unit>, Vec<Unit>) {
        match self {
            Self::Complex(complex) => (complex.numer.clone(), complex.denom.clone()),
            Self::None => (Vec::new(), Vec::new()),
            v => (vec![v], Vec::new()),
        }
    }

    pub fn invert(self) -> Self {
        let (numer, denom) = self.numer_and_denom();

        Self::new(denom, numer)
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Unit::Complex(c) if c.numer.len() != 1 || !c.denom.is_empty())
    }

    /// Whether numbers carrying these two units may be compared, added, or
    /// subtracted. `Unit::None` is comparable with everything.
    pub fn comparable(&self, other: &Unit) -> bool {
        if other == &Unit::None {
            return true;
        }
        match self.kind() {
            UnitKind::FontRelative | UnitKind::ViewportRelative | UnitKind::Other => self == other,
            UnitKind::None => true,
            kind => other.kind() == kind,
        }
    }
}

impl From<String> for Unit {
    fn from(unit: String) -> Self {
        match Unit::from_name(&unit.to_ascii_lowercase()) {
            Some(unit) => unit,
            None => Unit::Unknown(InternedString::get_or_intern(unit)),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(text) = self.as_known_str() {
            return f.write_str(text);
        }

        match self {
            Unit::Unknown(s) => write!(f, "{}", s),
            Unit::None => Ok(()),
            Unit::Complex(complex) => {
                let product = |units: &[Unit]| {
                    units
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<String>>()
                        .join("*")
                };

                let numer = product(&complex.numer);
                let denom = product(&complex.denom);

                if complex.denom.is_empty() {
                    write!(f, "{}", numer)
                } else if complex.numer.is_empty() && complex.denom.len() == 1 {
                    write!(f, "{}^-1", denom)
                } else if complex.numer.is_empty() {
                    write!(f, "({})^-1", denom)
                } else {
                    write!(f, "{}/{}", numer, denom)
                }
            }
            _ => unreachable!(),
        }
    }
}
