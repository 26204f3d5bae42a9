use std::fmt;

use crate::value::{fuzzy_equals, Number};

pub(crate) use name::NAMED_COLORS;

mod name;

/// How a color literal was written in the source, preserved so output can
/// round-trip the author's notation outside the compressed style.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorFormat {
    /// The verbatim source text, e.g. `RED` or `#ff0000`.
    Literal(String),
    /// Choose the shortest representation when serializing.
    Infer,
}

/// An RGBA color.
///
/// Channels are stored as floats in `0..=255` (alpha `0..=1`) because Sass
/// color arithmetic may produce fractional channels before final rounding.
#[derive(Debug, Clone)]
pub struct Color {
    red: Number,
    green: Number,
    blue: Number,
    alpha: Number,
    pub format: ColorFormat,
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.red == other.red
            && self.green == other.green
            && self.blue == other.blue
            && self.alpha == other.alpha
    }
}

impl Eq for Color {}

fn clamp_channel(n: Number) -> Number {
    Number(n.0.clamp(0.0, 255.0))
}

fn clamp_alpha(n: Number) -> Number {
    Number(n.0.clamp(0.0, 1.0))
}

impl Color {
    pub fn new_rgba(
        red: Number,
        green: Number,
        blue: Number,
        alpha: Number,
        format: ColorFormat,
    ) -> Self {
        Color {
            red: clamp_channel(red),
            green: clamp_channel(green),
            blue: clamp_channel(blue),
            alpha: clamp_alpha(alpha),
            format,
        }
    }

    pub fn from_rgba(red: Number, green: Number, blue: Number, alpha: Number) -> Self {
        Self::new_rgba(red, green, blue, alpha, ColorFormat::Infer)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let [r, g, b] = NAMED_COLORS.get_by_name(&name.to_ascii_lowercase())?;

        Some(Color::new_rgba(
            Number::from(r as i64),
            Number::from(g as i64),
            Number::from(b as i64),
            Number::from(1),
            ColorFormat::Literal(name.to_owned()),
        ))
    }

    /// Constructs a color from `hsla(..)` arguments. Hue is in degrees,
    /// saturation and lightness are percentages in `0..=100`.
    pub fn from_hsla(hue: Number, saturation: Number, lightness: Number, alpha: Number) -> Self {
        let hue = Number(hue.0.rem_euclid(360.0)) / Number::from(360);
        let saturation = Number(saturation.0.clamp(0.0, 100.0)) / Number::from(100);
        let lightness = Number(lightness.0.clamp(0.0, 100.0)) / Number::from(100);

        if saturation.is_zero() {
            let channel = lightness * Number::from(255);
            return Color::new_rgba(channel, channel, channel, alpha, ColorFormat::Infer);
        }

        let temp1 = if lightness.0 < 0.5 {
            lightness * (Number::from(1) + saturation)
        } else {
            lightness + saturation - lightness * saturation
        };
        let temp2 = Number::from(2) * lightness - temp1;

        let channel = |mut t: f64| -> Number {
            t = t.rem_euclid(1.0);
            let v = if t < 1.0 / 6.0 {
                temp2.0 + (temp1.0 - temp2.0) * 6.0 * t
            } else if t < 1.0 / 2.0 {
                temp1.0
            } else if t < 2.0 / 3.0 {
                temp2.0 + (temp1.0 - temp2.0) * (2.0 / 3.0 - t) * 6.0
            } else {
                temp2.0
            };
            Number(v * 255.0)
        };

        Color::new_rgba(
            channel(hue.0 + 1.0 / 3.0),
            channel(hue.0),
            channel(hue.0 - 1.0 / 3.0),
            alpha,
            ColorFormat::Infer,
        )
    }

    pub fn red(&self) -> Number {
        self.red.round()
    }

    pub fn green(&self) -> Number {
        self.green.round()
    }

    pub fn blue(&self) -> Number {
        self.blue.round()
    }

    pub fn alpha(&self) -> Number {
        self.alpha
    }

    /// Hue in degrees, `0..360`.
    pub fn hue(&self) -> Number {
        let (r, g, b) = self.unit_channels();
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);

        if fuzzy_equals(max, min) {
            return Number(0.0);
        }

        let delta = max - min;

        let hue = if max == r {
            (g - b) / delta
        } else if max == g {
            2.0 + (b - r) / delta
        } else {
            4.0 + (r - g) / delta
        };

        Number((hue * 60.0).rem_euclid(360.0))
    }

    /// Saturation as a percentage, `0..=100`.
    pub fn saturation(&self) -> Number {
        let (r, g, b) = self.unit_channels();
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);

        if fuzzy_equals(max, min) {
            return Number(0.0);
        }

        let delta = max - min;
        let lightness = (max + min) / 2.0;

        let saturation = if lightness < 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };

        Number(saturation * 100.0)
    }

    /// Lightness as a percentage, `0..=100`.
    pub fn lightness(&self) -> Number {
        let (r, g, b) = self.unit_channels();
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);

        Number((max + min) / 2.0 * 100.0)
    }

    fn unit_channels(&self) -> (f64, f64, f64) {
        (self.red.0 / 255.0, self.green.0 / 255.0, self.blue.0 / 255.0)
    }

    pub fn with_alpha(&self, alpha: Number) -> Self {
        Color::new_rgba(self.red, self.green, self.blue, alpha, ColorFormat::Infer)
    }

    pub fn with_hsl(
        &self,
        hue: Option<Number>,
        saturation: Option<Number>,
        lightness: Option<Number>,
    ) -> Self {
        Color::from_hsla(
            hue.unwrap_or_else(|| self.hue()),
            saturation.unwrap_or_else(|| self.saturation()),
            lightness.unwrap_or_else(|| self.lightness()),
            self.alpha,
        )
    }

    pub fn lighten(&self, amount: Number) -> Self {
        self.with_hsl(None, None, Some(self.lightness() + amount))
    }

    pub fn darken(&self, amount: Number) -> Self {
        self.with_hsl(None, None, Some(self.lightness() - amount))
    }

    pub fn saturate(&self, amount: Number) -> Self {
        self.with_hsl(None, Some(self.saturation() + amount), None)
    }

    pub fn desaturate(&self, amount: Number) -> Self {
        self.with_hsl(None, Some(self.saturation() - amount), None)
    }

    pub fn invert(&self, weight: Number) -> Self {
        let inverse = Color::from_rgba(
            Number(255.0 - self.red.0),
            Number(255.0 - self.green.0),
            Number(255.0 - self.blue.0),
            self.alpha,
        );

        inverse.mix(self, weight)
    }

    pub fn grayscale(&self) -> Self {
        self.with_hsl(None, Some(Number(0.0)), None)
    }

    /// Mixes two colors, weighting both by `weight` (a percentage giving
    /// `self`'s share) and their relative opacity.
    pub fn mix(&self, other: &Color, weight: Number) -> Self {
        let p = (weight.0 / 100.0).clamp(0.0, 1.0);
        let w = 2.0 * p - 1.0;
        let a = self.alpha.0 - other.alpha.0;

        let combined_weight1 = if w * a == -1.0 {
            w
        } else {
            (w + a) / (1.0 + w * a)
        };
        let weight1 = (combined_weight1 + 1.0) / 2.0;
        let weight2 = 1.0 - weight1;

        Color::from_rgba(
            Number(self.red.0 * weight1 + other.red.0 * weight2),
            Number(self.green.0 * weight1 + other.green.0 * weight2),
            Number(self.blue.0 * weight1 + other.blue.0 * weight2),
            Number(self.alpha.0 * p + other.alpha.0 * (1.0 - p)),
        )
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rgba({}, {}, {}, {})",
            self.red().0,
            self.green().0,
            self.blue().0,
            self.alpha.0
        )
    }
}
