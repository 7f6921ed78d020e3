use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Color, ValidationError};

// ==========================================
// PATTERN
// ==========================================

/// Temporal behaviour of the light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Pattern {
    #[default]
    Steady,
    /// Opacity oscillation.
    Pulse,
    /// Color/black oscillation.
    Strobe,
}

impl Pattern {
    pub const ALL: [Pattern; 3] = [Pattern::Steady, Pattern::Pulse, Pattern::Strobe];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Steady => "steady",
            Self::Pulse => "pulse",
            Self::Strobe => "strobe",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Steady => "Steady",
            Self::Pulse => "Pulse",
            Self::Strobe => "Strobe",
        }
    }

    /// Unknown names fall back to [`Pattern::Steady`].
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pattern {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ValidationError::UnknownPattern(s.to_string()))
    }
}

impl From<String> for Pattern {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

// ==========================================
// CONFIGURATION
// ==========================================

/// Clamps any integer into the `0..=100` percent range.
pub fn clamp_percent(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

/// One lighting setup.
///
/// Fields are private so the percent ranges hold for every value in
/// circulation; use [`ConfigurationModel::with_field`] to derive edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationModel {
    brightness: u8,
    color: Color,
    pattern: Pattern,
    saturation: u8,
    screen_brightness: u8,
}

impl Default for ConfigurationModel {
    fn default() -> Self {
        Self {
            brightness: 50,
            color: Color::WHITE,
            pattern: Pattern::Steady,
            saturation: 50,
            screen_brightness: 75,
        }
    }
}

impl ConfigurationModel {
    pub fn new(
        brightness: i64,
        color: Color,
        pattern: Pattern,
        saturation: i64,
        screen_brightness: i64,
    ) -> Self {
        Self {
            brightness: clamp_percent(brightness),
            color,
            pattern,
            saturation: clamp_percent(saturation),
            screen_brightness: clamp_percent(screen_brightness),
        }
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Kept for the editor; does not influence the displayed color.
    pub fn saturation(&self) -> u8 {
        self.saturation
    }

    /// Kept for the editor; does not influence the displayed color.
    pub fn screen_brightness(&self) -> u8 {
        self.screen_brightness
    }

    /// Returns a copy with one field replaced. Numeric values are clamped.
    pub fn with_field(&self, edit: Edit) -> Self {
        let mut next = *self;
        match edit {
            Edit::Brightness(v) => next.brightness = clamp_percent(v),
            Edit::Color(c) => next.color = c,
            Edit::Pattern(p) => next.pattern = p,
            Edit::Saturation(v) => next.saturation = clamp_percent(v),
            Edit::ScreenBrightness(v) => next.screen_brightness = clamp_percent(v),
        }
        next
    }

    /// Current value of `field`, formatted for display.
    pub fn field_value(&self, field: Field) -> String {
        match field {
            Field::Brightness => format!("{}%", self.brightness),
            Field::Color => self.color.to_hex(),
            Field::Pattern => self.pattern.label().to_string(),
            Field::Saturation => format!("{}%", self.saturation),
            Field::ScreenBrightness => format!("{}%", self.screen_brightness),
        }
    }
}

// ==========================================
// EDITS
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Brightness,
    Color,
    Pattern,
    Saturation,
    ScreenBrightness,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Brightness,
        Field::Color,
        Field::Pattern,
        Field::Saturation,
        Field::ScreenBrightness,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Brightness => "Brightness",
            Self::Color => "Color",
            Self::Pattern => "Pattern",
            Self::Saturation => "Saturation",
            Self::ScreenBrightness => "Screen Brightness",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single-field change. Integer payloads may be out of range; they are
/// clamped when applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Brightness(i64),
    Color(Color),
    Pattern(Pattern),
    Saturation(i64),
    ScreenBrightness(i64),
}

impl Edit {
    pub fn field(&self) -> Field {
        match self {
            Self::Brightness(_) => Field::Brightness,
            Self::Color(_) => Field::Color,
            Self::Pattern(_) => Field::Pattern,
            Self::Saturation(_) => Field::Saturation,
            Self::ScreenBrightness(_) => Field::ScreenBrightness,
        }
    }

    /// Builds an edit from raw control input (slider text, color picker
    /// value, pattern option). Unknown patterns become `Steady`.
    pub fn parse(field: Field, raw: &str) -> Result<Self, ValidationError> {
        let number = || {
            let trimmed = raw.trim();
            trimmed
                .parse::<i64>()
                .or_else(|_| trimmed.parse::<f64>().map(|f| f as i64))
                .map_err(|_| ValidationError::NotANumber {
                    field,
                    raw: raw.to_string(),
                })
        };

        Ok(match field {
            Field::Brightness => Self::Brightness(number()?),
            Field::Color => Self::Color(Color::parse_hex(raw)?),
            Field::Pattern => Self::Pattern(Pattern::parse_lenient(raw)),
            Field::Saturation => Self::Saturation(number()?),
            Field::ScreenBrightness => Self::ScreenBrightness(number()?),
        })
    }
}
