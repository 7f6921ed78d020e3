use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// An sRGB triple, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rgb` or `#rrggbb`. The leading `#` is optional and case is ignored.
    pub fn parse_hex(input: &str) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::MalformedColor(input.to_string());
        let digits = input.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(malformed());
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| malformed());
        match digits.len() {
            3 => {
                let mut out = [0u8; 3];
                for (slot, nibble) in out.iter_mut().zip(digits.chars()) {
                    let v = channel(&nibble.to_string())?;
                    *slot = v * 16 + v;
                }
                Ok(Self::new(out[0], out[1], out[2]))
            }
            6 => Ok(Self::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            _ => Err(malformed()),
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    /// Multiplies every channel by `factor` (clamped to `0.0..=1.0`), i.e.
    /// composites the color at that opacity over black.
    pub fn scaled(self, factor: f32) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        let scale = |c: u8| (c as f32 * factor).round() as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl TryFrom<String> for Color {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!(Color::parse_hex("#112233").unwrap(), Color::new(0x11, 0x22, 0x33));
        assert_eq!(Color::parse_hex("FFcc00").unwrap(), Color::new(0xff, 0xcc, 0x00));
        assert_eq!(Color::parse_hex("#fff").unwrap(), Color::WHITE);
        assert_eq!(Color::parse_hex(" #abc ").unwrap(), Color::new(0xaa, 0xbb, 0xcc));
    }

    #[test]
    fn rejects_malformed_hex() {
        for bad in ["", "#", "#12345", "#1234567", "#gg0000", "+f+f+f", "warm white"] {
            assert!(
                matches!(Color::parse_hex(bad), Err(ValidationError::MalformedColor(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn formats_lowercase() {
        assert_eq!(Color::new(0xAB, 0x0C, 0xFF).to_string(), "#ab0cff");
    }

    #[test]
    fn serde_uses_hex_strings() {
        let json = serde_json::to_string(&Color::new(1, 2, 3)).unwrap();
        assert_eq!(json, "\"#010203\"");
        let back: Color = serde_json::from_str("\"#FFCC00\"").unwrap();
        assert_eq!(back, Color::new(0xff, 0xcc, 0x00));
        assert!(serde_json::from_str::<Color>("\"nope\"").is_err());
    }

    #[test]
    fn scaled_composites_over_black() {
        assert_eq!(Color::new(200, 100, 0).scaled(0.5), Color::new(100, 50, 0));
        assert_eq!(Color::WHITE.scaled(0.0), Color::BLACK);
        assert_eq!(Color::WHITE.scaled(7.0), Color::WHITE);
    }
}
