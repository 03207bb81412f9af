//! Marker display colors and their persisted `#RRGGBB` form.

use std::error::Error;
use std::fmt;

/// A 24-bit RGB marker color.
///
/// `None` at the call sites that take `Option<MarkerColor>` means the
/// remote default. Encoded in the persisted file as a six-hex-digit string
/// prefixed by `#`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MarkerColor(u32);

impl MarkerColor {
    /// Construct from a packed `0xRRGGBB` value.
    ///
    /// Returns `None` if the value has bits above the low 24.
    pub fn from_rgb(rgb: u32) -> Option<Self> {
        if rgb > 0xFF_FF_FF {
            return None;
        }
        Some(Self(rgb))
    }

    /// The packed `0xRRGGBB` value.
    pub fn rgb(self) -> u32 {
        self.0
    }

    /// Parse a `#RRGGBB` (or bare `RRGGBB`) string.
    pub fn from_hex(s: &str) -> Result<Self, ColorParseError> {
        let stripped = s.strip_prefix('#').unwrap_or(s);
        if stripped.is_empty() {
            return Err(ColorParseError::Empty);
        }
        let value = u32::from_str_radix(stripped, 16)
            .map_err(|_| ColorParseError::InvalidDigit { input: s.to_string() })?;
        Self::from_rgb(value).ok_or(ColorParseError::OutOfRange { value })
    }

    /// Format as `#RRGGBB`, upper hex, zero-padded.
    pub fn to_hex(self) -> String {
        format!("#{:06X}", self.0)
    }
}

impl fmt::Display for MarkerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Errors parsing a hex color string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColorParseError {
    /// The input was empty (after stripping any `#`).
    Empty,
    /// The input contained a non-hex digit or was too long to fit `u32`.
    InvalidDigit {
        /// The rejected input.
        input: String,
    },
    /// The parsed value exceeds 24 bits.
    OutOfRange {
        /// The rejected value.
        value: u32,
    },
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty color string"),
            Self::InvalidDigit { input } => write!(f, "'{input}' is not a hex color"),
            Self::OutOfRange { value } => {
                write!(f, "{value:#X} exceeds the 24-bit RGB range")
            }
        }
    }
}

impl Error for ColorParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_hex() {
        let c = MarkerColor::from_rgb(0xFF8800).unwrap();
        assert_eq!(c.to_hex(), "#FF8800");
        assert_eq!(MarkerColor::from_hex(&c.to_hex()).unwrap(), c);
    }

    #[test]
    fn accepts_bare_and_prefixed_forms() {
        assert_eq!(
            MarkerColor::from_hex("00FF00").unwrap(),
            MarkerColor::from_hex("#00FF00").unwrap()
        );
    }

    #[test]
    fn pads_small_values() {
        assert_eq!(MarkerColor::from_rgb(0xAB).unwrap().to_hex(), "#0000AB");
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(MarkerColor::from_hex(""), Err(ColorParseError::Empty));
        assert_eq!(MarkerColor::from_hex("#"), Err(ColorParseError::Empty));
        assert!(matches!(
            MarkerColor::from_hex("zzz"),
            Err(ColorParseError::InvalidDigit { .. })
        ));
        assert!(matches!(
            MarkerColor::from_hex("#1000000"),
            Err(ColorParseError::OutOfRange { .. })
        ));
    }
}
