//! sRGB color used for cloud tints and color-temperature shifts.
//!
//! Components are `f64` in [0, 1]. Colors serialize as `"#rrggbb"` strings so
//! configuration files stay human-editable.

use crate::error::CloudError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// sRGB color with components in [0, 1].
///
/// The hex round-trip has 8-bit quantization (1/255 precision loss).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Srgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Srgb {
    pub const WHITE: Srgb = Srgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub const BLACK: Srgb = Srgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    /// Builds a color from 8-bit channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }

    /// Parses a hex color string like "#ff00aa" or "ff00aa" (case insensitive).
    ///
    /// Returns `CloudError::InvalidColor` if the input is not a valid 6-digit hex color.
    pub fn from_hex(hex: &str) -> Result<Srgb, CloudError> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(CloudError::InvalidColor(format!(
                "expected 6 hex digits, got '{hex}'"
            )));
        }
        let channel = |range: std::ops::Range<usize>, name: &str| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|e| CloudError::InvalidColor(format!("invalid {name} component: {e}")))
        };
        Ok(Srgb::from_rgb8(
            channel(0..2, "red")?,
            channel(2..4, "green")?,
            channel(4..6, "blue")?,
        ))
    }

    /// Converts the color to a hex string like `"#rrggbb"`.
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.to_rgb8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Quantizes to 8-bit channels, clamping out-of-range components.
    pub fn to_rgb8(self) -> [u8; 3] {
        let q = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }

    /// Moves `t` of the way from `self` toward `target`.
    pub fn lerp(self, target: Srgb, t: f64) -> Srgb {
        Srgb {
            r: self.r + (target.r - self.r) * t,
            g: self.g + (target.g - self.g) * t,
            b: self.b + (target.b - self.b) * t,
        }
    }
}

impl Serialize for Srgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Srgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Srgb::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn from_hex_parses_with_and_without_hash() {
        let a = Srgb::from_hex("#f0f5fa").unwrap();
        let b = Srgb::from_hex("F0F5FA").unwrap();
        assert_eq!(a, b);
        assert!(approx_eq(a.r, 240.0 / 255.0));
        assert!(approx_eq(a.g, 245.0 / 255.0));
        assert!(approx_eq(a.b, 250.0 / 255.0));
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(Srgb::from_hex("#fff").is_err());
        assert!(Srgb::from_hex("#gg0000").is_err());
        assert!(Srgb::from_hex("ééé").is_err());
    }

    #[test]
    fn to_hex_round_trips_8bit_colors() {
        for hex in ["#b4c3d2", "#fff5dc", "#000000", "#ffffff"] {
            assert_eq!(Srgb::from_hex(hex).unwrap().to_hex(), hex);
        }
    }

    #[test]
    fn to_hex_clamps_out_of_range() {
        let c = Srgb {
            r: 1.5,
            g: -0.2,
            b: 0.5,
        };
        assert_eq!(c.to_hex(), "#ff0080");
    }

    #[test]
    fn lerp_endpoints_and_midpoint() {
        let a = Srgb::BLACK;
        let b = Srgb::WHITE;
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        let mid = a.lerp(b, 0.3);
        assert!(approx_eq(mid.r, 0.3) && approx_eq(mid.g, 0.3) && approx_eq(mid.b, 0.3));
    }

    #[test]
    fn srgb_serializes_as_hex_string() {
        let json = serde_json::to_string(&Srgb::from_rgb8(255, 245, 220)).unwrap();
        assert_eq!(json, "\"#fff5dc\"");
    }

    #[test]
    fn srgb_deserialize_rejects_invalid_hex() {
        assert!(serde_json::from_str::<Srgb>("\"#12\"").is_err());
    }
}
