//! Color representation

use std::fmt;

/// Color representation
///
/// Format sections name their colour either by one of eight names or by a
/// legacy palette slot (`[Color12]`); both resolve to [`Color::Indexed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Color {
    /// RGB color (no alpha)
    Rgb { r: u8, g: u8, b: u8 },

    /// Indexed color (legacy Excel palette)
    Indexed(u8),
}

impl Color {
    /// Create an RGB color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb { r, g, b }
    }

    /// Create from a hex string (e.g., "#FF0000" or "FF0000")
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Color::Rgb { r, g, b })
    }

    /// Convert to hex string (without # prefix)
    pub fn to_hex(&self) -> String {
        let (r, g, b) = self.to_rgb();
        format!("{:02X}{:02X}{:02X}", r, g, b)
    }

    /// Convert to RGB tuple
    pub fn to_rgb(&self) -> (u8, u8, u8) {
        match self {
            Color::Rgb { r, g, b } => (*r, *g, *b),
            Color::Indexed(i) => Self::indexed_to_rgb(*i),
        }
    }

    /// Blend two colours, `t` = 0 gives `self`, `t` = 1 gives `other`
    pub fn interpolate(&self, other: &Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let (r1, g1, b1) = self.to_rgb();
        let (r2, g2, b2) = other.to_rgb();
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::Rgb {
            r: mix(r1, r2),
            g: mix(g1, g2),
            b: mix(b1, b2),
        }
    }

    /// Get RGB for indexed color
    fn indexed_to_rgb(index: u8) -> (u8, u8, u8) {
        // Standard Excel color palette (first 56 colors)
        const PALETTE: [(u8, u8, u8); 56] = [
            (0, 0, 0),       // 0: Black
            (255, 255, 255), // 1: White
            (255, 0, 0),     // 2: Red
            (0, 255, 0),     // 3: Bright Green
            (0, 0, 255),     // 4: Blue
            (255, 255, 0),   // 5: Yellow
            (255, 0, 255),   // 6: Pink
            (0, 255, 255),   // 7: Turquoise
            (0, 0, 0),       // 8: Black
            (255, 255, 255), // 9: White
            (255, 0, 0),     // 10: Red
            (0, 255, 0),     // 11: Bright Green
            (0, 0, 255),     // 12: Blue
            (255, 255, 0),   // 13: Yellow
            (255, 0, 255),   // 14: Pink
            (0, 255, 255),   // 15: Turquoise
            (128, 0, 0),     // 16: Dark Red
            (0, 128, 0),     // 17: Green
            (0, 0, 128),     // 18: Dark Blue
            (128, 128, 0),   // 19: Dark Yellow
            (128, 0, 128),   // 20: Violet
            (0, 128, 128),   // 21: Teal
            (192, 192, 192), // 22: 25% Gray
            (128, 128, 128), // 23: 50% Gray
            (153, 153, 255), // 24: Periwinkle
            (153, 51, 102),  // 25: Plum
            (255, 255, 204), // 26: Ivory
            (204, 255, 255), // 27: Light Turquoise
            (102, 0, 102),   // 28: Dark Purple
            (255, 128, 128), // 29: Coral
            (0, 102, 204),   // 30: Ocean Blue
            (204, 204, 255), // 31: Ice Blue
            (0, 0, 128),     // 32: Dark Blue
            (255, 0, 255),   // 33: Pink
            (255, 255, 0),   // 34: Yellow
            (0, 255, 255),   // 35: Turquoise
            (128, 0, 128),   // 36: Violet
            (128, 0, 0),     // 37: Dark Red
            (0, 128, 128),   // 38: Teal
            (0, 0, 255),     // 39: Blue
            (0, 204, 255),   // 40: Sky Blue
            (204, 255, 255), // 41: Light Turquoise
            (204, 255, 204), // 42: Light Green
            (255, 255, 153), // 43: Light Yellow
            (153, 204, 255), // 44: Pale Blue
            (255, 153, 204), // 45: Rose
            (204, 153, 255), // 46: Lavender
            (255, 204, 153), // 47: Tan
            (51, 102, 255),  // 48: Light Blue
            (51, 204, 204),  // 49: Aqua
            (153, 204, 0),   // 50: Lime
            (255, 204, 0),   // 51: Gold
            (255, 153, 0),   // 52: Light Orange
            (255, 102, 0),   // 53: Orange
            (102, 102, 153), // 54: Blue-Gray
            (150, 150, 150), // 55: 40% Gray
        ];

        PALETTE.get(index as usize).copied().unwrap_or((0, 0, 0))
    }

    // Format-language colours, palette slots 8-15
    pub const BLACK: Color = Color::Indexed(8);
    pub const WHITE: Color = Color::Indexed(9);
    pub const RED: Color = Color::Indexed(10);
    pub const GREEN: Color = Color::Indexed(11);
    pub const BLUE: Color = Color::Indexed(12);
    pub const YELLOW: Color = Color::Indexed(13);
    pub const MAGENTA: Color = Color::Indexed(14);
    pub const CYAN: Color = Color::Indexed(15);
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Rgb { r, g, b } => write!(f, "#{:02X}{:02X}{:02X}", r, g, b),
            Color::Indexed(i) => write!(f, "indexed({})", i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(
            Color::from_hex("#FF0000"),
            Some(Color::Rgb { r: 255, g: 0, b: 0 })
        );
        assert_eq!(Color::from_hex("00FF00"), Some(Color::rgb(0, 255, 0)));
        assert_eq!(Color::from_hex("#80FFFFFF"), None);
    }

    #[test]
    fn test_to_rgb() {
        assert_eq!(Color::RED.to_rgb(), (255, 0, 0));
        assert_eq!(Color::Indexed(17).to_hex(), "008000");
        assert_eq!(Color::Indexed(200).to_rgb(), (0, 0, 0));
    }

    #[test]
    fn test_interpolate() {
        let mid = Color::rgb(0, 0, 0).interpolate(&Color::rgb(255, 100, 0), 0.5);
        assert_eq!(mid, Color::rgb(128, 50, 0));
        assert_eq!(Color::BLACK.interpolate(&Color::WHITE, 2.0), Color::rgb(255, 255, 255));
    }
}
