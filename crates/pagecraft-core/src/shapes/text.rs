//! Text shape.

use super::ShapeBase;
use kurbo::Rect;
use peniko::Color;
use serde::{Deserialize, Serialize};

/// Font weight options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Light,
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    /// CSS-style numeric weight.
    pub fn value(&self) -> f32 {
        match self {
            FontWeight::Light => 300.0,
            FontWeight::Normal => 400.0,
            FontWeight::Bold => 700.0,
        }
    }
}

/// Font style options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// A text box. The box is authoritative; the font size is fitted to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Text {
    #[serde(flatten)]
    pub base: ShapeBase,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub font_style: FontStyle,
    /// Fill color as `#rrggbb` or `#rrggbbaa`.
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_font_size() -> f64 {
    Text::DEFAULT_FONT_SIZE
}

fn default_font_family() -> String {
    "sans-serif".to_string()
}

fn default_color() -> String {
    "#000000".to_string()
}

fn default_opacity() -> f64 {
    1.0
}

impl Text {
    pub const DEFAULT_FONT_SIZE: f64 = 24.0;

    pub fn new(bounds: Rect, text: impl Into<String>) -> Self {
        Self {
            base: ShapeBase::new(bounds),
            text: text.into(),
            font_size: Self::DEFAULT_FONT_SIZE,
            font_family: default_font_family(),
            font_weight: FontWeight::default(),
            font_style: FontStyle::default(),
            color: default_color(),
            opacity: 1.0,
        }
    }

    /// Fill color with opacity applied. Unparseable colors fall back to black.
    pub fn fill_color(&self) -> Color {
        let color = parse_hex_color(&self.color).unwrap_or(Color::BLACK);
        let rgba = color.to_rgba8();
        let alpha = (rgba.a as f64 * self.opacity.clamp(0.0, 1.0)).round() as u8;
        Color::from_rgba8(rgba.r, rgba.g, rgba.b, alpha)
    }
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let digits = hex.trim().trim_start_matches('#');
    if !digits.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    match digits.len() {
        3 => {
            let mut out = [0u8; 3];
            for (slot, c) in out.iter_mut().zip(digits.chars()) {
                let v = c.to_digit(16)? as u8;
                *slot = v * 17;
            }
            Some(Color::from_rgb8(out[0], out[1], out[2]))
        }
        6 => Some(Color::from_rgb8(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}
