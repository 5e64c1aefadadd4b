//! Host configuration.

use pagecraft_core::{EditorConfig, RgbColor};
use pagecraft_render::RenderStyle;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a headless editor host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Canvas width in CSS pixels.
    pub width: f64,
    /// Canvas height in CSS pixels.
    pub height: f64,
    pub device_pixel_ratio: f64,
    /// Frames per second when stepping animations.
    pub frame_rate: f64,
    /// Shortest time a page is held during export, even without animations.
    pub min_page_hold_ms: f64,
    pub canvas_color: RgbColor,
    pub selection_color: RgbColor,
    pub hover_color: RgbColor,
    pub editor: EditorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            device_pixel_ratio: 1.0,
            frame_rate: 60.0,
            min_page_hold_ms: 1000.0,
            canvas_color: RgbColor {
                r: 229,
                g: 231,
                b: 235,
                a: 255,
            },
            selection_color: RgbColor {
                r: 59,
                g: 130,
                b: 246,
                a: 255,
            },
            hover_color: RgbColor {
                r: 147,
                g: 197,
                b: 253,
                a: 255,
            },
            editor: EditorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context as _;
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parse config '{}'", path.display()))
    }

    /// Milliseconds between frames.
    pub fn frame_interval_ms(&self) -> f64 {
        if self.frame_rate > 0.0 {
            1000.0 / self.frame_rate
        } else {
            1000.0 / 60.0
        }
    }

    pub fn render_style(&self) -> RenderStyle {
        RenderStyle {
            canvas_color: self.canvas_color.into(),
            selection_color: self.selection_color.into(),
            hover_color: self.hover_color.into(),
            ..RenderStyle::default()
        }
    }
}
