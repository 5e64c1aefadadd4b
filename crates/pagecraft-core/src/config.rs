//! Tunable constants for the editor engine.

use serde::{Deserialize, Serialize};

/// Smallest width or height a shape may be resized to (world units).
pub const MIN_SHAPE_SIZE: f64 = 10.0;

/// Minimum camera zoom.
pub const MIN_ZOOM: f64 = 0.1;

/// Maximum camera zoom.
pub const MAX_ZOOM: f64 = 10.0;

/// Engine configuration.
///
/// Every value has a sensible default; hosts can override any subset by
/// deserializing a partial JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Minimum allowed zoom level.
    pub min_zoom: f64,
    /// Maximum allowed zoom level.
    pub max_zoom: f64,
    /// Minimum shape width/height in world units.
    pub min_shape_size: f64,
    /// Distance of the rotation handle above the top edge, in screen pixels.
    pub rotate_handle_offset_px: f64,
    /// Radius of the rotation handle hit circle, in screen pixels.
    pub rotate_handle_radius_px: f64,
    /// Nominal radius of the corner resize handles, in screen pixels.
    pub handle_base_radius_px: f64,
    /// Lower bound on the corner hit radius, in screen pixels.
    pub handle_min_hit_radius_px: f64,
    /// Hover recomputation debounce.
    pub hover_debounce_ms: f64,
    /// Outbound mutation debounce.
    pub outbound_debounce_ms: f64,
    /// Offset applied to pasted shapes.
    pub paste_offset: f64,
    /// Smallest font size the text fitter may choose.
    pub min_font_size: f64,
    /// Largest font size the text fitter may choose.
    pub max_font_size: f64,
    /// Opacity of the full-bleed preview drawn behind a selected image.
    pub image_preview_opacity: f64,
    /// Zoom factor per wheel notch when zooming.
    pub wheel_zoom_step: f64,
    /// Maximum number of undo snapshots kept.
    pub max_undo_history: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            min_shape_size: MIN_SHAPE_SIZE,
            rotate_handle_offset_px: 30.0,
            rotate_handle_radius_px: 10.0,
            handle_base_radius_px: 6.0,
            handle_min_hit_radius_px: 12.0,
            hover_debounce_ms: 16.0,
            outbound_debounce_ms: 150.0,
            paste_offset: 20.0,
            min_font_size: 4.0,
            max_font_size: 400.0,
            image_preview_opacity: 0.25,
            wheel_zoom_step: 1.1,
            max_undo_history: 50,
        }
    }
}

impl EditorConfig {
    /// World-space radius of a corner handle hit region at the given zoom.
    pub fn corner_hit_radius(&self, zoom: f64) -> f64 {
        self.handle_base_radius_px.max(self.handle_min_hit_radius_px) / zoom
    }

    /// World-space radius of the rotation handle hit region at the given zoom.
    pub fn rotate_hit_radius(&self, zoom: f64) -> f64 {
        self.rotate_handle_radius_px.max(self.handle_min_hit_radius_px) / zoom
    }

    /// World-space distance between the top edge and the rotation handle.
    pub fn rotate_handle_offset(&self, zoom: f64) -> f64 {
        self.rotate_handle_offset_px / zoom
    }
}
