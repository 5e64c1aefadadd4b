//! Camera module for pan/zoom transforms.

use crate::config::{MAX_ZOOM, MIN_ZOOM};
use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Camera manages the view transform for the canvas.
///
/// World coordinates map to screen coordinates as `screen = world * zoom + pan`.
/// The camera belongs to the editing session and is never stored alongside
/// shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Current zoom level (1.0 = one world unit per screen pixel).
    pub zoom: f64,
    /// Current translation offset in screen pixels.
    pub pan: Vec2,
    /// Whether a pan gesture is in progress.
    #[serde(skip)]
    pub is_panning: bool,
    /// Minimum allowed zoom level.
    pub min_zoom: f64,
    /// Maximum allowed zoom level.
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
            is_panning: false,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a camera with explicit zoom bounds.
    pub fn with_zoom_bounds(min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            min_zoom,
            max_zoom,
            ..Self::default()
        }
    }

    /// Get the affine transform for rendering (world to screen).
    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.zoom)
    }

    /// Get the inverse transform for input handling (screen to world).
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.pan)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        Point::new(
            (screen_point.x - self.pan.x) / self.zoom,
            (screen_point.y - self.pan.y) / self.zoom,
        )
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        Point::new(
            world_point.x * self.zoom + self.pan.x,
            world_point.y * self.zoom + self.pan.y,
        )
    }

    /// Convert a screen-space delta to a world-space delta.
    pub fn screen_delta_to_world(&self, delta: Vec2) -> Vec2 {
        delta / self.zoom
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Set the zoom level directly, clamped to the allowed range.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Zoom the camera, keeping the given screen point fixed.
    ///
    /// Returns `false` when the zoom was already at the clamp limit.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) -> bool {
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return false;
        }

        let world_point = self.screen_to_world(screen_point);
        self.zoom = new_zoom;

        // Adjust pan so world_point stays under screen_point
        let new_screen = self.world_to_screen(world_point);
        self.pan += Vec2::new(screen_point.x - new_screen.x, screen_point.y - new_screen.y);
        true
    }

    /// Reset camera to the identity view.
    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
        self.is_panning = false;
    }

    /// Fit a page of the given size into the canvas, centered, with padding
    /// in screen pixels on every side.
    pub fn fit_page(&mut self, page: Size, canvas: Size, padding: f64) {
        if page.width <= 0.0 || page.height <= 0.0 {
            self.reset();
            return;
        }

        let available = Size::new(
            (canvas.width - padding * 2.0).max(1.0),
            (canvas.height - padding * 2.0).max(1.0),
        );
        let scale_x = available.width / page.width;
        let scale_y = available.height / page.height;
        self.zoom = scale_x.min(scale_y).clamp(self.min_zoom, self.max_zoom);

        self.pan = Vec2::new(
            (canvas.width - page.width * self.zoom) / 2.0,
            (canvas.height - page.height * self.zoom) / 2.0,
        );
    }
}
