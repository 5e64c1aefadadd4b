//! Viewport culling.

use crate::camera::Camera;
use crate::shapes::Shape;
use kurbo::{Rect, Size};

/// World-space rectangle visible through a canvas of `canvas` screen pixels.
pub fn viewport_rect(camera: &Camera, canvas: Size) -> Rect {
    Rect::new(
        -camera.pan.x / camera.zoom,
        -camera.pan.y / camera.zoom,
        (canvas.width - camera.pan.x) / camera.zoom,
        (canvas.height - camera.pan.y) / camera.zoom,
    )
}

/// Whether `bounds` overlaps `viewport`. Touching an edge counts as visible.
pub fn is_visible(bounds: Rect, viewport: Rect) -> bool {
    !(bounds.x1 < viewport.x0
        || bounds.x0 > viewport.x1
        || bounds.y1 < viewport.y0
        || bounds.y0 > viewport.y1)
}

/// Whether a shape's rotated bounds overlap the viewport.
pub fn shape_visible(shape: &Shape, viewport: Rect) -> bool {
    is_visible(shape.base().world_bounds(), viewport)
}

/// Indices of the shapes that survive culling, in draw order.
pub fn visible_indices(shapes: &[Shape], viewport: Rect) -> Vec<usize> {
    shapes
        .iter()
        .enumerate()
        .filter(|(_, s)| shape_visible(s, viewport))
        .map(|(i, _)| i)
        .collect()
}
