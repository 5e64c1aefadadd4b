//! Drag, resize and rotate sessions.
//!
//! A session is opened on pointer-down over a shape or one of its handles
//! and closed on pointer-up or pointer-leave. Only one can be open at a time.

use crate::config::EditorConfig;
use crate::geometry::{self, Corner, GEOMETRY_EPSILON};
use crate::shapes::{Shape, ShapeBase};
use crate::text_fit::{TextMeasurer, fit_font_size};
use kurbo::{Point, Size, Vec2};

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub shape_index: usize,
    /// Last pointer position in world coordinates.
    pub last_pointer: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResizeSession {
    pub shape_index: usize,
    /// Corner being dragged; the opposite corner stays fixed.
    pub corner: Corner,
    /// Shape frame when the session opened.
    pub start: ShapeBase,
    /// Width / height preserved throughout the session.
    pub aspect_ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RotateSession {
    pub shape_index: usize,
    pub initial_rotation: f64,
    /// Pointer angle around the center at start, once the pointer is off-center.
    pub initial_pointer_angle: Option<f64>,
}

/// The open manipulation, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformSession {
    Drag(DragSession),
    Resize(ResizeSession),
    Rotate(RotateSession),
}

impl TransformSession {
    pub fn drag(shape_index: usize, pointer: Point) -> Self {
        TransformSession::Drag(DragSession {
            shape_index,
            last_pointer: pointer,
        })
    }

    pub fn resize(shape_index: usize, shape: &Shape, corner: Corner) -> Self {
        TransformSession::Resize(ResizeSession {
            shape_index,
            corner,
            start: shape.base().clone(),
            aspect_ratio: shape.aspect_ratio(),
        })
    }

    pub fn rotate(shape_index: usize, base: &ShapeBase, pointer: Point) -> Self {
        TransformSession::Rotate(RotateSession {
            shape_index,
            initial_rotation: base.rotation(),
            initial_pointer_angle: geometry::angle_to_center(pointer, base.center()),
        })
    }

    pub fn shape_index(&self) -> usize {
        match self {
            TransformSession::Drag(s) => s.shape_index,
            TransformSession::Resize(s) => s.shape_index,
            TransformSession::Rotate(s) => s.shape_index,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransformSession::Drag(_) => "drag",
            TransformSession::Resize(_) => "resize",
            TransformSession::Rotate(_) => "rotate",
        }
    }

    /// Apply a pointer move. Returns whether the shape changed.
    pub fn update(
        &mut self,
        shape: &mut Shape,
        pointer: Point,
        config: &EditorConfig,
        measurer: &mut dyn TextMeasurer,
    ) -> bool {
        match self {
            TransformSession::Drag(session) => {
                let delta = pointer - session.last_pointer;
                session.last_pointer = pointer;
                apply_drag(shape.base_mut(), delta)
            }
            TransformSession::Resize(session) => {
                apply_resize(shape, session, pointer, config, measurer)
            }
            TransformSession::Rotate(session) => apply_rotate(shape.base_mut(), session, pointer),
        }
    }
}

/// Translate by a world-space delta. Zero deltas change nothing.
pub fn apply_drag(base: &mut ShapeBase, delta: Vec2) -> bool {
    if delta.hypot2() < GEOMETRY_EPSILON * GEOMETRY_EPSILON {
        return false;
    }
    base.translate(delta);
    true
}

/// New frame for a resize, as `(origin, size)`.
///
/// The pointer is taken into the start frame's local space and measured from
/// the fixed opposite corner; the dominant axis sets the size and the other
/// follows the aspect ratio. The fixed corner keeps its world position.
pub fn resize_frame(
    start: &ShapeBase,
    corner: Corner,
    aspect_ratio: f64,
    pointer: Point,
    min_size: f64,
) -> (Point, Size) {
    let aspect = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
        aspect_ratio
    } else {
        1.0
    };
    let bounds = start.bounds();
    let rotation = start.rotation();
    let local = geometry::world_to_local(pointer, bounds, rotation);
    let anchor = corner.opposite().point_on(bounds);
    let dx = (local.x - anchor.x).abs();
    let dy = (local.y - anchor.y).abs();

    let mut height = if dx >= dy { dx / aspect } else { dy };
    let min_height = min_size.max(min_size / aspect);
    if height < min_height {
        height = min_height;
    }
    let width = height * aspect;

    let origin_local = corner.origin_from_anchor(anchor, width, height);
    let center_local = Point::new(origin_local.x + width / 2.0, origin_local.y + height / 2.0);
    let anchor_world = geometry::local_to_world(anchor, bounds, rotation);
    let center_world = geometry::rotate_point(
        anchor_world + (center_local - anchor),
        anchor_world,
        rotation,
    );
    (
        Point::new(center_world.x - width / 2.0, center_world.y - height / 2.0),
        Size::new(width, height),
    )
}

fn apply_resize(
    shape: &mut Shape,
    session: &ResizeSession,
    pointer: Point,
    config: &EditorConfig,
    measurer: &mut dyn TextMeasurer,
) -> bool {
    let (origin, size) = resize_frame(
        &session.start,
        session.corner,
        session.aspect_ratio,
        pointer,
        config.min_shape_size,
    );
    let base = shape.base();
    if origin == Point::new(base.x, base.y) && size == base.size() {
        return false;
    }
    shape.base_mut().set_frame(origin, size);

    if let Shape::Text(text) = shape {
        text.font_size = fit_font_size(
            measurer,
            text,
            size,
            config.min_font_size,
            config.max_font_size,
        );
    }
    true
}

/// Rotation for the current pointer, or `None` when the pointer gives no
/// direction (exactly at the center).
pub fn rotation_for_pointer(session: &mut RotateSession, center: Point, pointer: Point) -> Option<f64> {
    let current = geometry::angle_to_center(pointer, center)?;
    let initial = *session.initial_pointer_angle.get_or_insert(current);
    let delta = geometry::shortest_angle_delta(initial, current);
    Some(geometry::normalize_degrees(session.initial_rotation + delta))
}

fn apply_rotate(base: &mut ShapeBase, session: &mut RotateSession, pointer: Point) -> bool {
    let Some(rotation) = rotation_for_pointer(session, base.center(), pointer) else {
        return false;
    };
    if (rotation - base.rotation()).abs() < GEOMETRY_EPSILON {
        return false;
    }
    base.set_rotation(rotation);
    true
}
