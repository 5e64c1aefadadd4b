//! Hover resolution with fixed priority: rotate handle, resize handles, body.

use crate::config::EditorConfig;
use crate::geometry::Corner;
use crate::selection::{HandleKind, hit_test_handles};
use crate::shapes::Shape;
use kurbo::Point;

/// What the pointer is over. Variants are mutually exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HoverTarget {
    #[default]
    None,
    /// Rotation handle of the selected shape.
    RotateHandle,
    /// Corner handle of the selected shape.
    ResizeHandle(Corner),
    /// Body of an unselected shape.
    Body(usize),
}

impl HoverTarget {
    pub fn body_index(&self) -> Option<usize> {
        match self {
            HoverTarget::Body(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_handle(&self) -> bool {
        matches!(self, HoverTarget::RotateHandle | HoverTarget::ResizeHandle(_))
    }
}

/// Topmost shape (highest index) whose body contains `world`.
pub fn topmost_shape_at(shapes: &[Shape], world: Point) -> Option<usize> {
    shapes.iter().rposition(|s| s.base().contains(world))
}

/// Resolve the hover target for a world point.
///
/// Handles are only offered for the selected shape. When the topmost body
/// under the pointer is the selected shape the hover state is left as it
/// was (`current`), except that a stale handle hover is cleared since the
/// pointer is no longer over that handle.
pub fn resolve_hover(
    shapes: &[Shape],
    world: Point,
    selected: Option<usize>,
    zoom: f64,
    config: &EditorConfig,
    current: HoverTarget,
) -> HoverTarget {
    if let Some(shape) = selected.and_then(|i| shapes.get(i)) {
        match hit_test_handles(shape.base(), world, zoom, config) {
            Some(HandleKind::Rotate) => return HoverTarget::RotateHandle,
            Some(HandleKind::Corner(corner)) => return HoverTarget::ResizeHandle(corner),
            None => {}
        }
    }

    match topmost_shape_at(shapes, world) {
        Some(index) if Some(index) == selected => match current {
            HoverTarget::Body(_) | HoverTarget::None => current,
            HoverTarget::RotateHandle | HoverTarget::ResizeHandle(_) => HoverTarget::None,
        },
        Some(index) => HoverTarget::Body(index),
        None => HoverTarget::None,
    }
}
