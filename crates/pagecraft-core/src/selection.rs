//! Selection state and manipulation handles.

use crate::config::EditorConfig;
pub use crate::geometry::Corner;
use crate::geometry::point_in_circle;
use crate::shapes::ShapeBase;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Type of selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Corner resize handle.
    Corner(Corner),
    /// Rotation handle, above the top edge.
    Rotate,
}

/// A selection handle with its position and hit radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// Position in world coordinates (already rotated with the shape).
    pub position: Point,
    /// Position in the shape's unrotated frame.
    pub local_position: Point,
    /// Hit radius in world units.
    pub radius: f64,
    pub kind: HandleKind,
}

impl Handle {
    /// Check if a local-space point hits this handle.
    pub fn hit_test_local(&self, local: Point) -> bool {
        point_in_circle(local, self.local_position, self.radius)
    }
}

/// Rotation handle position in the shape's unrotated frame.
pub fn rotate_handle_local(base: &ShapeBase, zoom: f64, config: &EditorConfig) -> Point {
    Point::new(
        base.x + base.width / 2.0,
        base.y - config.rotate_handle_offset(zoom),
    )
}

/// The four corner handles followed by the rotation handle.
pub fn get_handles(base: &ShapeBase, zoom: f64, config: &EditorConfig) -> Vec<Handle> {
    let bounds = base.bounds();
    let corner_radius = config.corner_hit_radius(zoom);
    let mut handles: Vec<Handle> = Corner::ALL
        .iter()
        .map(|&corner| {
            let local = corner.point_on(bounds);
            Handle {
                position: base.to_world(local),
                local_position: local,
                radius: corner_radius,
                kind: HandleKind::Corner(corner),
            }
        })
        .collect();

    let rotate_local = rotate_handle_local(base, zoom, config);
    handles.push(Handle {
        position: base.to_world(rotate_local),
        local_position: rotate_local,
        radius: config.rotate_hit_radius(zoom),
        kind: HandleKind::Rotate,
    });
    handles
}

/// Find the handle under a world point. The rotation handle wins over corners.
pub fn hit_test_handles(
    base: &ShapeBase,
    world: Point,
    zoom: f64,
    config: &EditorConfig,
) -> Option<HandleKind> {
    let local = base.to_local(world);
    let handles = get_handles(base, zoom, config);
    handles
        .iter()
        .find(|h| h.kind == HandleKind::Rotate && h.hit_test_local(local))
        .or_else(|| handles.iter().find(|h| h.hit_test_local(local)))
        .map(|h| h.kind)
}

/// The currently selected shape, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectedShape {
    pub index: Option<usize>,
    /// Set while the overlay surface draws the selection border.
    pub suppress_overlay_border: bool,
}

impl SelectedShape {
    pub fn select(&mut self, index: usize) {
        self.index = Some(index);
        self.suppress_overlay_border = false;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is(&self, index: usize) -> bool {
        self.index == Some(index)
    }

    /// Drop the selection if it no longer points at a shape.
    pub fn validate(&mut self, shape_count: usize) -> bool {
        match self.index {
            Some(i) if i >= shape_count => {
                log::debug!("Dropping stale selection {i} (page has {shape_count} shapes)");
                self.clear();
                false
            }
            _ => true,
        }
    }
}
