//! Geometry primitives and shape-local coordinate conversion.
//!
//! Angles are in degrees throughout; rotation is clockwise on screen because
//! the y axis points down.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Tolerance below which a vector is treated as zero-length.
pub const GEOMETRY_EPSILON: f64 = 1e-9;

/// Corner of a shape's (unrotated) box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// All corners in handle draw order.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// The diagonally opposite corner.
    pub fn opposite(self) -> Self {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }

    /// Position of this corner on an axis-aligned rectangle.
    pub fn point_on(self, rect: Rect) -> Point {
        match self {
            Corner::TopLeft => Point::new(rect.x0, rect.y0),
            Corner::TopRight => Point::new(rect.x1, rect.y0),
            Corner::BottomLeft => Point::new(rect.x0, rect.y1),
            Corner::BottomRight => Point::new(rect.x1, rect.y1),
        }
    }

    /// Top-left origin of a `width x height` box whose *opposite* corner sits
    /// at `anchor`, when this corner is the one being dragged.
    pub fn origin_from_anchor(self, anchor: Point, width: f64, height: f64) -> Point {
        match self {
            Corner::BottomRight => anchor,
            Corner::TopLeft => Point::new(anchor.x - width, anchor.y - height),
            Corner::TopRight => Point::new(anchor.x, anchor.y - height),
            Corner::BottomLeft => Point::new(anchor.x - width, anchor.y),
        }
    }

    /// Whether this corner sits on the top-left/bottom-right diagonal.
    pub fn is_main_diagonal(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::BottomRight)
    }
}

/// Normalize an angle in degrees to `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Signed difference `to - from` folded into `[-180, 180]`.
pub fn shortest_angle_delta(from: f64, to: f64) -> f64 {
    let mut delta = to - from;
    if delta > 180.0 {
        delta -= 360.0;
    }
    if delta < -180.0 {
        delta += 360.0;
    }
    delta
}

/// Rotate `point` about `center` by `degrees`.
pub fn rotate_point(point: Point, center: Point, degrees: f64) -> Point {
    if degrees == 0.0 {
        return point;
    }
    let (sin, cos) = degrees.to_radians().sin_cos();
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    Point::new(
        center.x + dx * cos - dy * sin,
        center.y + dx * sin + dy * cos,
    )
}

/// Convert a world point into the local space of a box rotated by
/// `rotation` degrees about its center.
pub fn world_to_local(point: Point, bounds: Rect, rotation: f64) -> Point {
    if rotation == 0.0 {
        return point;
    }
    rotate_point(point, bounds.center(), -rotation)
}

/// Inverse of [`world_to_local`].
pub fn local_to_world(point: Point, bounds: Rect, rotation: f64) -> Point {
    if rotation == 0.0 {
        return point;
    }
    rotate_point(point, bounds.center(), rotation)
}

/// Angle from `center` to `point` in degrees, normalized to `[0, 360)`.
///
/// Returns `None` when the two points coincide.
pub fn angle_to_center(point: Point, center: Point) -> Option<f64> {
    let v = Vec2::new(point.x - center.x, point.y - center.y);
    if v.hypot2() < GEOMETRY_EPSILON * GEOMETRY_EPSILON {
        return None;
    }
    Some(normalize_degrees(v.y.atan2(v.x).to_degrees()))
}

/// Inclusive point-in-rectangle test.
pub fn point_in_rect(point: Point, rect: Rect) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// Inclusive point-in-circle test.
pub fn point_in_circle(point: Point, center: Point, radius: f64) -> bool {
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    dx * dx + dy * dy <= radius * radius
}

/// World positions of the four corners of a rotated box, in [`Corner::ALL`] order.
pub fn rotated_corners(bounds: Rect, rotation: f64) -> [Point; 4] {
    Corner::ALL.map(|corner| local_to_world(corner.point_on(bounds), bounds, rotation))
}

/// Axis-aligned bounding box of a rotated box.
pub fn rotated_bounds(bounds: Rect, rotation: f64) -> Rect {
    if rotation == 0.0 {
        return bounds;
    }
    let corners = rotated_corners(bounds, rotation);
    let mut out = Rect::from_points(corners[0], corners[1]);
    for &c in &corners[2..] {
        out = out.union_pt(c);
    }
    out
}
