//! Shape definitions for pages.
//!
//! Shapes serialize to the flat object the backend stores: a `kind`
//! discriminator, the shared frame fields, and the variant's own fields
//! merged alongside them.

mod image;
mod text;

pub use image::{Bitmap, Image, ImageHandle};
pub use text::{FontStyle, FontWeight, Text, parse_hex_color};

use crate::animation::AnimationConfig;
use crate::config::MIN_SHAPE_SIZE;
use crate::geometry;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Backend-assigned shape identifier. Unsaved shapes have none.
pub type ShapeId = i64;

/// Frame, rotation and animation shared by every shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeBase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ShapeId>,
    /// Left edge of the unrotated box.
    pub x: f64,
    /// Top edge of the unrotated box.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Clockwise rotation about the center, in degrees. `None` means 0.
    #[serde(default)]
    pub rotate: Option<f64>,
    #[serde(default)]
    pub animation: AnimationConfig,
    /// Set the first time the animation is observed.
    #[serde(skip)]
    pub animation_start_ms: Option<f64>,
}

impl ShapeBase {
    pub fn new(bounds: Rect) -> Self {
        Self {
            id: None,
            x: bounds.x0,
            y: bounds.y0,
            width: bounds.width(),
            height: bounds.height(),
            rotate: None,
            animation: AnimationConfig::default(),
            animation_start_ms: None,
        }
    }

    /// Unrotated bounding box.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Rotation in degrees, with `None` read as 0.
    pub fn rotation(&self) -> f64 {
        self.rotate.unwrap_or(0.0)
    }

    /// Set the rotation, normalized to `[0, 360)`.
    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotate = Some(geometry::normalize_degrees(degrees));
    }

    /// Replace the frame while keeping rotation and animation.
    pub fn set_frame(&mut self, origin: Point, size: Size) {
        self.x = origin.x;
        self.y = origin.y;
        self.width = size.width;
        self.height = size.height;
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    pub fn to_local(&self, world: Point) -> Point {
        geometry::world_to_local(world, self.bounds(), self.rotation())
    }

    pub fn to_world(&self, local: Point) -> Point {
        geometry::local_to_world(local, self.bounds(), self.rotation())
    }

    /// Whether a world point lies inside the body hit region: the
    /// axis-aligned frame, edges included, regardless of rotation.
    pub fn contains(&self, world: Point) -> bool {
        geometry::point_in_rect(world, self.bounds())
    }

    /// Bring stored values back inside the frame invariants: rotation in
    /// `[0, 360)` and both sides at least [`MIN_SHAPE_SIZE`].
    pub fn normalize(&mut self) {
        if let Some(rotate) = self.rotate {
            self.rotate = Some(geometry::normalize_degrees(rotate));
        }
        for side in [&mut self.width, &mut self.height] {
            if !side.is_finite() || *side < MIN_SHAPE_SIZE {
                *side = MIN_SHAPE_SIZE;
            }
        }
        if !self.x.is_finite() {
            self.x = 0.0;
        }
        if !self.y.is_finite() {
            self.y = 0.0;
        }
    }

    /// Axis-aligned bounds of the rotated body.
    pub fn world_bounds(&self) -> Rect {
        geometry::rotated_bounds(self.bounds(), self.rotation())
    }
}

/// A shape on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    Image(Image),
    Text(Text),
}

impl Shape {
    pub fn base(&self) -> &ShapeBase {
        match self {
            Shape::Image(s) => &s.base,
            Shape::Text(s) => &s.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut ShapeBase {
        match self {
            Shape::Image(s) => &mut s.base,
            Shape::Text(s) => &mut s.base,
        }
    }

    pub fn id(&self) -> Option<ShapeId> {
        self.base().id
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Image(_) => "image",
            Shape::Text(_) => "text",
        }
    }

    pub fn bounds(&self) -> Rect {
        self.base().bounds()
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Shape::Text(t) => Some(t),
            Shape::Image(_) => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            Shape::Text(t) => Some(t),
            Shape::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Shape::Image(i) => Some(i),
            Shape::Text(_) => None,
        }
    }

    pub fn as_image_mut(&mut self) -> Option<&mut Image> {
        match self {
            Shape::Image(i) => Some(i),
            Shape::Text(_) => None,
        }
    }

    /// Aspect ratio (width / height) that resizing preserves: the current box.
    ///
    /// A degenerate box falls back to an image's intrinsic ratio, then to 1.
    pub fn aspect_ratio(&self) -> f64 {
        let base = self.base();
        let ratio = base.width / base.height;
        if ratio.is_finite() && ratio > 0.0 {
            return ratio;
        }
        match self {
            Shape::Image(i) => i.aspect_ratio.filter(|r| r.is_finite() && *r > 0.0),
            Shape::Text(_) => None,
        }
        .unwrap_or(1.0)
    }

    /// Copy for pasting: no id, offset frame, fresh animation clock.
    pub fn duplicate(&self, offset: Vec2) -> Shape {
        let mut copy = self.clone();
        let base = copy.base_mut();
        base.id = None;
        base.animation_start_ms = None;
        base.translate(offset);
        copy
    }
}
