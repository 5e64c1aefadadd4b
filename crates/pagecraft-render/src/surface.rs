//! Immediate-mode drawing surface abstraction.

use kurbo::{Affine, Point, Rect};
use pagecraft_core::shapes::{Bitmap, Text};
use peniko::Color;

/// A 2D canvas the scene renderer draws into.
///
/// Transforms and clips are scoped by `save`/`restore`. Alpha layers are
/// scoped by `push_layer`/`pop_layer` and must nest inside the same
/// save/restore pair they were opened in.
pub trait DrawSurface {
    /// Reset the surface and fill it with `color`.
    fn clear(&mut self, color: Color);

    fn save(&mut self);

    fn restore(&mut self);

    /// Concatenate `affine` onto the current transform.
    fn transform(&mut self, affine: Affine);

    /// Intersect the clip with `rect` in current coordinates.
    fn clip_rect(&mut self, rect: Rect);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64);

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color);

    fn stroke_circle(&mut self, center: Point, radius: f64, color: Color, width: f64);

    fn line(&mut self, from: Point, to: Point, color: Color, width: f64);

    /// Draw `bitmap` stretched to `rect`.
    fn draw_image(&mut self, bitmap: &Bitmap, rect: Rect);

    /// Lay out `text` inside `rect`, wrapping at its width.
    fn draw_text(&mut self, text: &Text, rect: Rect);

    /// Start compositing everything until `pop_layer` at `alpha`.
    fn push_layer(&mut self, alpha: f64);

    fn pop_layer(&mut self);
}

/// RGBA8 color as recorded in a display list.
pub type Rgba = [u8; 4];

fn rgba(color: Color) -> Rgba {
    let c = color.to_rgba8();
    [c.r, c.g, c.b, c.a]
}

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Rgba),
    Save,
    Restore,
    Transform(Affine),
    ClipRect(Rect),
    FillRect {
        rect: Rect,
        color: Rgba,
    },
    StrokeRect {
        rect: Rect,
        color: Rgba,
        width: f64,
    },
    FillCircle {
        center: Point,
        radius: f64,
        color: Rgba,
    },
    StrokeCircle {
        center: Point,
        radius: f64,
        color: Rgba,
        width: f64,
    },
    Line {
        from: Point,
        to: Point,
        color: Rgba,
        width: f64,
    },
    Image {
        width: u32,
        height: u32,
        rect: Rect,
        /// Transform in effect when the image was drawn.
        transform: Affine,
    },
    Text {
        text: String,
        font_size: f64,
        rect: Rect,
        transform: Affine,
    },
    PushLayer(f64),
    PopLayer,
}

/// Surface that records commands instead of rasterizing them.
///
/// Tracks the current transform so image and text commands carry the
/// transform they were drawn with.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
    current: Affine,
    stack: Vec<Affine>,
    layer_depth: usize,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Current transform.
    pub fn current_transform(&self) -> Affine {
        self.current
    }

    pub fn images(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Image { .. }))
    }

    /// Text content of every recorded text draw, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of content draws (images and text).
    pub fn content_draws(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Image { .. } | DrawCommand::Text { .. }))
            .count()
    }

    /// Whether every save has a matching restore and every layer was popped.
    pub fn is_balanced(&self) -> bool {
        self.stack.is_empty() && self.layer_depth == 0
    }
}

impl DrawSurface for DisplayList {
    fn clear(&mut self, color: Color) {
        self.commands.clear();
        self.current = Affine::IDENTITY;
        self.stack.clear();
        self.layer_depth = 0;
        self.commands.push(DrawCommand::Clear(rgba(color)));
    }

    fn save(&mut self) {
        self.stack.push(self.current);
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        if let Some(previous) = self.stack.pop() {
            self.current = previous;
        } else {
            log::warn!("DisplayList restore without matching save");
        }
        self.commands.push(DrawCommand::Restore);
    }

    fn transform(&mut self, affine: Affine) {
        self.current = self.current * affine;
        self.commands.push(DrawCommand::Transform(affine));
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::ClipRect(rect));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect {
            rect,
            color: rgba(color),
        });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64) {
        self.commands.push(DrawCommand::StrokeRect {
            rect,
            color: rgba(color),
            width,
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            radius,
            color: rgba(color),
        });
    }

    fn stroke_circle(&mut self, center: Point, radius: f64, color: Color, width: f64) {
        self.commands.push(DrawCommand::StrokeCircle {
            center,
            radius,
            color: rgba(color),
            width,
        });
    }

    fn line(&mut self, from: Point, to: Point, color: Color, width: f64) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            color: rgba(color),
            width,
        });
    }

    fn draw_image(&mut self, bitmap: &Bitmap, rect: Rect) {
        self.commands.push(DrawCommand::Image {
            width: bitmap.width,
            height: bitmap.height,
            rect,
            transform: self.current,
        });
    }

    fn draw_text(&mut self, text: &Text, rect: Rect) {
        self.commands.push(DrawCommand::Text {
            text: text.text.clone(),
            font_size: text.font_size,
            rect,
            transform: self.current,
        });
    }

    fn push_layer(&mut self, alpha: f64) {
        self.layer_depth += 1;
        self.commands.push(DrawCommand::PushLayer(alpha));
    }

    fn pop_layer(&mut self) {
        self.layer_depth = self.layer_depth.saturating_sub(1);
        self.commands.push(DrawCommand::PopLayer);
    }
}
