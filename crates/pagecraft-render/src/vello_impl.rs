//! Vello-backed drawing surface.

use crate::surface::DrawSurface;
use crate::text_layout::TextLayouter;
use kurbo::{Affine, Circle, Line, Point, Rect, Size, Stroke};
use pagecraft_core::shapes::{Bitmap, Text};
use parley::layout::PositionedLayoutItem;
use peniko::{Brush, Color, Fill};
use std::collections::HashMap;
use std::sync::Arc;
use vello::Scene;
use vello::peniko::BlendMode;

/// Per-save state: the transform to return to and how many clip layers
/// were opened at this level.
#[derive(Debug, Clone, Copy)]
struct SavedState {
    transform: Affine,
    clip_layers: usize,
}

/// [`DrawSurface`] that builds a vello [`Scene`] with parley text.
pub struct VelloSurface {
    scene: Scene,
    layouter: TextLayouter,
    /// Surface size in physical pixels, used to bound alpha layers.
    size: Size,
    current: Affine,
    clip_layers: usize,
    stack: Vec<SavedState>,
    /// Decoded bitmaps keyed by pixel buffer, so vello sees a stable blob.
    image_cache: HashMap<usize, vello::peniko::ImageData>,
}

impl std::fmt::Debug for VelloSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VelloSurface")
            .field("size", &self.size)
            .field("depth", &self.stack.len())
            .field("cached_images", &self.image_cache.len())
            .finish_non_exhaustive()
    }
}

impl VelloSurface {
    pub fn new(size: Size) -> Self {
        Self {
            scene: Scene::new(),
            layouter: TextLayouter::new(),
            size,
            current: Affine::IDENTITY,
            clip_layers: 0,
            stack: Vec::new(),
            image_cache: HashMap::new(),
        }
    }

    pub fn resize(&mut self, size: Size) {
        self.size = size;
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    /// Drop cached image data, e.g. after a page switch.
    pub fn clear_image_cache(&mut self) {
        self.image_cache.clear();
    }

    fn full_rect(&self) -> Rect {
        Rect::from_origin_size(Point::ORIGIN, self.size)
    }

    fn image_data(&mut self, bitmap: &Bitmap) -> vello::peniko::ImageData {
        let key = Arc::as_ptr(&bitmap.pixels) as usize;
        self.image_cache
            .entry(key)
            .or_insert_with(|| vello::peniko::ImageData {
                data: vello::peniko::Blob::new(bitmap.pixels.clone()),
                format: vello::peniko::ImageFormat::Rgba8,
                width: bitmap.width,
                height: bitmap.height,
                alpha_type: vello::peniko::ImageAlphaType::Alpha,
            })
            .clone()
    }
}

impl DrawSurface for VelloSurface {
    fn clear(&mut self, color: Color) {
        self.scene.reset();
        self.current = Affine::IDENTITY;
        self.clip_layers = 0;
        self.stack.clear();
        if color.to_rgba8().a > 0 {
            let rect = self.full_rect();
            self.scene.fill(Fill::NonZero, Affine::IDENTITY, color, None, &rect);
        }
    }

    fn save(&mut self) {
        self.stack.push(SavedState {
            transform: self.current,
            clip_layers: self.clip_layers,
        });
        self.clip_layers = 0;
    }

    fn restore(&mut self) {
        for _ in 0..self.clip_layers {
            self.scene.pop_layer();
        }
        match self.stack.pop() {
            Some(saved) => {
                self.current = saved.transform;
                self.clip_layers = saved.clip_layers;
            }
            None => {
                log::warn!("VelloSurface restore without matching save");
                self.current = Affine::IDENTITY;
                self.clip_layers = 0;
            }
        }
    }

    fn transform(&mut self, affine: Affine) {
        self.current = self.current * affine;
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.scene
            .push_layer(Fill::NonZero, BlendMode::default(), 1.0, self.current, &rect);
        self.clip_layers += 1;
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.scene.fill(Fill::NonZero, self.current, color, None, &rect);
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64) {
        self.scene
            .stroke(&Stroke::new(width), self.current, color, None, &rect);
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color) {
        let circle = Circle::new(center, radius);
        self.scene.fill(Fill::NonZero, self.current, color, None, &circle);
    }

    fn stroke_circle(&mut self, center: Point, radius: f64, color: Color, width: f64) {
        let circle = Circle::new(center, radius);
        self.scene
            .stroke(&Stroke::new(width), self.current, color, None, &circle);
    }

    fn line(&mut self, from: Point, to: Point, color: Color, width: f64) {
        let line = Line::new(from, to);
        self.scene
            .stroke(&Stroke::new(width), self.current, color, None, &line);
    }

    fn draw_image(&mut self, bitmap: &Bitmap, rect: Rect) {
        if bitmap.width == 0 || bitmap.height == 0 {
            return;
        }
        let image_data = self.image_data(bitmap);
        let scale_x = rect.width() / bitmap.width as f64;
        let scale_y = rect.height() / bitmap.height as f64;
        let image_transform = self.current
            * Affine::translate((rect.x0, rect.y0))
            * Affine::scale_non_uniform(scale_x, scale_y);
        self.scene.draw_image(&vello::peniko::ImageBrush::from(image_data), image_transform);
    }

    fn draw_text(&mut self, text: &Text, rect: Rect) {
        if text.text.is_empty() {
            return;
        }
        let layout = self.layouter.layout(text, text.font_size, Some(rect.width()));
        let brush = Brush::Solid(text.fill_color());
        let text_transform = self.current * Affine::translate((rect.x0, rect.y0));

        for line in layout.lines() {
            for item in line.items() {
                let PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let mut x = glyph_run.offset();
                let y = glyph_run.baseline();
                let run = glyph_run.run();
                let synthesis = run.synthesis();
                let glyph_xform = synthesis
                    .skew()
                    .map(|angle| Affine::skew(angle.to_radians().tan() as f64, 0.0));

                let glyphs: Vec<vello::Glyph> = glyph_run
                    .glyphs()
                    .map(|glyph| {
                        let gx = x + glyph.x;
                        let gy = y - glyph.y;
                        x += glyph.advance;
                        vello::Glyph {
                            id: glyph.id,
                            x: gx,
                            y: gy,
                        }
                    })
                    .collect();

                if !glyphs.is_empty() {
                    self.scene
                        .draw_glyphs(run.font())
                        .brush(&brush)
                        .hint(false)
                        .transform(text_transform)
                        .glyph_transform(glyph_xform)
                        .font_size(run.font_size())
                        .normalized_coords(run.normalized_coords())
                        .draw(Fill::NonZero, glyphs.into_iter());
                }
            }
        }
    }

    fn push_layer(&mut self, alpha: f64) {
        let rect = self.full_rect();
        self.scene.push_layer(
            Fill::NonZero,
            BlendMode::default(),
            alpha.clamp(0.0, 1.0) as f32,
            Affine::IDENTITY,
            &rect,
        );
    }

    fn pop_layer(&mut self) {
        self.scene.pop_layer();
    }
}
