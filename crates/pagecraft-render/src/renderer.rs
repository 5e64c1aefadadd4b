//! Scene composition for the main canvas and the transform overlay.

use crate::surface::DrawSurface;
use kurbo::{Affine, Point};
use pagecraft_core::animation::{self, AnimationState};
use pagecraft_core::editor::EditorState;
use pagecraft_core::error::DocumentError;
use pagecraft_core::selection::{HandleKind, get_handles};
use pagecraft_core::shapes::{Shape, ShapeBase};
use pagecraft_core::viewport;
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("Invalid canvas size {width}x{height}")]
    InvalidCanvas { width: f64, height: f64 },
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// How shapes are posed when drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderMode {
    /// Shapes drawn at rest, editing chrome on top.
    Edit,
    /// Animations play against `now_ms`.
    Preview { now_ms: f64 },
    /// Like preview without chrome; `settle` forces every shape to its final pose.
    Export { now_ms: f64, settle: bool },
}

impl RenderMode {
    pub fn is_edit(&self) -> bool {
        matches!(self, RenderMode::Edit)
    }
}

/// Colors and stroke widths for the editing chrome.
#[derive(Debug, Clone, Copy)]
pub struct RenderStyle {
    /// Fill behind the page.
    pub canvas_color: Color,
    pub selection_color: Color,
    pub hover_color: Color,
    pub handle_fill: Color,
    /// Stroke width in screen pixels.
    pub border_width: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            canvas_color: Color::from_rgba8(229, 231, 235, 255),
            selection_color: Color::from_rgba8(59, 130, 246, 255),
            hover_color: Color::from_rgba8(147, 197, 253, 255),
            handle_fill: Color::WHITE,
            border_width: 1.5,
        }
    }
}

/// What a frame drew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Shapes that reached the surface.
    pub drawn: usize,
    /// Shapes outside the viewport.
    pub culled: usize,
    /// Shapes whose animation has not finished.
    pub animating: usize,
}

impl FrameStats {
    /// Whether another frame is needed to finish animations.
    pub fn needs_another_frame(&self) -> bool {
        self.animating > 0
    }
}

/// Builds frames from editor state onto a [`DrawSurface`].
#[derive(Debug, Clone, Default)]
pub struct SceneRenderer {
    pub style: RenderStyle,
}

impl SceneRenderer {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    /// Draw the main canvas.
    ///
    /// With `overlay_active` the shape of the open transform session is left
    /// out, along with its chrome; [`SceneRenderer::build_overlay`] draws them.
    pub fn build_frame(
        &self,
        state: &mut EditorState,
        surface: &mut dyn DrawSurface,
        mode: RenderMode,
        overlay_active: bool,
    ) -> FrameStats {
        let mut stats = FrameStats::default();
        let zoom = state.camera.zoom;
        let view = state.viewport();
        let transforming = state.session.as_ref().map(|s| s.shape_index());
        let skip = if overlay_active { transforming } else { None };

        surface.clear(self.style.canvas_color);
        surface.save();
        surface.transform(Affine::scale(state.device_pixel_ratio));
        surface.transform(state.camera.transform());

        let page_bounds = state.page().bounds();
        surface.fill_rect(page_bounds, state.page().background.color.into());

        // The preview sits under the page content, so it stays on this
        // surface; it is hidden while the overlay carries the selected image.
        if mode.is_edit() && (skip.is_none() || skip != state.selection.index) {
            self.draw_image_preview(state, surface);
        }

        surface.save();
        surface.clip_rect(page_bounds);
        for index in 0..state.shapes().len() {
            if skip == Some(index) {
                continue;
            }
            let shape = &mut state.page_mut().shapes[index];
            if !viewport::shape_visible(shape, view) {
                stats.culled += 1;
                continue;
            }
            let pose = pose_for(shape, mode);
            if pose.still_animating {
                stats.animating += 1;
            }
            if draw_shape(surface, shape, &pose) {
                stats.drawn += 1;
            }
        }
        surface.restore();

        if mode.is_edit() {
            self.draw_hover(state, surface, transforming, zoom);
            let suppressed = state.selection.suppress_overlay_border && transforming.is_some();
            if !suppressed {
                if let Some(shape) = state.selected_shape() {
                    self.draw_selection(surface, shape.base(), state, zoom);
                }
            }
        }

        surface.restore();
        stats
    }

    /// Draw page `page_index` without editing chrome, switching to it first
    /// if it is not current.
    pub fn export_frame(
        &self,
        state: &mut EditorState,
        page_index: usize,
        surface: &mut dyn DrawSurface,
        now_ms: f64,
        settle: bool,
    ) -> RenderResult<FrameStats> {
        let canvas = state.canvas_size;
        if !(canvas.width > 0.0 && canvas.height > 0.0) {
            return Err(RendererError::InvalidCanvas {
                width: canvas.width,
                height: canvas.height,
            });
        }
        if state.page_index() != page_index {
            state.set_page(page_index)?;
        }
        Ok(self.build_frame(state, surface, RenderMode::Export { now_ms, settle }, false))
    }

    /// Draw the transparent overlay above the main canvas: the shape of the
    /// open transform session and its handles. Returns `false` (leaving the
    /// surface cleared) when no session is open.
    pub fn build_overlay(&self, state: &mut EditorState, surface: &mut dyn DrawSurface) -> bool {
        surface.clear(Color::TRANSPARENT);
        let Some(index) = state.session.as_ref().map(|s| s.shape_index()) else {
            return false;
        };
        if index >= state.shapes().len() {
            log::debug!("Overlay skipped for missing shape {index}");
            return false;
        }
        let zoom = state.camera.zoom;

        surface.save();
        surface.transform(Affine::scale(state.device_pixel_ratio));
        surface.transform(state.camera.transform());

        surface.save();
        surface.clip_rect(state.page().bounds());
        let shape = &state.shapes()[index];
        draw_shape(surface, shape, &AnimationState::settled(animation::AnimationPhase::Idle));
        surface.restore();

        self.draw_selection(surface, shape.base(), state, zoom);
        surface.restore();
        true
    }

    /// Full-bleed, low-opacity copy of the selected image so the part
    /// outside the page stays visible.
    fn draw_image_preview(&self, state: &EditorState, surface: &mut dyn DrawSurface) {
        let Some(Shape::Image(image)) = state.selected_shape() else {
            return;
        };
        let Some(bitmap) = image.handle.bitmap() else {
            return;
        };
        let base = &image.base;
        surface.save();
        surface.transform(rotation_transform(base));
        surface.push_layer(state.config.image_preview_opacity);
        surface.draw_image(bitmap, base.bounds());
        surface.pop_layer();
        surface.restore();
    }

    fn draw_hover(
        &self,
        state: &EditorState,
        surface: &mut dyn DrawSurface,
        transforming: Option<usize>,
        zoom: f64,
    ) {
        let Some(index) = state.hover.body_index() else {
            return;
        };
        if state.selection.is(index) || transforming == Some(index) {
            return;
        }
        let Some(shape) = state.shapes().get(index) else {
            return;
        };
        let base = shape.base();
        surface.save();
        surface.transform(rotation_transform(base));
        surface.stroke_rect(base.bounds(), self.style.hover_color, self.style.border_width / zoom);
        surface.restore();
    }

    fn draw_selection(
        &self,
        surface: &mut dyn DrawSurface,
        base: &ShapeBase,
        state: &EditorState,
        zoom: f64,
    ) {
        let width = self.style.border_width / zoom;
        surface.save();
        surface.transform(rotation_transform(base));
        surface.stroke_rect(base.bounds(), self.style.selection_color, width);
        surface.restore();

        let handles = get_handles(base, zoom, &state.config);
        let top_center = base.to_world(Point::new(base.x + base.width / 2.0, base.y));
        let radius = state.config.handle_base_radius_px / zoom;
        for handle in &handles {
            match handle.kind {
                HandleKind::Rotate => {
                    surface.line(top_center, handle.position, self.style.selection_color, width);
                    let r = state.config.rotate_handle_radius_px / zoom;
                    surface.fill_circle(handle.position, r, self.style.handle_fill);
                    surface.stroke_circle(handle.position, r, self.style.selection_color, width);
                }
                HandleKind::Corner(_) => {
                    surface.fill_circle(handle.position, radius, self.style.handle_fill);
                    surface.stroke_circle(handle.position, radius, self.style.selection_color, width);
                }
            }
        }
    }
}

/// Rotation of a shape about its center, in world space.
fn rotation_transform(base: &ShapeBase) -> Affine {
    let rotation = base.rotation();
    if rotation == 0.0 {
        Affine::IDENTITY
    } else {
        Affine::rotate_about(rotation.to_radians(), base.center())
    }
}

fn pose_for(shape: &mut Shape, mode: RenderMode) -> AnimationState {
    match mode {
        RenderMode::Edit => AnimationState::settled(animation::AnimationPhase::Idle),
        RenderMode::Preview { now_ms } => animation::observe(shape.base_mut(), now_ms),
        RenderMode::Export { settle: true, .. } => animation::force_final_state(shape.base()),
        RenderMode::Export { now_ms, settle: false } => animation::observe(shape.base_mut(), now_ms),
    }
}

/// Draw one shape in its pose. Returns whether anything was drawn.
fn draw_shape(surface: &mut dyn DrawSurface, shape: &Shape, pose: &AnimationState) -> bool {
    if !pose.is_drawable() {
        return false;
    }
    let base = shape.base();
    let bounds = base.bounds();
    let bitmap = match shape {
        Shape::Image(image) => match image.handle.bitmap() {
            Some(bitmap) => Some(bitmap),
            // Pending and failed images have nothing to draw yet.
            None => return false,
        },
        Shape::Text(text) => {
            if text.text.is_empty() {
                return false;
            }
            None
        }
    };

    surface.save();
    surface.transform(Affine::translate(pose.offset) * rotation_transform(base));
    if let Some(clip) = pose.clip {
        surface.clip_rect(clip);
    }
    let layered = pose.alpha < 1.0;
    if layered {
        surface.push_layer(pose.alpha);
    }
    match (shape, bitmap) {
        (Shape::Image(_), Some(bitmap)) => surface.draw_image(bitmap, bounds),
        (Shape::Text(text), _) => surface.draw_text(text, bounds),
        (Shape::Image(_), None) => {}
    }
    if layered {
        surface.pop_layer();
    }
    surface.restore();
    true
}
