//! Editor session state.
//!
//! Everything the interaction layer reads or mutates lives in one
//! [`EditorState`], passed by `&mut` into the dispatcher and the renderer's
//! frame builder.

use crate::camera::Camera;
use crate::config::EditorConfig;
use crate::cursor::{CursorIcon, CursorInputs, cursor_for};
use crate::document::{Document, Page};
use crate::error::{DocumentError, DocumentResult};
use crate::hover::HoverTarget;
use crate::input::InputState;
use crate::scheduler::{Debounce, FrameScheduler};
use crate::selection::SelectedShape;
use crate::shapes::Shape;
use crate::sync::{ClientMessage, OutboundQueue, ServerMessage, ShapePatch};
use crate::text_fit::{ApproxTextMeasurer, TextMeasurer};
use crate::transform::TransformSession;
use crate::{animation, viewport};
use kurbo::{Point, Rect, Size};

/// Screen padding used when fitting a page into the canvas.
const FIT_PADDING: f64 = 40.0;

/// State of one editing session over a document.
pub struct EditorState {
    pub document: Document,
    page_index: usize,
    pub camera: Camera,
    /// Canvas size in CSS pixels.
    pub canvas_size: Size,
    pub device_pixel_ratio: f64,
    pub hover: HoverTarget,
    pub selection: SelectedShape,
    pub session: Option<TransformSession>,
    /// Whether the current session has changed its shape yet.
    pub(crate) session_changed: bool,
    /// Page shapes captured when the session opened, pushed to history on
    /// the first change.
    pub(crate) session_undo: Option<Vec<Shape>>,
    /// Space-toggled hand tool.
    pub pan_mode: bool,
    /// Index of the text shape being edited.
    pub text_edit: Option<usize>,
    pub(crate) text_edit_dirty: bool,
    pub clipboard: Option<Shape>,
    pub input: InputState,
    pub scheduler: FrameScheduler,
    /// Screen position waiting for hover recomputation.
    pub hover_debounce: Debounce<Point>,
    pub outbound: OutboundQueue,
    /// Timer deadline last handed to the host.
    pub(crate) timer_deadline: Option<f64>,
    pub cursor: CursorIcon,
    pub config: EditorConfig,
    measurer: Box<dyn TextMeasurer>,
}

impl std::fmt::Debug for EditorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorState")
            .field("document", &self.document.id)
            .field("page_index", &self.page_index)
            .field("camera", &self.camera)
            .field("hover", &self.hover)
            .field("selection", &self.selection)
            .field("session", &self.session)
            .field("text_edit", &self.text_edit)
            .finish_non_exhaustive()
    }
}

impl EditorState {
    /// Create a session over a document with at least one page.
    pub fn new(mut document: Document, config: EditorConfig) -> DocumentResult<Self> {
        if document.pages.is_empty() {
            return Err(DocumentError::Empty);
        }
        document.set_history_limit(config.max_undo_history);
        Ok(Self {
            document,
            page_index: 0,
            camera: Camera::with_zoom_bounds(config.min_zoom, config.max_zoom),
            canvas_size: Size::new(1280.0, 720.0),
            device_pixel_ratio: 1.0,
            hover: HoverTarget::None,
            selection: SelectedShape::default(),
            session: None,
            session_changed: false,
            session_undo: None,
            pan_mode: false,
            text_edit: None,
            text_edit_dirty: false,
            clipboard: None,
            input: InputState::new(),
            scheduler: FrameScheduler::new(),
            hover_debounce: Debounce::new(config.hover_debounce_ms),
            outbound: OutboundQueue::new(config.outbound_debounce_ms),
            timer_deadline: None,
            cursor: CursorIcon::Default,
            config,
            measurer: Box::new(ApproxTextMeasurer::default()),
        })
    }

    /// Replace the text measurer used for font fitting.
    pub fn with_measurer(mut self, measurer: Box<dyn TextMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    pub fn measurer_mut(&mut self) -> &mut dyn TextMeasurer {
        self.measurer.as_mut()
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page(&self) -> &Page {
        &self.document.pages[self.page_index]
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.document.pages[self.page_index]
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.page().shapes
    }

    pub fn selected_shape(&self) -> Option<&Shape> {
        self.selection.index.and_then(|i| self.shapes().get(i))
    }

    /// Switch pages, dropping all per-page interaction state.
    pub fn set_page(&mut self, index: usize) -> DocumentResult<()> {
        self.document.page(index)?;
        self.page_index = index;
        self.reset_interaction();
        animation::reset_page_animations(&mut self.page_mut().shapes);
        self.request_redraw();
        log::info!("Switched to page {index}");
        Ok(())
    }

    fn reset_interaction(&mut self) {
        self.selection.clear();
        self.hover = HoverTarget::None;
        self.session = None;
        self.session_changed = false;
        self.session_undo = None;
        self.text_edit = None;
        self.text_edit_dirty = false;
        self.hover_debounce.cancel();
    }

    /// Resize the canvas (CSS pixels) and device pixel ratio.
    pub fn set_canvas_size(&mut self, size: Size, device_pixel_ratio: f64) {
        self.canvas_size = size;
        self.device_pixel_ratio = if device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        self.request_redraw();
    }

    /// Center the current page in the canvas.
    pub fn fit_to_page(&mut self) {
        let page = self.page().size();
        self.camera.fit_page(page, self.canvas_size, FIT_PADDING);
        self.request_redraw();
    }

    /// World rectangle currently visible.
    pub fn viewport(&self) -> Rect {
        viewport::viewport_rect(&self.camera, self.canvas_size)
    }

    pub fn request_redraw(&mut self) -> bool {
        self.scheduler.request_redraw()
    }

    /// Earliest pending hover or outbound deadline.
    pub fn next_timer_deadline(&self, now_ms: f64) -> Option<f64> {
        match (self.hover_debounce.deadline(), self.outbound.next_deadline(now_ms)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        self.camera.screen_to_world(screen)
    }

    /// Drop selection, hover, session and text-edit references to shapes
    /// that no longer exist.
    pub fn validate_indices(&mut self) {
        let count = self.shapes().len();
        self.selection.validate(count);
        if matches!(self.hover, HoverTarget::Body(i) if i >= count) {
            self.hover = HoverTarget::None;
        }
        if self.hover.is_handle() && self.selection.index.is_none() {
            self.hover = HoverTarget::None;
        }
        if self.session.as_ref().is_some_and(|s| s.shape_index() >= count) {
            log::debug!("Discarding session on a removed shape");
            self.session = None;
            self.session_undo = None;
        }
        if self.text_edit.is_some_and(|i| i >= count) {
            self.text_edit = None;
        }
    }

    /// Shift shape references after removing the shape at `index`.
    pub(crate) fn on_shape_removed(&mut self, index: usize) {
        let shift = |i: usize| -> Option<usize> {
            match i.cmp(&index) {
                std::cmp::Ordering::Less => Some(i),
                std::cmp::Ordering::Equal => None,
                std::cmp::Ordering::Greater => Some(i - 1),
            }
        };
        match self.selection.index.map(shift) {
            Some(Some(i)) => self.selection.index = Some(i),
            Some(None) => self.selection.clear(),
            None => {}
        }
        self.hover = match self.hover {
            HoverTarget::Body(i) => shift(i).map_or(HoverTarget::None, HoverTarget::Body),
            other if self.selection.index.is_none() && other.is_handle() => HoverTarget::None,
            other => other,
        };
        // Sessions hold a raw index; any shift invalidates them.
        if self.session.as_ref().is_some_and(|s| s.shape_index() >= index) {
            self.session = None;
            self.session_undo = None;
        }
        self.text_edit = self.text_edit.and_then(shift);
    }

    /// Mutate one shape of the current page. Local edits and remote patches
    /// both go through here. Returns whether the shape changed.
    pub fn mutate_shape(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut Shape, &EditorConfig, &mut dyn TextMeasurer) -> bool,
    ) -> bool {
        let page = &mut self.document.pages[self.page_index];
        let Some(shape) = page.shapes.get_mut(index) else {
            log::debug!("Ignoring mutation of missing shape {index}");
            return false;
        };
        let changed = f(shape, &self.config, self.measurer.as_mut());
        if changed {
            self.scheduler.request_redraw();
        }
        changed
    }

    /// Queue a debounced update for a locally changed shape.
    pub fn publish_shape(&mut self, index: usize, now_ms: f64) {
        let page = self.page();
        let Some(patch) = page.shape(index).and_then(ShapePatch::from_shape) else {
            return;
        };
        let page_id = page.id.clone();
        self.outbound.push_update(&page_id, patch, now_ms);
    }

    /// Queue the current page's full shape list, used after undo/redo.
    pub fn publish_page(&mut self) {
        let page = self.page();
        let message = ClientMessage::SyncPage {
            page_id: page.id.clone(),
            shapes: page.shapes.clone(),
        };
        self.outbound.push_immediate(message);
    }

    /// Apply a backend message through the local mutation path.
    ///
    /// Returns `true` if the current page changed.
    pub fn apply_remote(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::ShapeUpdated { page_id, patch } => {
                let Some(page_index) = self.page_index_by_id(&page_id) else {
                    log::warn!("Remote update for unknown page {page_id}");
                    return false;
                };
                if page_index != self.page_index {
                    if let Some(shape) = self.document.pages[page_index]
                        .index_of(patch.id)
                        .and_then(|i| self.document.pages[page_index].shape_mut(i))
                    {
                        patch.apply(shape);
                    }
                    return false;
                }
                let Some(index) = self.page().index_of(patch.id) else {
                    log::debug!("Remote update for unknown shape {}", patch.id);
                    return false;
                };
                self.mutate_shape(index, |shape, _, _| {
                    patch.apply(shape);
                    true
                })
            }
            ServerMessage::ShapeCreated { page_id, mut shape } => {
                shape.base_mut().normalize();
                let Some(page_index) = self.page_index_by_id(&page_id) else {
                    log::warn!("Remote shape for unknown page {page_id}");
                    return false;
                };
                let page = &mut self.document.pages[page_index];
                match shape.id().and_then(|id| page.index_of(id)) {
                    Some(existing) => page.shapes[existing] = shape,
                    None => page.shapes.push(shape),
                }
                if page_index == self.page_index {
                    self.request_redraw();
                    true
                } else {
                    false
                }
            }
            ServerMessage::ShapeDeleted { page_id, id } => {
                let Some(page_index) = self.page_index_by_id(&page_id) else {
                    return false;
                };
                let Some(index) = self.document.pages[page_index].index_of(id) else {
                    return false;
                };
                self.document.pages[page_index].shapes.remove(index);
                if page_index == self.page_index {
                    self.on_shape_removed(index);
                    self.request_redraw();
                    true
                } else {
                    false
                }
            }
            ServerMessage::Error { message } => {
                log::warn!("Backend error: {message}");
                false
            }
        }
    }

    fn page_index_by_id(&self, page_id: &str) -> Option<usize> {
        self.document.pages.iter().position(|p| p.id == page_id)
    }

    /// Recompute the cursor. Returns the new cursor if it changed.
    pub fn update_cursor(&mut self) -> Option<CursorIcon> {
        let pointer_world = self.screen_to_world(self.input.pointer_position);
        let selected = self.selected_shape().map(|s| s.base());
        let over_text_edit = self
            .text_edit
            .and_then(|i| self.shapes().get(i))
            .is_some_and(|s| s.base().contains(pointer_world));
        let inputs = CursorInputs {
            hover: self.hover,
            session: self.session.as_ref(),
            selected,
            pan_mode: self.pan_mode || self.camera.is_panning,
            pointer_down: self.camera.is_panning,
            over_text_edit,
        };
        let cursor = cursor_for(&inputs);
        if cursor == self.cursor {
            return None;
        }
        self.cursor = cursor;
        Some(cursor)
    }
}
