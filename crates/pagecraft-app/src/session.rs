//! Headless editor session: drives the editor state, image loading and frame
//! building the way an interactive host would, without a window.
//!
//! Input events go through the dispatcher. Each frame tick drains image
//! decodes, resolves debounced timers, and draws only when a redraw was
//! scheduled. While a transform session is open the main canvas is drawn
//! without the transforming shape, and later frames rebuild only the overlay
//! until the camera, the page, or anything else on it changes.

use crate::config::AppConfig;
use crate::export::{ExportFrame, ExportTimeline};
use kurbo::{Rect, Size};
use pagecraft_core::animation::reset_page_animations;
use pagecraft_core::{
    ClientMessage, Document, DocumentResult, EditorCommand, EditorState, InputEvent,
    ServerMessage, Tick, dispatch, tick,
};
use pagecraft_render::{
    DisplayList, DrawCommand, DrawSurface, FrameStats, ImageLoader, RenderMode, RenderResult,
    SceneRenderer,
};
use peniko::Color;
use serde::Serialize;

pub struct Session {
    pub state: EditorState,
    renderer: SceneRenderer,
    loader: ImageLoader,
    canvas: DisplayList,
    overlay: DisplayList,
    overlay_enabled: bool,
    preview: bool,
    /// Inputs of the last main-canvas build that left a shape to the overlay.
    canvas_key: Option<CanvasKey>,
    /// Something besides the session shape changed since the last build.
    canvas_stale: bool,
    last_stats: FrameStats,
    frames_drawn: u64,
    overlay_only_frames: u64,
    sent: Vec<ClientMessage>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("page_index", &self.state.page_index())
            .field("preview", &self.preview)
            .field("frames_drawn", &self.frames_drawn)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(document: Document, config: &AppConfig) -> DocumentResult<Self> {
        let mut state = EditorState::new(document, config.editor.clone())?;
        #[cfg(feature = "vello-renderer")]
        {
            state = state.with_measurer(Box::new(pagecraft_render::ParleyMeasurer::new()));
        }
        state.set_canvas_size(Size::new(config.width, config.height), config.device_pixel_ratio);
        state.fit_to_page();
        log::info!(
            "Session opened: {} page(s), canvas {}x{}",
            state.document.pages.len(),
            config.width,
            config.height
        );
        Ok(Self {
            state,
            renderer: SceneRenderer::new(config.render_style()),
            loader: ImageLoader::new(),
            canvas: DisplayList::new(),
            overlay: DisplayList::new(),
            overlay_enabled: true,
            preview: false,
            canvas_key: None,
            canvas_stale: true,
            last_stats: FrameStats::default(),
            frames_drawn: 0,
            overlay_only_frames: 0,
            sent: Vec::new(),
        })
    }

    /// Draw the transforming shape on the main canvas instead of an overlay.
    pub fn with_overlay(mut self, enabled: bool) -> Self {
        self.overlay_enabled = enabled;
        self
    }

    pub fn canvas(&self) -> &DisplayList {
        &self.canvas
    }

    pub fn overlay(&self) -> &DisplayList {
        &self.overlay
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Frames where only the overlay was rebuilt.
    pub fn overlay_only_frames(&self) -> u64 {
        self.overlay_only_frames
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    /// Messages released to the transport so far.
    pub fn sent(&self) -> &[ClientMessage] {
        &self.sent
    }

    pub fn take_sent(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.sent)
    }

    /// Route one input event. Frame events run a full tick.
    pub fn handle(&mut self, event: &InputEvent) -> Vec<EditorCommand> {
        if let InputEvent::Frame { time_ms } = event {
            return self.frame(*time_ms);
        }
        let commands = dispatch(&mut self.state, event);
        self.collect_sent(&commands);
        commands
    }

    /// Apply a backend message. Returns `true` if the current page changed.
    pub fn apply_remote(&mut self, message: ServerMessage) -> bool {
        let changed = self.state.apply_remote(message);
        self.canvas_stale |= changed;
        changed
    }

    /// Switch between editing and animated preview. Entering preview
    /// replays the page's animations from the start.
    pub fn set_preview(&mut self, enabled: bool) {
        if self.preview == enabled {
            return;
        }
        self.preview = enabled;
        self.canvas_stale = true;
        if enabled {
            reset_page_animations(&mut self.state.page_mut().shapes);
        }
        self.state.request_redraw();
        log::debug!("Preview {}", if enabled { "on" } else { "off" });
    }

    /// Run one frame tick at `now_ms`.
    pub fn frame(&mut self, now_ms: f64) -> Vec<EditorCommand> {
        if self.sync_images() {
            self.state.request_redraw();
        }

        let Tick { redraw, mut commands } = tick(&mut self.state, now_ms);
        self.collect_sent(&commands);
        if !redraw {
            return commands;
        }

        let stats = self.draw(now_ms);
        if stats.needs_another_frame() && self.state.request_redraw() {
            commands.push(EditorCommand::ScheduleFrame);
        }
        commands
    }

    /// Release every queued outbound message now.
    pub fn flush_outbound(&mut self) -> Vec<ClientMessage> {
        let messages = self.state.outbound.flush();
        self.sent.extend(messages.iter().cloned());
        messages
    }

    /// Block until every requested image has decoded.
    pub fn finish_images(&mut self) -> bool {
        let view = self.state.viewport();
        let shapes = &mut self.state.page_mut().shapes;
        let mut changed = self.loader.sync_visible(shapes, view);
        changed |= self.loader.finish(shapes);
        if changed {
            self.canvas_stale = true;
            self.state.request_redraw();
        }
        changed
    }

    /// Draw page `page_index` at page-local `time_ms` with every image
    /// loaded. Animated modes start the page's animations at time zero.
    pub fn render_page(
        &mut self,
        page_index: usize,
        time_ms: f64,
        mode: RenderMode,
    ) -> RenderResult<FrameStats> {
        self.state.set_page(page_index)?;
        self.state.fit_to_page();
        self.finish_images();

        let stats = match mode {
            RenderMode::Edit => self.renderer.build_frame(&mut self.state, &mut self.canvas, mode, false),
            RenderMode::Preview { .. } => {
                self.renderer
                    .build_frame(&mut self.state, &mut self.canvas, RenderMode::Preview { now_ms: 0.0 }, false);
                self.renderer.build_frame(
                    &mut self.state,
                    &mut self.canvas,
                    RenderMode::Preview { now_ms: time_ms },
                    false,
                )
            }
            RenderMode::Export { settle, .. } => {
                self.renderer
                    .export_frame(&mut self.state, page_index, &mut self.canvas, 0.0, settle)?;
                self.renderer
                    .export_frame(&mut self.state, page_index, &mut self.canvas, time_ms, settle)?
            }
        };
        self.overlay.clear(Color::TRANSPARENT);
        self.canvas_key = None;
        self.record(stats);
        Ok(stats)
    }

    /// Draw every frame of `timeline`, handing each to `on_frame`.
    ///
    /// Returns the number of frames drawn.
    pub fn export<F>(&mut self, timeline: &ExportTimeline, mut on_frame: F) -> RenderResult<usize>
    where
        F: FnMut(&ExportFrame, &DisplayList, FrameStats),
    {
        let mut count = 0;
        let mut current_page = None;
        for frame in timeline.frames() {
            if current_page != Some(frame.page_index) {
                self.state.set_page(frame.page_index)?;
                self.state.fit_to_page();
                self.finish_images();
                current_page = Some(frame.page_index);
            }
            let stats = self.renderer.export_frame(
                &mut self.state,
                frame.page_index,
                &mut self.canvas,
                frame.local_ms,
                frame.settle,
            )?;
            self.canvas_key = None;
            self.record(stats);
            on_frame(&frame, &self.canvas, stats);
            count += 1;
        }
        log::info!("Exported {count} frame(s) over {:.0} ms", timeline.total_ms);
        Ok(count)
    }

    /// Summary of the last drawn frame.
    pub fn summary(&self) -> FrameSummary {
        FrameSummary::new(self.state.page_index(), self.last_stats, &self.canvas)
    }

    fn sync_images(&mut self) -> bool {
        let view = self.state.viewport();
        let shapes = &mut self.state.page_mut().shapes;
        let completed = self.loader.apply_completed(shapes);
        let patched = self.loader.sync_visible(shapes, view);
        let changed = completed || patched;
        self.canvas_stale |= changed;
        changed
    }

    fn draw(&mut self, now_ms: f64) -> FrameStats {
        let mode = if self.preview {
            RenderMode::Preview { now_ms }
        } else {
            RenderMode::Edit
        };
        let session_shape = self.state.session.as_ref().map(|s| s.shape_index());
        let key = session_shape
            .filter(|_| self.overlay_enabled && mode.is_edit())
            .map(|excludes| CanvasKey {
                page_index: self.state.page_index(),
                excludes,
                viewport: self.state.viewport(),
            });

        if key.is_some() && key == self.canvas_key && !self.canvas_stale {
            self.renderer.build_overlay(&mut self.state, &mut self.overlay);
            self.overlay_only_frames += 1;
            return self.last_stats;
        }

        let overlay_active = key.is_some();
        let stats = self
            .renderer
            .build_frame(&mut self.state, &mut self.canvas, mode, overlay_active);
        if overlay_active {
            self.renderer.build_overlay(&mut self.state, &mut self.overlay);
        } else {
            self.overlay.clear(Color::TRANSPARENT);
        }
        self.canvas_key = key;
        self.canvas_stale = false;
        self.record(stats);
        stats
    }

    fn record(&mut self, stats: FrameStats) {
        self.last_stats = stats;
        self.frames_drawn += 1;
    }

    fn collect_sent(&mut self, commands: &[EditorCommand]) {
        for command in commands {
            if let EditorCommand::Send { message } = command {
                self.sent.push(message.clone());
            }
        }
    }
}

/// What a main canvas drawn under an overlay depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CanvasKey {
    page_index: usize,
    /// Shape left to the overlay.
    excludes: usize,
    /// Covers pan, zoom and canvas size.
    viewport: Rect,
}

/// Printable description of a drawn frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSummary {
    pub page_index: usize,
    pub drawn: usize,
    pub culled: usize,
    pub animating: usize,
    pub commands: usize,
    pub images: usize,
    pub texts: Vec<String>,
    /// Alpha of every layer pushed, in draw order.
    pub layers: Vec<f64>,
}

impl FrameSummary {
    pub fn new(page_index: usize, stats: FrameStats, list: &DisplayList) -> Self {
        Self {
            page_index,
            drawn: stats.drawn,
            culled: stats.culled,
            animating: stats.animating,
            commands: list.commands().len(),
            images: list.images().count(),
            texts: list.texts().into_iter().map(str::to_string).collect(),
            layers: list
                .commands()
                .iter()
                .filter_map(|c| match c {
                    DrawCommand::PushLayer(alpha) => Some(*alpha),
                    _ => None,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Rect};
    use pagecraft_core::animation::{AnimationConfig, AnimationKind};
    use pagecraft_core::{Modifiers, MouseButton, Page, Shape, Text};

    fn document() -> Document {
        let mut page = Page::new(800.0, 600.0);
        let mut title = Text::new(Rect::new(100.0, 100.0, 300.0, 160.0), "Title");
        title.base.id = Some(7);
        title.base.animation = AnimationConfig::new(AnimationKind::Fade).with_timing(0.0, 300.0);
        page.shapes.push(Shape::Text(title));
        Document::new(vec![page, Page::new(800.0, 600.0)])
    }

    fn session() -> Session {
        Session::new(document(), &AppConfig::default()).unwrap()
    }

    fn screen(session: &Session, x: f64, y: f64) -> Point {
        session.state.camera.world_to_screen(Point::new(x, y))
    }

    fn down(session: &mut Session, at: Point, t: f64) {
        session.handle(&InputEvent::PointerDown {
            position: at,
            button: MouseButton::Left,
            modifiers: Modifiers::default(),
            time_ms: t,
        });
    }

    fn mv(session: &mut Session, at: Point, t: f64) {
        session.handle(&InputEvent::PointerMove { position: at, time_ms: t });
    }

    fn up(session: &mut Session, at: Point, t: f64) {
        session.handle(&InputEvent::PointerUp {
            position: at,
            button: MouseButton::Left,
            time_ms: t,
        });
    }

    #[test]
    fn test_first_frame_draws_page() {
        let mut session = session();
        session.frame(0.0);
        assert_eq!(session.frames_drawn(), 1);
        assert_eq!(session.canvas().texts(), vec!["Title"]);
        assert!(session.canvas().is_balanced());

        // Nothing scheduled: no redraw.
        session.frame(16.0);
        assert_eq!(session.frames_drawn(), 1);
    }

    #[test]
    fn test_drag_redraws_overlay_only() {
        let mut session = session();
        session.frame(0.0);

        let start = screen(&session, 150.0, 130.0);
        down(&mut session, start, 10.0);
        session.frame(16.0);
        // The main canvas leaves the dragged shape to the overlay.
        assert!(session.canvas().texts().is_empty());
        assert_eq!(session.overlay().texts(), vec!["Title"]);

        mv(&mut session, start + kurbo::Vec2::new(10.0, 0.0), 20.0);
        session.frame(32.0);
        mv(&mut session, start + kurbo::Vec2::new(20.0, 0.0), 40.0);
        session.frame(48.0);
        assert_eq!(session.overlay_only_frames(), 2);

        up(&mut session, start + kurbo::Vec2::new(20.0, 0.0), 50.0);
        session.frame(64.0);
        assert_eq!(session.canvas().texts(), vec!["Title"]);
        assert!(session.overlay().commands().len() == 1);
    }

    #[test]
    fn test_pan_during_drag_rebuilds_canvas() {
        let mut session = session();
        session.frame(0.0);
        let start = screen(&session, 150.0, 130.0);
        down(&mut session, start, 10.0);
        session.frame(16.0);
        mv(&mut session, start + kurbo::Vec2::new(10.0, 0.0), 20.0);
        let before = session.canvas().commands().to_vec();
        let frames = session.frames_drawn();

        session.handle(&InputEvent::Wheel {
            position: start,
            delta: kurbo::Vec2::new(0.0, 200.0),
            modifiers: Modifiers::default(),
            time_ms: 24.0,
        });
        session.frame(32.0);
        assert_eq!(session.overlay_only_frames(), 0);
        assert_eq!(session.frames_drawn(), frames + 1);
        assert_ne!(session.canvas().commands(), before.as_slice());

        // With the camera still, the next move is overlay-only again.
        mv(&mut session, start + kurbo::Vec2::new(20.0, 0.0), 40.0);
        session.frame(48.0);
        assert_eq!(session.overlay_only_frames(), 1);
    }

    #[test]
    fn test_remote_change_during_drag_rebuilds_canvas() {
        let mut session = session();
        session.frame(0.0);
        let start = screen(&session, 150.0, 130.0);
        down(&mut session, start, 10.0);
        session.frame(16.0);
        mv(&mut session, start + kurbo::Vec2::new(10.0, 0.0), 20.0);
        session.frame(32.0);
        assert_eq!(session.overlay_only_frames(), 1);

        let mut other = Text::new(Rect::new(400.0, 300.0, 600.0, 360.0), "Remote");
        other.base.id = Some(8);
        let page_id = session.state.page().id.clone();
        assert!(session.apply_remote(ServerMessage::ShapeCreated {
            page_id,
            shape: Shape::Text(other),
        }));
        mv(&mut session, start + kurbo::Vec2::new(20.0, 0.0), 40.0);
        session.frame(48.0);
        assert_eq!(session.overlay_only_frames(), 1);
        assert_eq!(session.canvas().texts(), vec!["Remote"]);
        assert_eq!(session.overlay().texts(), vec!["Title"]);
    }

    #[test]
    fn test_drag_without_overlay_redraws_canvas() {
        let mut session = session().with_overlay(false);
        session.frame(0.0);
        let start = screen(&session, 150.0, 130.0);
        down(&mut session, start, 10.0);
        session.frame(16.0);
        mv(&mut session, start + kurbo::Vec2::new(10.0, 0.0), 20.0);
        session.frame(32.0);
        assert_eq!(session.overlay_only_frames(), 0);
        assert_eq!(session.canvas().texts(), vec!["Title"]);
    }

    #[test]
    fn test_drag_publishes_after_quiet_period() {
        let mut session = session();
        let start = screen(&session, 150.0, 130.0);
        down(&mut session, start, 0.0);
        mv(&mut session, start + kurbo::Vec2::new(30.0, 0.0), 10.0);
        up(&mut session, start + kurbo::Vec2::new(30.0, 0.0), 20.0);

        session.frame(30.0);
        assert!(session.sent().is_empty());
        session.frame(500.0);
        assert_eq!(session.sent().len(), 1);
        assert!(matches!(
            &session.sent()[0],
            ClientMessage::UpdateShape { patch, .. } if patch.id == 7
        ));
    }

    #[test]
    fn test_preview_keeps_scheduling_until_settled() {
        let mut session = session();
        session.set_preview(true);
        let commands = session.frame(0.0);
        assert!(commands.contains(&EditorCommand::ScheduleFrame));
        assert_eq!(session.last_stats().animating, 1);

        session.frame(150.0);
        assert_eq!(session.summary().layers.len(), 1);
        assert!((session.summary().layers[0] - 0.5).abs() < 1e-9);

        let commands = session.frame(300.0);
        assert!(!commands.contains(&EditorCommand::ScheduleFrame));
        assert_eq!(session.last_stats().animating, 0);
        let frames = session.frames_drawn();
        session.frame(316.0);
        assert_eq!(session.frames_drawn(), frames);
    }

    #[test]
    fn test_render_page_preview_at_time() {
        let mut session = session();
        let stats = session.render_page(0, 150.0, RenderMode::Preview { now_ms: 150.0 }).unwrap();
        assert_eq!(stats.animating, 1);

        let stats = session
            .render_page(0, 150.0, RenderMode::Export { now_ms: 150.0, settle: true })
            .unwrap();
        assert_eq!(stats.animating, 0);
        assert!(session.summary().layers.is_empty());

        assert!(session.render_page(5, 0.0, RenderMode::Edit).is_err());
    }

    #[test]
    fn test_export_walks_timeline() {
        let mut session = session();
        let timeline = ExportTimeline::new(&session.state.document, 100.0, 0.0);
        let mut pages = Vec::new();
        let count = session
            .export(&timeline, |frame, list, _| {
                assert!(list.is_balanced());
                pages.push(frame.page_index);
            })
            .unwrap();
        assert_eq!(count, 4);
        assert_eq!(pages, vec![0, 0, 0, 1]);
        assert_eq!(session.state.page_index(), 1);
    }

    #[test]
    fn test_remote_update_redraws() {
        let mut session = session();
        session.frame(0.0);
        let mut patch = pagecraft_core::ShapePatch::from_shape(&session.state.shapes()[0]).unwrap();
        patch.x = Some(400.0);
        let page_id = session.state.page().id.clone();
        assert!(session.apply_remote(ServerMessage::ShapeUpdated { page_id, patch }));
        session.frame(16.0);
        assert_eq!(session.frames_drawn(), 2);
        // Remote changes are not echoed back.
        session.frame(1000.0);
        assert!(session.sent().is_empty());
    }
}
