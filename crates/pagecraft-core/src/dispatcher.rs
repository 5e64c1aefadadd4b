//! Interaction dispatcher: turns input events into state changes.
//!
//! Every handler mutates the [`EditorState`] it is given and returns the
//! commands the host should apply (cursor, UI notifications, frames to
//! schedule, messages to send). Pointer moves are routed with a fixed
//! priority: panning, then the open transform session, then debounced hover.

use crate::editor::EditorState;
use crate::hover::{HoverTarget, resolve_hover, topmost_shape_at};
use crate::input::{InputEvent, Key, Modifiers, MouseButton};
use crate::selection::{HandleKind, hit_test_handles};
use crate::shapes::{Shape, ShapeId};
use crate::sync::ClientMessage;
use crate::transform::TransformSession;
use kurbo::{Point, Vec2};
use serde::Serialize;

/// Kind of transform a session performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    Drag,
    Resize,
    Rotate,
}

impl From<&TransformSession> for TransformKind {
    fn from(session: &TransformSession) -> Self {
        match session {
            TransformSession::Drag(_) => TransformKind::Drag,
            TransformSession::Resize(_) => TransformKind::Resize,
            TransformSession::Rotate(_) => TransformKind::Rotate,
        }
    }
}

/// Effects the host applies after an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorCommand {
    /// A frame was newly scheduled; the host should enqueue a tick.
    ScheduleFrame,
    /// The host should run a tick at `deadline_ms`. Replaces any earlier
    /// timer request.
    #[serde(rename_all = "camelCase")]
    ScheduleTimer { deadline_ms: f64 },
    SelectionChanged { index: Option<usize> },
    HoverChanged { index: Option<usize> },
    CursorChanged { cursor: &'static str },
    Dragged { index: usize },
    Resized { index: usize },
    Rotated { index: usize },
    TransformCommitted { index: usize, kind: TransformKind },
    ShapeDeleted { index: usize, id: Option<ShapeId> },
    ShapePasted { index: usize },
    TextChanged { index: usize },
    TextEditStarted { index: usize },
    TextEditEnded { index: usize },
    HistoryRestored { page_index: usize },
    CameraChanged,
    PanModeChanged { enabled: bool },
    Send { message: ClientMessage },
}

/// Result of a frame tick.
#[derive(Debug, Clone, Default)]
pub struct Tick {
    /// Whether a frame was scheduled and should be drawn.
    pub redraw: bool,
    pub commands: Vec<EditorCommand>,
}

/// Route one input event.
pub fn dispatch(state: &mut EditorState, event: &InputEvent) -> Vec<EditorCommand> {
    let was_scheduled = state.scheduler.is_scheduled();
    let mut out = Vec::new();

    match event {
        InputEvent::PointerDown {
            position,
            button,
            modifiers,
            time_ms,
        } => handle_press(state, *position, *button, *modifiers, *time_ms, &mut out),
        InputEvent::PointerMove { position, time_ms } => {
            handle_move(state, *position, *time_ms, &mut out)
        }
        InputEvent::PointerUp {
            position,
            button,
            time_ms,
        } => handle_release(state, *position, *button, *time_ms, &mut out),
        InputEvent::PointerLeave { time_ms } => handle_leave(state, *time_ms, &mut out),
        InputEvent::Wheel {
            position,
            delta,
            modifiers,
            ..
        } => handle_wheel(state, *position, *delta, *modifiers, &mut out),
        InputEvent::KeyDown {
            key,
            modifiers,
            time_ms,
        } => handle_key(state, key, *modifiers, *time_ms, &mut out),
        InputEvent::Frame { time_ms } => {
            let tick = tick(state, *time_ms);
            out.extend(tick.commands);
        }
    }

    if let Some(cursor) = state.update_cursor() {
        out.push(EditorCommand::CursorChanged {
            cursor: cursor.as_css(),
        });
    }
    if !was_scheduled && state.scheduler.is_scheduled() {
        out.push(EditorCommand::ScheduleFrame);
    }
    schedule_timer(state, event.time_ms(), &mut out);
    out
}

/// Run one frame tick: clear the redraw flag, resolve debounced hover, and
/// release outbound messages whose quiet period has ended.
pub fn tick(state: &mut EditorState, now_ms: f64) -> Tick {
    let redraw = state.scheduler.begin_tick();
    let mut commands = Vec::new();

    if let Some(screen) = state.hover_debounce.poll(now_ms) {
        if state.session.is_none() && !state.camera.is_panning {
            let world = state.screen_to_world(screen);
            let hover = resolve_hover(
                state.shapes(),
                world,
                state.selection.index,
                state.camera.zoom,
                &state.config,
                state.hover,
            );
            set_hover(state, hover, &mut commands);
        }
    }

    for message in state.outbound.poll(now_ms) {
        commands.push(EditorCommand::Send { message });
    }
    if let Some(cursor) = state.update_cursor() {
        commands.push(EditorCommand::CursorChanged {
            cursor: cursor.as_css(),
        });
    }
    schedule_timer(state, now_ms, &mut commands);
    Tick { redraw, commands }
}

/// Ask the host for a tick at the earliest pending timer when it moved.
fn schedule_timer(state: &mut EditorState, now_ms: f64, out: &mut Vec<EditorCommand>) {
    let deadline = state.next_timer_deadline(now_ms);
    if deadline == state.timer_deadline {
        return;
    }
    state.timer_deadline = deadline;
    if let Some(deadline_ms) = deadline {
        out.push(EditorCommand::ScheduleTimer { deadline_ms });
    }
}

fn set_hover(state: &mut EditorState, hover: HoverTarget, out: &mut Vec<EditorCommand>) {
    if hover == state.hover {
        return;
    }
    let body_changed = hover.body_index() != state.hover.body_index();
    state.hover = hover;
    if body_changed {
        out.push(EditorCommand::HoverChanged {
            index: hover.body_index(),
        });
        // The hover border is part of the scene.
        state.request_redraw();
    }
}

fn set_selection(state: &mut EditorState, index: Option<usize>, out: &mut Vec<EditorCommand>) {
    if state.selection.index == index {
        return;
    }
    match index {
        Some(i) => state.selection.select(i),
        None => state.selection.clear(),
    }
    // Handles belong to the previous selection.
    if state.hover.is_handle() {
        state.hover = HoverTarget::None;
    }
    if state.hover.body_index().is_some() && state.hover.body_index() == index {
        state.hover = HoverTarget::None;
        out.push(EditorCommand::HoverChanged { index: None });
    }
    out.push(EditorCommand::SelectionChanged { index });
    state.request_redraw();
}

fn end_text_edit(state: &mut EditorState, out: &mut Vec<EditorCommand>) {
    if let Some(index) = state.text_edit.take() {
        state.text_edit_dirty = false;
        out.push(EditorCommand::TextEditEnded { index });
        state.request_redraw();
    }
}

fn open_session(state: &mut EditorState, session: TransformSession) {
    log::debug!("Opening {} session on shape {}", session.name(), session.shape_index());
    state.session_undo = Some(state.shapes().to_vec());
    state.session_changed = false;
    state.selection.suppress_overlay_border = true;
    state.session = Some(session);
    state.hover_debounce.cancel();
    state.request_redraw();
}

/// Close the open session, committing it if it changed anything.
fn close_session(state: &mut EditorState, out: &mut Vec<EditorCommand>) {
    let Some(session) = state.session.take() else {
        return;
    };
    state.session_undo = None;
    state.selection.suppress_overlay_border = false;
    if std::mem::take(&mut state.session_changed) {
        out.push(EditorCommand::TransformCommitted {
            index: session.shape_index(),
            kind: TransformKind::from(&session),
        });
    }
    state.request_redraw();
}

pub fn handle_press(
    state: &mut EditorState,
    position: Point,
    button: MouseButton,
    _modifiers: Modifiers,
    now_ms: f64,
    out: &mut Vec<EditorCommand>,
) {
    let double_click = state.input.pointer_down(position, button, now_ms);

    if state.pan_mode || button == MouseButton::Middle {
        state.camera.is_panning = true;
        return;
    }
    if button != MouseButton::Left {
        return;
    }

    // A stray session (e.g. the up event was lost) is committed first.
    close_session(state, out);
    state.validate_indices();
    let world = state.screen_to_world(position);
    let zoom = state.camera.zoom;

    if let Some(selected) = state.selection.index {
        let handle = state
            .shapes()
            .get(selected)
            .and_then(|shape| hit_test_handles(shape.base(), world, zoom, &state.config));
        match handle {
            Some(HandleKind::Rotate) => {
                end_text_edit(state, out);
                let session = TransformSession::rotate(selected, state.shapes()[selected].base(), world);
                open_session(state, session);
                return;
            }
            Some(HandleKind::Corner(corner)) => {
                end_text_edit(state, out);
                let session = TransformSession::resize(selected, &state.shapes()[selected], corner);
                open_session(state, session);
                return;
            }
            None => {}
        }
    }

    let hit = topmost_shape_at(state.shapes(), world);

    if let Some(editing) = state.text_edit {
        if hit == Some(editing) {
            // Clicks inside the edited text stay in edit mode.
            return;
        }
        end_text_edit(state, out);
    }

    match hit {
        Some(index) => {
            set_selection(state, Some(index), out);
            if double_click && matches!(state.shapes()[index], Shape::Text(_)) {
                state.text_edit = Some(index);
                state.text_edit_dirty = false;
                out.push(EditorCommand::TextEditStarted { index });
                state.request_redraw();
                return;
            }
            open_session(state, TransformSession::drag(index, world));
        }
        None => set_selection(state, None, out),
    }
}

pub fn handle_move(state: &mut EditorState, position: Point, now_ms: f64, out: &mut Vec<EditorCommand>) {
    let screen_delta = state.input.pointer_move(position);

    if state.camera.is_panning {
        if screen_delta != Vec2::ZERO {
            state.camera.pan_by(screen_delta);
            out.push(EditorCommand::CameraChanged);
            state.request_redraw();
        }
        return;
    }

    if let Some(mut session) = state.session.take() {
        let index = session.shape_index();
        if index >= state.shapes().len() {
            log::debug!("Discarding {} session on missing shape {index}", session.name());
            state.session_undo = None;
            state.selection.suppress_overlay_border = false;
            return;
        }

        let world = state.screen_to_world(position);
        let changed = state.mutate_shape(index, |shape, config, measurer| {
            session.update(shape, world, config, measurer)
        });

        if changed {
            if !state.session_changed {
                // History gets the page as it was when the session opened.
                if let Some(shapes) = state.session_undo.take() {
                    let page_index = state.page_index();
                    state.document.push_undo_shapes(page_index, shapes);
                }
                state.session_changed = true;
            }
            out.push(match session {
                TransformSession::Drag(_) => EditorCommand::Dragged { index },
                TransformSession::Resize(_) => EditorCommand::Resized { index },
                TransformSession::Rotate(_) => EditorCommand::Rotated { index },
            });
            state.publish_shape(index, now_ms);
        }
        state.session = Some(session);
        return;
    }

    state.hover_debounce.schedule(position, now_ms);
}

pub fn handle_release(
    state: &mut EditorState,
    position: Point,
    button: MouseButton,
    _now_ms: f64,
    out: &mut Vec<EditorCommand>,
) {
    state.input.pointer_up(position, button);
    if state.camera.is_panning {
        state.camera.is_panning = false;
        return;
    }
    close_session(state, out);
}

pub fn handle_leave(state: &mut EditorState, _now_ms: f64, out: &mut Vec<EditorCommand>) {
    state.input.pointer_leave();
    state.camera.is_panning = false;
    close_session(state, out);
    state.hover_debounce.cancel();
    set_hover(state, HoverTarget::None, out);
}

pub fn handle_wheel(
    state: &mut EditorState,
    position: Point,
    delta: Vec2,
    modifiers: Modifiers,
    out: &mut Vec<EditorCommand>,
) {
    let changed = if modifiers.command() {
        if delta.y == 0.0 {
            false
        } else {
            let step = state.config.wheel_zoom_step;
            let factor = if delta.y < 0.0 { step } else { 1.0 / step };
            state.camera.zoom_at(position, factor)
        }
    } else if delta != Vec2::ZERO {
        state.camera.pan_by(-delta);
        true
    } else {
        false
    };

    if changed {
        out.push(EditorCommand::CameraChanged);
        state.request_redraw();
    }
}

pub fn handle_key(
    state: &mut EditorState,
    key: &Key,
    modifiers: Modifiers,
    now_ms: f64,
    out: &mut Vec<EditorCommand>,
) {
    if modifiers.command() {
        handle_shortcut(state, key, modifiers, out);
        return;
    }

    if let Some(index) = state.text_edit {
        edit_text(state, index, key, now_ms, out);
        return;
    }

    match key {
        Key::Delete | Key::Backspace => delete_selected(state, out),
        Key::Escape => {
            close_session(state, out);
            set_selection(state, None, out);
        }
        Key::Space => {
            state.pan_mode = !state.pan_mode;
            if !state.pan_mode {
                state.camera.is_panning = false;
            }
            out.push(EditorCommand::PanModeChanged {
                enabled: state.pan_mode,
            });
        }
        Key::Enter => {
            if let Some(index) = state.selection.index {
                if matches!(state.shapes().get(index), Some(Shape::Text(_))) {
                    close_session(state, out);
                    state.text_edit = Some(index);
                    state.text_edit_dirty = false;
                    out.push(EditorCommand::TextEditStarted { index });
                    state.request_redraw();
                }
            }
        }
        Key::Char(_) => {}
    }
}

fn handle_shortcut(state: &mut EditorState, key: &Key, modifiers: Modifiers, out: &mut Vec<EditorCommand>) {
    let Key::Char(c) = key else {
        return;
    };
    match c.to_ascii_lowercase() {
        'z' if modifiers.shift => redo(state, out),
        'z' => undo(state, out),
        'y' => redo(state, out),
        'c' => {
            if let Some(shape) = state.selected_shape().cloned() {
                log::debug!("Copied {} shape", shape.kind_name());
                state.clipboard = Some(shape);
            }
        }
        'v' => paste(state, out),
        _ => {}
    }
}

fn edit_text(state: &mut EditorState, index: usize, key: &Key, now_ms: f64, out: &mut Vec<EditorCommand>) {
    if *key == Key::Escape {
        end_text_edit(state, out);
        return;
    }
    let edit = |text: &mut String| match key {
        Key::Char(c) => {
            text.push(*c);
            true
        }
        Key::Space => {
            text.push(' ');
            true
        }
        Key::Enter => {
            text.push('\n');
            true
        }
        Key::Backspace => text.pop().is_some(),
        Key::Delete | Key::Escape => false,
    };

    if !state.text_edit_dirty {
        let would_change = match key {
            Key::Backspace => state
                .shapes()
                .get(index)
                .and_then(Shape::as_text)
                .is_some_and(|t| !t.text.is_empty()),
            Key::Delete | Key::Escape => false,
            _ => true,
        };
        if !would_change {
            return;
        }
        let page_index = state.page_index();
        state.document.push_undo(page_index);
        state.text_edit_dirty = true;
    }

    let changed = state.mutate_shape(index, |shape, _, _| match shape {
        Shape::Text(text) => edit(&mut text.text),
        Shape::Image(_) => false,
    });
    if changed {
        out.push(EditorCommand::TextChanged { index });
        state.publish_shape(index, now_ms);
    }
}

fn delete_selected(state: &mut EditorState, out: &mut Vec<EditorCommand>) {
    state.validate_indices();
    let Some(index) = state.selection.index else {
        return;
    };
    close_session(state, out);
    let page_index = state.page_index();
    state.document.push_undo(page_index);
    let removed = state.page_mut().shapes.remove(index);
    state.on_shape_removed(index);
    let id = removed.id();
    if let Some(id) = id {
        let page_id = state.page().id.clone();
        state
            .outbound
            .push_immediate(ClientMessage::DeleteShape { page_id, id });
    }
    out.push(EditorCommand::ShapeDeleted { index, id });
    out.push(EditorCommand::SelectionChanged { index: None });
    state.request_redraw();
}

fn paste(state: &mut EditorState, out: &mut Vec<EditorCommand>) {
    let Some(source) = &state.clipboard else {
        return;
    };
    let offset = state.config.paste_offset;
    let shape = source.duplicate(Vec2::new(offset, offset));
    // Successive pastes cascade.
    state.clipboard = Some(shape.clone());

    close_session(state, out);
    end_text_edit(state, out);
    let page_index = state.page_index();
    state.document.push_undo(page_index);
    state.page_mut().shapes.push(shape.clone());
    let index = state.shapes().len() - 1;
    let page_id = state.page().id.clone();
    state
        .outbound
        .push_immediate(ClientMessage::CreateShape { page_id, shape });
    out.push(EditorCommand::ShapePasted { index });
    set_selection(state, Some(index), out);
}

fn restore_history(state: &mut EditorState, page_index: usize, out: &mut Vec<EditorCommand>) {
    state.session = None;
    state.session_undo = None;
    state.session_changed = false;
    if page_index != state.page_index() {
        // set_page only fails for out-of-range indices, which history never holds.
        if let Err(e) = state.set_page(page_index) {
            log::error!("Failed to switch page after undo: {}", e);
            return;
        }
    }
    state.validate_indices();
    state.publish_page();
    out.push(EditorCommand::HistoryRestored { page_index });
    state.request_redraw();
}

fn undo(state: &mut EditorState, out: &mut Vec<EditorCommand>) {
    end_text_edit(state, out);
    match state.document.undo() {
        Some(page_index) => restore_history(state, page_index, out),
        None => log::debug!("Nothing to undo"),
    }
}

fn redo(state: &mut EditorState, out: &mut Vec<EditorCommand>) {
    end_text_edit(state, out);
    match state.document.redo() {
        Some(page_index) => restore_history(state, page_index, out),
        None => log::debug!("Nothing to redo"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::document::{Document, Page};
    use crate::shapes::{Image, Text};
    use kurbo::Rect;

    fn editor() -> EditorState {
        let mut page = Page::new(1000.0, 1000.0);
        let mut image = Image::new(Rect::new(100.0, 100.0, 300.0, 200.0), "a.png");
        image.base.id = Some(1);
        image.aspect_ratio = Some(2.0);
        page.shapes.push(Shape::Image(image));
        let mut text = Text::new(Rect::new(500.0, 500.0, 700.0, 550.0), "Hello");
        text.base.id = Some(2);
        page.shapes.push(Shape::Text(text));
        let mut state = EditorState::new(Document::new(vec![page]), EditorConfig::default()).unwrap();
        state.canvas_size = kurbo::Size::new(1000.0, 1000.0);
        state
    }

    fn down(state: &mut EditorState, x: f64, y: f64, t: f64) -> Vec<EditorCommand> {
        dispatch(
            state,
            &InputEvent::PointerDown {
                position: Point::new(x, y),
                button: MouseButton::Left,
                modifiers: Modifiers::default(),
                time_ms: t,
            },
        )
    }

    fn mv(state: &mut EditorState, x: f64, y: f64, t: f64) -> Vec<EditorCommand> {
        dispatch(
            state,
            &InputEvent::PointerMove {
                position: Point::new(x, y),
                time_ms: t,
            },
        )
    }

    fn up(state: &mut EditorState, x: f64, y: f64, t: f64) -> Vec<EditorCommand> {
        dispatch(
            state,
            &InputEvent::PointerUp {
                position: Point::new(x, y),
                button: MouseButton::Left,
                time_ms: t,
            },
        )
    }

    fn key(state: &mut EditorState, key: Key, command: bool, shift: bool) -> Vec<EditorCommand> {
        dispatch(
            state,
            &InputEvent::KeyDown {
                key,
                modifiers: Modifiers {
                    ctrl: command,
                    shift,
                    ..Modifiers::default()
                },
                time_ms: 0.0,
            },
        )
    }

    #[test]
    fn test_click_selects_and_drag_moves() {
        let mut state = editor();
        let cmds = down(&mut state, 150.0, 150.0, 0.0);
        assert!(cmds.contains(&EditorCommand::SelectionChanged { index: Some(0) }));
        assert!(matches!(state.session, Some(TransformSession::Drag(_))));

        let cmds = mv(&mut state, 170.0, 160.0, 10.0);
        assert!(cmds.contains(&EditorCommand::Dragged { index: 0 }));
        let base = state.shapes()[0].base();
        assert_eq!((base.x, base.y), (120.0, 110.0));

        let cmds = up(&mut state, 170.0, 160.0, 20.0);
        assert!(cmds.contains(&EditorCommand::TransformCommitted {
            index: 0,
            kind: TransformKind::Drag
        }));
        assert!(state.session.is_none());
        assert!(state.document.can_undo());
    }

    #[test]
    fn test_click_without_move_leaves_no_history() {
        let mut state = editor();
        down(&mut state, 150.0, 150.0, 0.0);
        let cmds = up(&mut state, 150.0, 150.0, 5.0);
        assert!(!cmds.iter().any(|c| matches!(c, EditorCommand::TransformCommitted { .. })));
        assert!(!state.document.can_undo());
    }

    #[test]
    fn test_undo_restores_session_start() {
        let mut state = editor();
        down(&mut state, 150.0, 150.0, 0.0);
        mv(&mut state, 160.0, 150.0, 1.0);
        mv(&mut state, 200.0, 150.0, 2.0);
        up(&mut state, 200.0, 150.0, 3.0);
        assert!((state.shapes()[0].base().x - 150.0).abs() < f64::EPSILON);

        let cmds = key(&mut state, Key::Char('z'), true, false);
        assert!(cmds.contains(&EditorCommand::HistoryRestored { page_index: 0 }));
        assert!((state.shapes()[0].base().x - 100.0).abs() < f64::EPSILON);

        key(&mut state, Key::Char('z'), true, true);
        assert!((state.shapes()[0].base().x - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resize_through_corner_handle() {
        let mut state = editor();
        down(&mut state, 150.0, 150.0, 0.0);
        up(&mut state, 150.0, 150.0, 1.0);
        // Bottom-right handle of the selected image.
        down(&mut state, 300.0, 200.0, 600.0);
        assert!(matches!(state.session, Some(TransformSession::Resize(_))));
        let cmds = mv(&mut state, 500.0, 260.0, 610.0);
        assert!(cmds.contains(&EditorCommand::Resized { index: 0 }));
        let base = state.shapes()[0].base();
        assert!((base.width - 400.0).abs() < 1e-9);
        assert!((base.height - 200.0).abs() < 1e-9);
        assert_eq!((base.x, base.y), (100.0, 100.0));
    }

    #[test]
    fn test_rotate_through_handle() {
        let mut state = editor();
        down(&mut state, 150.0, 150.0, 0.0);
        up(&mut state, 150.0, 150.0, 1.0);
        // Rotation handle sits 30px above the top-center (200, 100).
        down(&mut state, 200.0, 70.0, 600.0);
        assert!(matches!(state.session, Some(TransformSession::Rotate(_))));
        let cmds = mv(&mut state, 400.0, 150.0, 610.0);
        assert!(cmds.contains(&EditorCommand::Rotated { index: 0 }));
        assert!((state.shapes()[0].base().rotation() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_hover_is_debounced() {
        let mut state = editor();
        mv(&mut state, 600.0, 520.0, 0.0);
        assert_eq!(state.hover, HoverTarget::None);
        let early = tick(&mut state, 10.0);
        assert!(early.commands.is_empty());
        let late = tick(&mut state, 16.0);
        assert!(late
            .commands
            .contains(&EditorCommand::HoverChanged { index: Some(1) }));
        assert_eq!(state.hover, HoverTarget::Body(1));
    }

    /// Host that runs a tick only when a command asked for one.
    #[derive(Default)]
    struct ScheduledHost {
        frame_pending: bool,
        timer: Option<f64>,
        seen: Vec<EditorCommand>,
    }

    impl ScheduledHost {
        fn take(&mut self, commands: Vec<EditorCommand>) {
            for command in commands {
                match command {
                    EditorCommand::ScheduleFrame => self.frame_pending = true,
                    EditorCommand::ScheduleTimer { deadline_ms } => self.timer = Some(deadline_ms),
                    _ => {}
                }
                self.seen.push(command);
            }
        }

        /// Run every tick the host was asked for, up to `until_ms`.
        fn run(&mut self, state: &mut EditorState, now_ms: f64, until_ms: f64) {
            let mut now = now_ms;
            for _ in 0..32 {
                let at = if self.frame_pending {
                    now
                } else {
                    match self.timer {
                        Some(deadline) if deadline <= until_ms => deadline.max(now),
                        _ => return,
                    }
                };
                self.frame_pending = false;
                if self.timer.is_some_and(|deadline| deadline <= at) {
                    self.timer = None;
                }
                now = at;
                let commands = tick(state, at).commands;
                self.take(commands);
            }
        }
    }

    #[test]
    fn test_host_ticking_on_request_resolves_hover_and_publishes() {
        let mut state = editor();
        state.scheduler.begin_tick();
        let mut host = ScheduledHost::default();

        host.take(mv(&mut state, 600.0, 520.0, 0.0));
        assert!(host.timer.is_some());
        host.run(&mut state, 0.0, 1000.0);
        assert_eq!(state.hover, HoverTarget::Body(1));
        assert!(host
            .seen
            .contains(&EditorCommand::HoverChanged { index: Some(1) }));

        host.take(down(&mut state, 150.0, 150.0, 100.0));
        host.take(mv(&mut state, 170.0, 150.0, 110.0));
        host.take(up(&mut state, 170.0, 150.0, 120.0));
        host.run(&mut state, 120.0, 1000.0);
        let sent = host
            .seen
            .iter()
            .filter(|c| matches!(c, EditorCommand::Send { message: ClientMessage::UpdateShape { .. } }))
            .count();
        assert_eq!(sent, 1);
        assert!(state.outbound.is_empty());
        assert_eq!(state.next_timer_deadline(1000.0), None);
    }

    #[test]
    fn test_timer_request_follows_debounce() {
        let mut state = editor();
        let first = mv(&mut state, 600.0, 520.0, 0.0);
        let deadline = state.config.hover_debounce_ms;
        assert!(first.contains(&EditorCommand::ScheduleTimer { deadline_ms: deadline }));
        let second = mv(&mut state, 610.0, 520.0, 5.0);
        assert!(second.contains(&EditorCommand::ScheduleTimer { deadline_ms: 5.0 + deadline }));
        // A tick before the deadline keeps the request standing.
        assert!(tick(&mut state, 1.0).commands.is_empty());
    }

    #[test]
    fn test_redraw_coalescing_through_events() {
        let mut state = editor();
        state.scheduler.begin_tick();
        let first = dispatch(
            &mut state,
            &InputEvent::Wheel {
                position: Point::ZERO,
                delta: Vec2::new(0.0, 10.0),
                modifiers: Modifiers::default(),
                time_ms: 0.0,
            },
        );
        assert!(first.contains(&EditorCommand::ScheduleFrame));
        let second = dispatch(
            &mut state,
            &InputEvent::Wheel {
                position: Point::ZERO,
                delta: Vec2::new(0.0, 10.0),
                modifiers: Modifiers::default(),
                time_ms: 1.0,
            },
        );
        assert!(!second.contains(&EditorCommand::ScheduleFrame));
        assert!(tick(&mut state, 2.0).redraw);
        assert!(!tick(&mut state, 3.0).redraw);
        assert!((state.camera.pan.y + 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ctrl_wheel_zooms() {
        let mut state = editor();
        let cmds = dispatch(
            &mut state,
            &InputEvent::Wheel {
                position: Point::new(100.0, 100.0),
                delta: Vec2::new(0.0, -1.0),
                modifiers: Modifiers {
                    ctrl: true,
                    ..Modifiers::default()
                },
                time_ms: 0.0,
            },
        );
        assert!(cmds.contains(&EditorCommand::CameraChanged));
        assert!((state.camera.zoom - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_delete_and_outbound() {
        let mut state = editor();
        down(&mut state, 150.0, 150.0, 0.0);
        up(&mut state, 150.0, 150.0, 1.0);
        let cmds = key(&mut state, Key::Delete, false, false);
        assert!(cmds.contains(&EditorCommand::ShapeDeleted {
            index: 0,
            id: Some(1)
        }));
        assert_eq!(state.shapes().len(), 1);
        assert_eq!(state.selection.index, None);
        let sent = tick(&mut state, 2.0).commands;
        assert!(sent.iter().any(|c| matches!(
            c,
            EditorCommand::Send {
                message: ClientMessage::DeleteShape { id: 1, .. }
            }
        )));
    }

    #[test]
    fn test_drag_publishes_after_quiet_period() {
        let mut state = editor();
        down(&mut state, 150.0, 150.0, 0.0);
        mv(&mut state, 160.0, 150.0, 10.0);
        mv(&mut state, 170.0, 150.0, 20.0);
        up(&mut state, 170.0, 150.0, 30.0);
        assert!(tick(&mut state, 100.0).commands.is_empty());
        let sent: Vec<_> = tick(&mut state, 170.0)
            .commands
            .into_iter()
            .filter(|c| matches!(c, EditorCommand::Send { .. }))
            .collect();
        assert_eq!(sent.len(), 1);
    }

    #[test]
    fn test_copy_paste_offsets_and_selects() {
        let mut state = editor();
        down(&mut state, 150.0, 150.0, 0.0);
        up(&mut state, 150.0, 150.0, 1.0);
        key(&mut state, Key::Char('c'), true, false);
        let cmds = key(&mut state, Key::Char('v'), true, false);
        assert!(cmds.contains(&EditorCommand::ShapePasted { index: 2 }));
        assert_eq!(state.selection.index, Some(2));
        let pasted = state.shapes()[2].base();
        assert_eq!((pasted.x, pasted.y), (120.0, 120.0));
        assert!(pasted.id.is_none());
    }

    #[test]
    fn test_double_click_edits_text() {
        let mut state = editor();
        down(&mut state, 600.0, 520.0, 0.0);
        up(&mut state, 600.0, 520.0, 50.0);
        let cmds = down(&mut state, 600.0, 520.0, 200.0);
        assert!(cmds.contains(&EditorCommand::TextEditStarted { index: 1 }));
        up(&mut state, 600.0, 520.0, 250.0);

        let cmds = key(&mut state, Key::Char('!'), false, false);
        assert!(cmds.contains(&EditorCommand::TextChanged { index: 1 }));
        key(&mut state, Key::Backspace, false, false);
        key(&mut state, Key::Backspace, false, false);
        // Backspace edits text rather than deleting the shape.
        assert_eq!(state.shapes().len(), 2);
        assert_eq!(state.shapes()[1].as_text().unwrap().text, "Hell");

        let cmds = key(&mut state, Key::Escape, false, false);
        assert!(cmds.contains(&EditorCommand::TextEditEnded { index: 1 }));
        assert_eq!(state.selection.index, Some(1));
    }

    #[test]
    fn test_space_toggles_pan_mode() {
        let mut state = editor();
        let cmds = key(&mut state, Key::Space, false, false);
        assert!(cmds.contains(&EditorCommand::PanModeChanged { enabled: true }));
        assert!(cmds.contains(&EditorCommand::CursorChanged { cursor: "grab" }));

        down(&mut state, 10.0, 10.0, 0.0);
        let cmds = mv(&mut state, 30.0, 15.0, 1.0);
        assert!(cmds.contains(&EditorCommand::CameraChanged));
        assert_eq!(state.camera.pan, Vec2::new(20.0, 5.0));
        // Panning never selects.
        assert_eq!(state.selection.index, None);
    }

    #[test]
    fn test_escape_clears_selection() {
        let mut state = editor();
        down(&mut state, 150.0, 150.0, 0.0);
        up(&mut state, 150.0, 150.0, 1.0);
        let cmds = key(&mut state, Key::Escape, false, false);
        assert!(cmds.contains(&EditorCommand::SelectionChanged { index: None }));
    }

    #[test]
    fn test_leave_ends_session() {
        let mut state = editor();
        down(&mut state, 150.0, 150.0, 0.0);
        mv(&mut state, 160.0, 150.0, 1.0);
        let cmds = dispatch(&mut state, &InputEvent::PointerLeave { time_ms: 2.0 });
        assert!(state.session.is_none());
        assert!(cmds.iter().any(|c| matches!(c, EditorCommand::TransformCommitted { .. })));
    }

    #[test]
    fn test_stale_session_discarded() {
        let mut state = editor();
        down(&mut state, 150.0, 150.0, 0.0);
        state.page_mut().shapes.clear();
        mv(&mut state, 170.0, 150.0, 1.0);
        assert!(state.session.is_none());
    }
}
