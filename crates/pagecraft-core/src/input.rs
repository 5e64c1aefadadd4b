//! Input events and pointer/keyboard state.
//!
//! Positions are element-relative screen pixels. Every event carries the
//! host's timestamp so that timing-dependent behavior (double-click,
//! debouncing) stays deterministic.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Double-click detection window.
const DOUBLE_CLICK_TIME_MS: f64 = 500.0;
/// Maximum pointer travel between the two clicks of a double-click.
const DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Keys the editor reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Delete,
    Backspace,
    Escape,
    Enter,
    Space,
    /// A printable character.
    Char(char),
}

/// Input event delivered by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputEvent {
    #[serde(rename_all = "camelCase")]
    PointerDown {
        position: Point,
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        modifiers: Modifiers,
        time_ms: f64,
    },
    #[serde(rename_all = "camelCase")]
    PointerMove { position: Point, time_ms: f64 },
    #[serde(rename_all = "camelCase")]
    PointerUp {
        position: Point,
        #[serde(default)]
        button: MouseButton,
        time_ms: f64,
    },
    #[serde(rename_all = "camelCase")]
    PointerLeave { time_ms: f64 },
    #[serde(rename_all = "camelCase")]
    Wheel {
        position: Point,
        delta: Vec2,
        #[serde(default)]
        modifiers: Modifiers,
        time_ms: f64,
    },
    #[serde(rename_all = "camelCase")]
    KeyDown {
        key: Key,
        #[serde(default)]
        modifiers: Modifiers,
        time_ms: f64,
    },
    /// A frame callback.
    #[serde(rename_all = "camelCase")]
    Frame { time_ms: f64 },
}

impl InputEvent {
    pub fn time_ms(&self) -> f64 {
        match self {
            InputEvent::PointerDown { time_ms, .. }
            | InputEvent::PointerMove { time_ms, .. }
            | InputEvent::PointerUp { time_ms, .. }
            | InputEvent::PointerLeave { time_ms }
            | InputEvent::Wheel { time_ms, .. }
            | InputEvent::KeyDown { time_ms, .. }
            | InputEvent::Frame { time_ms } => *time_ms,
        }
    }
}

/// Tracks pointer state between events.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Current pointer position in screen coordinates.
    pub pointer_position: Point,
    /// Whether the pointer is over the canvas.
    pub pointer_inside: bool,
    pressed_buttons: HashSet<MouseButton>,
    /// Last click time for double-click detection.
    last_click_time: Option<f64>,
    /// Last click position for double-click detection.
    last_click_position: Option<Point>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a button press. Returns `true` if it completes a double-click.
    pub fn pointer_down(&mut self, position: Point, button: MouseButton, now_ms: f64) -> bool {
        self.pointer_position = position;
        self.pointer_inside = true;
        self.pressed_buttons.insert(button);
        if button != MouseButton::Left {
            return false;
        }

        if let (Some(last_time), Some(last_pos)) = (self.last_click_time, self.last_click_position) {
            let elapsed = now_ms - last_time;
            if elapsed < DOUBLE_CLICK_TIME_MS && (position - last_pos).hypot() < DOUBLE_CLICK_DISTANCE {
                // A third click starts over instead of chaining.
                self.last_click_time = None;
                self.last_click_position = None;
                return true;
            }
        }
        self.last_click_time = Some(now_ms);
        self.last_click_position = Some(position);
        false
    }

    pub fn pointer_move(&mut self, position: Point) -> Vec2 {
        let delta = position - self.pointer_position;
        self.pointer_position = position;
        self.pointer_inside = true;
        delta
    }

    pub fn pointer_up(&mut self, position: Point, button: MouseButton) {
        self.pointer_position = position;
        self.pressed_buttons.remove(&button);
    }

    /// The pointer left the canvas; every button counts as released.
    pub fn pointer_leave(&mut self) {
        self.pointer_inside = false;
        self.pressed_buttons.clear();
    }

    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    pub fn any_button_pressed(&self) -> bool {
        !self.pressed_buttons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_press_and_release() {
        let mut input = InputState::new();
        input.pointer_down(Point::new(100.0, 100.0), MouseButton::Left, 0.0);
        assert!(input.is_button_pressed(MouseButton::Left));
        assert!(!input.is_button_pressed(MouseButton::Right));
        input.pointer_up(Point::new(100.0, 100.0), MouseButton::Left);
        assert!(!input.any_button_pressed());
    }

    #[test]
    fn test_double_click_detection() {
        let mut input = InputState::new();
        let pos = Point::new(100.0, 100.0);
        assert!(!input.pointer_down(pos, MouseButton::Left, 1000.0));
        input.pointer_up(pos, MouseButton::Left);
        assert!(input.pointer_down(pos, MouseButton::Left, 1200.0));
        input.pointer_up(pos, MouseButton::Left);
        // Third click does not chain into another double-click.
        assert!(!input.pointer_down(pos, MouseButton::Left, 1300.0));
    }

    #[test]
    fn test_double_click_too_slow_or_far() {
        let mut input = InputState::new();
        assert!(!input.pointer_down(Point::new(0.0, 0.0), MouseButton::Left, 0.0));
        assert!(!input.pointer_down(Point::new(0.0, 0.0), MouseButton::Left, 600.0));
        assert!(!input.pointer_down(Point::new(20.0, 0.0), MouseButton::Left, 700.0));
    }

    #[test]
    fn test_leave_releases_buttons() {
        let mut input = InputState::new();
        input.pointer_down(Point::ZERO, MouseButton::Middle, 0.0);
        input.pointer_leave();
        assert!(!input.any_button_pressed());
        assert!(!input.pointer_inside);
    }

    #[test]
    fn test_event_json() {
        let json = r#"{"type":"pointerDown","position":{"x":10,"y":20},"timeMs":5}"#;
        let event: InputEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            InputEvent::PointerDown {
                position: Point::new(10.0, 20.0),
                button: MouseButton::Left,
                modifiers: Modifiers::default(),
                time_ms: 5.0,
            }
        );
        let key: InputEvent =
            serde_json::from_str(r#"{"type":"keyDown","key":{"char":"z"},"modifiers":{"ctrl":true},"timeMs":9}"#)
                .unwrap();
        assert!(matches!(key, InputEvent::KeyDown { key: Key::Char('z'), modifiers, .. } if modifiers.command()));
    }
}
