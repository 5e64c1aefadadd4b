//! Scripted input replay.
//!
//! A script is a list of steps: input events exactly as a host would deliver
//! them, or backend messages. A frame tick runs after every step at the
//! step's time, and a final tick after the longest debounce so hover and
//! outbound timers resolve.

use crate::session::Session;
use pagecraft_core::{ClientMessage, EditorCommand, InputEvent, ServerMessage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One replay step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplayStep {
    Remote {
        remote: ServerMessage,
        #[serde(default, rename = "timeMs")]
        time_ms: Option<f64>,
    },
    Input(InputEvent),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReplayScript {
    /// Page the script starts on.
    pub page: usize,
    pub steps: Vec<ReplayStep>,
}

impl ReplayScript {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context as _;
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read replay script '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parse replay script '{}'", path.display()))
    }
}

/// What a replay produced.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub steps: usize,
    pub frames_drawn: u64,
    pub end_ms: f64,
    pub commands: Vec<EditorCommand>,
    pub sent: Vec<ClientMessage>,
}

/// Run `script` against `session`.
pub fn replay(session: &mut Session, script: &ReplayScript) -> anyhow::Result<ReplayReport> {
    use anyhow::Context as _;
    if script.page != session.state.page_index() {
        session
            .state
            .set_page(script.page)
            .with_context(|| format!("open page {}", script.page))?;
        session.state.fit_to_page();
    }

    let mut report = ReplayReport::default();
    let mut now_ms = 0.0_f64;
    for step in &script.steps {
        match step {
            ReplayStep::Input(event) => {
                now_ms = now_ms.max(event.time_ms());
                report.commands.extend(session.handle(event));
            }
            ReplayStep::Remote { remote, time_ms } => {
                if let Some(t) = time_ms {
                    now_ms = now_ms.max(*t);
                }
                session.apply_remote(remote.clone());
            }
        }
        report.commands.extend(session.frame(now_ms));
        report.steps += 1;
    }

    let config = &session.state.config;
    let settle_ms = now_ms + config.hover_debounce_ms.max(config.outbound_debounce_ms) + 1.0;
    report.commands.extend(session.frame(settle_ms));

    report.end_ms = settle_ms;
    report.frames_drawn = session.frames_drawn();
    report.sent = session.take_sent();
    log::info!(
        "Replayed {} step(s): {} command(s), {} message(s) sent",
        report.steps,
        report.commands.len(),
        report.sent.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use kurbo::Rect;
    use pagecraft_core::{Document, Page, Shape, Text};

    fn session() -> Session {
        let mut page = Page::new(800.0, 600.0);
        let mut text = Text::new(Rect::new(100.0, 100.0, 300.0, 160.0), "Hello");
        text.base.id = Some(3);
        page.shapes.push(Shape::Text(text));
        page.id = "p1".to_string();
        Session::new(Document::new(vec![page]), &AppConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_mixed_steps() {
        let json = r#"{
            "steps": [
                {"type": "pointerMove", "position": {"x": 5.0, "y": 5.0}, "timeMs": 1.0},
                {"remote": {"type": "shape_deleted", "page_id": "p1", "id": 3}, "timeMs": 2.0},
                {"type": "keyDown", "key": "escape", "timeMs": 3.0}
            ]
        }"#;
        let script: ReplayScript = serde_json::from_str(json).unwrap();
        assert_eq!(script.page, 0);
        assert_eq!(script.steps.len(), 3);
        assert!(matches!(script.steps[0], ReplayStep::Input(InputEvent::PointerMove { .. })));
        assert!(matches!(
            &script.steps[1],
            ReplayStep::Remote { remote: ServerMessage::ShapeDeleted { .. }, time_ms: Some(_) }
        ));
    }

    #[test]
    fn test_replay_drag_moves_shape_and_sends_update() {
        let mut session = session();
        let from = session.state.camera.world_to_screen(kurbo::Point::new(150.0, 130.0));
        let to = from + kurbo::Vec2::new(40.0, 0.0);
        let script = ReplayScript {
            page: 0,
            steps: vec![
                ReplayStep::Input(InputEvent::PointerDown {
                    position: from,
                    button: Default::default(),
                    modifiers: Default::default(),
                    time_ms: 0.0,
                }),
                ReplayStep::Input(InputEvent::PointerMove { position: to, time_ms: 16.0 }),
                ReplayStep::Input(InputEvent::PointerUp {
                    position: to,
                    button: Default::default(),
                    time_ms: 32.0,
                }),
            ],
        };

        let report = replay(&mut session, &script).unwrap();
        assert_eq!(report.steps, 3);
        assert!(report.commands.iter().any(|c| matches!(c, EditorCommand::TransformCommitted { .. })));
        assert_eq!(report.sent.len(), 1);
        assert!(session.state.shapes()[0].base().x > 100.0);
        assert!(session.state.document.can_undo());
    }

    #[test]
    fn test_replay_remote_delete() {
        let mut session = session();
        let script = ReplayScript {
            page: 0,
            steps: vec![ReplayStep::Remote {
                remote: ServerMessage::ShapeDeleted {
                    page_id: "p1".to_string(),
                    id: 3,
                },
                time_ms: None,
            }],
        };
        let report = replay(&mut session, &script).unwrap();
        assert!(session.state.shapes().is_empty());
        assert!(report.sent.is_empty());
    }

    #[test]
    fn test_replay_rejects_missing_page() {
        let mut session = session();
        let script = ReplayScript {
            page: 4,
            steps: Vec::new(),
        };
        assert!(replay(&mut session, &script).is_err());
    }
}
