//! Pagecraft headless host
//!
//! Drives the editor engine without a window: a frame loop over the editor
//! state, scripted replay, and the export timeline.

mod config;
mod export;
mod replay;
mod session;
mod shortcuts;

pub use config::AppConfig;
pub use export::{ExportFrame, ExportTimeline, PageHold};
pub use replay::{ReplayReport, ReplayScript, ReplayStep, replay};
pub use session::{FrameSummary, Session};
pub use shortcuts::{Shortcut, ShortcutRegistry};
