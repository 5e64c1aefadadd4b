//! Pagecraft Core Library
//!
//! Platform-agnostic document model, geometry, interaction and animation
//! logic for the Pagecraft page editor.

pub mod animation;
pub mod camera;
pub mod config;
pub mod cursor;
pub mod dispatcher;
pub mod document;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod hover;
pub mod input;
pub mod scheduler;
pub mod selection;
pub mod shapes;
pub mod sync;
pub mod text_fit;
pub mod transform;
pub mod viewport;

pub use animation::{AnimationConfig, AnimationKind, AnimationState, PanDirection};
pub use camera::Camera;
pub use config::EditorConfig;
pub use cursor::CursorIcon;
pub use dispatcher::{EditorCommand, Tick, TransformKind, dispatch, tick};
pub use document::{Background, Document, Page, RgbColor};
pub use editor::EditorState;
pub use error::{DocumentError, DocumentResult};
pub use hover::HoverTarget;
pub use input::{InputEvent, InputState, Key, Modifiers, MouseButton};
pub use scheduler::{Debounce, FrameClock, FrameScheduler};
pub use selection::{Corner, Handle, HandleKind, SelectedShape};
pub use shapes::{Bitmap, Image, ImageHandle, Shape, ShapeBase, ShapeId, Text};
pub use sync::{ClientMessage, OutboundQueue, ServerMessage, ShapePatch};
pub use text_fit::{ApproxTextMeasurer, TextMeasurer};
pub use transform::TransformSession;
