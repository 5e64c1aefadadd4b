//! Pagecraft Render Library
//!
//! Scene composition over an abstract drawing surface, plus the backends:
//! a recording display list and, with `vello-renderer`, a Vello scene with
//! Parley text. Image decoding runs in the background via [`ImageLoader`].

mod image_loader;
mod renderer;
mod surface;

#[cfg(feature = "vello-renderer")]
mod text_layout;
#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use image_loader::{ImageError, ImageLoader, decode_bytes, load_bitmap};
pub use renderer::{FrameStats, RenderMode, RenderResult, RenderStyle, RendererError, SceneRenderer};
pub use surface::{DisplayList, DrawCommand, DrawSurface, Rgba};

#[cfg(feature = "vello-renderer")]
pub use text_layout::{ParleyMeasurer, TextLayouter};
#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloSurface;
