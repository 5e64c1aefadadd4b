//! Image shape and its lazily decoded bitmap.

use super::ShapeBase;
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Decoded RGBA8 pixels.
#[derive(Clone, PartialEq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// Row-major, unpremultiplied RGBA8.
    pub pixels: Arc<Vec<u8>>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels: Arc::new(pixels),
        }
    }

    /// Intrinsic width / height, if both are non-zero.
    pub fn aspect_ratio(&self) -> Option<f64> {
        (self.width > 0 && self.height > 0).then(|| self.width as f64 / self.height as f64)
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Load state of an image shape's bitmap.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ImageHandle {
    /// Not requested yet.
    #[default]
    Unloaded,
    /// Decode in flight.
    Pending,
    Ready(Arc<Bitmap>),
    /// Decode failed; retried after the shape leaves and re-enters the viewport.
    Failed,
}

impl ImageHandle {
    pub fn bitmap(&self) -> Option<&Arc<Bitmap>> {
        match self {
            ImageHandle::Ready(bitmap) => Some(bitmap),
            _ => None,
        }
    }

    pub fn needs_request(&self) -> bool {
        matches!(self, ImageHandle::Unloaded)
    }
}

/// An image placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(flatten)]
    pub base: ShapeBase,
    pub url: String,
    /// Intrinsic width / height as stored by the backend.
    #[serde(default, rename = "ratio", skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    #[serde(skip)]
    pub handle: ImageHandle,
}

impl Image {
    pub fn new(bounds: Rect, url: impl Into<String>) -> Self {
        Self {
            base: ShapeBase::new(bounds),
            url: url.into(),
            aspect_ratio: None,
            handle: ImageHandle::Unloaded,
        }
    }

    /// Store a decoded bitmap, adopting its intrinsic ratio when none was stored.
    pub fn set_bitmap(&mut self, bitmap: Arc<Bitmap>) {
        if self.aspect_ratio.is_none() {
            self.aspect_ratio = bitmap.aspect_ratio();
        }
        self.handle = ImageHandle::Ready(bitmap);
    }
}
