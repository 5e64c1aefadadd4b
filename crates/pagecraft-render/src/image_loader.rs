//! Background image decoding.
//!
//! Decodes run on a worker thread; results come back over a channel that the
//! host drains once per frame tick with [`ImageLoader::apply_completed`].
//! Only shapes inside the viewport are requested.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use kurbo::Rect;
use pagecraft_core::shapes::{Bitmap, ImageHandle, Shape};
use pagecraft_core::viewport;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Image loading errors.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Malformed data URL")]
    MalformedDataUrl,
    #[error("Unsupported image source: {0}")]
    UnsupportedSource(String),
}

/// Decode the image at `url` into RGBA8 pixels.
///
/// Accepts `data:` URLs with a base64 payload, `file://` URLs and plain
/// filesystem paths.
pub fn load_bitmap(url: &str) -> Result<Bitmap, ImageError> {
    let bytes = if let Some(rest) = url.strip_prefix("data:") {
        let (meta, payload) = rest.split_once(',').ok_or(ImageError::MalformedDataUrl)?;
        if !meta.ends_with(";base64") {
            return Err(ImageError::MalformedDataUrl);
        }
        BASE64.decode(payload.trim())?
    } else if url.starts_with("http://") || url.starts_with("https://") {
        return Err(ImageError::UnsupportedSource(url.to_string()));
    } else {
        let path = url.strip_prefix("file://").unwrap_or(url);
        std::fs::read(Path::new(path))?
    };
    decode_bytes(&bytes)
}

/// Decode encoded image bytes (PNG, JPEG, WebP).
pub fn decode_bytes(bytes: &[u8]) -> Result<Bitmap, ImageError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(Bitmap::new(width, height, rgba.into_raw()))
}

type Completion = (String, Result<Bitmap, ImageError>);

/// Asynchronous loader with a per-URL cache of decoded bitmaps.
pub struct ImageLoader {
    requests: Option<Sender<String>>,
    completions: Receiver<Completion>,
    worker: Option<JoinHandle<()>>,
    in_flight: HashSet<String>,
    cache: HashMap<String, Arc<Bitmap>>,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("in_flight", &self.in_flight.len())
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader {
    /// Start the decode worker.
    pub fn new() -> Self {
        let (request_tx, request_rx) = mpsc::channel::<String>();
        let (done_tx, done_rx) = mpsc::channel::<Completion>();
        let worker = thread::Builder::new()
            .name("pagecraft-image-decode".into())
            .spawn(move || {
                for url in request_rx {
                    let result = load_bitmap(&url);
                    if done_tx.send((url, result)).is_err() {
                        break;
                    }
                }
            });
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Failed to spawn image decode thread: {}", e);
                None
            }
        };
        Self {
            requests: worker.as_ref().map(|_| request_tx),
            completions: done_rx,
            worker,
            in_flight: HashSet::new(),
            cache: HashMap::new(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn cached(&self, url: &str) -> Option<&Arc<Bitmap>> {
        self.cache.get(url)
    }

    /// Queue a decode. Returns `false` if the worker is gone.
    fn request(&mut self, url: &str) -> bool {
        if self.in_flight.contains(url) {
            return true;
        }
        let Some(requests) = &self.requests else {
            return false;
        };
        if requests.send(url.to_string()).is_err() {
            log::warn!("Image decode worker stopped");
            self.requests = None;
            return false;
        }
        self.in_flight.insert(url.to_string());
        true
    }

    /// Request bitmaps for unloaded images inside `view`, and reset failed
    /// images outside it so they retry on re-entry.
    ///
    /// Returns `true` if any shape was patched from the cache.
    pub fn sync_visible(&mut self, shapes: &mut [Shape], view: Rect) -> bool {
        let mut patched = false;
        for shape in shapes.iter_mut() {
            let visible = viewport::shape_visible(shape, view);
            let Shape::Image(image) = shape else {
                continue;
            };
            if !visible {
                if image.handle == ImageHandle::Failed {
                    image.handle = ImageHandle::Unloaded;
                }
                continue;
            }
            if !image.handle.needs_request() {
                continue;
            }
            if let Some(bitmap) = self.cache.get(&image.url) {
                image.set_bitmap(bitmap.clone());
                patched = true;
            } else if self.request(&image.url) {
                image.handle = ImageHandle::Pending;
            } else {
                image.handle = ImageHandle::Failed;
            }
        }
        patched
    }

    /// Drain finished decodes and patch every pending image with a matching
    /// URL. Returns `true` if any shape changed.
    pub fn apply_completed(&mut self, shapes: &mut [Shape]) -> bool {
        let mut changed = false;
        while let Ok((url, result)) = self.completions.try_recv() {
            changed |= self.complete(shapes, url, result);
        }
        changed
    }

    /// Block until every queued decode has finished and apply them.
    pub fn finish(&mut self, shapes: &mut [Shape]) -> bool {
        let mut changed = false;
        while !self.in_flight.is_empty() {
            let Ok((url, result)) = self.completions.recv() else {
                break;
            };
            changed |= self.complete(shapes, url, result);
        }
        changed
    }

    fn complete(&mut self, shapes: &mut [Shape], url: String, result: Result<Bitmap, ImageError>) -> bool {
        self.in_flight.remove(&url);
        let bitmap = match result {
            Ok(bitmap) => {
                log::debug!("Decoded {}x{} image", bitmap.width, bitmap.height);
                let bitmap = Arc::new(bitmap);
                self.cache.insert(url.clone(), bitmap.clone());
                Some(bitmap)
            }
            Err(e) => {
                log::warn!("Image decode failed: {}", e);
                None
            }
        };

        let mut changed = false;
        for shape in shapes.iter_mut() {
            let Shape::Image(image) = shape else {
                continue;
            };
            if image.url != url || image.handle != ImageHandle::Pending {
                continue;
            }
            match &bitmap {
                Some(bitmap) => image.set_bitmap(bitmap.clone()),
                None => image.handle = ImageHandle::Failed,
            }
            changed = true;
        }
        changed
    }
}

impl Drop for ImageLoader {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.requests = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Image decode thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_core::shapes::Image;
    use std::io::{Cursor, Write};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn data_url(bytes: &[u8]) -> String {
        format!("data:image/png;base64,{}", BASE64.encode(bytes))
    }

    fn image_at(x: f64, url: &str) -> Shape {
        Shape::Image(Image::new(Rect::new(x, 0.0, x + 100.0, 50.0), url))
    }

    #[test]
    fn test_load_data_url() {
        let bitmap = load_bitmap(&data_url(&png_bytes(4, 2))).unwrap();
        assert_eq!((bitmap.width, bitmap.height), (4, 2));
        assert_eq!(bitmap.pixels.len(), 32);
        assert_eq!(&bitmap.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_load_file_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&png_bytes(3, 3)).unwrap();
        let path = file.path().to_string_lossy().into_owned();
        assert_eq!(load_bitmap(&path).unwrap().width, 3);
        assert_eq!(load_bitmap(&format!("file://{path}")).unwrap().height, 3);
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            load_bitmap("https://example.com/a.png"),
            Err(ImageError::UnsupportedSource(_))
        ));
        assert!(matches!(load_bitmap("data:image/png,abc"), Err(ImageError::MalformedDataUrl)));
        assert!(matches!(load_bitmap("data:image/png;base64,!!!"), Err(ImageError::Base64(_))));
        assert!(matches!(
            load_bitmap(&data_url(b"not an image")),
            Err(ImageError::Decode(_))
        ));
        assert!(matches!(load_bitmap("/definitely/missing.png"), Err(ImageError::Io(_))));
    }

    #[test]
    fn test_only_visible_images_requested() {
        let url = data_url(&png_bytes(2, 1));
        let mut shapes = vec![image_at(0.0, &url), image_at(5000.0, &url)];
        let mut loader = ImageLoader::new();
        let view = Rect::new(0.0, 0.0, 800.0, 600.0);

        loader.sync_visible(&mut shapes, view);
        assert_eq!(shapes[0].as_image().unwrap().handle, ImageHandle::Pending);
        assert_eq!(shapes[1].as_image().unwrap().handle, ImageHandle::Unloaded);
        assert_eq!(loader.in_flight(), 1);

        assert!(loader.finish(&mut shapes));
        let image = shapes[0].as_image().unwrap();
        assert!(image.handle.bitmap().is_some());
        assert_eq!(image.aspect_ratio, Some(2.0));

        // The second shape is served from the cache once visible.
        assert!(loader.sync_visible(&mut shapes, Rect::new(4900.0, 0.0, 5200.0, 600.0)));
        assert!(shapes[1].as_image().unwrap().handle.bitmap().is_some());
    }

    #[test]
    fn test_failed_image_retries_after_leaving_view() {
        let mut shapes = vec![image_at(0.0, "/definitely/missing.png")];
        let mut loader = ImageLoader::new();
        let view = Rect::new(0.0, 0.0, 800.0, 600.0);

        loader.sync_visible(&mut shapes, view);
        loader.finish(&mut shapes);
        assert_eq!(shapes[0].as_image().unwrap().handle, ImageHandle::Failed);

        // Still visible: no retry.
        loader.sync_visible(&mut shapes, view);
        assert_eq!(shapes[0].as_image().unwrap().handle, ImageHandle::Failed);

        loader.sync_visible(&mut shapes, Rect::new(2000.0, 0.0, 2800.0, 600.0));
        assert_eq!(shapes[0].as_image().unwrap().handle, ImageHandle::Unloaded);
        loader.sync_visible(&mut shapes, view);
        assert_eq!(shapes[0].as_image().unwrap().handle, ImageHandle::Pending);
    }
}
