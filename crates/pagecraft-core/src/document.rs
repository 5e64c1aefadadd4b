//! Document and page model with snapshot-based undo/redo.

use crate::error::{DocumentError, DocumentResult};
use crate::shapes::{ImageHandle, Shape, ShapeId};
use kurbo::{Rect, Size};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of undo states to keep.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Serializable RGB(A) color as stored by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque")]
    pub a: u8,
}

fn opaque() -> u8 {
    255
}

impl RgbColor {
    pub fn white() -> Self {
        Self {
            r: 255,
            g: 255,
            b: 255,
            a: 255,
        }
    }
}

impl From<RgbColor> for Color {
    fn from(c: RgbColor) -> Self {
        Color::from_rgba8(c.r, c.g, c.b, c.a)
    }
}

/// Page background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background {
    pub color: RgbColor,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            color: RgbColor::white(),
        }
    }
}

/// A page: a fixed-size artboard with shapes in z-order (last is topmost).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub background: Background,
    #[serde(default)]
    pub shapes: Vec<Shape>,
}

impl Page {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            width,
            height,
            background: Background::default(),
            shapes: Vec::new(),
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// The page rectangle in world coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    pub fn shape(&self, index: usize) -> Option<&Shape> {
        self.shapes.get(index)
    }

    pub fn shape_mut(&mut self, index: usize) -> Option<&mut Shape> {
        self.shapes.get_mut(index)
    }

    pub fn index_of(&self, id: ShapeId) -> Option<usize> {
        self.shapes.iter().position(|s| s.id() == Some(id))
    }
}

#[derive(Debug, Clone)]
struct PageSnapshot {
    page_index: usize,
    shapes: Vec<Shape>,
}

/// A document: an ordered list of pages plus undo history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub pages: Vec<Page>,
    #[serde(skip)]
    undo_stack: Vec<PageSnapshot>,
    #[serde(skip)]
    redo_stack: Vec<PageSnapshot>,
    #[serde(skip, default = "default_history_limit")]
    history_limit: usize,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Default for Document {
    fn default() -> Self {
        Self::new(vec![Page::new(1920.0, 1080.0)])
    }
}

impl Document {
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            pages,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Parse a document. A document without pages is rejected.
    pub fn from_json(json: &str) -> DocumentResult<Self> {
        let mut document: Document = serde_json::from_str(json)?;
        if document.pages.is_empty() {
            return Err(DocumentError::Empty);
        }
        for shape in document.pages.iter_mut().flat_map(|p| p.shapes.iter_mut()) {
            shape.base_mut().normalize();
        }
        log::info!(
            "Loaded document {} with {} pages",
            document.id,
            document.pages.len()
        );
        Ok(document)
    }

    pub fn to_json(&self) -> DocumentResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn set_history_limit(&mut self, limit: usize) {
        self.history_limit = limit.max(1);
        self.trim_history();
    }

    pub fn page(&self, index: usize) -> DocumentResult<&Page> {
        let len = self.pages.len();
        self.pages
            .get(index)
            .ok_or(DocumentError::PageOutOfRange { index, len })
    }

    pub fn page_mut(&mut self, index: usize) -> DocumentResult<&mut Page> {
        let len = self.pages.len();
        self.pages
            .get_mut(index)
            .ok_or(DocumentError::PageOutOfRange { index, len })
    }

    fn snapshot(&self, page_index: usize) -> Option<PageSnapshot> {
        self.pages.get(page_index).map(|page| PageSnapshot {
            page_index,
            shapes: page.shapes.clone(),
        })
    }

    fn trim_history(&mut self) {
        while self.undo_stack.len() > self.history_limit {
            self.undo_stack.remove(0);
        }
    }

    /// Push the page's current shapes to the undo stack (call before changing them).
    pub fn push_undo(&mut self, page_index: usize) {
        let Some(snapshot) = self.snapshot(page_index) else {
            return;
        };
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        self.trim_history();
    }

    /// Push an earlier copy of a page's shapes, taken before a change that
    /// has already been applied.
    pub fn push_undo_shapes(&mut self, page_index: usize, shapes: Vec<Shape>) {
        if page_index >= self.pages.len() {
            return;
        }
        self.undo_stack.push(PageSnapshot { page_index, shapes });
        self.redo_stack.clear();
        self.trim_history();
    }

    /// Undo the last change. Returns the page index that was restored.
    pub fn undo(&mut self) -> Option<usize> {
        let snapshot = self.undo_stack.pop()?;
        let current = self.snapshot(snapshot.page_index)?;
        self.redo_stack.push(current);
        Some(self.restore(snapshot))
    }

    /// Redo the last undone change. Returns the page index that was restored.
    pub fn redo(&mut self) -> Option<usize> {
        let snapshot = self.redo_stack.pop()?;
        let current = self.snapshot(snapshot.page_index)?;
        self.undo_stack.push(current);
        Some(self.restore(snapshot))
    }

    fn restore(&mut self, snapshot: PageSnapshot) -> usize {
        let index = snapshot.page_index;
        if let Some(page) = self.pages.get_mut(index) {
            page.shapes = snapshot.shapes;
            // A decode that was in flight when the snapshot was taken has
            // since been delivered elsewhere; request it again.
            for shape in &mut page.shapes {
                if let Some(image) = shape.as_image_mut() {
                    if image.handle == ImageHandle::Pending {
                        image.handle = ImageHandle::Unloaded;
                    }
                }
            }
        }
        index
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Image, Text};

    const DOC: &str = r##"{
        "id": "doc-1",
        "pages": [{
            "id": "p1", "width": 800, "height": 600,
            "background": {"color": {"r": 10, "g": 20, "b": 30}},
            "shapes": [
                {"id": 1, "kind": "image", "x": 0, "y": 0, "width": 200, "height": 100, "rotate": 0, "url": "a.png", "ratio": 2.0},
                {"id": 2, "kind": "text", "x": 50, "y": 50, "width": 300, "height": 60, "rotate": 15, "text": "Title", "color": "#112233"}
            ]
        }]
    }"##;

    #[test]
    fn test_load_document() {
        let doc = Document::from_json(DOC).unwrap();
        assert_eq!(doc.id, "doc-1");
        let page = doc.page(0).unwrap();
        assert_eq!(page.shapes.len(), 2);
        assert_eq!(page.background.color.a, 255);
        assert_eq!(page.index_of(2), Some(1));
        assert!(matches!(
            doc.page(3),
            Err(DocumentError::PageOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn test_load_normalizes_frames() {
        let json = r#"{"id": "d", "pages": [{"id": "p", "width": 100, "height": 100, "shapes": [
            {"kind": "image", "x": 0, "y": 0, "width": 0, "height": 40, "rotate": 370, "url": "a.png"},
            {"kind": "image", "x": 0, "y": 0, "width": 40, "height": 40, "rotate": -30, "url": "b.png"}
        ]}]}"#;
        let doc = Document::from_json(json).unwrap();
        let shapes = &doc.page(0).unwrap().shapes;
        assert!((shapes[0].base().rotation() - 10.0).abs() < 1e-9);
        assert!((shapes[0].base().width - crate::config::MIN_SHAPE_SIZE).abs() < f64::EPSILON);
        assert!((shapes[1].base().rotation() - 330.0).abs() < 1e-9);

        let saved: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(saved["pages"][0]["shapes"][0]["rotate"], 10.0);
    }

    #[test]
    fn test_empty_document_rejected() {
        let err = Document::from_json(r#"{"id":"x","pages":[]}"#).unwrap_err();
        assert!(matches!(err, DocumentError::Empty));
        assert!(matches!(
            Document::from_json("{").unwrap_err(),
            DocumentError::Json(_)
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let doc = Document::from_json(DOC).unwrap();
        let json = doc.to_json().unwrap();
        let reloaded = Document::from_json(&json).unwrap();
        assert_eq!(reloaded.pages, doc.pages);
    }

    #[test]
    fn test_undo_redo() {
        let mut doc = Document::new(vec![Page::new(100.0, 100.0)]);
        doc.push_undo(0);
        doc.pages[0]
            .shapes
            .push(Shape::Text(Text::new(Rect::new(0.0, 0.0, 10.0, 10.0), "a")));

        assert!(doc.can_undo());
        assert_eq!(doc.undo(), Some(0));
        assert!(doc.pages[0].shapes.is_empty());
        assert!(doc.can_redo());

        assert_eq!(doc.redo(), Some(0));
        assert_eq!(doc.pages[0].shapes.len(), 1);
        assert_eq!(doc.undo(), Some(0));
        assert_eq!(doc.undo(), None);
    }

    #[test]
    fn test_new_change_clears_redo() {
        let mut doc = Document::new(vec![Page::new(100.0, 100.0)]);
        doc.push_undo(0);
        doc.undo();
        assert!(doc.can_redo());
        doc.push_undo(0);
        assert!(!doc.can_redo());
    }

    #[test]
    fn test_history_limit() {
        let mut doc = Document::new(vec![Page::new(100.0, 100.0)]);
        doc.set_history_limit(3);
        for _ in 0..10 {
            doc.push_undo(0);
        }
        let mut count = 0;
        while doc.undo().is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn test_restore_rerequests_pending_images() {
        let mut doc = Document::new(vec![Page::new(100.0, 100.0)]);
        let mut image = Image::new(Rect::new(0.0, 0.0, 10.0, 10.0), "a.png");
        image.handle = ImageHandle::Pending;
        doc.pages[0].shapes.push(Shape::Image(image));
        doc.push_undo(0);
        doc.undo();
        let handle = &doc.pages[0].shapes[0].as_image().unwrap().handle;
        assert_eq!(*handle, ImageHandle::Unloaded);
    }
}
