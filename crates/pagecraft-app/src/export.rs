//! Export timeline: how long each page is held and which frames to draw.
//!
//! A page is held for its longest animation (`delay + duration`), but never
//! less than the configured minimum. Frame times are page-local so each page
//! replays its animations from zero.

use pagecraft_core::Document;
use pagecraft_core::animation::max_animation_duration;
use serde::Serialize;

/// One page's slot on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageHold {
    pub index: usize,
    pub page_id: String,
    /// Offset of the page from the start of the export.
    pub start_ms: f64,
    pub hold_ms: f64,
    /// Longest animation on the page; zero when nothing animates.
    pub animation_ms: f64,
    /// Frames drawn for this page.
    pub frames: usize,
}

impl PageHold {
    pub fn end_ms(&self) -> f64 {
        self.start_ms + self.hold_ms
    }
}

/// A frame to draw: a page and the time since the page appeared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportFrame {
    pub page_index: usize,
    pub local_ms: f64,
    /// Last frame of the page, drawn with every animation settled.
    pub settle: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTimeline {
    pub frame_interval_ms: f64,
    pub total_ms: f64,
    pub pages: Vec<PageHold>,
}

impl ExportTimeline {
    pub fn new(document: &Document, frame_interval_ms: f64, min_page_hold_ms: f64) -> Self {
        let frame_interval_ms = if frame_interval_ms > 0.0 {
            frame_interval_ms
        } else {
            1000.0 / 60.0
        };
        let mut start_ms = 0.0;
        let pages = document
            .pages
            .iter()
            .enumerate()
            .map(|(index, page)| {
                let animation_ms = max_animation_duration(&page.shapes);
                let hold_ms = animation_ms.max(min_page_hold_ms).max(0.0);
                let frames = ((hold_ms / frame_interval_ms).ceil() as usize).max(1);
                let hold = PageHold {
                    index,
                    page_id: page.id.clone(),
                    start_ms,
                    hold_ms,
                    animation_ms,
                    frames,
                };
                start_ms += hold_ms;
                hold
            })
            .collect();
        log::debug!("Export timeline spans {start_ms:.0} ms");
        Self {
            frame_interval_ms,
            total_ms: start_ms,
            pages,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.pages.iter().map(|p| p.frames).sum()
    }

    /// Page shown at `time_ms` and the page-local time. The last page stays
    /// up past the end.
    pub fn page_at(&self, time_ms: f64) -> Option<(usize, f64)> {
        let time_ms = time_ms.max(0.0);
        let page = self
            .pages
            .iter()
            .find(|p| time_ms < p.end_ms())
            .or_else(|| self.pages.last())?;
        Some((page.index, time_ms - page.start_ms))
    }

    /// Every frame of the export in order.
    pub fn frames(&self) -> impl Iterator<Item = ExportFrame> + '_ {
        let interval = self.frame_interval_ms;
        self.pages.iter().flat_map(move |page| {
            (0..page.frames).map(move |i| ExportFrame {
                page_index: page.index,
                local_ms: i as f64 * interval,
                settle: i + 1 == page.frames,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;
    use pagecraft_core::animation::{AnimationConfig, AnimationKind};
    use pagecraft_core::document::Page;
    use pagecraft_core::shapes::{Shape, Text};

    fn animated_page(delay: f64, duration: f64) -> Page {
        let mut page = Page::new(800.0, 600.0);
        let mut text = Text::new(Rect::new(0.0, 0.0, 100.0, 40.0), "Title");
        text.base.animation = AnimationConfig::new(AnimationKind::Fade).with_timing(delay, duration);
        page.shapes.push(Shape::Text(text));
        page
    }

    #[test]
    fn test_hold_uses_longest_animation() {
        let doc = Document::new(vec![animated_page(500.0, 1500.0), Page::new(800.0, 600.0)]);
        let timeline = ExportTimeline::new(&doc, 100.0, 1000.0);

        assert!((timeline.pages[0].hold_ms - 2000.0).abs() < f64::EPSILON);
        assert!((timeline.pages[0].animation_ms - 2000.0).abs() < f64::EPSILON);
        // Static page held for the minimum.
        assert!((timeline.pages[1].hold_ms - 1000.0).abs() < f64::EPSILON);
        assert!((timeline.pages[1].start_ms - 2000.0).abs() < f64::EPSILON);
        assert!((timeline.total_ms - 3000.0).abs() < f64::EPSILON);
        assert_eq!(timeline.frame_count(), 30);
    }

    #[test]
    fn test_page_at() {
        let doc = Document::new(vec![animated_page(0.0, 2000.0), Page::new(800.0, 600.0)]);
        let timeline = ExportTimeline::new(&doc, 100.0, 1000.0);

        assert_eq!(timeline.page_at(-5.0), Some((0, 0.0)));
        let (page, local) = timeline.page_at(2500.0).unwrap();
        assert_eq!(page, 1);
        assert!((local - 500.0).abs() < f64::EPSILON);
        // Past the end the last page stays up.
        assert_eq!(timeline.page_at(10_000.0).map(|(p, _)| p), Some(1));
    }

    #[test]
    fn test_last_frame_of_each_page_settles() {
        let doc = Document::new(vec![animated_page(0.0, 250.0), Page::new(800.0, 600.0)]);
        let timeline = ExportTimeline::new(&doc, 100.0, 0.0);
        let frames: Vec<_> = timeline.frames().collect();

        // 250 ms at 100 ms per frame, then a single frame for the static page.
        assert_eq!(frames.len(), 4);
        assert!(!frames[0].settle);
        assert!(frames[2].settle);
        assert!((frames[2].local_ms - 200.0).abs() < f64::EPSILON);
        assert_eq!(frames[3].page_index, 1);
        assert!(frames[3].settle);
    }
}
