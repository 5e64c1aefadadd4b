//! Fitting a text shape's font size to its box.

use crate::shapes::Text;
use kurbo::Size;

/// Lays out text and reports its extent.
pub trait TextMeasurer {
    /// Size of `text` laid out at `font_size`, wrapped to `max_width`.
    fn measure(&mut self, text: &Text, font_size: f64, max_width: f64) -> Size;
}

/// Glyph-free measurer using fixed advance and line-height factors.
///
/// Used headless and in tests; the render crate provides a shaping measurer.
#[derive(Debug, Clone, Copy)]
pub struct ApproxTextMeasurer {
    /// Average glyph advance as a fraction of the font size.
    pub advance: f64,
    /// Line height as a fraction of the font size.
    pub line_height: f64,
}

impl Default for ApproxTextMeasurer {
    fn default() -> Self {
        Self {
            advance: 0.6,
            line_height: 1.2,
        }
    }
}

impl TextMeasurer for ApproxTextMeasurer {
    fn measure(&mut self, text: &Text, font_size: f64, max_width: f64) -> Size {
        let advance = font_size * self.advance;
        let space = advance;
        let mut widest: f64 = 0.0;
        let mut lines = 0usize;

        for paragraph in text.text.split('\n') {
            let mut line_width: f64 = 0.0;
            lines += 1;
            for word in paragraph.split_whitespace() {
                let word_width = word.chars().count() as f64 * advance;
                if line_width > 0.0 && line_width + space + word_width > max_width {
                    widest = widest.max(line_width);
                    lines += 1;
                    line_width = word_width;
                } else if line_width > 0.0 {
                    line_width += space + word_width;
                } else {
                    line_width = word_width;
                }
            }
            widest = widest.max(line_width);
        }

        Size::new(widest, lines as f64 * font_size * self.line_height)
    }
}

/// Largest whole font size in `[min_size, max_size]` whose layout fits `bounds`.
///
/// Binary search; each probe lays the text out once. Falls back to
/// `min_size` when nothing fits.
pub fn fit_font_size(
    measurer: &mut dyn TextMeasurer,
    text: &Text,
    bounds: Size,
    min_size: f64,
    max_size: f64,
) -> f64 {
    let mut lo = min_size.ceil().max(1.0) as i64;
    let mut hi = max_size.floor() as i64;
    if hi <= lo {
        return lo as f64;
    }

    let mut fits = |size: i64| {
        let measured = measurer.measure(text, size as f64, bounds.width);
        measured.width <= bounds.width && measured.height <= bounds.height
    };

    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo as f64
}
