//! Parley text layout shared by drawing and font fitting.

use kurbo::Size;
use pagecraft_core::shapes::{FontStyle, Text};
use pagecraft_core::text_fit::TextMeasurer;
use parley::{Alignment, AlignmentOptions, FontContext, FontStack, Layout, LayoutContext, StyleProperty};
use peniko::Brush;

/// Owns the font and layout contexts so fonts are discovered once.
pub struct TextLayouter {
    font_cx: FontContext,
    layout_cx: LayoutContext<Brush>,
}

impl Default for TextLayouter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TextLayouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextLayouter").finish_non_exhaustive()
    }
}

impl TextLayouter {
    pub fn new() -> Self {
        Self {
            font_cx: FontContext::new(),
            layout_cx: LayoutContext::new(),
        }
    }

    /// Lay out a text shape at `font_size`, wrapping at `max_width` when given.
    pub fn layout(&mut self, text: &Text, font_size: f64, max_width: Option<f64>) -> Layout<Brush> {
        let brush = Brush::Solid(text.fill_color());
        let mut builder = self
            .layout_cx
            .ranged_builder(&mut self.font_cx, &text.text, 1.0, false);
        builder.push_default(StyleProperty::FontSize(font_size as f32));
        builder.push_default(StyleProperty::Brush(brush));
        builder.push_default(StyleProperty::FontWeight(parley::FontWeight::new(
            text.font_weight.value(),
        )));
        if text.font_style == FontStyle::Italic {
            builder.push_default(StyleProperty::FontStyle(parley::FontStyle::Italic));
        }
        builder.push_default(StyleProperty::FontStack(FontStack::Source(
            text.font_family.as_str().into(),
        )));

        let mut layout = builder.build(&text.text);
        layout.break_all_lines(max_width.map(|w| w.max(0.0) as f32));
        layout.align(None, Alignment::Start, AlignmentOptions::default());
        layout
    }
}

/// [`TextMeasurer`] backed by real shaping.
#[derive(Debug, Default)]
pub struct ParleyMeasurer {
    layouter: TextLayouter,
}

impl ParleyMeasurer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextMeasurer for ParleyMeasurer {
    fn measure(&mut self, text: &Text, font_size: f64, max_width: f64) -> Size {
        let layout = self.layouter.layout(text, font_size, Some(max_width));
        Size::new(layout.width() as f64, layout.height() as f64)
    }
}
