use egui::{Color32, Vec2};

/// Outline color used for the label drawn on top of non-text shapes.
pub const LABEL_STROKE: Color32 = Color32::from_rgb(0x11, 0x11, 0x11);

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f32,
    pub fill: Color32,
    pub stroke: Color32,
    pub stroke_thickness: f32,
    /// Wrap lines longer than this many units
    pub word_wrap_width: Option<f32>,
    pub centered: bool,
    pub drop_shadow: bool,
}

impl TextStyle {
    pub fn new(font_family: impl Into<String>, font_size: f32) -> Self {
        Self {
            font_family: font_family.into(),
            font_size,
            fill: Color32::WHITE,
            stroke: Color32::BLACK,
            stroke_thickness: 0.0,
            word_wrap_width: None,
            centered: false,
            drop_shadow: false,
        }
    }

    /// Style of the centered label shown on rectangles, ellipses and paths.
    pub fn label(font_family: impl Into<String>, font_size: f32, fill: Color32, wrap_width: f32) -> Self {
        Self {
            fill,
            stroke: LABEL_STROKE,
            stroke_thickness: label_stroke_thickness(font_size),
            word_wrap_width: Some(wrap_width.abs()),
            centered: true,
            drop_shadow: true,
            ..Self::new(font_family, font_size)
        }
    }
}

pub fn label_stroke_thickness(font_size: f32) -> f32 {
    (font_size / 32.0).round().max(2.0)
}

/// A block of text placed in the local space of a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub text: String,
    pub style: TextStyle,
    pub alpha: f32,
    /// Unscaled size as reported by [`TextMetrics`]
    pub measured: Vec2,
    pub offset: Vec2,
    pub scale: Vec2,
}

impl TextNode {
    /// Silhouette used to mask a texture: opaque white glyphs.
    pub fn opaque(&self) -> Self {
        let mut mask = self.clone();
        mask.style.fill = Color32::WHITE;
        mask.alpha = 1.0;
        mask
    }

    pub fn scaled_size(&self) -> Vec2 {
        self.measured * self.scale
    }
}

/// Measures rendered text.
///
/// The host supplies a real implementation backed by its font system; the
/// renderer only needs the size of the laid-out block.
pub trait TextMetrics {
    fn measure(&self, text: &str, style: &TextStyle) -> Vec2;
}

/// Fixed-advance measurement used when no font system is available.
#[derive(Debug, Clone, Copy)]
pub struct ApproximateTextMetrics {
    /// Glyph advance as a fraction of the font size
    pub advance: f32,
    /// Line height as a fraction of the font size
    pub line_height: f32,
}

impl Default for ApproximateTextMetrics {
    fn default() -> Self {
        Self { advance: 0.6, line_height: 1.2 }
    }
}

impl TextMetrics for ApproximateTextMetrics {
    fn measure(&self, text: &str, style: &TextStyle) -> Vec2 {
        if text.is_empty() {
            return Vec2::ZERO;
        }
        let advance = style.font_size * self.advance;
        let max_chars = style
            .word_wrap_width
            .filter(|w| *w > 0.0 && advance > 0.0)
            .map(|w| ((w / advance).floor() as usize).max(1));

        let mut lines = 0usize;
        let mut widest = 0usize;
        for line in text.lines() {
            for wrapped in wrap_line(line, max_chars) {
                lines += 1;
                widest = widest.max(wrapped);
            }
        }
        Vec2::new(
            widest as f32 * advance + style.stroke_thickness,
            lines.max(1) as f32 * style.font_size * self.line_height + style.stroke_thickness,
        )
    }
}

/// Character counts of the lines `line` wraps into, breaking at spaces.
fn wrap_line(line: &str, max_chars: Option<usize>) -> Vec<usize> {
    let Some(max) = max_chars else {
        return vec![line.chars().count()];
    };
    let mut wrapped = Vec::new();
    let mut current = 0usize;
    for word in line.split(' ') {
        let len = word.chars().count();
        if current == 0 {
            current = len;
        } else if current + 1 + len <= max {
            current += 1 + len;
        } else {
            wrapped.push(current);
            current = len;
        }
        // Words longer than a line are broken at the wrap width
        while current > max {
            wrapped.push(max);
            current -= max;
        }
    }
    wrapped.push(current);
    wrapped
}
