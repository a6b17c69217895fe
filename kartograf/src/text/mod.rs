//! Text rendering onto raster canvases.
//!
//! Text is shaped with `rustybuzz`, glyph outlines are converted into vector paths and filled on
//! the canvas. If no font is available, text is not drawn at all.

use rustybuzz::ttf_parser::{GlyphId, OutlineBuilder};
use rustybuzz::UnicodeBuffer;
use serde::{Deserialize, Serialize};
use tiny_skia::{FillRule, LineJoin, Path, PathBuilder, Pixmap, Stroke, Transform};

use crate::color::Color;

mod font;

pub use font::FontData;

/// Style of a text label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextStyle {
    /// Size of the font in pixels.
    pub font_size: f32,
    /// Color of the font.
    #[serde(default = "default_font_color")]
    pub font_color: Color,
    /// Alignment of label along horizontal axis.
    #[serde(default)]
    pub horizontal_alignment: HorizontalAlignment,
    /// Alignment of label along vertical axis.
    #[serde(default)]
    pub vertical_alignment: VerticalAlignment,
    /// Width of the outline around the letters.
    #[serde(default)]
    pub outline_width: f32,
    /// Color of the outline around the letters.
    #[serde(default = "default_outline_color")]
    pub outline_color: Color,
}

impl TextStyle {
    /// Black text of the given size without outline.
    pub fn new(font_size: f32) -> Self {
        Self {
            font_size,
            font_color: default_font_color(),
            horizontal_alignment: HorizontalAlignment::default(),
            vertical_alignment: VerticalAlignment::default(),
            outline_width: 0.0,
            outline_color: default_outline_color(),
        }
    }

    /// Sets the font color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.font_color = color;
        self
    }

    /// Sets the outline drawn under the letters.
    pub fn with_outline(mut self, width: f32, color: Color) -> Self {
        self.outline_width = width;
        self.outline_color = color;
        self
    }

    /// Sets the alignment relative to the anchor point.
    pub fn with_alignment(
        mut self,
        horizontal: HorizontalAlignment,
        vertical: VerticalAlignment,
    ) -> Self {
        self.horizontal_alignment = horizontal;
        self.vertical_alignment = vertical;
        self
    }
}

fn default_font_color() -> Color {
    Color::BLACK
}

fn default_outline_color() -> Color {
    Color::TRANSPARENT
}

/// Horizontal alignment.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub enum HorizontalAlignment {
    /// Align to left.
    #[default]
    Left,
    /// Align to center.
    Center,
    /// Align to right.
    Right,
}

/// Vertical alignment.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerticalAlignment {
    /// Align to top.
    Top,
    /// Align to middle.
    Middle,
    /// Align to bottom.
    #[default]
    Bottom,
}

/// Vectorized text with its size. The origin is at the left end of the baseline.
struct ShapedText {
    path: Path,
    width: f32,
    ascender: f32,
    descender: f32,
}

/// Draws text with a single font.
#[derive(Debug, Clone, Default)]
pub struct TextRasterizer {
    font: Option<FontData>,
}

impl TextRasterizer {
    /// Creates a rasterizer using the font.
    pub fn new(font: FontData) -> Self {
        Self { font: Some(font) }
    }

    /// Creates a rasterizer with a system sans-serif font. Text is skipped if none is found.
    pub fn system() -> Self {
        let font = FontData::system_sans_serif();
        if font.is_none() {
            log::warn!("No system font found, text will not be drawn");
        }

        Self { font }
    }

    /// Rasterizer that draws nothing.
    pub fn without_font() -> Self {
        Self { font: None }
    }

    /// Returns true if text can be drawn.
    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Width and height of the text in pixels.
    pub fn measure(&self, text: &str, font_size: f32) -> Option<(f32, f32)> {
        let shaped = self.shape(text, font_size)?;
        Some((shaped.width, shaped.ascender - shaped.descender))
    }

    /// Draws the text at the `position` rotated by `angle` degrees clockwise around it.
    ///
    /// The outline is drawn first and the letters are filled over it.
    pub fn draw(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        position: (f32, f32),
        angle: f32,
        style: &TextStyle,
    ) {
        let Some(shaped) = self.shape(text, style.font_size) else {
            return;
        };

        let dx = match style.horizontal_alignment {
            HorizontalAlignment::Left => 0.0,
            HorizontalAlignment::Center => -shaped.width / 2.0,
            HorizontalAlignment::Right => -shaped.width,
        };
        let dy = match style.vertical_alignment {
            VerticalAlignment::Top => shaped.ascender,
            VerticalAlignment::Middle => (shaped.ascender + shaped.descender) / 2.0,
            VerticalAlignment::Bottom => shaped.descender,
        };

        let transform = Transform::from_translate(position.0, position.1)
            .pre_rotate(angle)
            .pre_translate(dx, dy);

        if style.outline_width > 0.0 && !style.outline_color.is_transparent() {
            let stroke = Stroke {
                width: style.outline_width,
                line_join: LineJoin::Round,
                ..Stroke::default()
            };
            pixmap.stroke_path(
                &shaped.path,
                &style.outline_color.to_paint(),
                &stroke,
                transform,
                None,
            );
        }

        pixmap.fill_path(
            &shaped.path,
            &style.font_color.to_paint(),
            FillRule::Winding,
            transform,
            None,
        );
    }

    fn shape(&self, text: &str, font_size: f32) -> Option<ShapedText> {
        if text.trim().is_empty() || font_size <= 0.0 {
            return None;
        }

        let face = self.font.as_ref()?.face()?;

        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.guess_segment_properties();

        let scale = font_size / face.units_per_em() as f32;
        let glyph_buffer = rustybuzz::shape(&face, &[], buffer);

        let mut builder = GlyphPathBuilder {
            builder: PathBuilder::new(),
            scale,
            offset_x: 0.0,
            offset_y: 0.0,
        };

        let mut advance_x = 0.0;
        for (info, position) in glyph_buffer
            .glyph_infos()
            .iter()
            .zip(glyph_buffer.glyph_positions())
        {
            builder.offset_x = advance_x + position.x_offset as f32 * scale;
            builder.offset_y = -(position.y_offset as f32 * scale);
            let _ = face.outline_glyph(GlyphId(info.glyph_id as u16), &mut builder);
            advance_x += position.x_advance as f32 * scale;
        }

        Some(ShapedText {
            path: builder.builder.finish()?,
            width: advance_x,
            ascender: face.ascender() as f32 * scale,
            descender: face.descender() as f32 * scale,
        })
    }
}

/// Collects glyph outlines into a path with Y axis pointing down.
struct GlyphPathBuilder {
    builder: PathBuilder,
    scale: f32,
    offset_x: f32,
    offset_y: f32,
}

impl GlyphPathBuilder {
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.scale + self.offset_x,
            -y * self.scale + self.offset_y,
        )
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
