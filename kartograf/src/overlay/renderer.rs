use kartograf_types::cartesian::Point2d;
use kartograf_types::geo::{BoundingBox, GeoPoint, Geodesic, PixelMapper};
use tiny_skia::{
    FillRule, FilterQuality, LineCap, LineJoin, Path, PathBuilder, Pixmap, PixmapPaint, Stroke,
    StrokeDash, Transform,
};

use super::grid::GridLine;
use super::marker::{load_icon, ICON_SIZE};
use super::pattern::{stamp_positions, StampShape};
use super::{ColorOverrides, Layer, LayerObject, Marker, MarkerIcon, ObjectKind, Style};
use crate::color::Color;
use crate::text::{HorizontalAlignment, TextRasterizer, TextStyle, VerticalAlignment};

/// Number of vertices of a radius circle.
const CIRCLE_SEGMENTS: usize = 72;
/// Font size of marker labels at the reference resolution.
const MARKER_LABEL_SIZE: f32 = 14.0;
/// Natural width of a marker.
const MARKER_REFERENCE_WIDTH: f32 = 25.0;

/// Draws geo-referenced overlays on a raster covering a bounding box.
///
/// Sizes of strokes, icons and text are multiplied by the scale factor `sqrt(width * height) /
/// 1000`, so overlays look the same on rasters of any resolution.
pub struct OverlayRenderer<'a> {
    mapper: PixelMapper,
    width: u32,
    height: u32,
    scale_factor: f32,
    text: &'a TextRasterizer,
    overrides: &'a ColorOverrides,
}

impl<'a> OverlayRenderer<'a> {
    /// Creates a renderer for a `width x height` raster covering `bbox`.
    ///
    /// Returns `None` if the box or the raster is degenerate.
    pub fn new(
        bbox: &BoundingBox,
        width: u32,
        height: u32,
        text: &'a TextRasterizer,
        overrides: &'a ColorOverrides,
    ) -> Option<Self> {
        let mapper = PixelMapper::new(bbox, width, height)?;
        Some(Self {
            mapper,
            width,
            height,
            scale_factor: ((width as f64 * height as f64).sqrt() / 1000.0) as f32,
            text,
            overrides,
        })
    }

    /// Multiplier of all overlay sizes.
    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    /// Pixel positions of the points.
    pub fn to_pixels(&self, points: &[GeoPoint]) -> Vec<Point2d> {
        self.mapper.to_pixels(points)
    }

    /// Draws all objects of the visible layers.
    pub fn render_layers(&self, pixmap: &mut Pixmap, layers: &[Layer]) {
        for layer in layers.iter().filter(|layer| layer.visible) {
            log::debug!(
                "Drawing layer {} with {} objects",
                layer.name,
                layer.objects.len()
            );
            for object in &layer.objects {
                self.render_object(pixmap, object);
            }
        }
    }

    /// Draws one object. Objects that cannot be projected are skipped.
    pub fn render_object(&self, pixmap: &mut Pixmap, object: &LayerObject) {
        let color_override = self.overrides.for_kind(object.kind());
        match object {
            LayerObject::Line { points, style } => {
                let color = color_override.unwrap_or(style.color);
                self.draw_shape(pixmap, &self.to_pixels(points), false, style, color);
            }
            LayerObject::Polygon { points, style } => {
                let color = color_override.unwrap_or(style.color);
                self.draw_shape(pixmap, &self.to_pixels(points), true, style, color);
            }
            LayerObject::Radius {
                center,
                radius,
                style,
            } => {
                if !radius.is_finite() || *radius <= 0.0 {
                    return;
                }

                let geodesic = Geodesic::WGS84;
                let circle: Vec<_> = (0..CIRCLE_SEGMENTS)
                    .map(|i| {
                        let azimuth = i as f64 * 360.0 / CIRCLE_SEGMENTS as f64;
                        geodesic.direct(center, azimuth, *radius)
                    })
                    .collect();
                let color = color_override.unwrap_or(style.color);
                self.draw_shape(pixmap, &self.to_pixels(&circle), true, style, color);
            }
            LayerObject::Text {
                position,
                text,
                angle,
                size,
                color,
            } => {
                let Some(anchor) = self.mapper.to_pixel(position) else {
                    return;
                };

                let style = TextStyle::new(size * self.scale_factor)
                    .with_color(color_override.unwrap_or(*color))
                    .with_alignment(HorizontalAlignment::Left, VerticalAlignment::Bottom);
                self.text.draw(
                    pixmap,
                    text,
                    (anchor.x as f32, anchor.y as f32),
                    *angle,
                    &style,
                );
            }
            LayerObject::Marker(marker) => self.draw_marker(pixmap, marker, color_override),
        }
    }

    /// Draws grid lines with their labels.
    pub fn render_grid(
        &self,
        pixmap: &mut Pixmap,
        lines: &[GridLine],
        color: Color,
        stroke_width: f32,
        label_size: f32,
    ) {
        let style = Style::new(color, stroke_width);
        let label_style = TextStyle::new(label_size * self.scale_factor)
            .with_color(color)
            .with_outline(label_size * self.scale_factor / 6.0, color.contrasting());
        let margin = 2.0 * self.scale_factor;

        for line in lines {
            let pixels = self.to_pixels(&line.points);
            self.draw_shape(pixmap, &pixels, false, &style, color);

            if let Some(first) = pixels.first() {
                let x = (first.x as f32).clamp(margin, self.width as f32 - margin);
                let y = (first.y as f32).clamp(margin, self.height as f32 - margin);
                let label_style = label_style.clone().with_alignment(
                    if x > self.width as f32 / 2.0 {
                        HorizontalAlignment::Right
                    } else {
                        HorizontalAlignment::Left
                    },
                    if y > self.height as f32 / 2.0 {
                        VerticalAlignment::Bottom
                    } else {
                        VerticalAlignment::Top
                    },
                );
                self.text.draw(pixmap, &line.label, (x, y), 0.0, &label_style);
            }
        }
    }

    fn stroke_width(&self, style: &Style) -> f32 {
        (style.stroke_width * self.scale_factor).max(0.5)
    }

    fn draw_shape(
        &self,
        pixmap: &mut Pixmap,
        pixels: &[Point2d],
        closed: bool,
        style: &Style,
        color: Color,
    ) {
        let Some(path) = polyline_path(pixels, closed) else {
            return;
        };

        if closed && style.fill_alpha > 0 {
            let fill_alpha = (style.fill_alpha as u32 * color.a() as u32 / 255) as u8;
            pixmap.fill_path(
                &path,
                &color.with_alpha(fill_alpha).to_paint(),
                FillRule::EvenOdd,
                Transform::identity(),
                None,
            );
        }

        let width = self.stroke_width(style);
        let mut stroke = Stroke {
            width,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        if let Some(dash) = style.pattern.dash() {
            stroke.dash = StrokeDash::new(dash.intervals.iter().map(|v| v * width).collect(), 0.0);
            if dash.round_caps {
                stroke.line_cap = LineCap::Round;
            }
        }

        let paint = color.to_paint();
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);

        if let Some(stamp) = style.pattern.stamp() {
            let mut points = pixels.to_vec();
            if closed {
                points.extend(pixels.first().copied());
            }

            let size = stamp.size * width;
            for (position, direction) in stamp_positions(&points, (stamp.spacing * width) as f64) {
                let Some(shape) = stamp_path(stamp.shape, size) else {
                    continue;
                };

                let transform = Transform::from_translate(position.x as f32, position.y as f32)
                    .pre_rotate(direction.to_degrees() as f32);
                match stamp.shape {
                    StampShape::Cross => {
                        let stroke = Stroke {
                            width,
                            ..Stroke::default()
                        };
                        pixmap.stroke_path(&shape, &paint, &stroke, transform, None);
                    }
                    StampShape::Arrow | StampShape::Tooth => {
                        pixmap.fill_path(&shape, &paint, FillRule::Winding, transform, None);
                    }
                }
            }
        }
    }

    fn draw_marker(&self, pixmap: &mut Pixmap, marker: &Marker, color_override: Option<Color>) {
        let Some(anchor) = self.mapper.to_pixel(&marker.position) else {
            return;
        };
        let (x, y) = (anchor.x as f32, anchor.y as f32);

        let scale = marker.width / MARKER_REFERENCE_WIDTH * self.scale_factor;
        let size = ICON_SIZE * scale;
        if !(size.is_finite() && size > 0.0) {
            return;
        }

        let transform = Transform::from_translate(x, y).pre_rotate(marker.rotation);
        let tint = color_override.or(marker.color);
        match &marker.icon {
            MarkerIcon::Builtin(icon) => {
                if let Some(path) = icon.path(size) {
                    let color = tint.unwrap_or(Color::RED);
                    pixmap.fill_path(
                        &path,
                        &color.to_paint(),
                        FillRule::Winding,
                        transform,
                        None,
                    );
                    let stroke = Stroke {
                        width: (size / 16.0).max(0.5),
                        ..Stroke::default()
                    };
                    pixmap.stroke_path(
                        &path,
                        &color.contrasting().to_paint(),
                        &stroke,
                        transform,
                        None,
                    );
                }
            }
            MarkerIcon::File(path) => {
                if let Some(icon) = load_icon(path, tint) {
                    let (icon_width, icon_height) = (icon.width() as f32, icon.height() as f32);
                    let icon_transform = transform
                        .pre_scale(size / icon_width, size / icon_height)
                        .pre_translate(-icon_width / 2.0, -icon_height / 2.0);
                    let paint = PixmapPaint {
                        quality: FilterQuality::Bicubic,
                        ..PixmapPaint::default()
                    };
                    pixmap.draw_pixmap(0, 0, icon.as_ref(), &paint, icon_transform, None);
                }
            }
        }

        if !marker.name.is_empty() {
            let label_color = self
                .overrides
                .marker_label
                .unwrap_or(marker.label_color);
            let font_size = MARKER_LABEL_SIZE * self.scale_factor;
            let style = TextStyle::new(font_size)
                .with_color(label_color)
                .with_outline(font_size / 5.0, label_color.contrasting())
                .with_alignment(HorizontalAlignment::Center, VerticalAlignment::Top);
            self.text.draw(
                pixmap,
                &marker.name,
                (x, y + size / 2.0 + 2.0 * self.scale_factor),
                0.0,
                &style,
            );
        }
    }
}

fn polyline_path(pixels: &[Point2d], closed: bool) -> Option<Path> {
    let min_points = if closed { 3 } else { 2 };
    if pixels.len() < min_points {
        return None;
    }

    let mut builder = PathBuilder::new();
    builder.move_to(pixels[0].x as f32, pixels[0].y as f32);
    for point in &pixels[1..] {
        builder.line_to(point.x as f32, point.y as f32);
    }
    if closed {
        builder.close();
    }

    builder.finish()
}

/// Shape pointing along +X, centered at the origin.
fn stamp_path(shape: StampShape, size: f32) -> Option<Path> {
    let half = size / 2.0;
    let mut builder = PathBuilder::new();
    match shape {
        StampShape::Arrow => {
            builder.move_to(half, 0.0);
            builder.line_to(-half, -half);
            builder.line_to(-half, half);
            builder.close();
        }
        StampShape::Cross => {
            builder.move_to(-half, -half);
            builder.line_to(half, half);
            builder.move_to(-half, half);
            builder.line_to(half, -half);
        }
        StampShape::Tooth => {
            builder.move_to(-half, 0.0);
            builder.line_to(half, 0.0);
            builder.line_to(0.0, size);
            builder.close();
        }
    }

    builder.finish()
}

#[cfg(test)]
mod tests {
    use kartograf_types::latlon;

    use super::*;
    use crate::overlay::{BuiltinIcon, StrokePattern};

    fn bbox() -> BoundingBox {
        BoundingBox::new(51.0, 50.0, 31.0, 30.0).unwrap()
    }

    fn pixel(pixmap: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let p = pixmap.pixel(x, y).unwrap().demultiply();
        [p.red(), p.green(), p.blue(), p.alpha()]
    }

    fn painted(pixmap: &Pixmap) -> usize {
        pixmap.pixels().iter().filter(|p| p.alpha() > 0).count()
    }

    #[test]
    fn degenerate_box() {
        let text = TextRasterizer::without_font();
        let overrides = ColorOverrides::default();
        assert!(OverlayRenderer::new(&bbox(), 0, 100, &text, &overrides).is_none());
    }

    #[test]
    fn scale_factor() {
        let text = TextRasterizer::without_font();
        let overrides = ColorOverrides::default();
        let renderer = OverlayRenderer::new(&bbox(), 4000, 1000, &text, &overrides).unwrap();
        assert_eq!(renderer.scale_factor(), 2.0);
    }

    #[test]
    fn line_is_drawn_through_projected_points() {
        let text = TextRasterizer::without_font();
        let overrides = ColorOverrides::default();
        let mut pixmap = Pixmap::new(200, 200).unwrap();
        let renderer = OverlayRenderer::new(&bbox(), 200, 200, &text, &overrides).unwrap();

        let center_lat = renderer.mapper.to_pixel(&latlon!(50.5, 30.5)).unwrap();
        renderer.render_object(
            &mut pixmap,
            &LayerObject::Line {
                points: vec![latlon!(50.5, 30.0), latlon!(50.5, 31.0)],
                style: Style::new(Color::BLUE, 20.0),
            },
        );

        let y = center_lat.y.round() as u32;
        assert_eq!(pixel(&pixmap, 100, y), [0, 0, 255, 255]);
        assert_eq!(pixel(&pixmap, 100, 10)[3], 0);
    }

    #[test]
    fn color_override_wins() {
        let text = TextRasterizer::without_font();
        let overrides = ColorOverrides {
            polygon: Some(Color::GREEN),
            ..Default::default()
        };
        let mut pixmap = Pixmap::new(100, 100).unwrap();
        let renderer = OverlayRenderer::new(&bbox(), 100, 100, &text, &overrides).unwrap();
        renderer.render_object(
            &mut pixmap,
            &LayerObject::Polygon {
                points: vec![
                    latlon!(50.9, 30.1),
                    latlon!(50.9, 30.9),
                    latlon!(50.1, 30.9),
                    latlon!(50.1, 30.1),
                ],
                style: Style::new(Color::RED, 1.0).with_fill_alpha(255),
            },
        );

        assert_eq!(pixel(&pixmap, 50, 50), [0, 255, 0, 255]);
    }

    #[test]
    fn radius_is_a_filled_circle() {
        let text = TextRasterizer::without_font();
        let overrides = ColorOverrides::default();
        let mut pixmap = Pixmap::new(100, 100).unwrap();
        let renderer = OverlayRenderer::new(&bbox(), 100, 100, &text, &overrides).unwrap();
        renderer.render_object(
            &mut pixmap,
            &LayerObject::Radius {
                center: latlon!(50.5, 30.5),
                radius: 20_000.0,
                style: Style::new(Color::RED, 1.0).with_fill_alpha(255),
            },
        );

        let center = renderer.mapper.to_pixel(&latlon!(50.5, 30.5)).unwrap();
        assert_eq!(
            pixel(&pixmap, center.x as u32, center.y as u32),
            [255, 0, 0, 255]
        );
        assert_eq!(pixel(&pixmap, 2, 2)[3], 0);
    }

    #[test]
    fn dashed_line_leaves_gaps() {
        let text = TextRasterizer::without_font();
        let overrides = ColorOverrides::default();
        let renderer = OverlayRenderer::new(&bbox(), 1000, 1000, &text, &overrides).unwrap();
        let line = |pattern| LayerObject::Line {
            points: vec![latlon!(50.5, 30.0), latlon!(50.5, 31.0)],
            style: Style::new(Color::BLACK, 4.0).with_pattern(pattern),
        };

        let mut solid = Pixmap::new(1000, 1000).unwrap();
        renderer.render_object(&mut solid, &line(StrokePattern::Solid));
        let mut dashed = Pixmap::new(1000, 1000).unwrap();
        renderer.render_object(&mut dashed, &line(StrokePattern::Dashed));
        let mut arrows = Pixmap::new(1000, 1000).unwrap();
        renderer.render_object(&mut arrows, &line(StrokePattern::Arrows));

        assert!(painted(&dashed) < painted(&solid));
        assert!(painted(&dashed) > painted(&solid) / 2);
        assert!(painted(&arrows) > painted(&solid));
    }

    #[test]
    fn marker_icon_is_scaled() {
        let text = TextRasterizer::without_font();
        let overrides = ColorOverrides::default();
        let marker = |width| {
            LayerObject::Marker(Marker {
                position: latlon!(50.5, 30.5),
                name: String::new(),
                icon: MarkerIcon::Builtin(BuiltinIcon::Square),
                color: Some(Color::BLUE),
                width,
                rotation: 0.0,
                label_color: Color::BLACK,
            })
        };

        let renderer = OverlayRenderer::new(&bbox(), 1000, 1000, &text, &overrides).unwrap();
        let mut small = Pixmap::new(1000, 1000).unwrap();
        renderer.render_object(&mut small, &marker(25.0));
        let mut large = Pixmap::new(1000, 1000).unwrap();
        renderer.render_object(&mut large, &marker(50.0));

        // 24x24 square and 48x48 square, with a thin outline.
        assert!((500..800).contains(&painted(&small)));
        assert!((2200..3000).contains(&painted(&large)));
    }

    #[test]
    fn hidden_layers_are_skipped() {
        let text = TextRasterizer::without_font();
        let overrides = ColorOverrides::default();
        let renderer = OverlayRenderer::new(&bbox(), 100, 100, &text, &overrides).unwrap();
        let mut layer = Layer::new(
            "hidden",
            vec![LayerObject::Line {
                points: vec![latlon!(50.5, 30.0), latlon!(50.5, 31.0)],
                style: Style::new(Color::BLACK, 10.0),
            }],
        );
        layer.visible = false;

        let mut pixmap = Pixmap::new(100, 100).unwrap();
        renderer.render_layers(&mut pixmap, &[layer]);
        assert_eq!(painted(&pixmap), 0);
    }

    #[test]
    fn malformed_objects_are_skipped() {
        let text = TextRasterizer::without_font();
        let overrides = ColorOverrides::default();
        let renderer = OverlayRenderer::new(&bbox(), 100, 100, &text, &overrides).unwrap();
        let mut pixmap = Pixmap::new(100, 100).unwrap();
        renderer.render_object(
            &mut pixmap,
            &LayerObject::Line {
                points: vec![latlon!(50.5, 30.0)],
                style: Style::new(Color::BLACK, 10.0),
            },
        );
        renderer.render_object(
            &mut pixmap,
            &LayerObject::Polygon {
                points: vec![],
                style: Style::new(Color::BLACK, 10.0),
            },
        );
        renderer.render_object(
            &mut pixmap,
            &LayerObject::Radius {
                center: latlon!(50.5, 30.5),
                radius: f64::NAN,
                style: Style::new(Color::BLACK, 10.0),
            },
        );
        assert_eq!(painted(&pixmap), 0);
    }
}
