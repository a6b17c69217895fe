//! Geo-referenced vector overlays drawn over the formed map.

use std::path::PathBuf;

use kartograf_types::geo::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::color::Color;

mod grid;
mod marker;
mod pattern;
mod renderer;

pub use grid::{geodetic_grid_lines, round_coord_to_nearest_step, sk42_grid_lines, GridLine};
pub use marker::{BuiltinIcon, MarkerIcon};
pub use pattern::{stamp_positions, DashPhase, StampPhase, StampShape, StrokePattern};
pub use renderer::OverlayRenderer;

/// Stroke and fill parameters of a line-like overlay object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// Stroke color.
    pub color: Color,
    /// Stroke width at the reference resolution.
    pub stroke_width: f32,
    /// Pattern of the stroke.
    #[serde(default)]
    pub pattern: StrokePattern,
    /// Opacity of the fill of closed shapes.
    #[serde(default = "default_fill_alpha")]
    pub fill_alpha: u8,
}

impl Style {
    /// Solid stroke of the color and width.
    pub fn new(color: Color, stroke_width: f32) -> Self {
        Self {
            color,
            stroke_width,
            pattern: StrokePattern::default(),
            fill_alpha: default_fill_alpha(),
        }
    }

    /// Sets the stroke pattern.
    pub fn with_pattern(mut self, pattern: StrokePattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Sets the fill opacity of closed shapes.
    pub fn with_fill_alpha(mut self, fill_alpha: u8) -> Self {
        self.fill_alpha = fill_alpha;
        self
    }
}

fn default_fill_alpha() -> u8 {
    64
}

/// Point marker with an icon and a name label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Anchor of the marker.
    pub position: GeoPoint,
    /// Label drawn below the icon.
    #[serde(default)]
    pub name: String,
    /// Icon of the marker.
    pub icon: MarkerIcon,
    /// Color filter applied to the icon.
    #[serde(default)]
    pub color: Option<Color>,
    /// Icon size; 25 is the natural size of the icon.
    #[serde(default = "default_marker_width")]
    pub width: f32,
    /// Heading in degrees clockwise.
    #[serde(default)]
    pub rotation: f32,
    /// Color of the name label.
    #[serde(default = "default_label_color")]
    pub label_color: Color,
}

fn default_marker_width() -> f32 {
    25.0
}

fn default_label_color() -> Color {
    Color::BLACK
}

/// A vector overlay object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerObject {
    /// Open polyline.
    Line {
        /// Vertices.
        points: Vec<GeoPoint>,
        /// Stroke.
        style: Style,
    },
    /// Closed, filled polygon.
    Polygon {
        /// Vertices, without repeating the first one.
        points: Vec<GeoPoint>,
        /// Stroke and fill.
        style: Style,
    },
    /// Circle of constant geodesic distance around a point.
    Radius {
        /// Center.
        center: GeoPoint,
        /// Radius in meters.
        radius: f64,
        /// Stroke and fill.
        style: Style,
    },
    /// Free text.
    Text {
        /// Anchor of the text.
        position: GeoPoint,
        /// The text.
        text: String,
        /// Rotation in degrees clockwise.
        #[serde(default)]
        angle: f32,
        /// Font size at the reference resolution.
        size: f32,
        /// Color.
        color: Color,
    },
    /// Point marker.
    Marker(Marker),
}

impl LayerObject {
    /// Kind of the object, used to look up color overrides.
    pub fn kind(&self) -> ObjectKind {
        match self {
            LayerObject::Line { .. } => ObjectKind::Line,
            LayerObject::Polygon { .. } => ObjectKind::Polygon,
            LayerObject::Radius { .. } => ObjectKind::Radius,
            LayerObject::Text { .. } => ObjectKind::Text,
            LayerObject::Marker(_) => ObjectKind::Marker,
        }
    }
}

/// Kinds of overlay objects.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// [`LayerObject::Line`]
    Line,
    /// [`LayerObject::Polygon`]
    Polygon,
    /// [`LayerObject::Radius`]
    Radius,
    /// [`LayerObject::Text`]
    Text,
    /// [`LayerObject::Marker`]
    Marker,
}

/// Named group of overlay objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Name of the layer.
    pub name: String,
    /// Hidden layers are not drawn.
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Objects in drawing order.
    pub objects: Vec<LayerObject>,
}

impl Layer {
    /// Creates a visible layer.
    pub fn new(name: impl Into<String>, objects: Vec<LayerObject>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            objects,
        }
    }
}

fn default_visible() -> bool {
    true
}

/// Colors replacing the style colors of whole kinds of objects at drawing time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorOverrides {
    /// Color of lines.
    pub line: Option<Color>,
    /// Color of polygons.
    pub polygon: Option<Color>,
    /// Color of radius circles.
    pub radius: Option<Color>,
    /// Color of free text.
    pub text: Option<Color>,
    /// Color filter of marker icons.
    pub marker: Option<Color>,
    /// Color of marker name labels.
    pub marker_label: Option<Color>,
}

impl ColorOverrides {
    /// Override for the kind of objects, if any.
    pub fn for_kind(&self, kind: ObjectKind) -> Option<Color> {
        match kind {
            ObjectKind::Line => self.line,
            ObjectKind::Polygon => self.polygon,
            ObjectKind::Radius => self.radius,
            ObjectKind::Text => self.text,
            ObjectKind::Marker => self.marker,
        }
    }
}

#[cfg(test)]
mod tests {
    use kartograf_types::latlon;

    use super::*;

    #[test]
    fn layer_json() {
        let json = r##"{
            "name": "route",
            "objects": [
                {"type": "line", "points": [{"lat": 50.0, "lon": 30.0}, {"lat": 50.1, "lon": 30.2}],
                 "style": {"color": "#FF0000FF", "stroke_width": 2.0, "pattern": "dashed"}},
                {"type": "marker", "position": {"lat": 50.0, "lon": 30.0},
                 "icon": {"builtin": "pin"}, "name": "Start"}
            ]
        }"##;

        let layer: Layer = serde_json::from_str(json).unwrap();
        assert!(layer.visible);
        assert_eq!(layer.objects.len(), 2);
        assert_eq!(
            layer.objects[0],
            LayerObject::Line {
                points: vec![latlon!(50.0, 30.0), latlon!(50.1, 30.2)],
                style: Style::new(Color::RED, 2.0).with_pattern(StrokePattern::Dashed),
            }
        );
        assert_eq!(layer.objects[1].kind(), ObjectKind::Marker);
    }

    #[test]
    fn overrides_by_kind() {
        let overrides = ColorOverrides {
            polygon: Some(Color::BLUE),
            ..Default::default()
        };
        assert_eq!(overrides.for_kind(ObjectKind::Polygon), Some(Color::BLUE));
        assert_eq!(overrides.for_kind(ObjectKind::Line), None);
    }
}
