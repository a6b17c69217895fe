use kartograf_types::cartesian::Point2d;
use serde::{Deserialize, Serialize};

/// Catalog of stroke patterns.
///
/// A pattern has up to two phases: a dash phase that cuts the stroke into segments, and a stamp
/// phase that repeats a small shape along the line. All lengths are in stroke widths.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokePattern {
    /// Continuous line.
    #[default]
    Solid,
    /// Regular dashes.
    Dashed,
    /// Round dots.
    Dotted,
    /// Dash and dot alternating.
    DashDot,
    /// Long dashes with short gaps.
    LongDash,
    /// Pairs of dashes.
    DoubleDash,
    /// Line with arrow heads pointing along it.
    Arrows,
    /// Line with crosses on it.
    Crosses,
    /// Line with triangular teeth on its right side.
    Teeth,
}

/// Dash intervals, alternating "on" and "off" lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct DashPhase {
    /// Intervals in stroke widths.
    pub intervals: Vec<f32>,
    /// Dots need round caps.
    pub round_caps: bool,
}

/// Shape stamped along the line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StampShape {
    /// Arrow head pointing along the line.
    Arrow,
    /// Cross centered on the line.
    Cross,
    /// Triangle on the right side of the line.
    Tooth,
}

/// Repeating shape.
#[derive(Debug, Clone, PartialEq)]
pub struct StampPhase {
    /// Shape.
    pub shape: StampShape,
    /// Distance between stamps in stroke widths.
    pub spacing: f32,
    /// Size of the shape in stroke widths.
    pub size: f32,
}

impl StrokePattern {
    /// Dash phase of the pattern.
    pub fn dash(&self) -> Option<DashPhase> {
        let (intervals, round_caps) = match self {
            StrokePattern::Solid
            | StrokePattern::Arrows
            | StrokePattern::Crosses
            | StrokePattern::Teeth => return None,
            StrokePattern::Dashed => (vec![4.0, 2.0], false),
            StrokePattern::Dotted => (vec![0.5, 2.0], true),
            StrokePattern::DashDot => (vec![4.0, 1.5, 0.5, 1.5], false),
            StrokePattern::LongDash => (vec![8.0, 3.0], false),
            StrokePattern::DoubleDash => (vec![3.0, 1.0, 3.0, 4.0], false),
        };

        Some(DashPhase {
            intervals,
            round_caps,
        })
    }

    /// Stamp phase of the pattern.
    pub fn stamp(&self) -> Option<StampPhase> {
        let (shape, spacing, size) = match self {
            StrokePattern::Arrows => (StampShape::Arrow, 12.0, 3.0),
            StrokePattern::Crosses => (StampShape::Cross, 8.0, 2.5),
            StrokePattern::Teeth => (StampShape::Tooth, 5.0, 2.5),
            _ => return None,
        };

        Some(StampPhase {
            shape,
            spacing,
            size,
        })
    }
}

/// Positions along the polyline spaced by `spacing` pixels, with the direction of the line at
/// each position in radians. The first stamp is half a spacing from the start.
pub fn stamp_positions(points: &[Point2d], spacing: f64) -> Vec<(Point2d, f64)> {
    let mut result = vec![];
    if spacing.is_nan() || spacing <= 0.0 {
        return result;
    }

    let mut next = spacing / 2.0;
    let mut walked = 0.0;
    for segment in points.windows(2) {
        let (from, to) = (segment[0], segment[1]);
        let delta = to - from;
        let length = delta.norm();
        if length == 0.0 {
            continue;
        }

        let direction = delta.y.atan2(delta.x);
        while next <= walked + length {
            let t = (next - walked) / length;
            result.push((from + delta * t, direction));
            next += spacing;
        }

        walked += length;
    }

    result
}
