//! Projected coordinates: meters of a planar projection or pixels of a raster.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Point in a cartesian (projected) coordinate system.
pub type Point2d = Point2<f64>;

/// Point in Web-Mercator (EPSG:3857) meters.
pub type MercatorPoint = Point2d;

/// Axis aligned rectangle.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    x_min: f64,
    y_min: f64,
    x_max: f64,
    y_max: f64,
}

impl Rect {
    /// Creates a new rectangle. Coordinates are reordered if necessary, so `x_min <= x_max` and
    /// `y_min <= y_max` always hold.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x_min: x1.min(x2),
            y_min: y1.min(y2),
            x_max: x1.max(x2),
            y_max: y1.max(y2),
        }
    }

    /// Minimum X.
    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    /// Maximum X.
    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    /// Minimum Y.
    pub fn y_min(&self) -> f64 {
        self.y_min
    }

    /// Maximum Y.
    pub fn y_max(&self) -> f64 {
        self.y_max
    }

    /// Width of the rectangle.
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Height of the rectangle.
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Center point.
    pub fn center(&self) -> Point2d {
        Point2d::new(
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// Smallest rectangle containing all the points, or `None` if the iterator is empty.
    pub fn from_points<'a>(mut points: impl Iterator<Item = &'a Point2d>) -> Option<Self> {
        let first = points.next()?;
        let mut rect = Self::new(first.x, first.y, first.x, first.y);
        for p in points {
            rect.x_min = rect.x_min.min(p.x);
            rect.y_min = rect.y_min.min(p.y);
            rect.x_max = rect.x_max.max(p.x);
            rect.y_max = rect.y_max.max(p.y);
        }

        Some(rect)
    }

    /// Returns true if the rectangles have common area or touch.
    pub fn intersects(&self, other: Rect) -> bool {
        self.x_max >= other.x_min
            && self.x_min <= other.x_max
            && self.y_max >= other.y_min
            && self.y_min <= other.y_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_normalizes_corners() {
        let rect = Rect::new(10.0, 5.0, -10.0, -5.0);
        assert_eq!(rect.x_min(), -10.0);
        assert_eq!(rect.y_max(), 5.0);
        assert_eq!(rect.width(), 20.0);
        assert_eq!(rect.height(), 10.0);
    }

    #[test]
    fn rect_from_points() {
        let points = [
            Point2d::new(1.0, 2.0),
            Point2d::new(-3.0, 7.0),
            Point2d::new(4.0, -1.0),
        ];
        let rect = Rect::from_points(points.iter()).unwrap();
        assert_eq!(rect, Rect::new(-3.0, -1.0, 4.0, 7.0));
        assert!(Rect::from_points([].iter()).is_none());
    }

    #[test]
    fn rect_intersection() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(Rect::new(5.0, 5.0, 15.0, 15.0)));
        assert!(a.intersects(Rect::new(10.0, 0.0, 15.0, 10.0)));
        assert!(!a.intersects(Rect::new(11.0, 0.0, 15.0, 10.0)));
    }
}
