use super::{BoundingBox, GeoPoint, Projection, WebMercator};
use crate::cartesian::{MercatorPoint, Point2d};
use crate::tile::MAX_LATITUDE;

/// Maps geographic points into pixels of a raster that covers a bounding box in Web-Mercator.
///
/// Pixel `(0, 0)` is the north-west corner of the box, Y grows to the south. Latitudes of the box
/// and of the points beyond [`MAX_LATITUDE`] are clamped to it, so polar points land on the edge
/// of the Mercator world.
#[derive(Debug, Clone, Copy)]
pub struct PixelMapper {
    projection: WebMercator,
    origin: MercatorPoint,
    pixel_width: f64,
    pixel_height: f64,
}

impl PixelMapper {
    /// Creates a mapper for a raster of `width x height` pixels covering `bbox`.
    ///
    /// Returns `None` if the box has zero span along any axis, cannot be projected, or the raster
    /// is empty.
    pub fn new(bbox: &BoundingBox, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        let projection = WebMercator::default();
        let north_west = projection.project(&clamp_latitude(&bbox.north_west()))?;
        let south_east = projection.project(&clamp_latitude(&bbox.south_east()))?;

        let span_x = south_east.x - north_west.x;
        let span_y = north_west.y - south_east.y;
        if span_x <= 0.0 || span_y <= 0.0 {
            return None;
        }

        Some(Self {
            projection,
            origin: north_west,
            pixel_width: span_x / width as f64,
            pixel_height: span_y / height as f64,
        })
    }

    /// Size of one pixel in Mercator meters, `(x, y)`.
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.pixel_width, self.pixel_height)
    }

    /// Pixel position of a projected point.
    pub fn mercator_to_pixel(&self, point: &MercatorPoint) -> Point2d {
        Point2d::new(
            (point.x - self.origin.x) / self.pixel_width,
            (self.origin.y - point.y) / self.pixel_height,
        )
    }

    /// Pixel position of a geographic point.
    pub fn to_pixel(&self, point: &GeoPoint) -> Option<Point2d> {
        self.projection
            .project(&clamp_latitude(point))
            .map(|p| self.mercator_to_pixel(&p))
    }

    /// Pixel positions of all the points. Points that cannot be projected are skipped.
    pub fn to_pixels<'a>(&self, points: impl IntoIterator<Item = &'a GeoPoint>) -> Vec<Point2d> {
        points
            .into_iter()
            .filter_map(|point| self.to_pixel(point))
            .collect()
    }
}

fn clamp_latitude(point: &GeoPoint) -> GeoPoint {
    GeoPoint::latlon(
        point.lat().clamp(-MAX_LATITUDE, MAX_LATITUDE),
        point.lon(),
    )
}

/// Converts geographic points into pixel coordinates of a `width x height` raster covering
/// `bbox`.
///
/// Returns `None` if the box is degenerate or no point could be converted.
pub fn convert_geo_to_pixel(
    points: &[GeoPoint],
    bbox: &BoundingBox,
    width: u32,
    height: u32,
) -> Option<Vec<Point2d>> {
    let mapper = PixelMapper::new(bbox, width, height)?;
    let pixels = mapper.to_pixels(points);
    if pixels.is_empty() {
        None
    } else {
        Some(pixels)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox::new(56.0, 55.0, 38.0, 37.0).unwrap()
    }

    #[test]
    fn corners_map_to_raster_corners() {
        let mapper = PixelMapper::new(&bbox(), 1000, 800).unwrap();
        let nw = mapper.to_pixel(&GeoPoint::latlon(56.0, 37.0)).unwrap();
        assert_abs_diff_eq!(nw.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(nw.y, 0.0, epsilon = 1e-9);

        let se = mapper.to_pixel(&GeoPoint::latlon(55.0, 38.0)).unwrap();
        assert_abs_diff_eq!(se.x, 1000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(se.y, 800.0, epsilon = 1e-6);
    }

    #[test]
    fn latitude_is_not_linear() {
        let mapper = PixelMapper::new(&bbox(), 1000, 1000).unwrap();
        let mid = mapper.to_pixel(&GeoPoint::latlon(55.5, 37.5)).unwrap();
        assert_abs_diff_eq!(mid.x, 500.0, epsilon = 1e-6);
        // Mercator stretches northern latitudes, so the geographic middle is below the center.
        assert!(mid.y > 500.0);
    }

    #[test]
    fn degenerate_box_yields_none() {
        let flat = BoundingBox::new(55.0, 55.0, 38.0, 37.0).unwrap();
        assert!(PixelMapper::new(&flat, 100, 100).is_none());
        assert!(convert_geo_to_pixel(&[GeoPoint::latlon(55.0, 37.5)], &flat, 100, 100).is_none());
        assert!(PixelMapper::new(&bbox(), 0, 100).is_none());
    }

    #[test]
    fn polar_box_is_clamped_to_the_mercator_limit() {
        let polar = BoundingBox::new(90.0, -90.0, 180.0, -180.0).unwrap();
        let mapper = PixelMapper::new(&polar, 1024, 1024).unwrap();

        let north = mapper.to_pixel(&GeoPoint::latlon(90.0, -180.0)).unwrap();
        assert_abs_diff_eq!(north.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(north.y, 0.0, epsilon = 1e-6);

        let south = mapper.to_pixel(&GeoPoint::latlon(-90.0, 180.0)).unwrap();
        assert_abs_diff_eq!(south.x, 1024.0, epsilon = 1e-6);
        assert_abs_diff_eq!(south.y, 1024.0, epsilon = 1e-6);

        let center = mapper.to_pixel(&GeoPoint::latlon(0.0, 0.0)).unwrap();
        assert_abs_diff_eq!(center.y, 512.0, epsilon = 1e-6);

        let pixels = convert_geo_to_pixel(
            &[GeoPoint::latlon(89.99, 10.0), GeoPoint::latlon(-88.0, -10.0)],
            &polar,
            1024,
            1024,
        )
        .unwrap();
        assert_eq!(pixels.len(), 2);
        assert!(pixels.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn empty_points_yield_none() {
        assert!(convert_geo_to_pixel(&[], &bbox(), 100, 100).is_none());
        let pixels =
            convert_geo_to_pixel(&[GeoPoint::latlon(55.5, 37.5)], &bbox(), 100, 100).unwrap();
        assert_eq!(pixels.len(), 1);
    }
}
