use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use super::Projection;
use crate::cartesian::MercatorPoint;
use crate::geo::{Datum, GeoPoint};
use crate::tile::MAX_LATITUDE;

/// Spherical Web-Mercator projection (EPSG:3857).
///
/// Points north or south of [`MAX_LATITUDE`] are outside of the projection and are not projected.
#[derive(Debug, Copy, Clone)]
pub struct WebMercator {
    datum: Datum,
}

impl WebMercator {
    /// Creates a projection using the semimajor axis of the given datum as the sphere radius.
    pub fn new(datum: Datum) -> Self {
        Self { datum }
    }

    /// Projects all the points. Points that cannot be projected (poles, non-finite values) are
    /// skipped.
    pub fn project_all<'a>(
        &self,
        points: impl IntoIterator<Item = &'a GeoPoint>,
    ) -> Vec<MercatorPoint> {
        points
            .into_iter()
            .filter_map(|p| self.project(p))
            .collect()
    }
}

impl Default for WebMercator {
    fn default() -> Self {
        Self {
            datum: Datum::WGS84,
        }
    }
}

impl Projection for WebMercator {
    type InPoint = GeoPoint;
    type OutPoint = MercatorPoint;

    fn project(&self, input: &GeoPoint) -> Option<MercatorPoint> {
        // Near the poles `tan` stays finite, so the range is checked explicitly.
        if input.lat().abs() > MAX_LATITUDE {
            return None;
        }

        let x = self.datum.semimajor() * input.lon_rad();
        let y = self.datum.semimajor() * (FRAC_PI_4 + input.lat_rad() / 2.0).tan().ln();

        if x.is_finite() && y.is_finite() {
            Some(MercatorPoint::new(x, y))
        } else {
            None
        }
    }

    fn unproject(&self, input: &MercatorPoint) -> Option<GeoPoint> {
        let r = self.datum.semimajor();
        let lat = 2.0 * (input.y / r).exp().atan() - FRAC_PI_2;
        let lon = input.x / r;

        if lat.is_finite() && lon.is_finite() {
            Some(GeoPoint::latlon(lat.to_degrees(), lon.to_degrees()))
        } else {
            None
        }
    }
}

/// Projects a point into Web-Mercator meters.
pub fn degree_to_mercator(point: &GeoPoint) -> Option<MercatorPoint> {
    WebMercator::default().project(point)
}

/// Projects a list of points into Web-Mercator meters using a single projection instance.
pub fn degrees_to_mercator(points: &[GeoPoint]) -> Vec<MercatorPoint> {
    WebMercator::default().project_all(points)
}
