//! Gauss–Krüger projection of the SK-42 datum: Krasovsky ellipsoid, 6° zones, central meridian
//! at `zone * 6 - 3`, false easting `zone * 1_000_000 + 500_000`.

use super::Projection;
use crate::cartesian::Point2d;
use crate::geo::{Datum, GeoPoint};
use crate::KartografTypesError;

const ZONE_WIDTH: f64 = 6.0;
const ZONE_COUNT: u32 = 60;
const FALSE_EASTING: f64 = 500_000.0;
const ZONE_EASTING: f64 = 1_000_000.0;

/// Gauss–Krüger projection for one 6° zone. Output points are `(easting, northing)` in meters,
/// with the zone number encoded in the easting millions.
#[derive(Debug, Copy, Clone)]
pub struct GaussKruger {
    datum: Datum,
    zone: u32,
}

impl GaussKruger {
    /// Projection of the given SK-42 zone (`1..=60`).
    pub fn sk42(zone: u32) -> Result<Self, KartografTypesError> {
        if zone == 0 || zone > ZONE_COUNT {
            return Err(KartografTypesError::InvalidZone(zone));
        }

        Ok(Self {
            datum: Datum::KRASOVSKY,
            zone,
        })
    }

    /// Projection of the SK-42 zone containing the given longitude.
    pub fn sk42_for_lon(lon: f64) -> Self {
        Self {
            datum: Datum::KRASOVSKY,
            zone: zone_from_lon(lon),
        }
    }

    /// Zone number.
    pub fn zone(&self) -> u32 {
        self.zone
    }

    /// Central meridian of the zone in degrees.
    pub fn central_meridian(&self) -> f64 {
        self.zone as f64 * ZONE_WIDTH - 3.0
    }

    fn zone_offset(&self) -> f64 {
        self.zone as f64 * ZONE_EASTING + FALSE_EASTING
    }

    /// Length of the meridian arc from the equator to the latitude `lat` (radians).
    fn meridian_arc(&self, lat: f64) -> f64 {
        let a = self.datum.semimajor();
        let e2 = self.datum.eccentricity_sq();
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        a * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
    }

    fn forward(&self, lat: f64, lon: f64) -> (f64, f64) {
        let a = self.datum.semimajor();
        let e2 = self.datum.eccentricity_sq();
        let ep2 = self.datum.second_eccentricity_sq();

        let b = lat.to_radians();
        let l = normalize_lon(lon - self.central_meridian()).to_radians();

        let (sin_b, cos_b) = b.sin_cos();
        let tan_b = b.tan();
        let n = a / (1.0 - e2 * sin_b * sin_b).sqrt();
        let t = tan_b * tan_b;
        let c = ep2 * cos_b * cos_b;
        let al = l * cos_b;

        let al2 = al * al;
        let al3 = al2 * al;
        let al4 = al3 * al;
        let al5 = al4 * al;
        let al6 = al5 * al;

        let northing = self.meridian_arc(b)
            + n * tan_b
                * (al2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * al4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * al6 / 720.0);

        let easting = n
            * (al
                + (1.0 - t + c) * al3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * al5 / 120.0);

        (easting + self.zone_offset(), northing)
    }

    fn inverse(&self, easting: f64, northing: f64) -> (f64, f64) {
        let a = self.datum.semimajor();
        let e2 = self.datum.eccentricity_sq();
        let ep2 = self.datum.second_eccentricity_sq();
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        let y = easting - self.zone_offset();

        // Footpoint latitude from the rectifying latitude `mu` and the `e1` series.
        let mu = northing / (a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
        let e1_2 = e1 * e1;
        let e1_3 = e1_2 * e1;
        let e1_4 = e1_3 * e1;
        let fp = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

        let (sin_fp, cos_fp) = fp.sin_cos();
        let tan_fp = fp.tan();
        let c1 = ep2 * cos_fp * cos_fp;
        let t1 = tan_fp * tan_fp;
        let w = 1.0 - e2 * sin_fp * sin_fp;
        let n1 = a / w.sqrt();
        let r1 = a * (1.0 - e2) / w.powf(1.5);
        let d = y / n1;

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let lat = fp
            - (n1 * tan_fp / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d6
                        / 720.0);

        let lon = (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5
                / 120.0)
            / cos_fp;

        (
            lat.to_degrees(),
            normalize_lon(self.central_meridian() + lon.to_degrees()),
        )
    }
}

impl Projection for GaussKruger {
    type InPoint = GeoPoint;
    type OutPoint = Point2d;

    fn project(&self, input: &GeoPoint) -> Option<Point2d> {
        let (easting, northing) = self.forward(input.lat(), input.lon());
        if easting.is_finite() && northing.is_finite() {
            Some(Point2d::new(easting, northing))
        } else {
            None
        }
    }

    fn unproject(&self, input: &Point2d) -> Option<GeoPoint> {
        let (lat, lon) = self.inverse(input.x, input.y);
        if lat.is_finite() && lon.is_finite() {
            Some(GeoPoint::latlon(lat, lon))
        } else {
            None
        }
    }
}

/// Six-degree zone number (`1..=60`) containing the longitude.
pub fn zone_from_lon(lon: f64) -> u32 {
    let lon = lon.rem_euclid(360.0);
    ((lon / ZONE_WIDTH).floor() as u32 + 1).min(ZONE_COUNT)
}

/// Projects SK-42 geographic coordinates into `(easting, northing)` of the given zone.
///
/// Zones outside of `1..=60` are clamped into the valid range.
pub fn forward_sk42(lat: f64, lon: f64, zone: u32) -> (f64, f64) {
    GaussKruger {
        datum: Datum::KRASOVSKY,
        zone: zone.clamp(1, ZONE_COUNT),
    }
    .forward(lat, lon)
}

/// Inverse of [`forward_sk42`].
pub fn inverse_sk42(easting: f64, northing: f64, zone: u32) -> GeoPoint {
    let (lat, lon) = GaussKruger {
        datum: Datum::KRASOVSKY,
        zone: zone.clamp(1, ZONE_COUNT),
    }
    .inverse(easting, northing);
    GeoPoint::latlon(lat, lon)
}

fn normalize_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 0.0 {
        180.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn zones() {
        assert_eq!(zone_from_lon(0.0), 1);
        assert_eq!(zone_from_lon(5.999), 1);
        assert_eq!(zone_from_lon(6.0), 2);
        assert_eq!(zone_from_lon(37.528073993), 7);
        assert_eq!(zone_from_lon(179.9), 30);
        assert_eq!(zone_from_lon(-0.5), 60);
        assert_eq!(GaussKruger::sk42(7).unwrap().central_meridian(), 39.0);
        assert!(GaussKruger::sk42(0).is_err());
        assert!(GaussKruger::sk42(61).is_err());
    }

    #[test]
    fn moscow_reference_point() {
        let (easting, northing) = forward_sk42(55.790282708, 37.528073993, 7);
        assert_eq!(easting.round(), 7_407_668.0);
        assert_eq!(northing.round(), 6_186_302.0);
    }

    #[test]
    fn round_trip() {
        for (lat, lon) in [
            (55.790282708, 37.528073993),
            (45.1, 31.2),
            (60.0, 44.9),
            (0.5, 3.0),
            (70.2, 100.3),
            (-33.8, 151.2),
        ] {
            let zone = zone_from_lon(lon);
            let (easting, northing) = forward_sk42(lat, lon, zone);
            let back = inverse_sk42(easting, northing, zone);
            assert_abs_diff_eq!(back.lat(), lat, epsilon = 1e-4);
            assert_abs_diff_eq!(back.lon(), lon, epsilon = 1e-4);
        }
    }

    #[test]
    fn central_meridian_has_false_easting() {
        let (easting, _) = forward_sk42(50.0, 39.0, 7);
        assert_abs_diff_eq!(easting, 7_500_000.0, epsilon = 1e-6);
    }

    #[test]
    fn projection_trait_matches_free_functions() {
        let projection = GaussKruger::sk42_for_lon(37.5);
        let point = GeoPoint::latlon(55.79, 37.5);
        let projected = projection.project(&point).unwrap();
        let (e, n) = forward_sk42(55.79, 37.5, 7);
        assert_eq!((projected.x, projected.y), (e, n));

        let back = projection.unproject(&projected).unwrap();
        assert_abs_diff_eq!(back.lat(), 55.79, epsilon = 1e-6);
        assert_abs_diff_eq!(back.lon(), 37.5, epsilon = 1e-6);
    }
}
