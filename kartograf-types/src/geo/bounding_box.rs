use serde::{Deserialize, Serialize};

use super::GeoPoint;
use crate::KartografTypesError;

/// Geographic rectangle given by its edges, in degrees.
///
/// Boxes crossing the antimeridian (`lon_west > lon_east`) are rejected on construction; the tile
/// and pixel math downstream assumes `west <= east`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBoundingBox", into = "RawBoundingBox")]
pub struct BoundingBox {
    lat_north: f64,
    lat_south: f64,
    lon_east: f64,
    lon_west: f64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBoundingBox {
    lat_north: f64,
    lat_south: f64,
    lon_east: f64,
    lon_west: f64,
}

impl TryFrom<RawBoundingBox> for BoundingBox {
    type Error = KartografTypesError;

    fn try_from(raw: RawBoundingBox) -> Result<Self, Self::Error> {
        Self::new(raw.lat_north, raw.lat_south, raw.lon_east, raw.lon_west)
    }
}

impl From<BoundingBox> for RawBoundingBox {
    fn from(value: BoundingBox) -> Self {
        Self {
            lat_north: value.lat_north,
            lat_south: value.lat_south,
            lon_east: value.lon_east,
            lon_west: value.lon_west,
        }
    }
}

impl BoundingBox {
    /// Creates a new box, checking that `lat_north >= lat_south`, `lon_east >= lon_west` and that
    /// latitudes are within `[-90, 90]`.
    pub fn new(
        lat_north: f64,
        lat_south: f64,
        lon_east: f64,
        lon_west: f64,
    ) -> Result<Self, KartografTypesError> {
        if ![lat_north, lat_south, lon_east, lon_west]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(KartografTypesError::InvalidBoundingBox(
                "coordinates must be finite".into(),
            ));
        }

        if lat_north < lat_south {
            return Err(KartografTypesError::InvalidBoundingBox(format!(
                "north edge {lat_north} is below south edge {lat_south}"
            )));
        }

        if lat_north > 90.0 || lat_south < -90.0 {
            return Err(KartografTypesError::InvalidBoundingBox(format!(
                "latitudes {lat_south}..{lat_north} are out of range"
            )));
        }

        if lon_west > lon_east {
            return Err(KartografTypesError::InvalidBoundingBox(format!(
                "west edge {lon_west} is east of east edge {lon_east}; antimeridian crossing is not supported"
            )));
        }

        Ok(Self {
            lat_north,
            lat_south,
            lon_east,
            lon_west,
        })
    }

    /// Smallest box containing all the points.
    pub fn from_points<'a>(
        points: impl IntoIterator<Item = &'a GeoPoint>,
    ) -> Result<Self, KartografTypesError> {
        let mut iter = points.into_iter();
        let first = iter.next().ok_or_else(|| {
            KartografTypesError::InvalidBoundingBox("no points given".into())
        })?;
        let (mut n, mut s, mut e, mut w) = (first.lat(), first.lat(), first.lon(), first.lon());
        for p in iter {
            n = n.max(p.lat());
            s = s.min(p.lat());
            e = e.max(p.lon());
            w = w.min(p.lon());
        }

        Self::new(n, s, e, w)
    }

    /// Northern edge.
    pub fn lat_north(&self) -> f64 {
        self.lat_north
    }

    /// Southern edge.
    pub fn lat_south(&self) -> f64 {
        self.lat_south
    }

    /// Eastern edge.
    pub fn lon_east(&self) -> f64 {
        self.lon_east
    }

    /// Western edge.
    pub fn lon_west(&self) -> f64 {
        self.lon_west
    }

    /// North-west corner.
    pub fn north_west(&self) -> GeoPoint {
        GeoPoint::latlon(self.lat_north, self.lon_west)
    }

    /// South-east corner.
    pub fn south_east(&self) -> GeoPoint {
        GeoPoint::latlon(self.lat_south, self.lon_east)
    }

    /// Center of the box in degrees.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::latlon(
            (self.lat_north + self.lat_south) / 2.0,
            (self.lon_east + self.lon_west) / 2.0,
        )
    }

    /// Returns true if the point is inside the box or on its edge.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lat() <= self.lat_north
            && point.lat() >= self.lat_south
            && point.lon() <= self.lon_east
            && point.lon() >= self.lon_west
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_latitudes() {
        assert!(BoundingBox::new(10.0, 20.0, 5.0, 0.0).is_err());
    }

    #[test]
    fn rejects_antimeridian_crossing() {
        let result = BoundingBox::new(10.0, 0.0, -170.0, 170.0);
        assert!(matches!(
            result,
            Err(KartografTypesError::InvalidBoundingBox(_))
        ));
    }

    #[test]
    fn rejects_non_finite() {
        assert!(BoundingBox::new(f64::NAN, 0.0, 1.0, 0.0).is_err());
        assert!(BoundingBox::new(91.0, 0.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn degenerate_box_is_allowed() {
        let bbox = BoundingBox::new(10.0, 10.0, 20.0, 20.0).unwrap();
        assert_eq!(bbox.center(), GeoPoint::latlon(10.0, 20.0));
    }

    #[test]
    fn from_points() {
        let points = [
            GeoPoint::latlon(55.0, 37.0),
            GeoPoint::latlon(56.5, 36.0),
            GeoPoint::latlon(54.0, 38.0),
        ];
        let bbox = BoundingBox::from_points(&points).unwrap();
        assert_eq!(bbox, BoundingBox::new(56.5, 54.0, 38.0, 36.0).unwrap());
        assert!(bbox.contains(&GeoPoint::latlon(55.0, 37.5)));
        assert!(!bbox.contains(&GeoPoint::latlon(57.0, 37.5)));
    }
}
