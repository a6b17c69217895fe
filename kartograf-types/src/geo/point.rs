use serde::{Deserialize, Serialize};

/// Point on the surface of the Earth, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    /// Creates a point from latitude and longitude in degrees.
    pub const fn latlon(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Creates a point from longitude and latitude in degrees.
    pub const fn lonlat(lon: f64, lat: f64) -> Self {
        Self { lat, lon }
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Latitude in radians.
    pub fn lat_rad(&self) -> f64 {
        self.lat.to_radians()
    }

    /// Longitude in radians.
    pub fn lon_rad(&self) -> f64 {
        self.lon.to_radians()
    }

    /// Both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Creates a new [`GeoPoint`] from latitude and longitude values (in degrees).
///
/// ```
/// use kartograf_types::latlon;
///
/// let point = latlon!(38.0, 52.0);
/// assert_eq!(point.lat(), 38.0);
/// ```
#[macro_export]
macro_rules! latlon {
    ($lat:expr, $lon:expr) => {
        $crate::geo::GeoPoint::latlon($lat, $lon)
    };
}
