//! Slippy-map tile numbering on the Web-Mercator grid.

use std::f64::consts::PI;

use crate::geo::GeoPoint;

/// Largest latitude covered by the Web-Mercator tile grid.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// Largest zoom level of the tile grid.
pub const MAX_ZOOM: u32 = 28;

/// Number of tiles along one axis at the given zoom, or `None` if the zoom is above
/// [`MAX_ZOOM`].
pub fn tiles_per_axis(zoom: u32) -> Option<u64> {
    (zoom <= MAX_ZOOM).then(|| 1u64 << zoom)
}

fn axis_len(zoom: u32) -> f64 {
    f64::from(zoom).exp2()
}

/// XYZ tile `(x, y)` containing the point.
///
/// Latitudes are clamped into the Mercator range and the result is clamped into the grid, so a
/// point on the east or south edge of the world maps into the last tile.
pub fn deg_to_tile(lat: f64, lon: f64, zoom: u32) -> (u32, u32) {
    let n = axis_len(zoom);
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();

    let x = ((lon + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor();

    let max = n - 1.0;
    (x.clamp(0.0, max) as u32, y.clamp(0.0, max) as u32)
}

/// North-west corner of the XYZ tile.
pub fn tile_to_deg(x: u32, y: u32, zoom: u32) -> GeoPoint {
    let n = axis_len(zoom);
    let lon = x as f64 / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y as f64 / n)).sinh().atan().to_degrees();
    GeoPoint::latlon(lat, lon)
}

/// Converts the row index between XYZ (north-up) and TMS (south-up) numbering. The conversion is
/// its own inverse.
///
/// Returns `None` if the zoom is above [`MAX_ZOOM`] or the row is outside of the grid.
pub fn flip_y(y: u32, zoom: u32) -> Option<u32> {
    let last = tiles_per_axis(zoom)?.checked_sub(1)?;
    let flipped = last.checked_sub(u64::from(y))?;
    u32::try_from(flipped).ok()
}
