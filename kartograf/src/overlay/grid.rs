//! Coordinate grids: a geodetic grid in degrees and an SK-42 kilometre grid.

use kartograf_types::geo::geodesic::geodesic_line;
use kartograf_types::geo::projection::{forward_sk42, inverse_sk42, zone_from_lon};
use kartograf_types::geo::{BoundingBox, GeoPoint};

/// Maximum number of grid lines in one direction.
const MAX_LINES: usize = 500;
/// Maximum number of sample points of an SK-42 grid line.
const MAX_SAMPLES: usize = 1000;

/// A grid line sampled as a polyline, labeled at its first point.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLine {
    /// Label of the line.
    pub label: String,
    /// Sample points.
    pub points: Vec<GeoPoint>,
}

/// Snaps `value` down to a multiple of `step`.
///
/// The result is rounded to 10 decimal places, so that `round_coord_to_nearest_step(55.1235432,
/// 0.01)` is exactly `55.12`. Non-positive steps leave the value unchanged.
pub fn round_coord_to_nearest_step(value: f64, step: f64) -> f64 {
    if !value.is_finite() || step.is_nan() || step <= 0.0 {
        return value;
    }

    // Tolerance for quotients like 55.12 / 0.01 = 5511.999999999999.
    let steps = (value / step + 1e-9).floor();
    round_10(steps * step)
}

fn round_10(value: f64) -> f64 {
    (value * 1e10).round() / 1e10
}

/// Values `start, start - step, ...` down to `min`.
fn descending_values(start: f64, step: f64, min: f64) -> Vec<f64> {
    let mut values = vec![];
    for i in 0..MAX_LINES {
        let value = round_10(start - step * i as f64);
        if value < min {
            return values;
        }
        values.push(value);
    }

    log::warn!("Grid step {step} is too small, only {MAX_LINES} lines are drawn");
    values
}

/// Lines of constant latitude and longitude every `step_deg` degrees.
///
/// The first line of each direction is the box maximum snapped down with `rounding_step`. Lines
/// are geodesics between the box edges sampled every `sample_step_m` meters, so they curve with
/// the map projection. Labels are the coordinate values with 5 decimal places.
pub fn geodetic_grid_lines(
    bbox: &BoundingBox,
    step_deg: f64,
    rounding_step: f64,
    sample_step_m: f64,
) -> Vec<GridLine> {
    if step_deg.is_nan() || step_deg <= 0.0 {
        return vec![];
    }

    let mut lines = vec![];

    let lat_start = round_coord_to_nearest_step(bbox.lat_north(), rounding_step);
    for lat in descending_values(lat_start, step_deg, bbox.lat_south()) {
        lines.push(GridLine {
            label: format!("{lat:.5}"),
            points: geodesic_line(
                &GeoPoint::latlon(lat, bbox.lon_west()),
                &GeoPoint::latlon(lat, bbox.lon_east()),
                sample_step_m,
            ),
        });
    }

    let lon_start = round_coord_to_nearest_step(bbox.lon_east(), rounding_step);
    for lon in descending_values(lon_start, step_deg, bbox.lon_west()) {
        lines.push(GridLine {
            label: format!("{lon:.5}"),
            points: geodesic_line(
                &GeoPoint::latlon(bbox.lat_north(), lon),
                &GeoPoint::latlon(bbox.lat_south(), lon),
                sample_step_m,
            ),
        });
    }

    lines
}

/// Lines of constant SK-42 easting and northing every `step_m` meters, in the zone of the box
/// center. Labels are the coordinate values in kilometres.
pub fn sk42_grid_lines(bbox: &BoundingBox, step_m: f64, sample_step_m: f64) -> Vec<GridLine> {
    if step_m.is_nan() || step_m <= 0.0 || sample_step_m.is_nan() || sample_step_m <= 0.0 {
        return vec![];
    }

    let zone = zone_from_lon(bbox.center().lon());
    let center_lon = bbox.center().lon();
    let corners = [
        (bbox.lat_north(), bbox.lon_west()),
        (bbox.lat_north(), center_lon),
        (bbox.lat_north(), bbox.lon_east()),
        (bbox.lat_south(), bbox.lon_west()),
        (bbox.lat_south(), center_lon),
        (bbox.lat_south(), bbox.lon_east()),
    ]
    .map(|(lat, lon)| forward_sk42(lat, lon, zone));

    let (mut e_min, mut e_max) = (f64::MAX, f64::MIN);
    let (mut n_min, mut n_max) = (f64::MAX, f64::MIN);
    for (easting, northing) in corners {
        e_min = e_min.min(easting);
        e_max = e_max.max(easting);
        n_min = n_min.min(northing);
        n_max = n_max.max(northing);
    }

    let sample = |from: f64, to: f64| -> Vec<f64> {
        let count = (((to - from) / sample_step_m).ceil() as usize).clamp(1, MAX_SAMPLES);
        (0..=count)
            .map(|i| from + (to - from) * i as f64 / count as f64)
            .collect()
    };

    let mut lines = vec![];
    for easting in ascending_multiples(e_min, e_max, step_m) {
        lines.push(GridLine {
            label: km_label(easting),
            points: sample(n_max, n_min)
                .into_iter()
                .map(|northing| inverse_sk42(easting, northing, zone))
                .collect(),
        });
    }

    for northing in ascending_multiples(n_min, n_max, step_m) {
        lines.push(GridLine {
            label: km_label(northing),
            points: sample(e_min, e_max)
                .into_iter()
                .map(|easting| inverse_sk42(easting, northing, zone))
                .collect(),
        });
    }

    lines
}

fn ascending_multiples(min: f64, max: f64, step: f64) -> Vec<f64> {
    let first = (min / step).ceil();
    let mut values = vec![];
    for i in 0..MAX_LINES {
        let value = (first + i as f64) * step;
        if value > max {
            return values;
        }
        values.push(value);
    }

    log::warn!("SK-42 grid step {step} is too small, only {MAX_LINES} lines are drawn");
    values
}

fn km_label(meters: f64) -> String {
    format!("{}", (meters / 1000.0).round() as i64)
}
