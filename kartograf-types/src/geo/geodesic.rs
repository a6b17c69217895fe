//! Vincenty's solutions of the direct and inverse geodesic problems on an ellipsoid.
//!
//! Both solutions iterate until the change of `λ` (inverse) or `σ` (direct) drops below
//! [`CONVERGENCE_TOLERANCE`] or [`MAX_ITERATIONS`] is reached. When the iteration does not converge
//! (nearly antipodal points), the last estimate is returned instead of an error.

use super::{Datum, GeoPoint};

/// Maximum number of iterations of the Vincenty formulae.
pub const MAX_ITERATIONS: usize = 100;
/// Convergence tolerance in radians.
pub const CONVERGENCE_TOLERANCE: f64 = 1e-12;

/// Solution of the inverse geodesic problem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodesicInverse {
    /// Ellipsoidal distance in meters.
    pub distance: f64,
    /// Azimuth at the start point, degrees clockwise from north in `[0, 360)`.
    pub initial_azimuth: f64,
    /// Azimuth at the end point, degrees clockwise from north in `[0, 360)`.
    pub final_azimuth: f64,
    /// False if the iteration cap was hit and the values are the last estimate.
    pub converged: bool,
}

/// Geodesic calculations on the given ellipsoid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Geodesic {
    datum: Datum,
}

impl Geodesic {
    /// Geodesics on the WGS-84 ellipsoid.
    pub const WGS84: Self = Self {
        datum: Datum::WGS84,
    };

    /// Geodesics on the given ellipsoid.
    pub fn new(datum: Datum) -> Self {
        Self { datum }
    }

    /// Distance and azimuths between two points.
    pub fn inverse(&self, from: &GeoPoint, to: &GeoPoint) -> GeodesicInverse {
        let a = self.datum.semimajor();
        let b = self.datum.semiminor();
        let f = self.datum.flattening();

        let l = (to.lon() - from.lon()).to_radians();
        let u1 = ((1.0 - f) * from.lat_rad().tan()).atan();
        let u2 = ((1.0 - f) * to.lat_rad().tan()).atan();
        let (sin_u1, cos_u1) = u1.sin_cos();
        let (sin_u2, cos_u2) = u2.sin_cos();

        let mut lambda = l;
        let mut converged = false;

        let mut sin_sigma = 0.0;
        let mut cos_sigma = 1.0;
        let mut sigma = 0.0;
        let mut cos_sq_alpha = 1.0;
        let mut cos_2sigma_m = 0.0;
        let mut sin_lambda = 0.0;
        let mut cos_lambda = 1.0;

        for _ in 0..MAX_ITERATIONS {
            (sin_lambda, cos_lambda) = lambda.sin_cos();
            let t1 = cos_u2 * sin_lambda;
            let t2 = cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda;
            sin_sigma = (t1 * t1 + t2 * t2).sqrt();
            if sin_sigma == 0.0 {
                return GeodesicInverse {
                    distance: 0.0,
                    initial_azimuth: 0.0,
                    final_azimuth: 0.0,
                    converged: true,
                };
            }

            cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
            sigma = sin_sigma.atan2(cos_sigma);
            let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
            cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
            // Equatorial line: cos²α = 0.
            cos_2sigma_m = if cos_sq_alpha != 0.0 {
                cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
            } else {
                0.0
            };

            let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
            let prev = lambda;
            lambda = l
                + (1.0 - c)
                    * f
                    * sin_alpha
                    * (sigma
                        + c * sin_sigma
                            * (cos_2sigma_m
                                + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

            if (lambda - prev).abs() < CONVERGENCE_TOLERANCE {
                converged = true;
                break;
            }
        }

        let u_sq = cos_sq_alpha * (a * a - b * b) / (b * b);
        let (big_a, big_b) = series_coefficients(u_sq);
        let delta_sigma = delta_sigma(big_b, sin_sigma, cos_sigma, cos_2sigma_m);
        let distance = b * big_a * (sigma - delta_sigma);

        let initial = (cos_u2 * sin_lambda).atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda);
        let final_ = (cos_u1 * sin_lambda).atan2(-sin_u1 * cos_u2 + cos_u1 * sin_u2 * cos_lambda);

        GeodesicInverse {
            distance,
            initial_azimuth: normalize_azimuth(initial.to_degrees()),
            final_azimuth: normalize_azimuth(final_.to_degrees()),
            converged,
        }
    }

    /// Point reached by travelling `distance` meters from `from` along the geodesic starting with
    /// the given `azimuth` (degrees clockwise from north).
    pub fn direct(&self, from: &GeoPoint, azimuth: f64, distance: f64) -> GeoPoint {
        if distance == 0.0 {
            return *from;
        }

        let a = self.datum.semimajor();
        let b = self.datum.semiminor();
        let f = self.datum.flattening();

        let (sin_alpha1, cos_alpha1) = azimuth.to_radians().sin_cos();
        let tan_u1 = (1.0 - f) * from.lat_rad().tan();
        let cos_u1 = 1.0 / (1.0 + tan_u1 * tan_u1).sqrt();
        let sin_u1 = tan_u1 * cos_u1;

        let sigma1 = tan_u1.atan2(cos_alpha1);
        let sin_alpha = cos_u1 * sin_alpha1;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        let u_sq = cos_sq_alpha * (a * a - b * b) / (b * b);
        let (big_a, big_b) = series_coefficients(u_sq);

        let base = distance / (b * big_a);
        let mut sigma = base;
        let mut sin_sigma;
        let mut cos_sigma;
        let mut cos_2sigma_m;

        let mut iterations = 0;
        loop {
            cos_2sigma_m = (2.0 * sigma1 + sigma).cos();
            (sin_sigma, cos_sigma) = sigma.sin_cos();
            let prev = sigma;
            sigma = base + delta_sigma(big_b, sin_sigma, cos_sigma, cos_2sigma_m);

            iterations += 1;
            if (sigma - prev).abs() < CONVERGENCE_TOLERANCE || iterations >= MAX_ITERATIONS {
                break;
            }
        }

        cos_2sigma_m = (2.0 * sigma1 + sigma).cos();
        (sin_sigma, cos_sigma) = sigma.sin_cos();

        let tmp = sin_u1 * sin_sigma - cos_u1 * cos_sigma * cos_alpha1;
        let lat2 = (sin_u1 * cos_sigma + cos_u1 * sin_sigma * cos_alpha1)
            .atan2((1.0 - f) * (sin_alpha * sin_alpha + tmp * tmp).sqrt());
        let lambda =
            (sin_sigma * sin_alpha1).atan2(cos_u1 * cos_sigma - sin_u1 * sin_sigma * cos_alpha1);
        let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
        let l = lambda
            - (1.0 - c)
                * f
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m
                            + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        GeoPoint::latlon(lat2.to_degrees(), from.lon() + l.to_degrees())
    }

    /// Samples the geodesic between two points every `step` meters.
    ///
    /// The first point is always `from` and the last is always exactly `to`, so the last segment
    /// may be shorter than `step`. A non-positive or non-finite step yields just the two ends.
    pub fn line(&self, from: &GeoPoint, to: &GeoPoint, step: f64) -> Vec<GeoPoint> {
        let mut points = vec![*from];

        if step.is_finite() && step > 0.0 {
            let inverse = self.inverse(from, to);
            let mut travelled = step;
            while travelled < inverse.distance {
                points.push(self.direct(from, inverse.initial_azimuth, travelled));
                travelled += step;
            }
        }

        points.push(*to);
        points
    }
}

fn series_coefficients(u_sq: f64) -> (f64, f64) {
    let a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
    (a, b)
}

fn delta_sigma(big_b: f64, sin_sigma: f64, cos_sigma: f64, cos_2sigma_m: f64) -> f64 {
    big_b
        * sin_sigma
        * (cos_2sigma_m
            + big_b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                    - big_b / 6.0
                        * cos_2sigma_m
                        * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                        * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)))
}

fn normalize_azimuth(azimuth: f64) -> f64 {
    azimuth.rem_euclid(360.0)
}

/// Inverse problem on WGS-84: `(distance, initial azimuth)`.
pub fn vincenty_inverse(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> (f64, f64) {
    let result = Geodesic::WGS84.inverse(&GeoPoint::latlon(lat1, lon1), &GeoPoint::latlon(lat2, lon2));
    (result.distance, result.initial_azimuth)
}

/// Direct problem on WGS-84.
pub fn vincenty_direct(lat: f64, lon: f64, azimuth: f64, distance: f64) -> GeoPoint {
    Geodesic::WGS84.direct(&GeoPoint::latlon(lat, lon), azimuth, distance)
}

/// Geodesic line on WGS-84 sampled every `step` meters. See [`Geodesic::line`].
pub fn geodesic_line(from: &GeoPoint, to: &GeoPoint, step: f64) -> Vec<GeoPoint> {
    Geodesic::WGS84.line(from, to, step)
}
