/// Reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datum {
    semimajor: f64,
    inv_flattening: f64,
}

impl Datum {
    /// WGS-84 ellipsoid used by GPS and Web-Mercator tiles.
    pub const WGS84: Self = Datum {
        semimajor: 6_378_137.0,
        inv_flattening: 298.257223563,
    };

    /// Krasovsky 1940 ellipsoid of the SK-42 datum.
    pub const KRASOVSKY: Self = Datum {
        semimajor: 6_378_245.0,
        inv_flattening: 298.3,
    };

    /// Equatorial radius in meters.
    pub fn semimajor(&self) -> f64 {
        self.semimajor
    }

    /// `1/f`.
    pub fn inv_flattening(&self) -> f64 {
        self.inv_flattening
    }

    /// Flattening `f`.
    pub fn flattening(&self) -> f64 {
        1.0 / self.inv_flattening
    }

    /// Polar radius in meters.
    pub fn semiminor(&self) -> f64 {
        self.semimajor * (1.0 - self.flattening())
    }

    /// First eccentricity squared, `e² = 2f - f²`.
    pub fn eccentricity_sq(&self) -> f64 {
        let f = self.flattening();
        2.0 * f - f * f
    }

    /// Second eccentricity squared, `e'² = e² / (1 - e²)`.
    pub fn second_eccentricity_sq(&self) -> f64 {
        let e2 = self.eccentricity_sq();
        e2 / (1.0 - e2)
    }
}

impl Default for Datum {
    fn default() -> Self {
        Self::WGS84
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn derived_parameters() {
        assert_abs_diff_eq!(Datum::WGS84.semiminor(), 6_356_752.314245, epsilon = 1e-6);
        assert_abs_diff_eq!(
            Datum::WGS84.eccentricity_sq(),
            0.006_694_379_990_14,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            Datum::KRASOVSKY.eccentricity_sq(),
            0.006_693_421_622_97,
            epsilon = 1e-12
        );
    }
}
