//! Universal Transverse Mercator on WGS84 using Krüger's series.
//!
//! Third-order series are accurate to well below a millimetre inside a zone
//! and degrade gracefully towards the singular line 90° from the central
//! meridian, which is rejected.

use geo::Coord;

use super::{
    Projection, ProjectionError, WGS84_FLATTENING, WGS84_SEMI_MAJOR_AXIS, check_geodetic,
    check_planar,
};

const SCALE_FACTOR: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Hemisphere of a UTM zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    /// Northern hemisphere (EPSG:326zz).
    North,
    /// Southern hemisphere (EPSG:327zz), with a 10 000 km false northing.
    South,
}

/// A UTM zone, numbered 1 to 60.
///
/// # Examples
/// ```
/// use osm2dxf_core::projection::{Hemisphere, UtmZone};
///
/// let zone = UtmZone::new(33, Hemisphere::North).expect("valid zone");
/// assert_eq!(zone.central_meridian(), 15.0);
/// assert_eq!(zone.epsg_code(), 32633);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtmZone {
    number: u8,
    hemisphere: Hemisphere,
}

impl UtmZone {
    /// Construct a zone, returning `None` outside `1..=60`.
    pub fn new(number: u8, hemisphere: Hemisphere) -> Option<Self> {
        (1..=60)
            .contains(&number)
            .then_some(Self { number, hemisphere })
    }

    /// Zone number.
    pub fn number(&self) -> u8 {
        self.number
    }

    /// Zone hemisphere.
    pub fn hemisphere(&self) -> Hemisphere {
        self.hemisphere
    }

    /// Central meridian in degrees.
    pub fn central_meridian(&self) -> f64 {
        f64::from(self.number) * 6.0 - 183.0
    }

    /// EPSG code of the zone.
    pub fn epsg_code(&self) -> u32 {
        let base = match self.hemisphere {
            Hemisphere::North => 32_600,
            Hemisphere::South => 32_700,
        };
        base + u32::from(self.number)
    }

    fn false_northing(&self) -> f64 {
        match self.hemisphere {
            Hemisphere::North => 0.0,
            Hemisphere::South => FALSE_NORTHING_SOUTH,
        }
    }
}

/// Series coefficients derived from the WGS84 third flattening.
struct KruegerSeries {
    rectifying_radius: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
    eccentricity_term: f64,
}

impl KruegerSeries {
    fn wgs84() -> Self {
        let n = WGS84_FLATTENING / (2.0 - WGS84_FLATTENING);
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        Self {
            rectifying_radius: WGS84_SEMI_MAJOR_AXIS / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0),
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
                61.0 * n3 / 240.0,
            ],
            beta: [
                n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
                n2 / 48.0 + n3 / 15.0,
                17.0 * n3 / 480.0,
            ],
            delta: [
                2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
                7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
                56.0 * n3 / 15.0,
            ],
            eccentricity_term: 2.0 * n.sqrt() / (1.0 + n),
        }
    }
}

/// Transverse Mercator projection for one UTM zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransverseMercator {
    zone: UtmZone,
}

impl TransverseMercator {
    /// Projection for `zone`.
    pub fn new(zone: UtmZone) -> Self {
        Self { zone }
    }

    /// The zone this projection serves.
    pub fn zone(&self) -> UtmZone {
        self.zone
    }
}

impl Projection for TransverseMercator {
    fn forward(&self, geodetic: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        check_geodetic(geodetic)?;
        let central_meridian = self.zone.central_meridian();
        let mut offset = geodetic.x - central_meridian;
        // Wrap across the antimeridian so zone 60 accepts -179°.
        if offset > 180.0 {
            offset -= 360.0;
        } else if offset < -180.0 {
            offset += 360.0;
        }
        if offset.abs() >= 90.0 {
            return Err(ProjectionError::OutsideZone {
                lon: geodetic.x,
                central_meridian,
            });
        }

        let series = KruegerSeries::wgs84();
        let phi = geodetic.y.to_radians();
        let lambda = offset.to_radians();
        let c = series.eccentricity_term;
        let t = (phi.sin().atanh() - c * (c * phi.sin()).atanh()).sinh();
        let xi_prime = (t / lambda.cos()).atan();
        let eta_prime = (lambda.sin() / (1.0 + t * t).sqrt()).atanh();

        let mut easting = eta_prime;
        let mut northing = xi_prime;
        for (index, alpha) in series.alpha.iter().enumerate() {
            let order = 2.0 * (index as f64 + 1.0);
            easting += alpha * (order * xi_prime).cos() * (order * eta_prime).sinh();
            northing += alpha * (order * xi_prime).sin() * (order * eta_prime).cosh();
        }

        let scale = SCALE_FACTOR * series.rectifying_radius;
        Ok(Coord {
            x: FALSE_EASTING + scale * easting,
            y: self.zone.false_northing() + scale * northing,
        })
    }

    fn inverse(&self, planar: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        check_planar(planar)?;
        let series = KruegerSeries::wgs84();
        let scale = SCALE_FACTOR * series.rectifying_radius;
        let xi = (planar.y - self.zone.false_northing()) / scale;
        let eta = (planar.x - FALSE_EASTING) / scale;

        let mut xi_prime = xi;
        let mut eta_prime = eta;
        for (index, beta) in series.beta.iter().enumerate() {
            let order = 2.0 * (index as f64 + 1.0);
            xi_prime -= beta * (order * xi).sin() * (order * eta).cosh();
            eta_prime -= beta * (order * xi).cos() * (order * eta).sinh();
        }

        let sin_chi = xi_prime.sin() / eta_prime.cosh();
        if !(-1.0..=1.0).contains(&sin_chi) {
            return Err(ProjectionError::NoInverse {
                x: planar.x,
                y: planar.y,
            });
        }
        let chi = sin_chi.asin();
        let mut phi = chi;
        for (index, delta) in series.delta.iter().enumerate() {
            let order = 2.0 * (index as f64 + 1.0);
            phi += delta * (order * chi).sin();
        }
        let lambda = eta_prime.sinh().atan2(xi_prime.cos());

        let mut lon = self.zone.central_meridian() + lambda.to_degrees();
        if lon > 180.0 {
            lon -= 360.0;
        } else if lon < -180.0 {
            lon += 360.0;
        }
        Ok(Coord {
            x: lon,
            y: phi.to_degrees(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        let delta = (actual - expected).abs();
        assert!(
            delta <= tolerance,
            "expected {expected}, got {actual} (|Δ| = {delta})"
        );
    }

    fn zone(number: u8, hemisphere: Hemisphere) -> TransverseMercator {
        TransverseMercator::new(UtmZone::new(number, hemisphere).expect("valid zone"))
    }

    #[rstest]
    #[case(0)]
    #[case(61)]
    fn zone_numbers_are_bounded(#[case] number: u8) {
        assert!(UtmZone::new(number, Hemisphere::North).is_none());
    }

    #[rstest]
    fn central_meridian_on_equator_is_false_origin() {
        let projected = zone(31, Hemisphere::North)
            .forward(Coord { x: 3.0, y: 0.0 })
            .expect("in domain");
        assert_close(projected.x, 500_000.0, 1.0e-6);
        assert_close(projected.y, 0.0, 1.0e-6);
    }

    #[rstest]
    #[case(Coord { x: 13.4, y: 52.5 }, 33, Hemisphere::North, 391_390.731_337, 5_817_855.240_776)]
    #[case(Coord { x: 151.21, y: -33.86 }, 56, Hemisphere::South, 334_416.393_994, 6_251_925.360_375)]
    fn projects_known_locations(
        #[case] geodetic: Coord<f64>,
        #[case] number: u8,
        #[case] hemisphere: Hemisphere,
        #[case] easting: f64,
        #[case] northing: f64,
    ) {
        let projected = zone(number, hemisphere)
            .forward(geodetic)
            .expect("in domain");
        assert_close(projected.x, easting, 1.0e-3);
        assert_close(projected.y, northing, 1.0e-3);
    }

    #[rstest]
    fn rejects_points_on_the_singular_line() {
        let err = zone(31, Hemisphere::North)
            .forward(Coord { x: 93.0, y: 10.0 })
            .expect_err("90 degrees from the central meridian");
        assert!(matches!(err, ProjectionError::OutsideZone { .. }));
    }

    #[rstest]
    fn zone_sixty_wraps_across_the_antimeridian() {
        let projection = zone(60, Hemisphere::South);
        let geodetic = Coord { x: -179.5, y: -16.0 };
        let planar = projection.forward(geodetic).expect("in domain");
        let back = projection.inverse(planar).expect("invertible");
        assert_close(back.x, geodetic.x, 1.0e-7);
        assert_close(back.y, geodetic.y, 1.0e-7);
    }
}
