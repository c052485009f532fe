//! Mercator projections on the sphere (EPSG:3857) and the WGS84 ellipsoid
//! (EPSG:3395).

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo::Coord;

use super::{
    Projection, ProjectionError, WGS84_ECCENTRICITY, WGS84_SEMI_MAJOR_AXIS, check_geodetic,
    check_planar,
};

const MAX_INVERSE_ITERATIONS: usize = 15;
const INVERSE_CONVERGENCE: f64 = 1.0e-12;

/// Slack for the radian/degree round trip at the antimeridian.
const ANTIMERIDIAN_SLACK: f64 = 1.0e-9;

fn inverse_longitude(planar: Coord<f64>) -> Result<f64, ProjectionError> {
    let lon = (planar.x / WGS84_SEMI_MAJOR_AXIS).to_degrees();
    if lon.abs() > 180.0 + ANTIMERIDIAN_SLACK {
        return Err(ProjectionError::NoInverse {
            x: planar.x,
            y: planar.y,
        });
    }
    Ok(lon.clamp(-180.0, 180.0))
}

/// Spherical "Web" Mercator, the de-facto projection of web map tiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WebMercator;

impl Projection for WebMercator {
    fn forward(&self, geodetic: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        check_geodetic(geodetic)?;
        let lambda = geodetic.x.to_radians();
        let phi = geodetic.y.to_radians();
        Ok(Coord {
            x: WGS84_SEMI_MAJOR_AXIS * lambda,
            y: WGS84_SEMI_MAJOR_AXIS * (FRAC_PI_4 + phi / 2.0).tan().ln(),
        })
    }

    fn inverse(&self, planar: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        check_planar(planar)?;
        let lon = inverse_longitude(planar)?;
        let lat = (2.0 * (planar.y / WGS84_SEMI_MAJOR_AXIS).exp().atan() - FRAC_PI_2).to_degrees();
        Ok(Coord { x: lon, y: lat })
    }
}

/// Ellipsoidal World Mercator on WGS84.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldMercator;

impl WorldMercator {
    fn conformal_factor(phi: f64) -> f64 {
        let e_sin = WGS84_ECCENTRICITY * phi.sin();
        ((1.0 - e_sin) / (1.0 + e_sin)).powf(WGS84_ECCENTRICITY / 2.0)
    }
}

impl Projection for WorldMercator {
    fn forward(&self, geodetic: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        check_geodetic(geodetic)?;
        let lambda = geodetic.x.to_radians();
        let phi = geodetic.y.to_radians();
        let isometric = ((FRAC_PI_4 + phi / 2.0).tan() * Self::conformal_factor(phi)).ln();
        Ok(Coord {
            x: WGS84_SEMI_MAJOR_AXIS * lambda,
            y: WGS84_SEMI_MAJOR_AXIS * isometric,
        })
    }

    fn inverse(&self, planar: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        check_planar(planar)?;
        let lon = inverse_longitude(planar)?;
        let t = (-planar.y / WGS84_SEMI_MAJOR_AXIS).exp();
        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..MAX_INVERSE_ITERATIONS {
            let next = FRAC_PI_2 - 2.0 * (t * Self::conformal_factor(phi)).atan();
            let delta = (next - phi).abs();
            phi = next;
            if delta < INVERSE_CONVERGENCE {
                break;
            }
        }
        Ok(Coord {
            x: lon,
            y: phi.to_degrees(),
        })
    }
}
