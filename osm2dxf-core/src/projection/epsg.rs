//! Projected systems looked up in the EPSG registry and evaluated with
//! `proj4rs`.
//!
//! Only codes without a closed-form implementation reach this module. The
//! registry entry is parsed once per [`EpsgProjection`]; reuse one value for
//! a whole dataset.

use std::fmt;

use geo::Coord;
use proj4rs::Proj;
use proj4rs::transform::transform;

use super::{CrsParseError, Projection, ProjectionError, check_geodetic, check_planar};

const WGS84_GEODETIC: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// A projected EPSG system backed by its registry definition.
pub struct EpsgProjection {
    code: u16,
    geodetic: Proj,
    planar: Proj,
}

impl EpsgProjection {
    /// Look up `code` and prepare its forward and inverse transforms.
    ///
    /// Unknown codes and geographic (longitude/latitude) systems are
    /// rejected as unsupported.
    pub fn new(code: u32) -> Result<Self, CrsParseError> {
        let unsupported = CrsParseError::Unsupported { code };
        let short = u16::try_from(code).map_err(|_| unsupported.clone())?;
        let definition = crs_definitions::from_code(short).ok_or_else(|| unsupported.clone())?;
        if definition.proj4.contains("+proj=longlat") {
            return Err(unsupported);
        }
        let planar = Proj::from_proj_string(definition.proj4).map_err(|_| unsupported.clone())?;
        let geodetic = Proj::from_proj_string(WGS84_GEODETIC).map_err(|_| unsupported)?;
        Ok(Self {
            code: short,
            geodetic,
            planar,
        })
    }

    /// EPSG code of the target system.
    pub fn code(&self) -> u32 {
        u32::from(self.code)
    }

    fn failure(&self, source: &proj4rs::errors::Error) -> ProjectionError {
        ProjectionError::Transform {
            code: self.code(),
            reason: source.to_string(),
        }
    }
}

impl fmt::Debug for EpsgProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpsgProjection")
            .field("code", &self.code)
            .finish_non_exhaustive()
    }
}

impl Projection for EpsgProjection {
    fn forward(&self, geodetic: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        check_geodetic(geodetic)?;
        let mut point = (geodetic.x.to_radians(), geodetic.y.to_radians(), 0.0);
        transform(&self.geodetic, &self.planar, &mut point).map_err(|err| self.failure(&err))?;
        let planar = Coord {
            x: point.0,
            y: point.1,
        };
        check_planar(planar)?;
        Ok(planar)
    }

    fn inverse(&self, planar: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        check_planar(planar)?;
        let mut point = (planar.x, planar.y, 0.0);
        transform(&self.planar, &self.geodetic, &mut point).map_err(|err| self.failure(&err))?;
        let geodetic = Coord {
            x: point.0.to_degrees(),
            y: point.1.to_degrees(),
        };
        if geodetic.x.is_finite() && geodetic.y.is_finite() {
            Ok(geodetic)
        } else {
            Err(ProjectionError::NoInverse {
                x: planar.x,
                y: planar.y,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn british_national_grid_places_london() {
        let grid = EpsgProjection::new(27_700).expect("EPSG:27700 is registered");
        let charing_cross = Coord {
            x: -0.1276,
            y: 51.5072,
        };
        let planar = grid.forward(charing_cross).expect("in domain");
        assert!((529_000.0..532_000.0).contains(&planar.x), "easting {}", planar.x);
        assert!((179_000.0..182_000.0).contains(&planar.y), "northing {}", planar.y);

        let back = grid.inverse(planar).expect("invertible");
        assert!((back.x - charing_cross.x).abs() < 1.0e-6);
        assert!((back.y - charing_cross.y).abs() < 1.0e-6);
    }

    #[rstest]
    #[case(4326)]
    #[case(4_000_000)]
    fn geographic_and_unknown_codes_are_unsupported(#[case] code: u32) {
        assert_eq!(
            EpsgProjection::new(code).map(|projection| projection.code()),
            Err(CrsParseError::Unsupported { code })
        );
    }
}
