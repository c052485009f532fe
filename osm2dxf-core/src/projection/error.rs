use thiserror::Error;

/// Errors from [`crate::projection::Projection`] implementations.
///
/// A projection error concerns a single coordinate. Callers mark the
/// offending node as unresolvable and carry on with the rest of the data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// Latitude or longitude was NaN or infinite.
    #[error("coordinate (lat {lat}, lon {lon}) is not finite")]
    NonFinite {
        /// Offending latitude.
        lat: f64,
        /// Offending longitude.
        lon: f64,
    },
    /// Latitude reached a pole, where Mercator-family projections diverge.
    #[error("latitude {lat} is outside the open interval (-90, 90)")]
    LatitudeOutOfRange {
        /// Offending latitude.
        lat: f64,
    },
    /// Longitude fell outside the valid range.
    #[error("longitude {lon} is outside [-180, 180]")]
    LongitudeOutOfRange {
        /// Offending longitude.
        lon: f64,
    },
    /// A transverse Mercator input sat on or beyond the zone's singular line.
    #[error("longitude {lon} is 90 degrees or more from central meridian {central_meridian}")]
    OutsideZone {
        /// Offending longitude.
        lon: f64,
        /// Central meridian of the zone in degrees.
        central_meridian: f64,
    },
    /// The registry-backed transform rejected the coordinate.
    #[cfg(feature = "epsg")]
    #[error("EPSG:{code} transform failed: {reason}")]
    Transform {
        /// Target system.
        code: u32,
        /// Backend message.
        reason: String,
    },
    /// A planar coordinate does not map back onto the ellipsoid.
    #[error("planar coordinate ({x}, {y}) has no geodetic inverse")]
    NoInverse {
        /// Easting.
        x: f64,
        /// Northing.
        y: f64,
    },
}

/// Errors from parsing a coordinate reference system identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrsParseError {
    /// The identifier is not of the form `EPSG:<code>`.
    #[error("CRS identifier {0:?} is not of the form EPSG:<code>")]
    Malformed(String),
    /// The EPSG code is not one of the supported projected systems.
    #[error("EPSG:{code} is not a supported projected coordinate system")]
    Unsupported {
        /// Requested EPSG code.
        code: u32,
    },
}
