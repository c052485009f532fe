//! Project geodetic coordinates into a planar drawing coordinate system.
//!
//! The [`Projection`] trait maps WGS84 longitude/latitude (`x = lon`,
//! `y = lat`, degrees) to planar metres and back. [`Crs`] names the supported
//! target systems by EPSG identifier; [`Projector`] applies one to every node
//! of a parsed dataset.
//!
//! Web Mercator, World Mercator and UTM have closed-form implementations.
//! With the `epsg` feature any other projected system in the EPSG registry
//! is accepted and evaluated by `proj4rs`.
//!
//! Errors concern single coordinates: a node that cannot be projected is
//! reported and left out, it never aborts a conversion.

#[cfg(feature = "epsg")]
mod epsg;
mod error;
mod mercator;
mod utm;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use geo::Coord;

#[cfg(feature = "epsg")]
pub use epsg::EpsgProjection;
pub use error::{CrsParseError, ProjectionError};
pub use mercator::{WebMercator, WorldMercator};
pub use utm::{Hemisphere, TransverseMercator, UtmZone};

use crate::osm::{NodeTable, OsmId};
use crate::report::ConversionWarning;

/// WGS84 semi-major axis in metres.
pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;
/// WGS84 first eccentricity.
pub const WGS84_ECCENTRICITY: f64 = 0.081_819_190_842_621_49;

/// Map geodetic coordinates to planar coordinates and back.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use osm2dxf_core::projection::{Projection, WebMercator};
///
/// let planar = WebMercator.forward(Coord { x: 0.0, y: 0.0 }).expect("in domain");
/// assert!(planar.x.abs() < 1e-9 && planar.y.abs() < 1e-9);
/// ```
pub trait Projection {
    /// Project a longitude/latitude pair in degrees.
    fn forward(&self, geodetic: Coord<f64>) -> Result<Coord<f64>, ProjectionError>;

    /// Recover the longitude/latitude pair for a planar coordinate.
    fn inverse(&self, planar: Coord<f64>) -> Result<Coord<f64>, ProjectionError>;
}

pub(crate) fn check_geodetic(geodetic: Coord<f64>) -> Result<(), ProjectionError> {
    let (lon, lat) = (geodetic.x, geodetic.y);
    if !lon.is_finite() || !lat.is_finite() {
        return Err(ProjectionError::NonFinite { lat, lon });
    }
    if lat.abs() >= 90.0 {
        return Err(ProjectionError::LatitudeOutOfRange { lat });
    }
    if lon.abs() > 180.0 {
        return Err(ProjectionError::LongitudeOutOfRange { lon });
    }
    Ok(())
}

pub(crate) fn check_planar(planar: Coord<f64>) -> Result<(), ProjectionError> {
    if planar.x.is_finite() && planar.y.is_finite() {
        Ok(())
    } else {
        Err(ProjectionError::NoInverse {
            x: planar.x,
            y: planar.y,
        })
    }
}

/// A supported projected coordinate reference system.
///
/// # Examples
/// ```
/// use osm2dxf_core::Crs;
///
/// let crs: Crs = "epsg:32633".parse().expect("UTM 33N is supported");
/// assert_eq!(crs.to_string(), "EPSG:32633");
/// assert_eq!(Crs::default().epsg_code(), 3857);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Crs {
    /// EPSG:3857, spherical Web Mercator.
    #[default]
    WebMercator,
    /// EPSG:3395, ellipsoidal World Mercator.
    WorldMercator,
    /// EPSG:326zz / EPSG:327zz.
    Utm(UtmZone),
    /// Any other projected system from the EPSG registry.
    #[cfg(feature = "epsg")]
    Epsg(u32),
}

impl Crs {
    /// EPSG code of the system.
    pub fn epsg_code(&self) -> u32 {
        match self {
            Self::WebMercator => 3857,
            Self::WorldMercator => 3395,
            Self::Utm(zone) => zone.epsg_code(),
            #[cfg(feature = "epsg")]
            Self::Epsg(code) => *code,
        }
    }

    /// Prepare the system for projecting many coordinates.
    ///
    /// Registry-backed systems parse their definition here, once, instead
    /// of on every [`Projection::forward`] call.
    pub fn prepare(self) -> Result<PreparedCrs, CrsParseError> {
        #[cfg(feature = "epsg")]
        if let Self::Epsg(code) = self {
            return EpsgProjection::new(code).map(PreparedCrs::Registry);
        }
        Ok(PreparedCrs::ClosedForm(self))
    }

    /// Look up a system by EPSG code.
    pub fn from_epsg(code: u32) -> Result<Self, CrsParseError> {
        let utm = |base: u32, hemisphere: Hemisphere| {
            u8::try_from(code - base)
                .ok()
                .and_then(|number| UtmZone::new(number, hemisphere))
                .map(Self::Utm)
                .ok_or(CrsParseError::Unsupported { code })
        };
        match code {
            3857 | 900_913 | 3785 => Ok(Self::WebMercator),
            3395 => Ok(Self::WorldMercator),
            32_601..=32_660 => utm(32_600, Hemisphere::North),
            32_701..=32_760 => utm(32_700, Hemisphere::South),
            #[cfg(feature = "epsg")]
            _ => EpsgProjection::new(code).map(|_| Self::Epsg(code)),
            #[cfg(not(feature = "epsg"))]
            _ => Err(CrsParseError::Unsupported { code }),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg_code())
    }
}

impl FromStr for Crs {
    type Err = CrsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let code = trimmed
            .split_once(':')
            .filter(|(authority, _)| authority.eq_ignore_ascii_case("epsg"))
            .and_then(|(_, code)| code.parse::<u32>().ok())
            .ok_or_else(|| CrsParseError::Malformed(trimmed.to_owned()))?;
        Self::from_epsg(code)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Crs {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Crs {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Projection for Crs {
    fn forward(&self, geodetic: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        match self {
            Self::WebMercator => WebMercator.forward(geodetic),
            Self::WorldMercator => WorldMercator.forward(geodetic),
            Self::Utm(zone) => TransverseMercator::new(*zone).forward(geodetic),
            #[cfg(feature = "epsg")]
            Self::Epsg(code) => registry(*code)?.forward(geodetic),
        }
    }

    fn inverse(&self, planar: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        match self {
            Self::WebMercator => WebMercator.inverse(planar),
            Self::WorldMercator => WorldMercator.inverse(planar),
            Self::Utm(zone) => TransverseMercator::new(*zone).inverse(planar),
            #[cfg(feature = "epsg")]
            Self::Epsg(code) => registry(*code)?.inverse(planar),
        }
    }
}

#[cfg(feature = "epsg")]
fn registry(code: u32) -> Result<EpsgProjection, ProjectionError> {
    EpsgProjection::new(code).map_err(|err| ProjectionError::Transform {
        code,
        reason: err.to_string(),
    })
}

/// A [`Crs`] ready to project a whole dataset.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use osm2dxf_core::{Crs, Projection};
///
/// let prepared = Crs::WorldMercator.prepare().expect("closed form");
/// assert!(prepared.forward(Coord { x: 0.0, y: 0.0 }).is_ok());
/// ```
#[derive(Debug)]
pub enum PreparedCrs {
    /// A system with a closed-form implementation.
    ClosedForm(Crs),
    /// A registry-backed system with its definition parsed.
    #[cfg(feature = "epsg")]
    Registry(EpsgProjection),
}

impl Projection for PreparedCrs {
    fn forward(&self, geodetic: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        match self {
            Self::ClosedForm(crs) => crs.forward(geodetic),
            #[cfg(feature = "epsg")]
            Self::Registry(projection) => projection.forward(geodetic),
        }
    }

    fn inverse(&self, planar: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        match self {
            Self::ClosedForm(crs) => crs.inverse(planar),
            #[cfg(feature = "epsg")]
            Self::Registry(projection) => projection.inverse(planar),
        }
    }
}

/// Planar coordinates for every node that could be projected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectedNodes {
    coordinates: HashMap<OsmId, Coord<f64>>,
}

impl ProjectedNodes {
    /// Planar coordinate of a node, if it was projected.
    pub fn get(&self, id: OsmId) -> Option<Coord<f64>> {
        self.coordinates.get(&id).copied()
    }

    /// Number of projected nodes.
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    /// Whether no node was projected.
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

/// Applies a [`Projection`] to every node of a dataset.
#[derive(Debug, Clone, Copy)]
pub struct Projector<P = Crs> {
    projection: P,
}

impl<P: Projection> Projector<P> {
    /// Wrap a projection.
    pub fn new(projection: P) -> Self {
        Self { projection }
    }

    /// Project a single coordinate.
    pub fn project(&self, geodetic: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        self.projection.forward(geodetic)
    }

    /// Project every node; failures become warnings and the node is omitted.
    pub fn project_nodes(
        &self,
        nodes: &NodeTable,
        warnings: &mut Vec<ConversionWarning>,
    ) -> ProjectedNodes {
        let mut coordinates = HashMap::with_capacity(nodes.len());
        for node in nodes {
            match self.project(node.location) {
                Ok(planar) => {
                    coordinates.insert(node.id, planar);
                }
                Err(source) => warnings.push(ConversionWarning::Projection {
                    node: node.id,
                    reason: source.to_string(),
                }),
            }
        }
        ProjectedNodes { coordinates }
    }
}
