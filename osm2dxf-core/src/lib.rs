//! Core conversion model for osm2dxf.
//!
//! Responsibilities:
//! - Hold parsed OpenStreetMap elements in memory.
//! - Project geodetic coordinates into a planar drawing system.
//! - Classify elements into styled layers and filter them per plan type.
//! - Build planar shapes and labels ready for a drawing emitter.
//!
//! Boundaries:
//! - No I/O. Parsing and drawing serialisation live in `osm2dxf-data`.
//!
//! Invariants:
//! - Every element receives exactly one category.
//! - Polygons are explicitly closed rings.
//! - Nothing here mutates its inputs; every stage returns new values.

pub mod classify;
pub mod geometry;
pub mod options;
pub mod osm;
pub mod plan;
pub mod projection;
pub mod report;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use classify::{
    AciColor, Category, Classification, ClassificationRule, ClassifiedFeature, Classifier,
    Lineweight, TagMatcher, VALID_LINEWEIGHTS,
};
#[cfg(feature = "serde")]
pub use classify::RulesError;
pub use geometry::{
    DEDUP_EPSILON, GeometryBuilder, Placement, Primitive, ProjectedGeometry, ShapeKind,
};
pub use options::{ConvertOptions, InputFormat};
pub use osm::{ElementKind, ElementRef, Member, Node, NodeTable, OsmData, OsmId, Relation, Tags, Way};
pub use plan::{FilteredPlan, PlanFilter, PlanType, Presentation, RetainedFeature, StyleMode};
pub use projection::{
    Crs, CrsParseError, PreparedCrs, ProjectedNodes, Projection, ProjectionError, Projector,
};
pub use report::{ConversionReport, ConversionWarning, EntityCounts, LayerSummary};
