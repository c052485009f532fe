//! Geodata input, drawing output and the conversion pipeline for osm2dxf.
//!
//! Responsibilities:
//! - Parse OSM XML (`quick-xml`) and, with the `pbf` feature, OSM PBF
//!   (`osmpbf`) into the in-memory model of `osm2dxf-core`.
//! - Serialise drawings as AutoCAD R2000 ASCII DXF.
//! - Drive a whole conversion through [`convert_bytes`] and [`convert_file`].
//!
//! Boundaries:
//! - Do not encode classification or plan rules (live in `osm2dxf-core`).
//! - Filesystem access goes through `osm2dxf-fs`.
//!
//! Invariants:
//! - The same input and options always produce byte-identical output.
//! - A failed conversion never leaves a partial output file.
//! - No global mutable state.

mod convert;
pub mod dxf;
pub mod parse;

#[cfg(feature = "serde")]
pub use convert::load_rules;
pub use convert::{ConvertError, convert_bytes, convert_file};
pub use dxf::{Drawing, EmitError, write_drawing};
#[cfg(feature = "pbf")]
pub use parse::PbfSource;
pub use parse::{GeodataSource, ParseError, ParsedGeodata, XmlSource, read_geodata};
