//! Facade crate for the osm2dxf converter.
//!
//! This crate re-exports the domain model, the conversion entry points and
//! the drawing emitter. PBF input and JSON rule tables sit behind the `pbf`
//! and `serde` feature flags; registry-backed EPSG systems behind `epsg`.

#![forbid(unsafe_code)]

pub use osm2dxf_core::{
    AciColor, Category, Classifier, ConversionReport, ConversionWarning, ConvertOptions, Crs,
    InputFormat, OsmData, PlanType, StyleMode,
};

#[cfg(feature = "serde")]
pub use osm2dxf_core::RulesError;

pub use osm2dxf_data::{
    ConvertError, Drawing, EmitError, ParseError, ParsedGeodata, convert_bytes, convert_file,
    read_geodata, write_drawing,
};

#[cfg(feature = "serde")]
pub use osm2dxf_data::load_rules;
