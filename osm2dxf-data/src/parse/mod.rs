//! Geodata parsers.
//!
//! Every backend implements [`GeodataSource`]: it consumes a byte stream and
//! yields an [`OsmData`] graph in source order together with the warnings
//! raised while reading it. Element-level defects are warnings; only a
//! structurally broken stream is a [`ParseError`].

use std::io::BufRead;
use std::sync::Arc;

use geo::Rect;
use osm2dxf_core::{ConversionWarning, InputFormat, OsmData};
use thiserror::Error;

mod graph;
#[cfg(feature = "pbf")]
mod pbf;
mod tags;
mod xml;

#[cfg(feature = "pbf")]
pub use pbf::PbfSource;
pub use xml::XmlSource;

/// Outcome of reading a geodata stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedGeodata {
    /// Nodes, validated ways and relations in source order.
    pub data: OsmData,
    /// Geodetic bounds: the declared `bounds` element when present,
    /// otherwise the extent of the parsed nodes.
    pub bounds: Option<Rect<f64>>,
    /// Recoverable anomalies in the order encountered.
    pub warnings: Vec<ConversionWarning>,
}

/// Errors that abort parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The XML is not well formed.
    #[error("malformed XML at line {line} (byte {position})")]
    Xml {
        /// Byte offset where the reader stopped.
        position: usize,
        /// One-based line of `position`.
        line: usize,
        /// Reader error.
        #[source]
        source: quick_xml::Error,
    },
    /// The input ended inside an element.
    #[error("element <{element}> opened at line {line} (byte {position}) is never closed")]
    UnclosedElement {
        /// Name of the innermost open element.
        element: String,
        /// Byte offset just after its start tag.
        position: usize,
        /// One-based line of `position`.
        line: usize,
    },
    /// The document root is not `osm`.
    #[error("{}", describe_root(.found.as_deref()))]
    MissingRoot {
        /// Root element actually found, if any.
        found: Option<String>,
    },
    /// Reading the underlying stream failed.
    #[error("failed to read geodata")]
    Io {
        /// I/O failure.
        #[source]
        source: Arc<std::io::Error>,
    },
    /// The PBF container could not be decoded.
    #[cfg(feature = "pbf")]
    #[error("failed to decode OSM PBF data")]
    Pbf {
        /// Decoder failure.
        #[source]
        source: osmpbf::Error,
    },
    /// PBF input was requested from a build without the `pbf` feature.
    #[cfg(not(feature = "pbf"))]
    #[error("OSM PBF support is not enabled in this build")]
    PbfUnavailable,
}

fn describe_root(found: Option<&str>) -> String {
    match found {
        Some(name) => format!("expected an <osm> root element, found <{name}>"),
        None => "input contains no <osm> root element".to_owned(),
    }
}

/// A parser backend.
pub trait GeodataSource {
    /// Consume the source and build the element graph.
    fn read_geodata(self) -> Result<ParsedGeodata, ParseError>;
}

/// Read `input` with the backend for `format`.
///
/// # Examples
/// ```
/// use osm2dxf_core::InputFormat;
/// use osm2dxf_data::read_geodata;
///
/// let xml = br#"<osm version="0.6"><node id="1" lat="52.5" lon="13.4"/></osm>"#;
/// let parsed = read_geodata(InputFormat::Xml, &xml[..]).expect("well-formed input");
/// assert_eq!(parsed.data.nodes.len(), 1);
/// ```
pub fn read_geodata<R>(format: InputFormat, input: R) -> Result<ParsedGeodata, ParseError>
where
    R: BufRead + Send,
{
    match format {
        InputFormat::Xml => XmlSource::new(input).read_geodata(),
        #[cfg(feature = "pbf")]
        InputFormat::Pbf => PbfSource::new(input).read_geodata(),
        #[cfg(not(feature = "pbf"))]
        InputFormat::Pbf => Err(ParseError::PbfUnavailable),
    }
}
