//! The conversion pipeline: parse, project, classify, filter, build, emit.
//!
//! Each stage hands a new value to the next; nothing is shared between
//! conversions, so independent calls may run in parallel as long as they
//! write to different outputs.
use std::io::{self, BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use osm2dxf_core::{
    ConversionReport, ConversionWarning, ConvertOptions, CrsParseError, GeometryBuilder,
    InputFormat, Projector,
};
use thiserror::Error;

use crate::dxf::{self, Drawing, EmitError};
use crate::parse::{self, ParseError, ParsedGeodata};

/// Errors that abort a conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The input file could not be opened.
    #[error("failed to open input {path}")]
    OpenInput {
        /// Input path.
        path: Utf8PathBuf,
        /// Filesystem failure.
        #[source]
        source: io::Error,
    },
    /// The input path does not name a regular file.
    #[error("input {path} is not a readable file")]
    NotAFile {
        /// Input path.
        path: Utf8PathBuf,
    },
    /// The input could not be parsed.
    #[error("failed to parse {format} input")]
    Parse {
        /// Backend that failed.
        format: InputFormat,
        /// Parser failure.
        #[source]
        source: ParseError,
    },
    /// The drawing could not be written.
    #[error(transparent)]
    Emit(#[from] EmitError),
    /// The requested coordinate reference system is not supported.
    #[error("unsupported coordinate reference system")]
    UnsupportedCrs(#[from] CrsParseError),
    /// The classification rules file could not be read.
    #[error("failed to read classification rules from {path}")]
    RulesFile {
        /// Rules path.
        path: Utf8PathBuf,
        /// Filesystem failure.
        #[source]
        source: io::Error,
    },
    /// The classification rules are invalid.
    #[cfg(feature = "serde")]
    #[error("invalid classification rules in {path}")]
    Rules {
        /// Rules path.
        path: Utf8PathBuf,
        /// Validation failure.
        #[source]
        source: osm2dxf_core::RulesError,
    },
}

/// Convert an in-memory document, returning the drawing bytes.
///
/// # Examples
/// ```
/// use osm2dxf_core::{ConvertOptions, InputFormat};
/// use osm2dxf_data::convert_bytes;
///
/// let xml = br#"<osm version="0.6">
///   <node id="1" lat="1.0" lon="1.0"/>
///   <node id="2" lat="1.1" lon="1.0"/>
///   <way id="3"><nd ref="1"/><nd ref="2"/><tag k="highway" v="motorway"/></way>
/// </osm>"#;
/// let (dxf, report) = convert_bytes(xml, InputFormat::Xml, &ConvertOptions::default())?;
/// assert_eq!(report.entities.polylines, 1);
/// assert!(dxf.starts_with(b"999\n"));
/// # Ok::<(), osm2dxf_data::ConvertError>(())
/// ```
pub fn convert_bytes(
    input: &[u8],
    format: InputFormat,
    options: &ConvertOptions,
) -> Result<(Vec<u8>, ConversionReport), ConvertError> {
    let parsed = parse::read_geodata(format, input)
        .map_err(|source| ConvertError::Parse { format, source })?;
    let (drawing, report) = render(parsed, options)?;
    let bytes = dxf::to_dxf_bytes(&drawing)?;
    Ok((bytes, report))
}

/// Convert `input_path` and write the drawing to `output_path`.
///
/// The input format comes from [`ConvertOptions::input_format`] or, when
/// unset, from the input file extension. The output is replaced atomically
/// and is never touched when parsing fails.
pub fn convert_file(
    input_path: &Utf8Path,
    output_path: &Utf8Path,
    options: &ConvertOptions,
) -> Result<ConversionReport, ConvertError> {
    let format = options
        .input_format
        .unwrap_or_else(|| InputFormat::from_path(input_path));
    let is_file = osm2dxf_fs::is_regular_file(input_path).map_err(|source| {
        ConvertError::OpenInput {
            path: input_path.to_path_buf(),
            source,
        }
    })?;
    if !is_file {
        return Err(ConvertError::NotAFile {
            path: input_path.to_path_buf(),
        });
    }
    let file = osm2dxf_fs::open_input(input_path).map_err(|source| ConvertError::OpenInput {
        path: input_path.to_path_buf(),
        source,
    })?;
    info!("reading {format} input from {input_path}");
    let parsed = parse::read_geodata(format, BufReader::new(file))
        .map_err(|source| ConvertError::Parse { format, source })?;

    let (drawing, report) = render(parsed, options)?;
    dxf::write_dxf_file(&drawing, output_path)?;
    info!(
        "wrote {} entities on {} layers to {output_path}",
        report.entities.total(),
        report.layers.len()
    );
    Ok(report)
}

/// Load a classification rule table from a JSON file.
#[cfg(feature = "serde")]
pub fn load_rules(path: &Utf8Path) -> Result<osm2dxf_core::Classifier, ConvertError> {
    let file = osm2dxf_fs::open_input(path).map_err(|source| ConvertError::RulesFile {
        path: path.to_path_buf(),
        source,
    })?;
    let classifier = osm2dxf_core::Classifier::from_json_reader(BufReader::new(file))
        .map_err(|source| ConvertError::Rules {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("loaded {} classification rules from {path}", classifier.rules().len());
    Ok(classifier)
}

/// Run every stage after parsing.
fn render(
    parsed: ParsedGeodata,
    options: &ConvertOptions,
) -> Result<(Drawing, ConversionReport), ConvertError> {
    let ParsedGeodata {
        data,
        bounds,
        mut warnings,
    } = parsed;
    let mut report = ConversionReport::new(options.plan, options.style(), options.projection);
    report.nodes_parsed = data.nodes.len();
    report.ways_parsed = data.ways.len();
    report.relations_parsed = data.relations.len();
    info!(
        "parsed {} nodes, {} ways and {} relations",
        report.nodes_parsed, report.ways_parsed, report.relations_parsed
    );
    if let Some(bounds) = bounds {
        debug!(
            "geodetic bounds ({}, {}) to ({}, {})",
            bounds.min().x,
            bounds.min().y,
            bounds.max().x,
            bounds.max().y
        );
    }

    let projector = Projector::new(options.projection.prepare()?);
    let projected = projector.project_nodes(&data.nodes, &mut warnings);
    debug!("projected {} nodes into {}", projected.len(), options.projection);

    let features = options.classifier.classify_elements(&data);
    report.features_classified = features.len();

    let plan = options.plan_filter().apply(&features);
    report.features_retained = plan.retained.len();
    info!(
        "{} plan retains {} of {} classified features ({:?})",
        options.plan,
        report.features_retained,
        report.features_classified,
        report.style
    );

    let placements = GeometryBuilder::new(&data, &projected).build(&plan, &mut warnings);
    report.record_placements(&placements);
    log_warnings(&warnings);
    report.record_warnings(warnings);

    let drawing = Drawing::from_placements(options.plan, options.projection, &placements);
    Ok((drawing, report))
}

fn log_warnings(warnings: &[ConversionWarning]) {
    for warning in warnings {
        warn!("{warning}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osm2dxf_core::test_support::OsmDataBuilder;
    use osm2dxf_core::{Category, PlanType};
    use rstest::{fixture, rstest};

    const NEIGHBOURHOOD: &str = r#"<osm version="0.6">
  <node id="1" lat="52.5000" lon="13.4000"/>
  <node id="2" lat="52.5000" lon="13.4010"/>
  <node id="3" lat="52.5010" lon="13.4010"/>
  <node id="4" lat="52.5010" lon="13.4000"/>
  <node id="5" lat="52.5005" lon="13.4005">
    <tag k="amenity" v="cafe"/>
    <tag k="name" v="Kiosk"/>
  </node>
  <node id="6" lat="95.0" lon="13.4"/>
  <way id="10"><nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="4"/><nd ref="1"/>
    <tag k="building" v="yes"/></way>
  <way id="11"><nd ref="1"/><nd ref="2"/>
    <tag k="highway" v="residential"/><tag k="name" v="Mill Lane"/></way>
  <way id="12"><nd ref="2"/><nd ref="3"/><tag k="highway" v="motorway"/></way>
  <way id="13"><nd ref="3"/><nd ref="99"/><tag k="highway" v="primary"/></way>
</osm>"#;

    #[fixture]
    fn location() -> ConvertOptions {
        ConvertOptions::default()
    }

    fn convert(options: &ConvertOptions) -> (Vec<u8>, ConversionReport) {
        convert_bytes(NEIGHBOURHOOD.as_bytes(), InputFormat::Xml, options)
            .unwrap_or_else(|err| panic!("conversion failed: {err}"))
    }

    #[rstest]
    fn report_counts_every_stage(location: ConvertOptions) {
        let (_, report) = convert(&location);
        assert_eq!(report.nodes_parsed, 6);
        assert_eq!(report.ways_parsed, 3);
        assert_eq!(report.relations_parsed, 0);
        assert_eq!(report.ways_dropped, 1);
        assert_eq!(report.features_classified, 4);
        assert_eq!(report.features_retained, 4);
        assert_eq!(report.scale_denominator, 1000);
        assert_eq!(report.entities.polygons, 1);
        assert_eq!(report.entities.polylines, 2);
        assert_eq!(report.entities.points, 1);
        assert_eq!(report.entities.labels, 2);
        assert!(report.bounds.is_some());
        assert!(
            matches!(
                report.warnings.as_slice(),
                [
                    ConversionWarning::UnresolvedNode { way: 13, node: 99 },
                    ConversionWarning::Projection { node: 6, .. },
                ]
            ),
            "{:?}",
            report.warnings
        );
    }

    #[rstest]
    fn ways_through_out_of_range_nodes_are_unprojectable(location: ConvertOptions) {
        let xml = br#"<osm version="0.6">
  <node id="1" lat="52.5" lon="13.4"/>
  <node id="2" lat="95.0" lon="13.4"/>
  <way id="7"><nd ref="1"/><nd ref="2"/><tag k="highway" v="primary"/></way>
</osm>"#;
        let (_, report) =
            convert_bytes(xml, InputFormat::Xml, &location).expect("conversion succeeds");
        assert_eq!(report.nodes_parsed, 2);
        assert_eq!(report.ways_dropped, 1);
        assert!(
            matches!(
                report.warnings.as_slice(),
                [
                    ConversionWarning::Projection { node: 2, .. },
                    ConversionWarning::UnresolvableWay { way: 7, node: 2 },
                ]
            ),
            "{:?}",
            report.warnings
        );
    }

    #[rstest]
    fn render_counts_relations_and_their_rings(location: ConvertOptions) {
        let data = OsmDataBuilder::default()
            .node(1, 13.400, 52.500, &[])
            .node(2, 13.401, 52.500, &[])
            .node(3, 13.401, 52.501, &[])
            .node(4, 13.400, 52.501, &[])
            .way(10, &[1, 2, 3, 4, 1], &[])
            .way_relation(20, &[(10, "outer")], &[("type", "multipolygon"), ("natural", "water")])
            .build();
        let parsed = ParsedGeodata {
            data,
            bounds: None,
            warnings: Vec::new(),
        };
        let (_, report) = render(parsed, &location).expect("closed-form projection");
        assert_eq!(report.relations_parsed, 1);
        assert_eq!(report.ways_parsed, 1);
        assert_eq!(report.entities.polygons, 1);
        assert_eq!(report.ways_dropped, 0);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[rstest]
    fn layers_are_listed_in_emission_order(location: ConvertOptions) {
        let (_, report) = convert(&location);
        let categories: Vec<Category> = report.layers.iter().map(|layer| layer.category).collect();
        assert_eq!(
            categories,
            vec![
                Category::Amenity,
                Category::Building,
                Category::HighwayResidential,
                Category::HighwayMotorway,
            ]
        );
    }

    #[rstest]
    fn key_plan_reduces_and_monochromes(location: ConvertOptions) {
        let options = ConvertOptions {
            plan: PlanType::Key,
            ..location
        };
        let (dxf, report) = convert(&options);
        assert_eq!(report.scale_denominator, 2000);
        assert_eq!(report.entities.points, 0);
        assert_eq!(report.entities.labels, 1, "only the street name remains");
        assert!(report.layers.iter().all(|layer| layer.color.index() == 7));
        let text = String::from_utf8(dxf).expect("ASCII output");
        assert!(text.contains("osm2dxf plan=key scale=1:2000"));
    }

    #[rstest]
    fn output_is_deterministic(location: ConvertOptions) {
        let verbose = ConvertOptions {
            verbose: true,
            ..location.clone()
        };
        assert_eq!(convert(&location).0, convert(&location).0);
        assert_eq!(convert(&location).0, convert(&verbose).0);
    }

    #[rstest]
    fn parse_failures_name_the_backend(location: ConvertOptions) {
        let err = convert_bytes(b"<osm><node id=\"1\"", InputFormat::Xml, &location)
            .expect_err("truncated input");
        assert!(matches!(
            err,
            ConvertError::Parse {
                format: InputFormat::Xml,
                ..
            }
        ));
    }

    #[rstest]
    fn missing_input_is_not_a_file(location: ConvertOptions) {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = Utf8PathBuf::from_path_buf(dir.path().join("absent.osm")).expect("utf-8");
        let output = input.with_extension("dxf");
        let err = convert_file(&input, &output, &location).expect_err("missing input");
        assert!(matches!(err, ConvertError::NotAFile { .. }));
        assert!(!output.exists());
    }

    #[cfg(feature = "serde")]
    #[rstest]
    fn rules_files_replace_the_default_table() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("rules.json")).expect("utf-8");
        std::fs::write(
            &path,
            r#"{"rules": [{"match": {"has_key": {"key": "building"}}, "category": "LANDUSE", "color": 3, "lineweight": 26}]}"#,
        )
        .expect("write rules");
        let classifier = load_rules(&path).expect("rules load");
        assert_eq!(classifier.rules().len(), 1);

        let broken = path.with_file_name("broken.json");
        std::fs::write(&broken, "{").expect("write rules");
        assert!(matches!(load_rules(&broken), Err(ConvertError::Rules { .. })));
        assert!(matches!(
            load_rules(&path.with_file_name("absent.json")),
            Err(ConvertError::RulesFile { .. })
        ));
    }
}
