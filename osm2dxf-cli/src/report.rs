//! Conversion report rendering.

use std::fmt::Write as _;
use std::io::Write;

use camino::Utf8Path;
use osm2dxf_core::{ConversionReport, StyleMode};
use serde::Serialize;

use crate::CliError;

#[derive(Serialize)]
struct ReportEnvelope<'a> {
    output: &'a Utf8Path,
    #[serde(flatten)]
    report: &'a ConversionReport,
}

pub(crate) fn write_report(
    writer: &mut dyn Write,
    report: &ConversionReport,
    output: &Utf8Path,
    json: bool,
) -> Result<(), CliError> {
    let payload = if json {
        serde_json::to_string_pretty(&ReportEnvelope { output, report })
            .map_err(CliError::SerializeReport)?
    } else {
        render_text(report, output)
    };
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteReport)?;
    writer.write_all(b"\n").map_err(CliError::WriteReport)?;
    Ok(())
}

fn style_name(style: StyleMode) -> &'static str {
    match style {
        StyleMode::Colored => "coloured",
        StyleMode::Monochrome => "monochrome",
    }
}

/// Human-readable summary, one fact per line.
pub(crate) fn render_text(report: &ConversionReport, output: &Utf8Path) -> String {
    let mut text = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(text, "wrote {output}");
    let _ = writeln!(
        text,
        "plan: {} (1:{}, {}) in {}",
        report.plan,
        report.scale_denominator,
        style_name(report.style),
        report.crs
    );
    let _ = writeln!(
        text,
        "parsed: {} nodes, {} ways, {} relations; {} ways dropped",
        report.nodes_parsed, report.ways_parsed, report.relations_parsed, report.ways_dropped
    );
    let _ = writeln!(
        text,
        "features: {} classified, {} retained",
        report.features_classified, report.features_retained
    );
    let counts = &report.entities;
    let _ = writeln!(
        text,
        "entities: {} polylines, {} polygons, {} points, {} labels",
        counts.polylines, counts.polygons, counts.points, counts.labels
    );
    for layer in &report.layers {
        let weight = layer.lineweight.hundredths_mm();
        let _ = writeln!(
            text,
            "layer {}: colour {}, lineweight {}.{:02} mm, {} features, {} entities",
            layer.name,
            layer.color.index(),
            weight / 100,
            weight % 100,
            layer.features,
            layer.entities
        );
    }
    let _ = write!(text, "warnings: {}", report.warnings.len());
    for warning in &report.warnings {
        let _ = write!(text, "\n  {warning}");
    }
    text
}
