//! End-to-end tests driving the convert command against real files.

use super::helpers::{LANDUSE_RULES, Workspace};
use super::*;
use osm2dxf_data::ConvertError;
use rstest::rstest;
use std::fs;

fn config_for(args: ConvertArgs) -> ConvertConfig {
    let config = ConvertConfig::try_from(args).expect("config");
    config.validate_sources().expect("sources exist");
    config
}

fn run_to_string(config: &ConvertConfig) -> Result<String, CliError> {
    let mut out = Vec::new();
    run_convert_with(config, &mut out)?;
    Ok(String::from_utf8(out).expect("utf-8 report"))
}

#[rstest]
fn writes_the_drawing_next_to_the_input() {
    let workspace = Workspace::new();
    let input = workspace.block_map();
    let config = config_for(ConvertArgs {
        input: Some(input),
        ..ConvertArgs::default()
    });

    let report = run_to_string(&config).expect("conversion succeeds");

    let drawing = fs::read_to_string(workspace.root().join("block.dxf")).expect("drawing");
    assert!(drawing.starts_with("999\n"), "drawing should open with its comment");
    assert!(drawing.trim_end().ends_with("EOF"));
    assert!(report.contains(&format!("wrote {}", config.output)));
    assert!(report.contains("plan: location (1:1000, coloured) in EPSG:3857"));
    assert!(report.contains("1 ways dropped"));
    assert!(report.contains("layer BUILDING: colour 5"));
    assert!(report.contains("warnings: 1"));
}

#[rstest]
fn json_report_carries_the_output_path() {
    let workspace = Workspace::new();
    let input = workspace.block_map();
    let output = workspace.root().join("plans/key.dxf");
    let config = config_for(ConvertArgs {
        input: Some(input),
        output: Some(output.clone()),
        plan: Some(PlanType::Key),
        json: true,
        ..ConvertArgs::default()
    });

    let report = run_to_string(&config).expect("conversion succeeds");
    let value: serde_json::Value = serde_json::from_str(&report).expect("json report");

    assert_eq!(value["output"], output.as_str());
    assert_eq!(value["plan"], "key");
    assert_eq!(value["scale_denominator"], 2000);
    assert_eq!(value["ways_dropped"], 1);
    assert!(output.is_file());
}

#[rstest]
fn rules_file_replaces_the_builtin_table() {
    let workspace = Workspace::new();
    let input = workspace.block_map();
    let rules = workspace.write("rules.json", LANDUSE_RULES);
    let config = config_for(ConvertArgs {
        input: Some(input),
        rules: Some(rules),
        ..ConvertArgs::default()
    });

    let report = run_to_string(&config).expect("conversion succeeds");

    assert!(report.contains("layer LANDUSE: colour 3"));
    assert!(!report.contains("layer BUILDING"));
    assert!(!report.contains("HIGHWAY_RESIDENTIAL"));
}

#[rstest]
fn broken_rules_file_is_reported() {
    let workspace = Workspace::new();
    let input = workspace.block_map();
    let rules = workspace.write("rules.json", "{\"rules\": []}");
    let config = config_for(ConvertArgs {
        input: Some(input),
        rules: Some(rules.clone()),
        ..ConvertArgs::default()
    });

    match run_to_string(&config) {
        Err(CliError::Convert(ConvertError::Rules { path, .. })) => assert_eq!(path, rules),
        other => panic!("expected a rules error, found {other:?}"),
    }
}

#[rstest]
fn parse_failures_leave_no_drawing() {
    let workspace = Workspace::new();
    let input = workspace.write("broken.osm", "<osm>\n  <way id=\"1\">\n");
    let config = config_for(ConvertArgs {
        input: Some(input),
        ..ConvertArgs::default()
    });

    match run_to_string(&config) {
        Err(CliError::Convert(ConvertError::Parse { format, .. })) => {
            assert_eq!(format, InputFormat::Xml);
        }
        other => panic!("expected a parse error, found {other:?}"),
    }
    assert!(!config.output.exists());
}

#[rstest]
fn errors_render_with_their_context() {
    let err = CliError::MissingArgument {
        field: ARG_INPUT,
        env: ENV_INPUT,
    };
    assert_eq!(
        err.to_string(),
        "missing input (pass <input> or set OSM2DXF_INPUT)"
    );
}
