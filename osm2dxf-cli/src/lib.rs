//! Command-line interface for the osm2dxf converter.
#![forbid(unsafe_code)]

use std::io;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use osm2dxf_core::{Crs, InputFormat, PlanType};
use serde::{Deserialize, Serialize};
use structured_logger::{Builder, json::new_writer};

mod convert;
mod error;
mod report;

pub use error::CliError;

use convert::{ConvertConfig, run_convert_with};

pub(crate) const ARG_INPUT: &str = "input";
pub(crate) const ARG_OUTPUT: &str = "output";
pub(crate) const ARG_PROJECTION: &str = "projection";
pub(crate) const ARG_PLAN: &str = "plan";
pub(crate) const ARG_COLORS: &str = "colors";
pub(crate) const ARG_NO_COLORS: &str = "no-colors";
pub(crate) const ARG_RULES: &str = "rules";
pub(crate) const ARG_FORMAT: &str = "format";
pub(crate) const ENV_INPUT: &str = "OSM2DXF_INPUT";

/// Run the converter with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let args = ConvertArgs::try_parse().map_err(CliError::ArgumentParsing)?;
    let config = resolve_convert_config(args)?;
    init_logging(config.verbose)?;
    let mut stdout = io::stdout().lock();
    run_convert_with(&config, &mut stdout)
}

fn resolve_convert_config(args: ConvertArgs) -> Result<ConvertConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

/// Install the JSON-lines logger on stderr. Stdout carries the report.
fn init_logging(verbose: bool) -> Result<(), CliError> {
    let level = if verbose { "debug" } else { "info" };
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stderr()))
        .try_init()
        .map_err(CliError::Logging)
}

fn is_false(flag: &bool) -> bool {
    !flag
}

/// Arguments accepted by the `osm2dxf` binary.
///
/// Unset CLI values fall back to `OSM2DXF_*` environment variables and then
/// to configuration files.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "osm2dxf",
    about = "Convert OpenStreetMap data into an AutoCAD DXF site plan",
    long_about = "Convert an OpenStreetMap XML or PBF extract into an ASCII \
                  DXF drawing laid out as a Key Plan (1:2000) or a Location \
                  Plan (1:1000). Settings can come from CLI flags, \
                  configuration files, or environment variables.",
    version
)]
#[ortho_config(prefix = "OSM2DXF")]
pub(crate) struct ConvertArgs {
    /// OSM XML (`.osm`, `.xml`) or PBF (`.osm.pbf`) input file.
    #[arg(value_name = "input")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Destination drawing; defaults to the input path with a `.dxf` extension.
    #[arg(short = 'o', long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Target coordinate reference system, for example `EPSG:32633`.
    #[arg(short = 'p', long = ARG_PROJECTION, value_name = "EPSG:code")]
    #[serde(default)]
    pub(crate) projection: Option<Crs>,
    /// Plan profile: `key` or `location`.
    #[arg(long = ARG_PLAN, value_name = "key|location")]
    #[serde(default)]
    pub(crate) plan: Option<PlanType>,
    /// Colour preference as layered from files, environment and flags.
    #[arg(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) colors: Option<bool>,
    /// Keep rule colours regardless of the plan default.
    #[arg(long = ARG_COLORS, conflicts_with = "no_colors")]
    #[serde(skip)]
    pub(crate) colors_flag: bool,
    /// Draw every layer in colour 7 regardless of the plan default.
    #[arg(long = ARG_NO_COLORS)]
    #[serde(skip)]
    pub(crate) no_colors: bool,
    /// JSON file replacing the built-in classification rules.
    #[arg(long = ARG_RULES, value_name = "path")]
    #[serde(default)]
    pub(crate) rules: Option<Utf8PathBuf>,
    /// Input format, overriding detection from the file extension.
    #[arg(long = ARG_FORMAT, value_name = "xml|pbf")]
    #[serde(default)]
    pub(crate) format: Option<InputFormat>,
    /// Print the conversion report as JSON.
    #[arg(long = "json")]
    #[serde(default, skip_serializing_if = "is_false")]
    pub(crate) json: bool,
    /// Log per-element diagnostics.
    #[arg(short = 'v', long = "verbose")]
    #[serde(default, skip_serializing_if = "is_false")]
    pub(crate) verbose: bool,
}

impl ConvertArgs {
    fn into_config(self) -> Result<ConvertConfig, CliError> {
        let merged = self
            .with_colour_flags_folded()
            .load_and_merge()
            .map_err(CliError::Configuration)?;
        ConvertConfig::try_from(merged)
    }

    /// Fold `--colors`/`--no-colors` into the layered `colors` value so the
    /// command line overrides files and environment.
    pub(crate) fn with_colour_flags_folded(mut self) -> Self {
        if self.colors_flag {
            self.colors = Some(true);
        } else if self.no_colors {
            self.colors = Some(false);
        }
        self.colors_flag = false;
        self.no_colors = false;
        self
    }
}

#[cfg(test)]
mod tests;
