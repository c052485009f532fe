//! Convert command implementation.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use osm2dxf_core::{Classifier, ConvertOptions, Crs, InputFormat, PlanType};
use osm2dxf_data::{convert_file, load_rules};

use crate::report::write_report;
use crate::{ARG_INPUT, ARG_RULES, CliError, ConvertArgs, ENV_INPUT};

/// Resolved conversion settings after configuration layering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConvertConfig {
    pub(crate) input: Utf8PathBuf,
    pub(crate) output: Utf8PathBuf,
    pub(crate) plan: PlanType,
    pub(crate) colors: Option<bool>,
    pub(crate) projection: Crs,
    pub(crate) rules: Option<Utf8PathBuf>,
    pub(crate) format: Option<InputFormat>,
    pub(crate) json: bool,
    pub(crate) verbose: bool,
}

impl ConvertConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        Self::require_existing(&self.input, ARG_INPUT)?;
        if let Some(rules) = &self.rules {
            Self::require_existing(rules, ARG_RULES)?;
        }
        Ok(())
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match osm2dxf_fs::is_regular_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Conversion options, loading the rule file when one is configured.
    pub(crate) fn options(&self) -> Result<ConvertOptions, CliError> {
        let classifier = match &self.rules {
            Some(path) => load_rules(path)?,
            None => Classifier::default(),
        };
        Ok(ConvertOptions {
            plan: self.plan,
            colors: self.colors,
            projection: self.projection,
            verbose: self.verbose,
            classifier,
            input_format: self.format,
        })
    }
}

impl TryFrom<ConvertArgs> for ConvertConfig {
    type Error = CliError;

    fn try_from(args: ConvertArgs) -> Result<Self, Self::Error> {
        let args = args.with_colour_flags_folded();
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_INPUT,
            env: ENV_INPUT,
        })?;
        let output = args
            .output
            .unwrap_or_else(|| osm2dxf_fs::default_output_path(&input));

        Ok(Self {
            input,
            output,
            plan: args.plan.unwrap_or_default(),
            colors: args.colors,
            projection: args.projection.unwrap_or_default(),
            rules: args.rules,
            format: args.format,
            json: args.json,
            verbose: args.verbose,
        })
    }
}

pub(crate) fn run_convert_with(
    config: &ConvertConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let options = config.options()?;
    info!(
        "converting {} to {} as a {} plan",
        config.input, config.output, config.plan
    );
    let report = convert_file(&config.input, &config.output, &options)?;
    write_report(writer, &report, &config.output, config.json)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ConvertConfig, CliError> {
    use ortho_config::OrthoConfig;

    let merged = ConvertArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ConvertConfig::try_from(merged)
}
