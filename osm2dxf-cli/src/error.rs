//! Error type emitted by the osm2dxf CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use osm2dxf_data::ConvertError;
use thiserror::Error;

/// Errors emitted by the osm2dxf CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (pass <{field}> or set {env})")]
    MissingArgument {
        /// Argument name.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// A referenced input path does not exist on disk or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        /// Argument the path came from.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Argument the path came from.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Filesystem failure.
        #[source]
        source: std::io::Error,
    },
    /// The conversion itself failed.
    #[error(transparent)]
    Convert(#[from] ConvertError),
    /// Installing the logger failed.
    #[error("failed to install logger: {0}")]
    Logging(#[source] log::SetLoggerError),
    /// Serializing the JSON report failed.
    #[error("failed to serialize conversion report: {0}")]
    SerializeReport(#[source] serde_json::Error),
    /// Writing the report failed.
    #[error("failed to write conversion report: {0}")]
    WriteReport(#[source] std::io::Error),
}
