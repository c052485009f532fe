//! Drawing emitter: document model, group-code writer and file output.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

mod document;
mod emit;
mod writer;

pub use document::{Drawing, DrawingHeader, Entity, Layer, PAPER_TEXT_HEIGHT_MM};
pub use emit::write_drawing;
pub use writer::{escape_text, format_real};

/// Errors raised while producing drawing output.
#[derive(Debug, Error)]
pub enum EmitError {
    /// Serialising into memory failed.
    #[error("failed to serialise the drawing")]
    Serialize {
        /// Writer failure.
        #[source]
        source: io::Error,
    },
    /// Creating, writing, syncing or renaming the output file failed.
    #[error("failed to write drawing to {path}")]
    Write {
        /// Destination path.
        path: Utf8PathBuf,
        /// Filesystem failure.
        #[source]
        source: io::Error,
    },
}

/// Serialise a drawing into memory.
pub fn to_dxf_bytes(drawing: &Drawing) -> Result<Vec<u8>, EmitError> {
    let mut bytes = Vec::new();
    write_drawing(drawing, &mut bytes).map_err(|source| EmitError::Serialize { source })?;
    Ok(bytes)
}

/// Write a drawing to `path` atomically.
///
/// The drawing is written to a temporary file next to `path` and renamed
/// over it once complete; on failure `path` is left as it was.
pub fn write_dxf_file(drawing: &Drawing, path: &Utf8Path) -> Result<(), EmitError> {
    osm2dxf_fs::write_atomic(path, |out| write_drawing(drawing, out)).map_err(|source| {
        EmitError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}
