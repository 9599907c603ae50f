//! Index writer - final pipeline stage.
//!
//! Sorts the collected records deterministically, attaches run metadata,
//! and serializes the whole document as pretty-printed JSON in one write.

use chrono::Utc;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::{IndexMetadata, OutputDocument, PackageRecord};

/// Errors while producing the output file. Always fatal to the run.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize index: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Sorts records ascending by lower-cased identifier. Empty identifiers
/// sort first. Stable, so equal keys keep their relative order.
pub fn sort_records(records: &mut [PackageRecord]) {
    records.sort_by(|a, b| a.id.to_lowercase().cmp(&b.id.to_lowercase()));
}

/// Assembles the output document: sorted packages plus metadata stamped
/// with the current UTC time.
pub fn build_document(mut records: Vec<PackageRecord>, source: &str) -> OutputDocument {
    sort_records(&mut records);
    let metadata = IndexMetadata {
        total: records.len(),
        extracted_at: Utc::now(),
        source: source.to_string(),
    };
    OutputDocument {
        packages: records,
        metadata,
    }
}

/// Serializes the document to `path` as pretty-printed JSON.
pub fn write_index(path: &Path, document: &OutputDocument) -> Result<(), WriteError> {
    let io_err = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, document)?;
    writer.write_all(b"\n").map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}
