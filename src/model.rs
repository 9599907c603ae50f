use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One normalized, de-duplicated package as it appears in the output index.
///
/// Exactly one record exists per unique identifier. Fields come from the
/// directory's version document, complemented by the best-available locale
/// document (see `extractor`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageRecord {
    /// Package identifier, e.g. `"Mozilla.Firefox"`. Dedup and sort key.
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub version: Option<String>,
    #[serde(rename = "shortDescription")]
    pub short_description: Option<String>,
    pub tags: Vec<String>,
    pub homepage: Option<String>,
    pub license: Option<String>,
}

/// (identifier, version, directory) extracted from one directory's version
/// document during the scan pass. Identifier and version are both non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCandidate {
    pub identifier: String,
    pub version: String,
    pub directory: PathBuf,
}

/// Winning (version, directory) pair for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestVersion {
    pub version: String,
    pub directory: PathBuf,
}

/// Identifier → best-version mapping produced by folding candidates.
/// Superseded entries are discarded, never retained.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub winners: BTreeMap<String, BestVersion>,
}

impl ScanResult {
    pub fn len(&self) -> usize {
        self.winners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }
}

/// Run metadata attached to the output document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Number of records in `packages`.
    pub total: usize,

    /// Extraction time. Serializes as an RFC 3339 / ISO-8601 UTC string via
    /// chrono's serde support.
    pub extracted_at: DateTime<Utc>,

    /// Label identifying the data origin.
    pub source: String,
}

/// The single serialized output: sorted records plus run metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDocument {
    pub packages: Vec<PackageRecord>,
    pub metadata: IndexMetadata,
}
