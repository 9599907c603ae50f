//! Package extractor - second pipeline stage.
//!
//! Given one winning directory, merges its version document with the
//! best-available locale document into a single [`PackageRecord`].
//!
//! Locale fallback precedence:
//! 1. the canonical `en-US` locale document, when present;
//! 2. otherwise any other locale document (best effort);
//! 3. otherwise locale-derived fields stay unset.
//!
//! Directories that cannot yield a record return an explicit [`SkipReason`]
//! value; the caller decides to log and continue. A locale document that
//! fails to parse is not a skip: it is reported and the record keeps its
//! version-document fields.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::manifest::{self, ManifestError, ManifestKind, RawManifest};
use crate::model::PackageRecord;

/// Why a directory produced no record. Not fatal to the run.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("directory '{0}' is unreadable: {1}")]
    Unreadable(PathBuf, std::io::Error),

    #[error("no version document in '{0}'")]
    NoVersionDocument(PathBuf),

    #[error("version document failed to parse: {0}")]
    VersionDocument(#[from] ManifestError),

    #[error("version document in '{0}' has no package identifier")]
    MissingIdentifier(PathBuf),
}

/// Extracts one [`PackageRecord`] from a directory of manifest files.
pub fn extract_package(dir: &Path) -> Result<PackageRecord, SkipReason> {
    let files = list_manifest_files(dir)?;

    let version_doc = files
        .iter()
        .find(|f| matches!(manifest::classify(f), Some(ManifestKind::Version)))
        .ok_or_else(|| SkipReason::NoVersionDocument(dir.to_path_buf()))?;

    let version = manifest::parse_manifest(version_doc)?;
    let identifier = version
        .identifier()
        .ok_or_else(|| SkipReason::MissingIdentifier(dir.to_path_buf()))?
        .to_string();

    let mut record = PackageRecord {
        id: identifier,
        name: None,
        description: None,
        publisher: None,
        version: version.version(),
        short_description: non_empty(version.short_description.clone()),
        tags: version.tags.clone().unwrap_or_default(),
        homepage: None,
        license: None,
    };

    if let Some(locale_doc) = select_locale_document(&files) {
        match manifest::parse_manifest(locale_doc) {
            Ok(locale) => merge_locale(&mut record, locale),
            Err(err) => {
                warn!(directory = %dir.display(), "Locale document ignored: {err}");
            }
        }
    }

    Ok(record)
}

/// Manifest-like files in `dir`, sorted for deterministic selection.
fn list_manifest_files(dir: &Path) -> Result<Vec<PathBuf>, SkipReason> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| SkipReason::Unreadable(dir.to_path_buf(), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SkipReason::Unreadable(dir.to_path_buf(), e))?;
        let path = entry.path();
        if path.is_file() && manifest::is_manifest_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Picks the locale document: `en-US` first, then any other locale file
/// (lexicographically first for determinism), else none.
fn select_locale_document(files: &[PathBuf]) -> Option<&PathBuf> {
    let mut fallback = None;
    for file in files {
        match manifest::classify(file) {
            Some(ManifestKind::Locale { en_us: true }) => return Some(file),
            Some(ManifestKind::Locale { en_us: false }) => {
                fallback.get_or_insert(file);
            }
            _ => {}
        }
    }
    fallback
}

/// Applies locale-document fields onto a record built from the version
/// document. Locale supplies the descriptive fields; tags only when the
/// version document did not already provide non-empty tags.
fn merge_locale(record: &mut PackageRecord, locale: RawManifest) {
    record.name = non_empty(locale.package_name);
    record.publisher = non_empty(locale.publisher);
    record.description =
        non_empty(locale.description).or_else(|| non_empty(locale.short_description));
    record.homepage = non_empty(locale.package_url);
    record.license = non_empty(locale.license);
    if record.tags.is_empty() {
        if let Some(tags) = locale.tags {
            record.tags = tags;
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
