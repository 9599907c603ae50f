//! Directory scanner - first pipeline stage.
//!
//! Walks the manifest root once, extracts a [`VersionCandidate`] from every
//! directory holding a parseable version document, and folds the candidates
//! into an identifier → best-version mapping. The fold itself is a pure
//! function ([`reduce_candidates`]) so the reduction semantics are testable
//! without touching the filesystem.

use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::manifest::{self, ManifestError, ManifestKind};
use crate::model::{BestVersion, ScanResult, VersionCandidate};
use crate::version;

/// Errors that abort the scan. Per-directory problems are not errors; they
/// skip the directory and are counted in [`ScanStats`].
#[derive(Debug, Error)]
pub enum ScanError {
    /// Root path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Root path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The root itself could not be traversed
    #[error("Failed to traverse '{path}': {source}")]
    Traversal {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// Counters accumulated over one scan pass.
#[derive(Debug, Default, Clone)]
pub struct ScanStats {
    /// Directories containing at least one manifest-like file
    pub manifest_directories: usize,

    /// Manifest-like files seen across the whole tree
    pub manifest_files: usize,

    /// Directories that yielded a valid (identifier, version) candidate
    pub candidates: usize,

    /// Manifest directories skipped (no version document, parse failure,
    /// or missing identifier/version fields)
    pub skipped: usize,
}

/// Scan output: the reduced mapping plus pass statistics.
#[derive(Debug)]
pub struct ScanOutcome {
    pub result: ScanResult,
    pub stats: ScanStats,
}

/// Why a manifest directory contributed no candidate.
#[derive(Debug)]
enum CandidateSkip {
    NoVersionDocument,
    ParseFailed(ManifestError),
    MissingFields,
}

/// Walks `root` and produces the identifier → best-version mapping.
///
/// Every directory in the tree is visited exactly once. Directories without
/// manifest-like files are ignored; directories that cannot yield a valid
/// candidate are skipped (parse failures logged at `warn`) without aborting
/// the run.
///
/// # Errors
///
/// Returns [`ScanError`] only for fatal conditions: missing root, root that
/// is not a directory, or an unreadable root.
pub fn scan_root(root: &Path) -> Result<ScanOutcome, ScanError> {
    if !root.exists() {
        return Err(ScanError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let directories = collect_manifest_directories(root)?;

    let mut stats = ScanStats {
        manifest_directories: directories.len(),
        ..ScanStats::default()
    };
    let mut candidates = Vec::new();

    for (dir, files) in &directories {
        stats.manifest_files += files.len();
        match extract_candidate(dir, files) {
            Ok(candidate) => {
                stats.candidates += 1;
                candidates.push(candidate);
            }
            Err(CandidateSkip::ParseFailed(err)) => {
                stats.skipped += 1;
                warn!(directory = %dir.display(), "Skipping directory: {err}");
            }
            Err(reason) => {
                stats.skipped += 1;
                debug!(directory = %dir.display(), ?reason, "Skipping directory");
            }
        }
    }

    Ok(ScanOutcome {
        result: reduce_candidates(candidates),
        stats,
    })
}

/// Groups manifest-like files by parent directory. The map and the per-entry
/// file lists are ordered, so candidate extraction order is deterministic
/// regardless of the traversal order the platform produces.
fn collect_manifest_directories(
    root: &Path,
) -> Result<BTreeMap<PathBuf, Vec<PathBuf>>, ScanError> {
    let mut directories: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let failed = err.path().map(Path::to_path_buf);
                // An unreadable root is fatal; anything deeper is skipped.
                if failed.as_deref() == Some(root) || failed.is_none() {
                    return Err(ScanError::Traversal {
                        path: root.to_path_buf(),
                        source: err,
                    });
                }
                warn!("Unreadable entry during scan: {err}");
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_file() && manifest::is_manifest_file(path) {
            if let Some(parent) = path.parent() {
                directories
                    .entry(parent.to_path_buf())
                    .or_default()
                    .push(path.to_path_buf());
            }
        }
    }

    for files in directories.values_mut() {
        files.sort();
    }
    Ok(directories)
}

/// Extracts one candidate from a directory's manifest files: the first
/// version document (neither locale- nor installer-marked) supplies the
/// identifier and version. Both must be non-empty.
fn extract_candidate(dir: &Path, files: &[PathBuf]) -> Result<VersionCandidate, CandidateSkip> {
    let version_doc = files
        .iter()
        .find(|f| matches!(manifest::classify(f), Some(ManifestKind::Version)))
        .ok_or(CandidateSkip::NoVersionDocument)?;

    let raw = manifest::parse_manifest(version_doc).map_err(CandidateSkip::ParseFailed)?;

    match (raw.identifier(), raw.version()) {
        (Some(identifier), Some(version)) => Ok(VersionCandidate {
            identifier: identifier.to_string(),
            version,
            directory: dir.to_path_buf(),
        }),
        _ => Err(CandidateSkip::MissingFields),
    }
}

/// Folds candidates into the identifier → best-version mapping.
///
/// A candidate replaces the stored winner only when its version compares
/// strictly greater. On an exact version tie the lexicographically smaller
/// directory path wins, making the result independent of traversal order.
pub fn reduce_candidates<I>(candidates: I) -> ScanResult
where
    I: IntoIterator<Item = VersionCandidate>,
{
    let mut winners: BTreeMap<String, BestVersion> = BTreeMap::new();

    for candidate in candidates {
        let VersionCandidate {
            identifier,
            version,
            directory,
        } = candidate;

        match winners.entry(identifier) {
            Entry::Vacant(slot) => {
                slot.insert(BestVersion { version, directory });
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get();
                let replace = match version::compare(&version, &current.version) {
                    Ordering::Greater => true,
                    Ordering::Equal => directory < current.directory,
                    Ordering::Less => false,
                };
                if replace {
                    slot.insert(BestVersion { version, directory });
                }
            }
        }
    }

    ScanResult { winners }
}
