//! Index pipeline executor.
//!
//! Coordinates the three sequential stages (Scan → Extract → Write) with:
//! - Blocking filesystem work offloaded via `tokio::task::spawn_blocking`
//! - Semaphore-bounded parallel extraction of winning directories
//! - Structured logging via `tracing`
//! - Per-stage timing statistics in [`IndexStats`]
//!
//! Parallel extraction is an optimization only: the scan reduction is a
//! sequential fold and the writer re-sorts all records, so the output is
//! identical to a fully sequential run (metadata timestamp aside).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::extractor;
use crate::model::PackageRecord;
use crate::scanner::{self, ScanError};
use crate::writer::{self, WriteError};

/// Default label recorded as the data origin in output metadata.
pub const DEFAULT_SOURCE_LABEL: &str = "winget-manifests";

/// Statistics about one pipeline run.
#[derive(Debug, Default, Clone)]
pub struct IndexStats {
    /// Directories containing at least one manifest-like file
    pub manifest_directories: usize,

    /// Manifest-like files seen during the scan
    pub manifest_files: usize,

    /// Directories that yielded a valid version candidate
    pub candidates: usize,

    /// Directories skipped during scan or extraction
    pub skipped: usize,

    /// Records written to the output document
    pub records_written: usize,

    /// Time spent scanning (milliseconds)
    pub scan_duration_ms: u64,

    /// Time spent extracting records (milliseconds)
    pub extract_duration_ms: u64,

    /// Time spent writing the output (milliseconds)
    pub write_duration_ms: u64,

    /// Total wall-clock time (milliseconds)
    pub total_duration_ms: u64,
}

/// Errors that abort the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("Write failed: {0}")]
    Write(#[from] WriteError),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Concurrency limiter closed: {0}")]
    Concurrency(String),
}

/// One-shot batch pipeline over a manifest tree.
///
/// # Example
///
/// ```ignore
/// use manifest_indexer::pipeline::IndexPipeline;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let stats = IndexPipeline::new()
///         .execute(PathBuf::from("manifests"), PathBuf::from("index.json"))
///         .await?;
///     println!("wrote {} packages", stats.records_written);
///     Ok(())
/// }
/// ```
pub struct IndexPipeline {
    source_label: String,
    concurrency: usize,
}

impl Default for IndexPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexPipeline {
    /// Creates a pipeline with the default source label and an extraction
    /// concurrency of 8.
    pub fn new() -> Self {
        Self {
            source_label: DEFAULT_SOURCE_LABEL.to_string(),
            concurrency: 8,
        }
    }

    /// Overrides the source label recorded in output metadata.
    pub fn with_source_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = label.into();
        self
    }

    /// Sets the maximum number of directories extracted concurrently.
    /// Clamped to at least 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Runs the full pipeline: scan `root`, extract one record per winning
    /// directory, write the sorted index to `output`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the root cannot be traversed or the
    /// output cannot be written. Per-directory failures are logged and
    /// counted in [`IndexStats::skipped`], never fatal.
    pub async fn execute(
        &self,
        root: PathBuf,
        output: PathBuf,
    ) -> Result<IndexStats, PipelineError> {
        let start = Instant::now();
        let mut stats = IndexStats::default();

        // ====================================================================
        // Stage 1: Scan
        // ====================================================================

        info!(root = %root.display(), "Starting scan stage");
        let scan_start = Instant::now();

        let scan_root = root.clone();
        let outcome =
            tokio::task::spawn_blocking(move || scanner::scan_root(&scan_root)).await??;

        stats.manifest_directories = outcome.stats.manifest_directories;
        stats.manifest_files = outcome.stats.manifest_files;
        stats.candidates = outcome.stats.candidates;
        stats.skipped = outcome.stats.skipped;
        stats.scan_duration_ms = scan_start.elapsed().as_millis() as u64;

        info!(
            duration_ms = stats.scan_duration_ms,
            directories = stats.manifest_directories,
            files = stats.manifest_files,
            winners = outcome.result.len(),
            "Scan completed"
        );

        // ====================================================================
        // Stage 2: Extract
        // ====================================================================

        info!("Starting extraction stage");
        let extract_start = Instant::now();

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(outcome.result.len());

        for (identifier, best) in outcome.result.winners {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::Concurrency(e.to_string()))?;

            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let result = extractor::extract_package(&best.directory);
                (identifier, best.directory, result)
            }));
        }

        let mut records: Vec<PackageRecord> = Vec::with_capacity(handles.len());
        for handle in handles {
            let (identifier, directory, result) = handle.await?;
            match result {
                Ok(record) => records.push(record),
                Err(reason) => {
                    stats.skipped += 1;
                    warn!(
                        identifier = %identifier,
                        directory = %directory.display(),
                        "Skipping package: {reason}"
                    );
                }
            }
        }

        stats.records_written = records.len();
        stats.extract_duration_ms = extract_start.elapsed().as_millis() as u64;

        info!(
            duration_ms = stats.extract_duration_ms,
            records = stats.records_written,
            "Extraction completed"
        );

        // ====================================================================
        // Stage 3: Write
        // ====================================================================

        info!(output = %output.display(), "Starting write stage");
        let write_start = Instant::now();

        let document = writer::build_document(records, &self.source_label);
        let write_path = output.clone();
        tokio::task::spawn_blocking(move || writer::write_index(&write_path, &document))
            .await??;

        stats.write_duration_ms = write_start.elapsed().as_millis() as u64;
        stats.total_duration_ms = start.elapsed().as_millis() as u64;

        info!(
            duration_ms = stats.write_duration_ms,
            total_ms = stats.total_duration_ms,
            packages = stats.records_written,
            skipped = stats.skipped,
            "Index written"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::fs;
    use std::path::Path;

    fn write_package(
        root: &Path,
        id: &str,
        version: &str,
        locale: Option<(&str, &str)>,
    ) {
        let dir = root.join(id.replace('.', "/")).join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(format!("{id}.yaml")),
            format!("PackageIdentifier: {id}\nPackageVersion: \"{version}\"\n"),
        )
        .unwrap();
        if let Some((locale_tag, name)) = locale {
            fs::write(
                dir.join(format!("{id}.locale.{locale_tag}.yaml")),
                format!("PackageName: {name}\nPublisher: {name} Publisher\n"),
            )
            .unwrap();
        }
    }

    async fn run(root: &Path, output: &Path) -> IndexStats {
        IndexPipeline::new()
            .with_source_label("test-run")
            .execute(root.to_path_buf(), output.to_path_buf())
            .await
            .unwrap()
    }

    fn read_index(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn deduplicates_to_highest_version_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("manifests");
        write_package(&root, "Foo.Bar", "1.0.0", Some(("en-US", "Foo Bar Old")));
        write_package(&root, "Foo.Bar", "2.0.0", Some(("en-US", "Foo Bar New")));

        let output = tmp.path().join("index.json");
        let stats = run(&root, &output).await;
        assert_eq!(stats.records_written, 1);

        let index = read_index(&output);
        let packages = index["packages"].as_array().unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0]["id"], "Foo.Bar");
        assert_eq!(packages[0]["version"], "2.0.0");
        assert_eq!(packages[0]["name"], "Foo Bar New");
        assert_eq!(index["metadata"]["total"], 1);
        assert_eq!(index["metadata"]["source"], "test-run");
    }

    #[tokio::test]
    async fn packages_are_sorted_by_lowercased_identifier() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("manifests");
        write_package(&root, "Zeta.App", "1.0.0", None);
        write_package(&root, "alpha.tool", "1.0.0", None);

        let output = tmp.path().join("index.json");
        run(&root, &output).await;

        let index = read_index(&output);
        let ids: Vec<&str> = index["packages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, ["alpha.tool", "Zeta.App"]);
    }

    #[tokio::test]
    async fn repeated_runs_produce_identical_packages() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("manifests");
        write_package(&root, "Foo.Bar", "1.0.0", Some(("en-US", "Foo Bar")));
        write_package(&root, "Other.App", "3.1.4", None);
        write_package(&root, "Other.App", "not-a-version", None);

        let first = tmp.path().join("first.json");
        let second = tmp.path().join("second.json");
        run(&root, &first).await;
        run(&root, &second).await;

        let a = read_index(&first);
        let b = read_index(&second);
        assert_eq!(a["packages"], b["packages"]);
        // Invalid version never wins against a valid one.
        assert_eq!(a["packages"][1]["version"], "3.1.4");
    }

    #[tokio::test]
    async fn skipped_directories_do_not_abort_the_run() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("manifests");
        write_package(&root, "Good.App", "1.0.0", None);

        let broken = root.join("b/Broken/1.0.0");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("Broken.yaml"), "PackageVersion: \"1.0.0\"\n").unwrap();

        let output = tmp.path().join("index.json");
        let stats = run(&root, &output).await;
        assert_eq!(stats.records_written, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.manifest_directories, 2);

        let index = read_index(&output);
        assert_eq!(index["packages"].as_array().unwrap().len(), 1);
        assert_eq!(index["packages"][0]["id"], "Good.App");
    }

    #[tokio::test]
    async fn empty_tree_produces_empty_index() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("manifests");
        fs::create_dir_all(&root).unwrap();

        let output = tmp.path().join("index.json");
        let stats = run(&root, &output).await;
        assert_eq!(stats.records_written, 0);

        let index = read_index(&output);
        assert_eq!(index["packages"].as_array().unwrap().len(), 0);
        assert_eq!(index["metadata"]["total"], 0);
    }

    #[tokio::test]
    async fn missing_root_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let result = IndexPipeline::new()
            .execute(
                tmp.path().join("does-not-exist"),
                tmp.path().join("index.json"),
            )
            .await;
        assert!(matches!(result, Err(PipelineError::Scan(_))));
    }

    #[tokio::test]
    async fn unwritable_output_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("manifests");
        fs::create_dir_all(&root).unwrap();

        let result = IndexPipeline::new()
            .execute(root, tmp.path().join("no-such-dir/index.json"))
            .await;
        assert!(matches!(result, Err(PipelineError::Write(_))));
    }

    #[tokio::test]
    async fn stats_reconcile_with_directories_visited() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("manifests");
        write_package(&root, "One.App", "1.0.0", None);
        write_package(&root, "Two.App", "1.0.0", None);

        let no_id = root.join("n/NoId/1.0.0");
        fs::create_dir_all(&no_id).unwrap();
        fs::write(no_id.join("NoId.yaml"), "ShortDescription: nothing\n").unwrap();

        let output = tmp.path().join("index.json");
        let stats = run(&root, &output).await;
        assert_eq!(stats.manifest_directories, 3);
        assert_eq!(stats.candidates, 2);
        assert_eq!(stats.candidates + stats.skipped, stats.manifest_directories);
    }
}
