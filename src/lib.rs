//! Manifest-indexer - scans a winget-style manifest tree, keeps the highest
//! version per package identifier, and exports one deduplicated JSON index.
//!
//! Pipeline stages: [`scanner`] → [`extractor`] → [`writer`], coordinated by
//! [`pipeline::IndexPipeline`].

pub mod extractor;
pub mod manifest;
pub mod model;
pub mod pipeline;
pub mod scanner;
pub mod version;
pub mod writer;

// Re-export common types for convenience
pub use model::{
    BestVersion, IndexMetadata, OutputDocument, PackageRecord, ScanResult, VersionCandidate,
};
pub use pipeline::{IndexPipeline, IndexStats, PipelineError, DEFAULT_SOURCE_LABEL};
