//! manifest-indexer - command-line entry point.
//!
//! Usage: `manifest-indexer <MANIFESTS_DIR> <OUTPUT>`
//!
//! Scans the manifest tree under `MANIFESTS_DIR` and writes the deduplicated
//! package index to `OUTPUT`. Exits 1 on bad arguments or any fatal I/O
//! failure; per-directory problems are logged and skipped.

use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use manifest_indexer::pipeline::{IndexPipeline, DEFAULT_SOURCE_LABEL};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "manifest-indexer")]
#[command(about = "Scan a winget manifest tree and export a deduplicated JSON index")]
#[command(version)]
struct Args {
    /// Root directory of the manifest tree
    manifests_dir: PathBuf,

    /// Output JSON file path
    output: PathBuf,

    /// Label recorded as the data origin in output metadata
    #[arg(long, default_value = DEFAULT_SOURCE_LABEL)]
    source_label: String,

    /// Maximum number of directories extracted concurrently
    #[arg(long, default_value_t = 8)]
    concurrency: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "manifest_indexer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Usage errors exit 1; --help and --version exit 0.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    info!(
        manifests_dir = %args.manifests_dir.display(),
        output = %args.output.display(),
        "Starting manifest index run"
    );

    let pipeline = IndexPipeline::new()
        .with_source_label(args.source_label)
        .with_concurrency(args.concurrency);

    match pipeline.execute(args.manifests_dir, args.output).await {
        Ok(stats) => {
            info!(
                packages = stats.records_written,
                skipped = stats.skipped,
                duration_ms = stats.total_duration_ms,
                "Index run finished"
            );
        }
        Err(err) => {
            eprintln!("manifest-indexer: {err}");
            std::process::exit(1);
        }
    }
}
