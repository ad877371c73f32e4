//! Async runtime layer for the energy dashboard.
//!
//! Runs source parsing on tokio's blocking pool with bounded concurrency and
//! feeds the merged result through the same aggregation as the sequential
//! pipeline.

pub mod ingest;

pub use energy_core as core;
pub use energy_data as data;

use energy_core::config::PipelineConfig;
use energy_core::error::Result;
use energy_data::analysis::{build_report, PipelineReport};
use energy_data::reader::discover_sources;

use crate::ingest::ParallelIngestor;

/// Run the full pipeline with concurrent parsing.
///
/// Produces the same report as [`energy_data::analysis::run_pipeline`]; only
/// the parse stage differs.
pub async fn run_pipeline_concurrent(config: &PipelineConfig) -> Result<PipelineReport> {
    config.validate()?;

    let sources = discover_sources(config);
    tracing::info!(
        sources = sources.len(),
        data_dir = %config.data_dir.display(),
        max_concurrency = config.max_concurrency,
        "starting concurrent ingestion"
    );

    let ingest = ParallelIngestor::new(config.clone()).ingest(sources).await?;
    Ok(build_report(ingest))
}
