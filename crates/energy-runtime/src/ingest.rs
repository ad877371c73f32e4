//! Bounded concurrent ingestion.
//!
//! Each source is parsed on tokio's blocking pool; a [`Semaphore`] caps how
//! many files are open at once. Batches carry their source index, so the
//! merged dataset is the same as the sequential path's no matter which file
//! finishes first.

use std::sync::Arc;

use energy_core::config::PipelineConfig;
use energy_core::error::Result;
use energy_core::models::SourceFile;
use energy_data::merger::{merge, IngestReport};
use energy_data::reader::{parse_source, SourceBatch};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

// ── ParallelIngestor ──────────────────────────────────────────────────────────

/// Parses sources concurrently and merges the results.
///
/// # Example
/// ```no_run
/// use energy_core::config::PipelineConfig;
/// use energy_data::reader::discover_sources;
/// use energy_runtime::ingest::ParallelIngestor;
///
/// # async fn run() -> energy_core::Result<()> {
/// let config = PipelineConfig::with_data_dir("data");
/// let report = ParallelIngestor::new(config.clone())
///     .ingest(discover_sources(&config))
///     .await?;
/// println!("{} readings", report.dataset.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ParallelIngestor {
    config: Arc<PipelineConfig>,
    permits: Arc<Semaphore>,
}

impl ParallelIngestor {
    /// Create an ingestor allowing `config.max_concurrency` parses at once.
    pub fn new(config: PipelineConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        Self {
            config: Arc::new(config),
            permits,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Parse every source and return the batches in source order.
    ///
    /// A task that panics is logged and its source is reported unavailable.
    pub async fn parse_all(&self, sources: Vec<SourceFile>) -> Vec<SourceBatch> {
        let mut tasks = JoinSet::new();
        let mut pending: Vec<Option<SourceFile>> = Vec::with_capacity(sources.len());

        for (index, source) in sources.into_iter().enumerate() {
            pending.push(Some(source.clone()));
            let permits = Arc::clone(&self.permits);
            let config = Arc::clone(&self.config);

            tasks.spawn(async move {
                // The semaphore is never closed.
                let _permit = permits.acquire_owned().await.ok();
                let outcome =
                    tokio::task::spawn_blocking(move || parse_source(index, &source, &config)).await;
                (index, outcome)
            });
        }

        let mut batches = Vec::with_capacity(pending.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(batch))) => {
                    pending[batch.index] = None;
                    batches.push(batch);
                }
                Ok((index, Err(e))) => {
                    if let Some(source) = pending[index].take() {
                        tracing::warn!(
                            source = %source.display_name(),
                            error = %e,
                            "parse task failed; marking source unavailable"
                        );
                        batches.push(SourceBatch::unavailable(
                            index,
                            source,
                            format!("parse task failed: {e}"),
                        ));
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "ingest task failed");
                }
            }
        }

        // Anything still pending lost its outer task as well.
        for (index, source) in pending.into_iter().enumerate() {
            if let Some(source) = source {
                batches.push(SourceBatch::unavailable(index, source, "ingest task failed"));
            }
        }

        batches.sort_by_key(|b| b.index);
        tracing::debug!(sources = batches.len(), "parallel parse finished");
        batches
    }

    /// Parse every source concurrently and merge them.
    pub async fn ingest(&self, sources: Vec<SourceFile>) -> Result<IngestReport> {
        merge(self.parse_all(sources).await)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
