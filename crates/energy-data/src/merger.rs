//! Combines per-source batches into one [`MergedDataset`].

use energy_core::error::Result;
use energy_core::models::{MergedDataset, SourceFile};
use serde::Serialize;
use tracing::{info, warn};

use crate::reader::{SourceBatch, SourceStatus};

/// How one declared source fared, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceOutcome {
    pub source: SourceFile,
    /// Readings the source contributed to the dataset.
    pub readings: usize,
    /// Readings dropped at merge time because their value was not finite.
    pub non_finite_dropped: usize,
    #[serde(flatten)]
    pub status: SourceStatus,
}

impl SourceOutcome {
    pub fn is_unavailable(&self) -> bool {
        matches!(self.status, SourceStatus::Unavailable { .. })
    }

    /// Rows dropped as malformed, by the parser or at merge time.
    pub fn malformed_rows(&self) -> usize {
        let parsed = match &self.status {
            SourceStatus::Loaded { stats } => stats.malformed,
            SourceStatus::Unavailable { .. } => 0,
        };
        parsed + self.non_finite_dropped
    }
}

/// Merged readings plus the per-source account of how they were obtained.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub dataset: MergedDataset,
    pub sources: Vec<SourceOutcome>,
}

impl IngestReport {
    /// Malformed rows dropped across all sources.
    pub fn malformed_rows(&self) -> usize {
        self.sources.iter().map(SourceOutcome::malformed_rows).sum()
    }

    pub fn unavailable_sources(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.sources.iter().filter(|o| o.is_unavailable())
    }
}

/// Concatenate batches into one dataset.
///
/// Batches are ordered by their source index first, so the result is the same
/// whatever order parsing finished in. No deduplication is performed.
/// Readings with a non-finite value are dropped and counted per source.
/// Returns [`EnergyError::NoDataIngested`](energy_core::EnergyError::NoDataIngested)
/// when no batch holds a reading.
pub fn merge(mut batches: Vec<SourceBatch>) -> Result<IngestReport> {
    batches.sort_by_key(|b| b.index);

    let sources_attempted = batches.len();
    let sources_unavailable = batches
        .iter()
        .filter(|b| matches!(b.status, SourceStatus::Unavailable { .. }))
        .count();

    let total: usize = batches.iter().map(|b| b.readings.len()).sum();
    let mut readings = Vec::with_capacity(total);
    let mut sources = Vec::with_capacity(batches.len());

    for batch in batches {
        let offered = batch.readings.len();
        let before = readings.len();
        readings.extend(batch.readings.into_iter().filter(|r| r.value.is_finite()));
        let kept = readings.len() - before;
        let non_finite_dropped = offered - kept;

        if non_finite_dropped > 0 {
            warn!(
                "Dropped {} non-finite reading(s) from {}",
                non_finite_dropped,
                batch.source.display_name()
            );
        }

        sources.push(SourceOutcome {
            source: batch.source,
            readings: kept,
            non_finite_dropped,
            status: batch.status,
        });
    }

    let dataset = MergedDataset::try_from_readings(readings, sources_attempted, sources_unavailable)?;

    info!(
        "Merged {} readings from {} source(s) ({} unavailable)",
        dataset.len(),
        sources_attempted,
        sources_unavailable
    );

    Ok(IngestReport { dataset, sources })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
