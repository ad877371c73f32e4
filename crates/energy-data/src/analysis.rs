//! End-to-end analysis pipeline.
//!
//! Discovers sources, parses and merges them, then runs every aggregation and
//! builds the building registry, returning a [`PipelineReport`] ready for the
//! dashboard layer.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Timelike, Utc};
use energy_core::building::BuildingManager;
use energy_core::config::PipelineConfig;
use energy_core::error::Result;
use energy_core::models::{
    sort_canonical, Bucket, BuildingSummary, HourlyPeak, MergedDataset, SeriesStats, SourceFile,
};
use energy_core::time_utils::Timestamp;
use serde::Serialize;
use tracing::info;

use crate::aggregator::{Aggregator, WeeklyAverage};
use crate::merger::{merge, IngestReport, SourceOutcome};
use crate::reader::{discover_sources, parse_source};

// ── Public types ──────────────────────────────────────────────────────────────

/// Direction of consumption over the monitored period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    DecreasingOrStable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increasing => write!(f, "increasing"),
            Self::DecreasingOrStable => write!(f, "decreasing or stable"),
        }
    }
}

/// Campus-wide headline figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveSummary {
    /// Sum of every building's total.
    pub total_consumption: f64,
    /// Building with the largest total; ties go to the first name.
    pub highest_consumer: String,
    pub highest_consumer_total: f64,
    /// Hour of day (0-23) with the highest mean reading across all buildings.
    pub peak_load_hour: u32,
    pub trend: Trend,
}

impl ExecutiveSummary {
    /// Derive the headline figures from a dataset and its building summary.
    ///
    /// `summaries` must be the output of [`Aggregator::building_summary`] for
    /// the same dataset, so it is never empty.
    pub fn from_parts(dataset: &MergedDataset, summaries: &[BuildingSummary]) -> Self {
        let total_consumption: f64 = summaries.iter().map(|s| s.total).sum();

        let (highest_consumer, highest_consumer_total) = summaries
            .iter()
            .fold(None::<&BuildingSummary>, |best, s| match best {
                Some(b) if b.total >= s.total => Some(b),
                _ => Some(s),
            })
            .map(|s| (s.building.clone(), s.total))
            .unwrap_or_default();

        Self {
            total_consumption,
            highest_consumer,
            highest_consumer_total,
            peak_load_hour: peak_load_hour(dataset),
            trend: trend(dataset),
        }
    }
}

/// Metadata produced alongside the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// RFC 3339 timestamp when this report was generated.
    pub generated_at: String,
    pub sources_attempted: usize,
    pub sources_unavailable: usize,
    pub malformed_rows: usize,
    pub readings: usize,
    pub buildings: usize,
    /// Earliest and latest reading timestamp.
    pub first_reading: Timestamp,
    pub last_reading: Timestamp,
}

/// The complete output of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub metadata: ReportMetadata,
    pub sources: Vec<SourceOutcome>,
    pub daily: Vec<Bucket>,
    pub weekly: Vec<Bucket>,
    pub hourly_peaks: Vec<HourlyPeak>,
    pub summaries: Vec<BuildingSummary>,
    pub weekly_averages: Vec<WeeklyAverage>,
    pub executive: ExecutiveSummary,
    #[serde(skip)]
    pub dataset: MergedDataset,
    #[serde(skip)]
    pub manager: BuildingManager,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Parse the given sources one after another and merge them.
pub fn ingest_sources(sources: &[SourceFile], config: &PipelineConfig) -> Result<IngestReport> {
    let batches = sources
        .iter()
        .enumerate()
        .map(|(index, source)| parse_source(index, source, config))
        .collect();
    merge(batches)
}

/// Run every aggregation over an ingested dataset.
///
/// The aggregation engine and the building registry both read the same merged
/// dataset; neither depends on the other.
pub fn build_report(ingest: IngestReport) -> PipelineReport {
    let IngestReport { dataset, sources } = ingest;

    let aggregator = Aggregator::new(&dataset);
    let daily = aggregator.daily_totals();
    let weekly = aggregator.weekly_totals();
    let hourly_peaks = aggregator.hourly_peaks();
    let summaries = aggregator.building_summary();
    let weekly_averages = aggregator.average_weekly_usage();

    let manager = BuildingManager::from_dataset(&dataset);
    let executive = ExecutiveSummary::from_parts(&dataset, &summaries);

    let (first_reading, last_reading) = dataset.time_span();
    let metadata = ReportMetadata {
        generated_at: Utc::now().to_rfc3339(),
        sources_attempted: sources.len(),
        sources_unavailable: sources.iter().filter(|s| s.is_unavailable()).count(),
        malformed_rows: sources.iter().map(SourceOutcome::malformed_rows).sum(),
        readings: dataset.len(),
        buildings: manager.len(),
        first_reading,
        last_reading,
    };

    info!(
        "Aggregated {} daily, {} weekly and {} hourly buckets for {} building(s)",
        daily.len(),
        weekly.len(),
        hourly_peaks.len(),
        summaries.len()
    );

    PipelineReport {
        metadata,
        sources,
        daily,
        weekly,
        hourly_peaks,
        summaries,
        weekly_averages,
        executive,
        dataset,
        manager,
    }
}

/// Run the full pipeline sequentially.
///
/// 1. Validate `config`.
/// 2. Discover sources under `config.data_dir`.
/// 3. Parse and merge them.
/// 4. Aggregate and build the report.
///
/// Returns [`EnergyError::NoDataIngested`](energy_core::EnergyError::NoDataIngested)
/// when nothing usable was read; no aggregation runs in that case.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineReport> {
    config.validate()?;

    let sources = discover_sources(config);
    info!(
        "Discovered {} source(s) in {}",
        sources.len(),
        config.data_dir.display()
    );

    let ingest = ingest_sources(&sources, config)?;
    Ok(build_report(ingest))
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Hour of day with the highest mean reading; earliest hour wins ties.
fn peak_load_hour(dataset: &MergedDataset) -> u32 {
    let mut by_hour: BTreeMap<u32, Vec<(Timestamp, f64)>> = BTreeMap::new();
    for r in dataset {
        by_hour
            .entry(r.timestamp.hour())
            .or_default()
            .push((r.timestamp, r.value));
    }

    let mut best: Option<(u32, f64)> = None;
    for (hour, mut points) in by_hour {
        let Some(stats) = SeriesStats::from_points(&mut points) else {
            continue;
        };
        match best {
            Some((_, mean)) if mean >= stats.mean => {}
            _ => best = Some((hour, stats.mean)),
        }
    }
    best.map(|(hour, _)| hour).unwrap_or(0)
}

/// Compare the later half of the readings, in time order, with the earlier
/// half. An odd middle reading counts towards the later half.
fn trend(dataset: &MergedDataset) -> Trend {
    let mut points: Vec<(Timestamp, f64)> =
        dataset.iter().map(|r| (r.timestamp, r.value)).collect();
    sort_canonical(&mut points);

    let (first, second) = points.split_at(points.len() / 2);
    let first_sum: f64 = first.iter().map(|&(_, v)| v).sum();
    let second_sum: f64 = second.iter().map(|&(_, v)| v).sum();

    if second_sum > first_sum {
        Trend::Increasing
    } else {
        Trend::DecreasingOrStable
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use energy_core::error::EnergyError;
    use energy_core::models::ValidatedReading;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_csv(dir: &Path, name: &str, lines: &[&str]) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
    }

    fn dataset(rows: &[(&str, &str, f64)]) -> MergedDataset {
        let readings = rows
            .iter()
            .map(|(b, t, v)| ValidatedReading {
                building: b.to_string(),
                timestamp: NaiveDateTime::parse_from_str(t, "%Y-%m-%d %H:%M").unwrap(),
                value: *v,
                period: None,
            })
            .collect();
        MergedDataset::try_from_readings(readings, 1, 0).unwrap()
    }

    // ── ExecutiveSummary ──────────────────────────────────────────────────────

    #[test]
    fn test_executive_summary_worked_example() {
        let ds = dataset(&[
            ("A", "2024-01-15 09:00", 10.0),
            ("A", "2024-01-15 09:30", 5.0),
            ("B", "2024-01-15 09:15", 7.0),
        ]);
        let summaries = Aggregator::new(&ds).building_summary();
        let exec = ExecutiveSummary::from_parts(&ds, &summaries);
        assert_eq!(exec.total_consumption, 22.0);
        assert_eq!(exec.highest_consumer, "A");
        assert_eq!(exec.highest_consumer_total, 15.0);
        assert_eq!(exec.peak_load_hour, 9);
    }

    #[test]
    fn test_highest_consumer_tie_goes_to_first_name() {
        let ds = dataset(&[
            ("Beta", "2024-01-15 09:00", 5.0),
            ("Alpha", "2024-01-15 10:00", 5.0),
        ]);
        let summaries = Aggregator::new(&ds).building_summary();
        let exec = ExecutiveSummary::from_parts(&ds, &summaries);
        assert_eq!(exec.highest_consumer, "Alpha");
    }

    #[test]
    fn test_peak_load_hour_uses_mean_and_earliest_tie() {
        let ds = dataset(&[
            // Hour 8 sums highest but its mean is 3.
            ("A", "2024-01-15 08:00", 3.0),
            ("A", "2024-01-15 08:30", 3.0),
            ("A", "2024-01-16 08:00", 3.0),
            ("A", "2024-01-15 13:00", 4.0),
            ("A", "2024-01-15 17:00", 4.0),
        ]);
        assert_eq!(peak_load_hour(&ds), 13);
    }

    #[test]
    fn test_trend_increasing() {
        let ds = dataset(&[
            ("A", "2024-01-15 09:00", 1.0),
            ("A", "2024-01-16 09:00", 2.0),
            ("A", "2024-01-17 09:00", 5.0),
            ("A", "2024-01-18 09:00", 6.0),
        ]);
        assert_eq!(trend(&ds), Trend::Increasing);
    }

    #[test]
    fn test_trend_uses_time_order_not_insertion_order() {
        let ds = dataset(&[
            ("A", "2024-01-18 09:00", 1.0),
            ("A", "2024-01-17 09:00", 1.0),
            ("A", "2024-01-16 09:00", 6.0),
            ("A", "2024-01-15 09:00", 6.0),
        ]);
        assert_eq!(trend(&ds), Trend::DecreasingOrStable);
    }

    #[test]
    fn test_trend_single_and_odd_length_middle_goes_to_later_half() {
        // One reading: the earlier half is empty and sums to zero.
        let single = dataset(&[("A", "2024-01-15 09:00", 1.5)]);
        assert_eq!(trend(&single), Trend::Increasing);

        // Three readings split 1 | 2, so the middle 2.0 joins the later half.
        let odd = dataset(&[
            ("A", "2024-01-15 09:00", 3.0),
            ("A", "2024-01-16 09:00", 2.0),
            ("A", "2024-01-17 09:00", 1.5),
        ]);
        assert_eq!(trend(&odd), Trend::Increasing);

        let odd_falling = dataset(&[
            ("A", "2024-01-15 09:00", 4.0),
            ("A", "2024-01-16 09:00", 2.0),
            ("A", "2024-01-17 09:00", 1.5),
        ]);
        assert_eq!(trend(&odd_falling), Trend::DecreasingOrStable);
    }

    #[test]
    fn test_trend_flat_is_decreasing_or_stable() {
        let ds = dataset(&[
            ("A", "2024-01-15 09:00", 2.0),
            ("A", "2024-01-16 09:00", 2.0),
        ]);
        assert_eq!(trend(&ds), Trend::DecreasingOrStable);
        assert_eq!(Trend::DecreasingOrStable.to_string(), "decreasing or stable");
    }

    // ── run_pipeline ──────────────────────────────────────────────────────────

    #[test]
    fn test_run_pipeline_end_to_end() {
        let tmp = TempDir::new().unwrap();
        write_csv(
            tmp.path(),
            "library_jan.csv",
            &["timestamp,kwh", "2024-01-15 09:00,10", "2024-01-15 09:30,5", "oops,1"],
        );
        write_csv(tmp.path(), "gym_jan.csv", &["2024-01-15 09:15,7"]);

        let report = run_pipeline(&PipelineConfig::with_data_dir(tmp.path())).unwrap();

        assert_eq!(report.metadata.sources_attempted, 2);
        assert_eq!(report.metadata.readings, 3);
        assert_eq!(report.metadata.malformed_rows, 1);
        assert_eq!(report.summaries.len(), 2);
        assert_eq!(report.manager.len(), 2);

        let library = report
            .summaries
            .iter()
            .find(|s| s.building == "Library")
            .unwrap();
        assert_eq!(library.total, 15.0);
        assert_eq!(
            report.manager.get("Library").unwrap().total_consumption(),
            library.total
        );
        assert_eq!(report.executive.highest_consumer, "Library");
    }

    #[test]
    fn test_run_pipeline_empty_directory() {
        let tmp = TempDir::new().unwrap();
        let err = run_pipeline(&PipelineConfig::with_data_dir(tmp.path())).unwrap_err();
        assert!(matches!(
            err,
            EnergyError::NoDataIngested {
                sources_attempted: 0,
                ..
            }
        ));
        assert_eq!(err.stage(), "merge");
    }

    #[test]
    fn test_run_pipeline_rejects_invalid_config() {
        let config = PipelineConfig {
            max_concurrency: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(run_pipeline(&config), Err(EnergyError::Config(_))));
    }

    #[test]
    fn test_report_serializes_without_raw_dataset() {
        let tmp = TempDir::new().unwrap();
        write_csv(tmp.path(), "hall_feb.csv", &["2024-02-01 00:00,1.5"]);
        let report = run_pipeline(&PipelineConfig::with_data_dir(tmp.path())).unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("dataset").is_none());
        assert_eq!(json["executive"]["trend"], "increasing");
        assert_eq!(json["sources"][0]["status"], "loaded");
    }
}
