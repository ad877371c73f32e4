//! Consumption aggregation over calendar windows.
//!
//! Every operation is a pure function of a [`MergedDataset`]. Groups are
//! keyed by `(building, window start)` in a `BTreeMap`, so output rows come
//! back sorted by building and then by period.

use std::collections::BTreeMap;

use energy_core::error::Result;
use energy_core::models::{Bucket, BuildingSummary, HourlyPeak, MergedDataset, SeriesStats};
use energy_core::time_utils::{BucketWindow, Timestamp};
use serde::Serialize;
use tracing::debug;

type Points = Vec<(Timestamp, f64)>;

/// Mean of a building's weekly totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAverage {
    pub building: String,
    pub average: f64,
    /// Number of weeks the building has readings in.
    pub weeks: usize,
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Groups a borrowed dataset's readings by building and time window.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    dataset: &'a MergedDataset,
}

impl<'a> Aggregator<'a> {
    pub fn new(dataset: &'a MergedDataset) -> Self {
        Self { dataset }
    }

    /// Total consumption per building per calendar day (midnight to midnight).
    pub fn daily_totals(&self) -> Vec<Bucket> {
        self.bucket_totals(BucketWindow::Day)
    }

    /// Total consumption per building per Monday-start week.
    pub fn weekly_totals(&self) -> Vec<Bucket> {
        self.bucket_totals(BucketWindow::Week)
    }

    /// Largest single reading per building per clock hour.
    pub fn hourly_peaks(&self) -> Vec<HourlyPeak> {
        self.bucket_peaks(BucketWindow::Hour)
    }

    /// Sums over an arbitrary window.
    ///
    /// Fails with [`EnergyError::InvalidBucketWindow`](energy_core::EnergyError::InvalidBucketWindow)
    /// for a degenerate window instead of returning an empty set.
    pub fn totals(&self, window: BucketWindow) -> Result<Vec<Bucket>> {
        window.validate()?;
        Ok(self.bucket_totals(window))
    }

    /// Peaks over an arbitrary window; same validation as [`Self::totals`].
    pub fn peaks(&self, window: BucketWindow) -> Result<Vec<HourlyPeak>> {
        window.validate()?;
        Ok(self.bucket_peaks(window))
    }

    /// Mean, min, max and total per building, sorted by building name.
    pub fn building_summary(&self) -> Vec<BuildingSummary> {
        let mut groups: BTreeMap<&str, Points> = BTreeMap::new();
        for r in self.dataset {
            groups
                .entry(r.building.as_str())
                .or_default()
                .push((r.timestamp, r.value));
        }

        groups
            .into_iter()
            .filter_map(|(building, mut points)| {
                let stats = SeriesStats::from_points(&mut points)?;
                Some(BuildingSummary {
                    building: building.to_string(),
                    mean: stats.mean,
                    min: stats.min,
                    max: stats.max,
                    total: stats.total,
                    readings: stats.count,
                })
            })
            .collect()
    }

    /// Average weekly total per building, highest first.
    pub fn average_weekly_usage(&self) -> Vec<WeeklyAverage> {
        let mut per_building: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for bucket in self.weekly_totals() {
            per_building.entry(bucket.building).or_default().push(bucket.total);
        }

        let mut averages: Vec<WeeklyAverage> = per_building
            .into_iter()
            .map(|(building, totals)| WeeklyAverage {
                average: totals.iter().sum::<f64>() / totals.len() as f64,
                weeks: totals.len(),
                building,
            })
            .collect();

        averages.sort_by(|a, b| {
            b.average
                .total_cmp(&a.average)
                .then_with(|| a.building.cmp(&b.building))
        });
        averages
    }

    // ── Private ───────────────────────────────────────────────────────────────

    fn group(&self, window: BucketWindow) -> BTreeMap<(&'a str, Timestamp), Points> {
        let mut map: BTreeMap<(&'a str, Timestamp), Points> = BTreeMap::new();
        for r in self.dataset {
            map.entry((r.building.as_str(), window.floor(r.timestamp)))
                .or_default()
                .push((r.timestamp, r.value));
        }
        map
    }

    fn bucket_totals(&self, window: BucketWindow) -> Vec<Bucket> {
        let groups = self.group(window);
        debug!("Summing {} {} bucket(s)", groups.len(), window);
        groups
            .into_iter()
            .filter_map(|((building, start), mut points)| {
                let stats = SeriesStats::from_points(&mut points)?;
                let (period_start, period_end) = window.bounds(start);
                Some(Bucket {
                    building: building.to_string(),
                    period_start,
                    period_end,
                    total: stats.total,
                    readings: stats.count,
                })
            })
            .collect()
    }

    fn bucket_peaks(&self, window: BucketWindow) -> Vec<HourlyPeak> {
        let groups = self.group(window);
        debug!("Finding peaks in {} {} bucket(s)", groups.len(), window);
        groups
            .into_iter()
            .filter_map(|((building, start), points)| {
                let peak = points
                    .iter()
                    .map(|&(_, v)| v)
                    .reduce(f64::max)?;
                let (period_start, period_end) = window.bounds(start);
                Some(HourlyPeak {
                    building: building.to_string(),
                    period_start,
                    period_end,
                    peak,
                    readings: points.len(),
                })
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
