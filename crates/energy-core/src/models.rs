use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{EnergyError, Result};
use crate::time_utils::Timestamp;

/// A declared input file plus the labels every reading from it is tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Location of the delimited-text file.
    pub path: PathBuf,
    /// Normalised (title-cased) building name.
    pub building: String,
    /// Reporting period label such as `"Jan"`, if the filename carried one.
    pub period: Option<String>,
}

impl SourceFile {
    /// Declare a source with explicit labels.
    ///
    /// The building label is normalised with [`normalize_building_name`].
    pub fn new(path: impl Into<PathBuf>, building: &str, period: Option<&str>) -> Self {
        Self {
            path: path.into(),
            building: normalize_building_name(building),
            period: period.map(normalize_building_name),
        }
    }

    /// Infer labels from a `{building}_{period}.ext` file name.
    ///
    /// The period is the last `_`-separated part of the stem and the building
    /// everything before it. A stem without an underscore names a building
    /// with no period.
    ///
    /// ```
    /// use energy_core::models::SourceFile;
    ///
    /// let src = SourceFile::from_path("data/building_a_jan.csv");
    /// assert_eq!(src.building, "Building A");
    /// assert_eq!(src.period.as_deref(), Some("Jan"));
    /// ```
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (building, period) = match filename_pattern().captures(&stem) {
            Some(caps) => (
                caps.name("building").map_or("", |m| m.as_str()).to_string(),
                caps.name("period").map(|m| m.as_str().to_string()),
            ),
            None => (stem.clone(), None),
        };

        Self::new(path, &building, period.as_deref())
    }

    /// Human-readable name for logs: the file name, or the full path if it
    /// has none.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Borrow the source path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A single validated meter reading.
///
/// Only ever constructed by the parser after both columns validated, so
/// `value` is always finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedReading {
    /// Normalised building name.
    pub building: String,
    /// When the reading was taken, in the source file's wall-clock time.
    pub timestamp: Timestamp,
    /// Consumption in kWh.
    pub value: f64,
    /// Period label inherited from the source file.
    #[serde(default)]
    pub period: Option<String>,
}

/// The unified, insertion-ordered collection of readings for one run.
///
/// Never empty: [`MergedDataset::try_from_readings`] refuses an empty set, so
/// aggregation and modelling cannot be handed one.
#[derive(Debug, Clone, Serialize)]
pub struct MergedDataset {
    readings: Vec<ValidatedReading>,
}

impl MergedDataset {
    /// Build a dataset from already validated readings.
    ///
    /// `sources_attempted` / `sources_unavailable` are only used to describe
    /// the [`EnergyError::NoDataIngested`] returned for an empty input.
    pub fn try_from_readings(
        readings: Vec<ValidatedReading>,
        sources_attempted: usize,
        sources_unavailable: usize,
    ) -> Result<Self> {
        if readings.is_empty() {
            return Err(EnergyError::NoDataIngested {
                sources_attempted,
                sources_unavailable,
            });
        }
        Ok(Self { readings })
    }

    /// Number of readings.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Iterate readings in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidatedReading> {
        self.readings.iter()
    }

    /// Borrow the readings as a slice.
    pub fn readings(&self) -> &[ValidatedReading] {
        &self.readings
    }

    /// Distinct building names in order of first appearance.
    pub fn buildings(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.readings
            .iter()
            .map(|r| r.building.as_str())
            .filter(|b| seen.insert(*b))
            .collect()
    }

    /// Readings of one building, in insertion order.
    pub fn readings_for<'a>(
        &'a self,
        building: &'a str,
    ) -> impl Iterator<Item = &'a ValidatedReading> + 'a {
        self.readings.iter().filter(move |r| r.building == building)
    }

    /// Earliest and latest timestamp in the dataset.
    pub fn time_span(&self) -> (Timestamp, Timestamp) {
        let first = self.readings[0].timestamp;
        self.readings
            .iter()
            .fold((first, first), |(lo, hi), r| (lo.min(r.timestamp), hi.max(r.timestamp)))
    }
}

impl<'a> IntoIterator for &'a MergedDataset {
    type Item = &'a ValidatedReading;
    type IntoIter = std::slice::Iter<'a, ValidatedReading>;

    fn into_iter(self) -> Self::IntoIter {
        self.readings.iter()
    }
}

/// Summed consumption of one building inside one `[period_start, period_end)`
/// window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub building: String,
    pub period_start: Timestamp,
    pub period_end: Timestamp,
    /// Sum of all reading values inside the window.
    pub total: f64,
    /// Number of readings that contributed.
    pub readings: usize,
}

/// Largest single reading of one building inside one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyPeak {
    pub building: String,
    pub period_start: Timestamp,
    pub period_end: Timestamp,
    /// Maximum reading value inside the window.
    pub peak: f64,
    pub readings: usize,
}

/// Descriptive statistics for all readings of one building.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingSummary {
    pub building: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub total: f64,
    pub readings: usize,
}

// ── SeriesStats ───────────────────────────────────────────────────────────────

/// Count, sum, mean and extremes of a group of readings.
///
/// Points are put into canonical order (timestamp, then value) before
/// summing, so the result does not depend on the order sources were merged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub count: usize,
    pub total: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl SeriesStats {
    /// Returns `None` for an empty group.
    pub fn from_points(points: &mut [(Timestamp, f64)]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        sort_canonical(points);

        let mut total = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &(_, value) in points.iter() {
            total += value;
            min = min.min(value);
            max = max.max(value);
        }

        let count = points.len();
        Some(Self {
            count,
            total,
            mean: total / count as f64,
            min,
            max,
        })
    }
}

/// Order points by timestamp, breaking ties by value.
pub fn sort_canonical(points: &mut [(Timestamp, f64)]) {
    points.sort_by(|a, b| match a.0.cmp(&b.0) {
        Ordering::Equal => a.1.total_cmp(&b.1),
        other => other,
    });
}

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?P<building>.+)_(?P<period>[^_]+)$").expect("regex is valid"))
}

/// Normalise a building or period label to title case.
///
/// Underscores and runs of whitespace become single spaces; each word keeps
/// its first character upper-cased and the rest lower-cased.
///
/// ```
/// use energy_core::models::normalize_building_name;
///
/// assert_eq!(normalize_building_name("building_a"), "Building A");
/// assert_eq!(normalize_building_name("  SCIENCE   hall "), "Science Hall");
/// ```
pub fn normalize_building_name(raw: &str) -> String {
    raw.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts(s: &str) -> Timestamp {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn reading(building: &str, at: &str, value: f64) -> ValidatedReading {
        ValidatedReading {
            building: building.to_string(),
            timestamp: ts(at),
            value,
            period: None,
        }
    }

    // ── normalize_building_name ───────────────────────────────────────────────

    #[test]
    fn test_normalize_title_cases_words() {
        assert_eq!(normalize_building_name("library"), "Library");
        assert_eq!(normalize_building_name("ENGINEERING"), "Engineering");
        assert_eq!(normalize_building_name("building_A"), "Building A");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_building_name(""), "");
        assert_eq!(normalize_building_name("__"), "");
    }

    // ── SourceFile ────────────────────────────────────────────────────────────

    #[test]
    fn test_source_file_new_normalises_labels() {
        let src = SourceFile::new("/data/x.csv", "main hall", Some("jan"));
        assert_eq!(src.building, "Main Hall");
        assert_eq!(src.period.as_deref(), Some("Jan"));
        assert_eq!(src.display_name(), "x.csv");
    }

    #[test]
    fn test_source_file_from_path_building_and_period() {
        let src = SourceFile::from_path("/data/science_hall_feb.csv");
        assert_eq!(src.building, "Science Hall");
        assert_eq!(src.period.as_deref(), Some("Feb"));
    }

    #[test]
    fn test_source_file_from_path_without_period() {
        let src = SourceFile::from_path("/data/LIBRARY.csv");
        assert_eq!(src.building, "Library");
        assert!(src.period.is_none());
    }

    #[test]
    fn test_source_file_from_path_trailing_underscore() {
        let src = SourceFile::from_path("gym_.csv");
        assert_eq!(src.building, "Gym");
        assert!(src.period.is_none());
    }

    // ── MergedDataset ─────────────────────────────────────────────────────────

    #[test]
    fn test_dataset_rejects_empty() {
        let err = MergedDataset::try_from_readings(Vec::new(), 2, 1).unwrap_err();
        match err {
            EnergyError::NoDataIngested {
                sources_attempted,
                sources_unavailable,
            } => {
                assert_eq!(sources_attempted, 2);
                assert_eq!(sources_unavailable, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_dataset_buildings_in_first_seen_order() {
        let ds = MergedDataset::try_from_readings(
            vec![
                reading("B", "2024-01-15 09:00", 1.0),
                reading("A", "2024-01-15 09:00", 2.0),
                reading("B", "2024-01-15 10:00", 3.0),
            ],
            1,
            0,
        )
        .unwrap();
        assert_eq!(ds.buildings(), vec!["B", "A"]);
        assert_eq!(ds.readings_for("B").count(), 2);
        assert_eq!(ds.len(), 3);
        assert!(!ds.is_empty());
    }

    #[test]
    fn test_dataset_keeps_duplicates() {
        let ds = MergedDataset::try_from_readings(
            vec![
                reading("A", "2024-01-15 09:00", 4.0),
                reading("A", "2024-01-15 09:00", 4.0),
            ],
            1,
            0,
        )
        .unwrap();
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_dataset_time_span() {
        let ds = MergedDataset::try_from_readings(
            vec![
                reading("A", "2024-01-15 09:00", 1.0),
                reading("A", "2024-01-10 09:00", 1.0),
                reading("B", "2024-01-20 09:00", 1.0),
            ],
            1,
            0,
        )
        .unwrap();
        let (lo, hi) = ds.time_span();
        assert_eq!(lo, ts("2024-01-10 09:00"));
        assert_eq!(hi, ts("2024-01-20 09:00"));
    }

    // ── SeriesStats ───────────────────────────────────────────────────────────

    #[test]
    fn test_series_stats_basic() {
        let mut points = vec![
            (ts("2024-01-15 09:30"), 5.0),
            (ts("2024-01-15 09:00"), 10.0),
        ];
        let stats = SeriesStats::from_points(&mut points).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total, 15.0);
        assert_eq!(stats.mean, 7.5);
        assert_eq!(stats.min, 5.0);
        assert_eq!(stats.max, 10.0);
    }

    #[test]
    fn test_series_stats_single_point() {
        let mut points = vec![(ts("2024-01-15 09:00"), 3.25)];
        let stats = SeriesStats::from_points(&mut points).unwrap();
        assert_eq!(stats.mean, 3.25);
        assert_eq!(stats.min, 3.25);
        assert_eq!(stats.max, 3.25);
        assert_eq!(stats.total, 3.25);
    }

    #[test]
    fn test_series_stats_empty() {
        assert!(SeriesStats::from_points(&mut []).is_none());
    }

    #[test]
    fn test_series_stats_order_independent() {
        let a = ts("2024-01-15 09:00");
        let b = ts("2024-01-15 10:00");
        let mut forward = vec![(a, 0.1), (a, 0.7), (b, 0.2), (b, 1e16)];
        let mut backward: Vec<_> = forward.iter().rev().copied().collect();
        let s1 = SeriesStats::from_points(&mut forward).unwrap();
        let s2 = SeriesStats::from_points(&mut backward).unwrap();
        assert_eq!(s1.total.to_bits(), s2.total.to_bits());
    }
}
