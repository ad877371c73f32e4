//! Object model for per-building reporting.
//!
//! A [`BuildingManager`] is built once from a [`MergedDataset`] and then only
//! read: there is no removal operation.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{MergedDataset, SeriesStats};
use crate::time_utils::Timestamp;

// ── MeterReading ──────────────────────────────────────────────────────────────

/// One consumption sample owned by a [`Building`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeterReading {
    pub timestamp: Timestamp,
    /// Consumption in kWh.
    pub value: f64,
}

// ── Building ──────────────────────────────────────────────────────────────────

/// A monitored building and its reading history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Building {
    name: String,
    readings: Vec<MeterReading>,
}

impl Building {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            readings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a reading; history keeps insertion order.
    pub fn add_reading(&mut self, timestamp: Timestamp, value: f64) {
        self.readings.push(MeterReading { timestamp, value });
    }

    pub fn readings(&self) -> &[MeterReading] {
        &self.readings
    }

    pub fn reading_count(&self) -> usize {
        self.readings.len()
    }

    fn stats(&self) -> Option<SeriesStats> {
        let mut points: Vec<(Timestamp, f64)> = self
            .readings
            .iter()
            .map(|r| (r.timestamp, r.value))
            .collect();
        SeriesStats::from_points(&mut points)
    }

    /// Sum of all reading values.
    ///
    /// Uses the same canonical summation as the aggregation engine, so it is
    /// bit-identical to the building's `BuildingSummary::total`.
    pub fn total_consumption(&self) -> f64 {
        self.stats().map(|s| s.total).unwrap_or(0.0)
    }

    /// Mean reading value, `None` without readings.
    pub fn average_consumption(&self) -> Option<f64> {
        self.stats().map(|s| s.mean)
    }

    /// The largest reading (earliest on ties).
    pub fn peak_reading(&self) -> Option<&MeterReading> {
        self.readings.iter().fold(None, |best, r| match best {
            Some(b) if b.value >= r.value => Some(b),
            _ => Some(r),
        })
    }

    /// One-line human-readable summary.
    pub fn report(&self) -> String {
        format!(
            "{}: Total Consumption = {:.2} kWh",
            self.name,
            self.total_consumption()
        )
    }
}

// ── BuildingManager ───────────────────────────────────────────────────────────

/// Registry of buildings keyed by unique name, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct BuildingManager {
    buildings: Vec<Building>,
    index: HashMap<String, usize>,
}

impl BuildingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an owned registry from a dataset.
    pub fn from_dataset(dataset: &MergedDataset) -> Self {
        let mut manager = Self::new();
        manager.load(dataset);
        manager
    }

    /// Add every reading of `dataset` to its building, creating buildings on
    /// first sight and reusing existing ones.
    ///
    /// Readings are appended in dataset iteration order.
    pub fn load(&mut self, dataset: &MergedDataset) {
        for reading in dataset {
            self.building_mut(&reading.building)
                .add_reading(reading.timestamp, reading.value);
        }
        tracing::debug!(
            buildings = self.buildings.len(),
            readings = dataset.len(),
            "building registry loaded"
        );
    }

    fn building_mut(&mut self, name: &str) -> &mut Building {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                self.buildings.push(Building::new(name));
                let idx = self.buildings.len() - 1;
                self.index.insert(name.to_string(), idx);
                idx
            }
        };
        &mut self.buildings[idx]
    }

    pub fn get(&self, name: &str) -> Option<&Building> {
        self.index.get(name).map(|&idx| &self.buildings[idx])
    }

    /// `(name, building)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Building)> {
        self.buildings.iter().map(|b| (b.name(), b))
    }

    pub fn names(&self) -> Vec<&str> {
        self.buildings.iter().map(Building::name).collect()
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    /// [`Building::report`] for every building, in insertion order.
    pub fn generate_all_reports(&self) -> Vec<String> {
        self.buildings.iter().map(Building::report).collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
