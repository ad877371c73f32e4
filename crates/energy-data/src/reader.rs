//! Source discovery and row parsing.
//!
//! Turns one delimited-text meter file into a lazy stream of
//! [`ValidatedReading`]s. Each row is first split into a [`RawRecord`] and then
//! validated into a typed reading or a [`MalformedRow`]; malformed rows are
//! counted and skipped, never propagated.

use std::fs::File;
use std::path::{Path, PathBuf};

use energy_core::config::PipelineConfig;
use energy_core::error::{EnergyError, MalformedRow, Result};
use energy_core::models::{SourceFile, ValidatedReading};
use energy_core::time_utils::parse_timestamp;
use serde::Serialize;
use tracing::{debug, warn};

/// How many rejected rows are kept per source for diagnostics.
pub const MAX_REJECTED_SAMPLES: usize = 5;

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Find files with `extension` under `dir`, sorted by path.
///
/// Only descends into sub-directories when `recursive` is set.
pub fn find_source_files(dir: &Path, extension: &str, recursive: bool) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Data directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let wanted = extension.trim_start_matches('.');
    let walker = walkdir::WalkDir::new(dir).follow_links(true);
    let walker = if recursive { walker } else { walker.max_depth(1) };

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case(wanted))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Discover sources under the configured directory and label them from their
/// file names.
pub fn discover_sources(config: &PipelineConfig) -> Vec<SourceFile> {
    find_source_files(&config.data_dir, &config.extension, config.recursive)
        .into_iter()
        .map(SourceFile::from_path)
        .collect()
}

// ── Row parsing ───────────────────────────────────────────────────────────────

/// The two untyped leading columns of one row plus its line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'r> {
    pub line: usize,
    pub timestamp: &'r str,
    pub value: &'r str,
}

impl<'r> RawRecord<'r> {
    /// Split a decoded record; extra columns are ignored.
    pub fn from_record(
        record: &'r csv::StringRecord,
        line: usize,
    ) -> std::result::Result<Self, MalformedRow> {
        match (record.get(0), record.get(1)) {
            (Some(timestamp), Some(value)) => Ok(Self {
                line,
                timestamp,
                value,
            }),
            _ => Err(MalformedRow::MissingColumns {
                line,
                found: record.len(),
            }),
        }
    }

    /// Coerce both fields and tag the result with the source's labels.
    pub fn validate(self, source: &SourceFile) -> std::result::Result<ValidatedReading, MalformedRow> {
        let timestamp = parse_timestamp(self.timestamp).ok_or_else(|| MalformedRow::BadTimestamp {
            line: self.line,
            raw: self.timestamp.to_string(),
        })?;

        let value = parse_value(self.value).ok_or_else(|| MalformedRow::BadValue {
            line: self.line,
            raw: self.value.to_string(),
        })?;

        Ok(ValidatedReading {
            building: source.building.clone(),
            timestamp,
            value,
            period: source.period.clone(),
        })
    }
}

/// Parse-then-validate a single decoded record.
pub fn parse_row(
    record: &csv::StringRecord,
    line: usize,
    source: &SourceFile,
) -> std::result::Result<ValidatedReading, MalformedRow> {
    RawRecord::from_record(record, line)?.validate(source)
}

fn parse_value(raw: &str) -> Option<f64> {
    let v = raw.trim().parse::<f64>().ok()?;
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}

// ── ParseStats ────────────────────────────────────────────────────────────────

/// Row counters for one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseStats {
    /// Records seen, including the header and malformed rows.
    pub rows_read: usize,
    /// Whether the first row was treated as a header.
    pub header_skipped: bool,
    /// Rows dropped as malformed.
    pub malformed: usize,
    /// Rows turned into readings.
    pub accepted: usize,
    /// The first few malformed rows, as messages.
    pub rejected_samples: Vec<String>,
    /// I/O failure that ended the read early, if any.
    pub read_error: Option<String>,
}

impl ParseStats {
    fn record_malformed(&mut self, row: &MalformedRow) {
        self.malformed += 1;
        if self.rejected_samples.len() < MAX_REJECTED_SAMPLES {
            self.rejected_samples.push(row.to_string());
        }
    }
}

// ── SourceReader ──────────────────────────────────────────────────────────────

/// Lazy, single-pass iterator of validated readings from one source.
pub struct SourceReader {
    source: SourceFile,
    records: csv::StringRecordsIntoIter<File>,
    stats: ParseStats,
    finished: bool,
}

impl SourceReader {
    /// Open `source` for reading.
    ///
    /// Fails with [`EnergyError::SourceUnavailable`] when the path cannot be
    /// opened or is not a regular file.
    pub fn open(source: &SourceFile, config: &PipelineConfig) -> Result<Self> {
        let unavailable = |e: std::io::Error| EnergyError::SourceUnavailable {
            path: source.path.clone(),
            source: e,
        };

        let file = File::open(&source.path).map_err(unavailable)?;
        let metadata = file.metadata().map_err(unavailable)?;
        if !metadata.is_file() {
            return Err(unavailable(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .delimiter(config.delimiter_byte())
            .from_reader(file);

        Ok(Self {
            source: source.clone(),
            records: reader.into_records(),
            stats: ParseStats::default(),
            finished: false,
        })
    }

    /// Counters so far; final once the iterator is exhausted.
    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    pub fn into_stats(self) -> ParseStats {
        self.stats
    }
}

impl Iterator for SourceReader {
    type Item = ValidatedReading;

    fn next(&mut self) -> Option<ValidatedReading> {
        if self.finished {
            return None;
        }

        loop {
            let Some(result) = self.records.next() else {
                self.finished = true;
                return None;
            };
            self.stats.rows_read += 1;
            let ordinal = self.stats.rows_read;

            // A header is a first row whose leading column is not a timestamp.
            let mut header_like = false;
            let outcome = match result {
                Ok(record) => {
                    let line = record
                        .position()
                        .map(|p| p.line() as usize)
                        .unwrap_or(ordinal);
                    header_like = ordinal == 1
                        && record.get(0).map_or(true, |c| parse_timestamp(c).is_none());
                    parse_row(&record, line, &self.source)
                }
                Err(e) if e.is_io_error() => {
                    warn!(
                        "Read error in {} after {} rows: {}",
                        self.source.display_name(),
                        ordinal - 1,
                        e
                    );
                    self.stats.rows_read -= 1;
                    self.stats.read_error = Some(e.to_string());
                    self.finished = true;
                    return None;
                }
                Err(e) => Err(MalformedRow::Undecodable {
                    line: e.position().map(|p| p.line() as usize).unwrap_or(ordinal),
                    reason: e.to_string(),
                }),
            };

            match outcome {
                Ok(reading) => {
                    self.stats.accepted += 1;
                    return Some(reading);
                }
                Err(MalformedRow::BadTimestamp { .. } | MalformedRow::MissingColumns { .. })
                    if header_like =>
                {
                    debug!("{}: treating first row as header", self.source.display_name());
                    self.stats.header_skipped = true;
                }
                Err(row) => {
                    debug!("{}: skipping malformed row: {}", self.source.display_name(), row);
                    self.stats.record_malformed(&row);
                }
            }
        }
    }
}

// ── Per-source parsing ────────────────────────────────────────────────────────

/// Whether a source contributed to the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// The file was read; `stats` tells how many rows survived.
    Loaded { stats: ParseStats },
    /// The file could not be opened; it contributed nothing.
    Unavailable { reason: String },
}

/// Everything parsed from one source, tagged with its position in the
/// declared source list so merges are deterministic.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub index: usize,
    pub source: SourceFile,
    pub readings: Vec<ValidatedReading>,
    pub status: SourceStatus,
}

impl SourceBatch {
    /// Batch for a source that produced nothing because it failed outright.
    pub fn unavailable(index: usize, source: SourceFile, reason: impl Into<String>) -> Self {
        Self {
            index,
            source,
            readings: Vec::new(),
            status: SourceStatus::Unavailable {
                reason: reason.into(),
            },
        }
    }
}

/// Parse one source completely.
///
/// A source that cannot be opened is logged and reported as
/// [`SourceStatus::Unavailable`] with zero readings instead of failing the run.
pub fn parse_source(index: usize, source: &SourceFile, config: &PipelineConfig) -> SourceBatch {
    let mut reader = match SourceReader::open(source, config) {
        Ok(r) => r,
        Err(e) => {
            warn!("Skipping source {}: {}", source.display_name(), e);
            return SourceBatch::unavailable(index, source.clone(), e.to_string());
        }
    };

    let readings: Vec<ValidatedReading> = reader.by_ref().collect();
    let stats = reader.into_stats();

    debug!(
        "Source {}: {} rows read, {} accepted, {} malformed, header={}",
        source.display_name(),
        stats.rows_read,
        stats.accepted,
        stats.malformed,
        stats.header_skipped,
    );

    SourceBatch {
        index,
        source: source.clone(),
        readings,
        status: SourceStatus::Loaded { stats },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
