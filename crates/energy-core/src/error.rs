use std::path::PathBuf;
use thiserror::Error;

/// Why a single source row was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRow {
    /// The row had fewer than the two required columns.
    #[error("line {line}: expected at least 2 columns, found {found}")]
    MissingColumns { line: usize, found: usize },

    /// Column 0 could not be parsed as a point in time.
    #[error("line {line}: unparsable timestamp {raw:?}")]
    BadTimestamp { line: usize, raw: String },

    /// Column 1 was not a finite number.
    #[error("line {line}: invalid reading value {raw:?}")]
    BadValue { line: usize, raw: String },

    /// The delimited-text decoder could not produce a record at all.
    #[error("line {line}: undecodable record: {reason}")]
    Undecodable { line: usize, reason: String },
}

impl MalformedRow {
    /// 1-based line number of the offending row.
    pub fn line(&self) -> usize {
        match self {
            Self::MissingColumns { line, .. }
            | Self::BadTimestamp { line, .. }
            | Self::BadValue { line, .. }
            | Self::Undecodable { line, .. } => *line,
        }
    }
}

/// All errors produced by the energy dashboard crates.
#[derive(Error, Debug)]
pub enum EnergyError {
    /// A reading failed validation.
    #[error("Malformed row: {0}")]
    MalformedRow(#[from] MalformedRow),

    /// A declared source could not be opened or read.
    #[error("Source unavailable {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every source was processed and none produced a valid reading.
    #[error(
        "No data ingested: {sources_attempted} source(s) attempted, {sources_unavailable} unavailable"
    )]
    NoDataIngested {
        sources_attempted: usize,
        sources_unavailable: usize,
    },

    /// An aggregation window that cannot partition time.
    #[error("Invalid bucket window: {0}")]
    InvalidBucketWindow(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be parsed or produced.
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl EnergyError {
    /// Name of the pipeline stage this error aborts.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::MalformedRow(_) | Self::SourceUnavailable { .. } => "ingestion",
            Self::NoDataIngested { .. } => "merge",
            Self::InvalidBucketWindow(_) => "aggregation",
            Self::Config(_) | Self::Json(_) => "configuration",
        }
    }
}

/// Convenience alias used throughout the energy crates.
pub type Result<T> = std::result::Result<T, EnergyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_source_unavailable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = EnergyError::SourceUnavailable {
            path: PathBuf::from("/data/library_jan.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Source unavailable"));
        assert!(msg.contains("/data/library_jan.csv"));
        assert!(msg.contains("no such file"));
        assert_eq!(err.stage(), "ingestion");
    }

    #[test]
    fn test_error_display_no_data_ingested() {
        let err = EnergyError::NoDataIngested {
            sources_attempted: 3,
            sources_unavailable: 1,
        };
        assert_eq!(
            err.to_string(),
            "No data ingested: 3 source(s) attempted, 1 unavailable"
        );
        assert_eq!(err.stage(), "merge");
    }

    #[test]
    fn test_error_display_invalid_bucket_window() {
        let err = EnergyError::InvalidBucketWindow("width must be positive".to_string());
        assert_eq!(err.to_string(), "Invalid bucket window: width must be positive");
        assert_eq!(err.stage(), "aggregation");
    }

    #[test]
    fn test_malformed_row_line_and_display() {
        let row = MalformedRow::BadValue {
            line: 7,
            raw: "abc".to_string(),
        };
        assert_eq!(row.line(), 7);
        assert_eq!(row.to_string(), "line 7: invalid reading value \"abc\"");

        let err: EnergyError = row.into();
        assert!(err.to_string().starts_with("Malformed row: line 7"));
    }

    #[test]
    fn test_error_display_config() {
        let err = EnergyError::Config("max_concurrency must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: max_concurrency must be at least 1"
        );
        assert_eq!(err.stage(), "configuration");
    }

    #[test]
    fn test_every_variant_maps_to_a_pipeline_stage() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let cases = [
            (
                EnergyError::from(MalformedRow::MissingColumns { line: 1, found: 1 }),
                "ingestion",
            ),
            (EnergyError::Json(json_err), "configuration"),
            (EnergyError::InvalidBucketWindow("zero".to_string()), "aggregation"),
        ];
        for (err, stage) in cases {
            assert_eq!(err.stage(), stage, "{err}");
        }
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: EnergyError = json_err.into();
        assert!(err.to_string().contains("Failed to process JSON"));
    }
}
