use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EnergyError, Result};

/// Default directory scanned for meter files.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default source file extension.
pub const DEFAULT_EXTENSION: &str = "csv";

/// Default number of sources parsed at the same time.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

// ── PipelineConfig ────────────────────────────────────────────────────────────

/// Explicit configuration handed to the pipeline entry points.
///
/// Every field has a default, so a JSON config file only needs the keys it
/// wants to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding `{building}_{period}.{extension}` files.
    pub data_dir: PathBuf,
    /// File extension (without the dot) of source files.
    pub extension: String,
    /// Single-byte ASCII field delimiter.
    pub delimiter: char,
    /// Descend into sub-directories of `data_dir`.
    pub recursive: bool,
    /// Upper bound on sources parsed concurrently.
    pub max_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            extension: DEFAULT_EXTENSION.to_string(),
            delimiter: ',',
            recursive: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl PipelineConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load a JSON config file; absent keys keep their defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EnergyError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive a run.
    pub fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() {
            return Err(EnergyError::Config(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            )));
        }
        if self.extension.trim().is_empty() {
            return Err(EnergyError::Config("extension must not be empty".to_string()));
        }
        if self.max_concurrency == 0 {
            return Err(EnergyError::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The delimiter as the byte the CSV reader expects.
    ///
    /// Non-ASCII delimiters are rejected by [`validate`](Self::validate); this
    /// falls back to a comma for them.
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .unwrap_or(b',')
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
