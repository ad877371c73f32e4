use std::ffi::OsString;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use energy_core::config::{
    PipelineConfig, DEFAULT_DATA_DIR, DEFAULT_EXTENSION, DEFAULT_MAX_CONCURRENCY,
};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Campus energy consumption dashboard
#[derive(Parser, Debug, Clone)]
#[command(
    name = "energy-dashboard",
    about = "Aggregate campus meter readings into daily, weekly and per-building reports",
    version
)]
pub struct Settings {
    /// Directory holding `{building}_{period}.csv` meter files
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// JSON pipeline configuration file; explicit flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Extension of meter files
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    pub extension: String,

    /// Field delimiter
    #[arg(long, default_value = ",")]
    pub delimiter: char,

    /// Also scan sub-directories of the data directory
    #[arg(long)]
    pub recursive: bool,

    /// Maximum number of files parsed at once
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// Parse files one after another instead of concurrently
    #[arg(long)]
    pub sequential: bool,

    /// Report format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and resolve the pipeline configuration.
    pub fn load() -> anyhow::Result<(Self, PipelineConfig)> {
        Self::load_from_args(std::env::args_os().collect())
    }

    /// Same as [`load`](Self::load) but accepts an explicit argument list,
    /// enabling unit-testing without spawning subprocesses.
    pub fn load_from_args(args: Vec<OsString>) -> anyhow::Result<(Self, PipelineConfig)> {
        // Raw matches tell which flags came from the command line.
        let matches = Settings::command().get_matches_from(args.clone());
        let settings = Settings::parse_from(args);

        let config = settings.pipeline_config(&matches)?;
        Ok((settings, config))
    }

    /// Level actually used for logging; `--debug` wins over `--log-level`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    pub fn wants_json(&self) -> bool {
        self.format == "json"
    }

    /// Start from the `--config` file (or defaults) and apply every flag that
    /// was given explicitly.
    fn pipeline_config(&self, matches: &clap::ArgMatches) -> energy_core::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load_from(path)?,
            None => PipelineConfig::default(),
        };

        if is_arg_explicitly_set(matches, "data_dir") {
            config.data_dir = self.data_dir.clone();
        }
        if is_arg_explicitly_set(matches, "extension") {
            config.extension = self.extension.clone();
        }
        if is_arg_explicitly_set(matches, "delimiter") {
            config.delimiter = self.delimiter;
        }
        if self.recursive {
            config.recursive = true;
        }
        if is_arg_explicitly_set(matches, "max_concurrency") {
            config.max_concurrency = self.max_concurrency;
        }

        config.validate()?;
        Ok(config)
    }
}

fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
