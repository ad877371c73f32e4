mod bootstrap;
mod report;
mod settings;

use std::process::ExitCode;

use anyhow::{Context, Result};
use energy_core::EnergyError;
use energy_data::analysis::run_pipeline;
use energy_runtime::run_pipeline_concurrent;

use crate::settings::Settings;

/// Exit status when no reading could be ingested.
const EXIT_NO_DATA: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let (settings, config) = Settings::load()?;

    bootstrap::setup_logging(settings.effective_log_level())?;

    tracing::info!("Energy Dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Data: {}, Extension: {}, Mode: {}",
        config.data_dir.display(),
        config.extension,
        if settings.sequential { "sequential" } else { "concurrent" }
    );

    let outcome = if settings.sequential {
        let config = config.clone();
        tokio::task::spawn_blocking(move || run_pipeline(&config))
            .await
            .context("pipeline task failed")?
    } else {
        run_pipeline_concurrent(&config).await
    };

    let report = match outcome {
        Ok(report) => report,
        Err(e @ EnergyError::NoDataIngested { .. }) => {
            eprintln!("Project aborted at the {} stage: {}", e.stage(), e);
            return Ok(ExitCode::from(EXIT_NO_DATA));
        }
        Err(e) => {
            let stage = e.stage();
            return Err(anyhow::Error::new(e).context(format!("{stage} stage failed")));
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if settings.wants_json() {
        report::write_json(&mut out, &report)?;
    } else {
        report::write_text(&mut out, &report)?;
    }

    Ok(ExitCode::SUCCESS)
}
