//! Report rendering for stdout.

use std::io::Write;

use energy_core::formatting::{format_kwh, format_number, format_period, share_percent};
use energy_core::time_utils::BucketWindow;
use energy_data::analysis::PipelineReport;
use energy_data::reader::SourceStatus;

/// Number of daily rows shown in the text preview.
pub const DAILY_PREVIEW_ROWS: usize = 10;

const RULE: &str = "────────────────────────────────────────────────────────────────────────";

// ── JSON ───────────────────────────────────────────────────────────────────────

/// Write the whole report as pretty-printed JSON.
pub fn write_json<W: Write>(out: &mut W, report: &PipelineReport) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

// ── Text ───────────────────────────────────────────────────────────────────────

/// Write the human-readable dashboard.
pub fn write_text<W: Write>(out: &mut W, report: &PipelineReport) -> anyhow::Result<()> {
    write_sources(out, report)?;
    write_daily_preview(out, report)?;
    write_summary_table(out, report)?;
    write_weekly_averages(out, report)?;
    write_building_reports(out, report)?;
    write_executive_summary(out, report)?;
    Ok(())
}

fn heading<W: Write>(out: &mut W, title: &str) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{title}")?;
    writeln!(out, "{RULE}")
}

fn write_sources<W: Write>(out: &mut W, report: &PipelineReport) -> std::io::Result<()> {
    heading(out, "Sources")?;
    for outcome in &report.sources {
        let label = match &outcome.source.period {
            Some(period) => format!("{} ({})", outcome.source.building, period),
            None => outcome.source.building.clone(),
        };
        match &outcome.status {
            SourceStatus::Loaded { .. } => writeln!(
                out,
                "  ok    {:<28} {:<20} {:>7} readings, {} malformed",
                outcome.source.display_name(),
                label,
                outcome.readings,
                outcome.malformed_rows()
            )?,
            SourceStatus::Unavailable { reason } => writeln!(
                out,
                "  skip  {:<28} {:<20} {}",
                outcome.source.display_name(),
                label,
                reason
            )?,
        }
    }

    let meta = &report.metadata;
    writeln!(
        out,
        "  {} readings from {} of {} source(s), {} to {}",
        format_number(meta.readings as f64, 0),
        meta.sources_attempted - meta.sources_unavailable,
        meta.sources_attempted,
        meta.first_reading.format("%Y-%m-%d %H:%M"),
        meta.last_reading.format("%Y-%m-%d %H:%M"),
    )
}

fn write_daily_preview<W: Write>(out: &mut W, report: &PipelineReport) -> std::io::Result<()> {
    heading(out, "Daily totals")?;
    for bucket in report.daily.iter().take(DAILY_PREVIEW_ROWS) {
        writeln!(
            out,
            "  {:<12} {:<24} {:>16}",
            format_period(bucket.period_start, BucketWindow::Day),
            bucket.building,
            format_kwh(bucket.total)
        )?;
    }
    if report.daily.len() > DAILY_PREVIEW_ROWS {
        writeln!(
            out,
            "  ... {} more row(s)",
            report.daily.len() - DAILY_PREVIEW_ROWS
        )?;
    }
    Ok(())
}

fn write_summary_table<W: Write>(out: &mut W, report: &PipelineReport) -> std::io::Result<()> {
    heading(out, "Building summary (kWh)")?;
    writeln!(
        out,
        "  {:<24} {:>8} {:>10} {:>10} {:>10} {:>12}",
        "Building", "Readings", "Mean", "Min", "Max", "Total"
    )?;
    for s in &report.summaries {
        writeln!(
            out,
            "  {:<24} {:>8} {:>10} {:>10} {:>10} {:>12}",
            s.building,
            s.readings,
            format_number(s.mean, 2),
            format_number(s.min, 2),
            format_number(s.max, 2),
            format_number(s.total, 2)
        )?;
    }
    Ok(())
}

fn write_weekly_averages<W: Write>(out: &mut W, report: &PipelineReport) -> std::io::Result<()> {
    heading(out, "Average weekly usage")?;
    for avg in &report.weekly_averages {
        writeln!(
            out,
            "  {:<24} {:>16}  over {} week(s)",
            avg.building,
            format_kwh(avg.average),
            avg.weeks
        )?;
    }
    Ok(())
}

fn write_building_reports<W: Write>(out: &mut W, report: &PipelineReport) -> std::io::Result<()> {
    heading(out, "Building reports")?;
    for line in report.manager.generate_all_reports() {
        writeln!(out, "  {line}")?;
    }
    Ok(())
}

fn write_executive_summary<W: Write>(out: &mut W, report: &PipelineReport) -> std::io::Result<()> {
    let exec = &report.executive;
    heading(out, "Executive summary")?;
    writeln!(
        out,
        "  Total campus consumption:   {}",
        format_kwh(exec.total_consumption)
    )?;
    writeln!(
        out,
        "  Highest-consuming building: {} ({}, {:.1}% of campus)",
        exec.highest_consumer,
        format_kwh(exec.highest_consumer_total),
        share_percent(exec.highest_consumer_total, exec.total_consumption)
    )?;
    writeln!(out, "  Peak load hour:             {:02}:00", exec.peak_load_hour)?;
    writeln!(out, "  Overall trend:              {}", exec.trend)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
