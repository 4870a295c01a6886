//! Report rendering: table, JSON and CSV views of a [`ProfileReport`].

use crate::utils::{format_ms, truncate};
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use latency_profiler::{ProfileReport, ProfileSummary, TrialResult};
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// One flattened row of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub plugin_slug: String,
    pub display_name: String,
    /// `None` when the trial failed or was skipped.
    pub load_time_ms: Option<f64>,
    pub overhead_ms: Option<f64>,
    pub classification: &'static str,
    pub status: Option<u16>,
    pub error: Option<String>,
}

impl TrialRecord {
    pub fn from_trial(report: &ProfileReport, trial: &TrialResult) -> Self {
        let status = match &trial.outcome {
            latency_profiler::TrialOutcome::Loaded { status, .. } => Some(*status),
            _ => None,
        };
        Self {
            plugin_slug: trial.plugin.slug.clone(),
            display_name: trial.plugin.name.clone(),
            load_time_ms: trial.outcome.measured_ms(),
            overhead_ms: report.overhead_ms(trial),
            classification: trial.outcome.label(),
            status,
            error: trial.outcome.error(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    run_id: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    homepage: &'a str,
    baseline_ms: Option<f64>,
    summary: &'a ProfileSummary,
    trials: Vec<TrialRecord>,
}

fn records(report: &ProfileReport, sort: bool) -> Vec<TrialRecord> {
    let trials: Vec<&TrialResult> = if sort {
        report.slowest_first()
    } else {
        report.trials.iter().collect()
    };
    trials
        .into_iter()
        .map(|trial| TrialRecord::from_trial(report, trial))
        .collect()
}

/// `sort` orders rows slowest first; otherwise rows keep test order.
pub fn render(report: &ProfileReport, format: OutputFormat, sort: bool) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(report, sort)?),
        OutputFormat::Json => render_json(report, sort),
        OutputFormat::Csv => render_csv(report, sort),
    }
}

pub fn render_json(report: &ProfileReport, sort: bool) -> Result<String> {
    let document = ReportDocument {
        run_id: report.run_id.to_string(),
        started_at: report.started_at,
        finished_at: report.finished_at,
        homepage: &report.homepage,
        baseline_ms: report.baseline.as_ref().and_then(|b| b.measured_ms()),
        summary: &report.summary,
        trials: records(report, sort),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn render_csv(report: &ProfileReport, sort: bool) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records(report, sort) {
        writer.serialize(record)?;
    }
    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("{}", e))?;
    Ok(String::from_utf8(bytes)?)
}

pub fn render_table(report: &ProfileReport, sort: bool) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "Plugin load times for {}", report.homepage)?;
    if let Some(baseline) = &report.baseline {
        writeln!(
            out,
            "Baseline (no plugins active): {}",
            baseline
                .measured_ms()
                .map(format_ms)
                .unwrap_or_else(|| format!("failed ({})", baseline.error().unwrap_or_default()))
        )?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "{:<32} {:<40} {:>10} {:>10}  {}",
        "PLUGIN", "SLUG", "LOAD", "OVERHEAD", "RATING"
    )?;

    for record in records(report, sort) {
        let rating = match &record.error {
            Some(error) => format!("{} ({})", record.classification.to_uppercase(), error),
            None => record.classification.to_uppercase(),
        };
        writeln!(
            out,
            "{:<32} {:<40} {:>10} {:>10}  {}",
            truncate(&record.display_name, 32),
            truncate(&record.plugin_slug, 40),
            format_ms(record.load_time_ms.unwrap_or(f64::INFINITY)),
            record.overhead_ms.map(format_ms).unwrap_or_else(|| "-".to_string()),
            rating
        )?;
    }

    let summary = &report.summary;
    writeln!(out)?;
    writeln!(
        out,
        "{} plugins: {} fast, {} moderate, {} slow, {} failed, {} skipped",
        summary.plugins, summary.fast, summary.moderate, summary.slow, summary.failed, summary.skipped
    )?;
    if let Some(latency) = &summary.latency {
        writeln!(
            out,
            "min {}  mean {}  p50 {}  p95 {}  max {}",
            format_ms(latency.min_ms),
            format_ms(latency.mean_ms),
            format_ms(latency.p50_ms),
            format_ms(latency.p95_ms),
            format_ms(latency.max_ms)
        )?;
    }
    Ok(out)
}
