//! Report writing: markdown summary, full JSON, dashboard JSON
//!
//! The JSON report is the complete serialized run and re-renders to
//! markdown via `promptbench report`. The dashboard file is the flat
//! aggregate a charting layer would consume; rendering charts is out of
//! scope here.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

use crate::scheduler::{Outcome, RunConfig};
use crate::stats::RunStats;

/// Complete record of one benchmark run
#[derive(Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub suite_name: String,
    pub suite_version: u32,
    pub config: RunConfig,
    pub cancelled: bool,
    pub stats: RunStats,
    pub outcomes: Vec<Outcome>,
}

impl RunReport {
    pub fn new(
        suite_name: &str,
        suite_version: u32,
        config: RunConfig,
        result: crate::scheduler::RunResult,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            suite_name: suite_name.to_string(),
            suite_version,
            config,
            cancelled: result.cancelled,
            stats: result.stats,
            outcomes: result.outcomes,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// Render the markdown comparison report
pub fn render_markdown(report: &RunReport) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Benchmark: {}\n\n", report.suite_name));
    md.push_str(&format!(
        "Run `{}` at {}{}\n\n",
        report.run_id,
        report.created_at.to_rfc3339(),
        if report.cancelled { " (cancelled)" } else { "" }
    ));
    let saved = report.stats.total_saved();
    md.push_str(&format!(
        "{} invocations ({} reused), total cost ${:.4}{}\n\n",
        report.stats.total_runs(),
        report.stats.total_reused(),
        report.stats.total_cost(),
        if saved > 0.0 {
            format!(" (saved ${:.4} via reuse)", saved)
        } else {
            String::new()
        }
    ));

    if let Some(winner) = report.stats.winner() {
        md.push_str(&format!("**Winner:** `{}`\n\n", winner));
    }

    md.push_str("## Models\n\n");
    md.push_str(
        "| Model | Grade | Pass rate | Mean score | Mean latency | Tokens | Cost | Reused |\n",
    );
    md.push_str("|---|---|---|---|---|---|---|---|\n");
    for (model, stats) in &report.stats.models {
        let o = &stats.overall;
        md.push_str(&format!(
            "| `{}` | {} | {:.0}% | {:.2} | {}ms | {} | ${:.4} | {} |\n",
            model,
            stats.grade(),
            o.pass_rate() * 100.0,
            o.mean_weighted(),
            o.mean_latency_ms(),
            o.total_tokens,
            o.total_cost,
            o.reused,
        ));
    }

    for (model, stats) in &report.stats.models {
        md.push_str(&format!("\n## {}\n\n", model));
        md.push_str("| Test | Pass rate | Mean score | Mean latency | Failures |\n");
        md.push_str("|---|---|---|---|---|\n");
        for (test_id, agg) in &stats.per_test {
            md.push_str(&format!(
                "| {} | {:.0}% | {:.2} | {}ms | {} |\n",
                test_id,
                agg.pass_rate() * 100.0,
                agg.mean_weighted(),
                agg.mean_latency_ms(),
                agg.failures,
            ));
        }
    }

    md
}

/// Flat per-model/per-test aggregate for a charting layer
pub fn dashboard_json(report: &RunReport) -> serde_json::Value {
    let models: Vec<_> = report
        .stats
        .models
        .iter()
        .map(|(model, stats)| {
            let tests: Vec<_> = stats
                .per_test
                .iter()
                .map(|(test_id, agg)| {
                    json!({
                        "test": test_id,
                        "pass_rate": agg.pass_rate(),
                        "mean_score": agg.mean_weighted(),
                        "mean_latency_ms": agg.mean_latency_ms(),
                        "failures": agg.failures,
                    })
                })
                .collect();
            json!({
                "model": model,
                "grade": stats.grade(),
                "pass_rate": stats.overall.pass_rate(),
                "mean_score": stats.overall.mean_weighted(),
                "mean_latency_ms": stats.overall.mean_latency_ms(),
                "min_latency_ms": stats.overall.min_latency_ms(),
                "max_latency_ms": stats.overall.max_latency_ms(),
                "total_tokens": stats.overall.total_tokens,
                "total_cost": stats.overall.total_cost,
                "saved_cost": stats.overall.saved_cost,
                "reused": stats.overall.reused,
                "tests": tests,
            })
        })
        .collect();

    json!({
        "run_id": report.run_id,
        "suite": report.suite_name,
        "created_at": report.created_at.to_rfc3339(),
        "winner": report.stats.winner(),
        "models": models,
    })
}

/// Write the JSON, markdown, and dashboard files into `out_dir`.
/// Returns the paths written.
pub fn write_reports(report: &RunReport, out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let stamp = report.created_at.format("%Y%m%d-%H%M%S");
    let mut written = Vec::new();

    let json_path = out_dir.join(format!("run-{}.json", stamp));
    fs::write(&json_path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;
    written.push(json_path);

    let md_path = out_dir.join(format!("report-{}.md", stamp));
    fs::write(&md_path, render_markdown(report))
        .with_context(|| format!("Failed to write {}", md_path.display()))?;
    written.push(md_path);

    let dash_path = out_dir.join(format!("dashboard-{}.json", stamp));
    fs::write(&dash_path, serde_json::to_string_pretty(&dashboard_json(report))?)
        .with_context(|| format!("Failed to write {}", dash_path.display()))?;
    written.push(dash_path);

    Ok(written)
}
