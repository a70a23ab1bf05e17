//! Incremental run statistics
//!
//! Aggregates update one outcome at a time as the scheduler's workers
//! report in; nothing here re-reads raw outcomes after the fact.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Running aggregate over a stream of outcomes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Aggregate {
    pub runs: usize,
    pub reused: usize,
    pub passes: usize,
    pub failures: usize,
    pub total_tokens: u64,
    /// Dollars actually spent on live invocations this run
    pub total_cost: f64,
    /// Dollars the reused artifacts cost when first paid for
    pub saved_cost: f64,
    score_sum: f64,
    raw_sum: f64,
    latency_sum_ms: u64,
    latency_min_ms: u64,
    latency_max_ms: u64,
}

impl Aggregate {
    /// Fold in a scored outcome
    pub fn record(
        &mut self,
        raw: f64,
        weighted: f64,
        passed: bool,
        latency_ms: u64,
        tokens: u64,
        cost: f64,
        reused: bool,
    ) {
        self.runs += 1;
        if reused {
            self.reused += 1;
            // Historical spend, not this run's bill
            self.saved_cost += cost;
        } else {
            self.total_cost += cost;
        }
        if passed {
            self.passes += 1;
        }
        self.raw_sum += raw;
        self.score_sum += weighted;
        self.total_tokens += tokens;

        self.latency_sum_ms += latency_ms;
        if self.runs == 1 || latency_ms < self.latency_min_ms {
            self.latency_min_ms = latency_ms;
        }
        if latency_ms > self.latency_max_ms {
            self.latency_max_ms = latency_ms;
        }
    }

    /// Fold in a failed or timed-out invocation (score 0)
    pub fn record_failure(&mut self, latency_ms: u64) {
        self.runs += 1;
        self.failures += 1;
        self.latency_sum_ms += latency_ms;
        if self.runs == 1 || latency_ms < self.latency_min_ms {
            self.latency_min_ms = latency_ms;
        }
        if latency_ms > self.latency_max_ms {
            self.latency_max_ms = latency_ms;
        }
    }

    pub fn mean_weighted(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.score_sum / self.runs as f64
        }
    }

    pub fn mean_raw(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.raw_sum / self.runs as f64
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.passes as f64 / self.runs as f64
        }
    }

    pub fn mean_latency_ms(&self) -> u64 {
        if self.runs == 0 {
            0
        } else {
            self.latency_sum_ms / self.runs as u64
        }
    }

    pub fn min_latency_ms(&self) -> u64 {
        self.latency_min_ms
    }

    pub fn max_latency_ms(&self) -> u64 {
        self.latency_max_ms
    }
}

/// Per-model statistics: an overall aggregate plus one per test
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelStats {
    pub overall: Aggregate,
    pub per_test: BTreeMap<String, Aggregate>,
}

impl ModelStats {
    /// Letter grade from mean weighted score, matching the "Mean score"
    /// column in reports. Test weights shift grades by design: a suite
    /// heavy on high-weight tests grades its passers higher.
    pub fn grade(&self) -> &'static str {
        let avg = self.overall.mean_weighted();
        match avg {
            x if x >= 0.95 => "A+",
            x if x >= 0.90 => "A",
            x if x >= 0.80 => "B+",
            x if x >= 0.70 => "B",
            x if x >= 0.60 => "C+",
            x if x >= 0.50 => "C",
            x if x >= 0.35 => "D",
            _ => "F",
        }
    }
}

/// Statistics for a whole run, keyed by model id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub models: BTreeMap<String, ModelStats>,
}

impl RunStats {
    pub fn record(
        &mut self,
        model: &str,
        test_id: &str,
        raw: f64,
        weighted: f64,
        passed: bool,
        latency_ms: u64,
        tokens: u64,
        cost: f64,
        reused: bool,
    ) {
        let stats = self.models.entry(model.to_string()).or_default();
        stats
            .overall
            .record(raw, weighted, passed, latency_ms, tokens, cost, reused);
        stats
            .per_test
            .entry(test_id.to_string())
            .or_default()
            .record(raw, weighted, passed, latency_ms, tokens, cost, reused);
    }

    pub fn record_failure(&mut self, model: &str, test_id: &str, latency_ms: u64) {
        let stats = self.models.entry(model.to_string()).or_default();
        stats.overall.record_failure(latency_ms);
        stats
            .per_test
            .entry(test_id.to_string())
            .or_default()
            .record_failure(latency_ms);
    }

    /// Model with the highest mean weighted score
    pub fn winner(&self) -> Option<&str> {
        self.models
            .iter()
            .max_by(|(_, a), (_, b)| {
                a.overall
                    .mean_weighted()
                    .partial_cmp(&b.overall.mean_weighted())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(id, _)| id.as_str())
    }

    pub fn total_runs(&self) -> usize {
        self.models.values().map(|m| m.overall.runs).sum()
    }

    pub fn total_reused(&self) -> usize {
        self.models.values().map(|m| m.overall.reused).sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.models.values().map(|m| m.overall.total_cost).sum()
    }

    pub fn total_saved(&self) -> f64 {
        self.models.values().map(|m| m.overall.saved_cost).sum()
    }
}
