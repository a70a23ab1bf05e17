//! Response scoring against expected/forbidden substrings
//!
//! Matching is case-insensitive substring containment, nothing fancier.
//! Scoring is pure: the same (test, response) always yields the same score,
//! which is what lets reused artifacts be re-scored against edited suites.

use serde::{Deserialize, Serialize};

use crate::suite::TestCase;

/// Score for a single response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    /// Fraction of expected substrings present (1.0 if none defined)
    pub relevance: f64,
    /// 1 - fraction of forbidden substrings present (1.0 if none defined)
    pub precision: f64,
    /// Unweighted combination of relevance and precision
    pub raw: f64,
    /// raw * test weight
    pub weighted: f64,
    /// All expected present and no forbidden present
    pub passed: bool,
}

impl Score {
    /// Score a response against a test case
    pub fn compute(test: &TestCase, response: &str) -> Self {
        let response_lower = response.to_lowercase();

        let expected_hits = test
            .expect
            .iter()
            .filter(|e| response_lower.contains(&e.to_lowercase()))
            .count();
        let relevance = if test.expect.is_empty() {
            1.0
        } else {
            expected_hits as f64 / test.expect.len() as f64
        };

        let forbidden_hits = test
            .forbid
            .iter()
            .filter(|f| response_lower.contains(&f.to_lowercase()))
            .count();
        let precision = if test.forbid.is_empty() {
            1.0
        } else {
            1.0 - (forbidden_hits as f64 / test.forbid.len() as f64)
        };

        let raw = relevance * 0.7 + precision * 0.3;
        let weighted = raw * test.weight;
        let passed = expected_hits == test.expect.len() && forbidden_hits == 0;

        Self {
            relevance,
            precision,
            raw,
            weighted,
            passed,
        }
    }

    /// Zero score for a failed or timed-out invocation
    pub fn failed() -> Self {
        Self {
            relevance: 0.0,
            precision: 0.0,
            raw: 0.0,
            weighted: 0.0,
            passed: false,
        }
    }
}
