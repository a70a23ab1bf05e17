//! Test suite definitions and JSON loading
//!
//! A suite is a named set of prompts, each with expected and forbidden
//! substrings. Suites load from JSON files; a built-in default suite
//! ships in the binary so `promptbench run` works out of the box.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// A single benchmark test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    /// The prompt sent to the model
    pub prompt: String,
    /// Extra context appended to the prompt (code samples etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Substrings a good response contains (case-insensitive)
    #[serde(default)]
    pub expect: Vec<String>,
    /// Substrings a good response avoids (case-insensitive)
    #[serde(default)]
    pub forbid: Vec<String>,
    /// Completion token cap for this test
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Difficulty multiplier applied to the raw score
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_max_tokens() -> u32 { 500 }
fn default_weight() -> f64 { 1.0 }

impl TestCase {
    /// Full prompt as sent to the backend: prompt plus optional context
    pub fn full_prompt(&self) -> String {
        match &self.context {
            Some(ctx) => format!("{}\n\nContext:\n{}", self.prompt, ctx),
            None => self.prompt.clone(),
        }
    }
}

/// A named collection of test cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suite {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub tests: Vec<TestCase>,
}

fn default_version() -> u32 { 1 }

/// Suite validation failures
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("suite contains no tests")]
    Empty,
    #[error("duplicate test id: {0}")]
    DuplicateId(String),
    #[error("test {0} has an empty prompt")]
    EmptyPrompt(String),
    #[error("test {0} has zero max_tokens")]
    ZeroMaxTokens(String),
}

impl Suite {
    /// Load a suite from a JSON file and validate it
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read suite {}", path.display()))?;
        let suite: Suite = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse suite {}", path.display()))?;
        suite.validate()?;
        Ok(suite)
    }

    /// Check structural invariants
    pub fn validate(&self) -> Result<(), SuiteError> {
        if self.tests.is_empty() {
            return Err(SuiteError::Empty);
        }
        let mut seen = HashSet::new();
        for test in &self.tests {
            if !seen.insert(test.id.as_str()) {
                return Err(SuiteError::DuplicateId(test.id.clone()));
            }
            if test.prompt.trim().is_empty() {
                return Err(SuiteError::EmptyPrompt(test.id.clone()));
            }
            if test.max_tokens == 0 {
                return Err(SuiteError::ZeroMaxTokens(test.id.clone()));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&TestCase> {
        self.tests.iter().find(|t| t.id == id)
    }

    pub fn count(&self) -> usize {
        self.tests.len()
    }
}

/// Built-in default suite: general capability checks
pub fn builtin_suite() -> Suite {
    Suite {
        name: "builtin".into(),
        version: 1,
        tests: vec![
            TestCase {
                id: "explain-ownership".into(),
                prompt: "Explain Rust's ownership model. Cover moves, borrows, and lifetimes."
                    .into(),
                context: None,
                expect: vec![
                    "ownership".into(),
                    "borrow".into(),
                    "move".into(),
                    "lifetime".into(),
                ],
                forbid: vec!["garbage collect".into()],
                max_tokens: 500,
                weight: 1.0,
            },
            TestCase {
                id: "dead-code".into(),
                prompt: "Identify dead code in this Rust module. List functions that are never \
                         called, unused imports, and unreachable code paths."
                    .into(),
                context: Some(SAMPLE_DEAD_CODE.into()),
                expect: vec![
                    "unused".into(),
                    "dead".into(),
                    "remove".into(),
                ],
                forbid: vec!["add".into(), "implement".into()],
                max_tokens: 500,
                weight: 1.0,
            },
            TestCase {
                id: "security-scan".into(),
                prompt: "Scan for security issues. Check for: SQL injection, command injection, \
                         path traversal, hardcoded secrets."
                    .into(),
                context: Some(SAMPLE_VULNERABLE.into()),
                expect: vec![
                    "injection".into(),
                    "sanitize".into(),
                    "validate".into(),
                ],
                forbid: vec!["no issues".into(), "looks secure".into()],
                max_tokens: 700,
                weight: 1.5,
            },
            TestCase {
                id: "perf-hotspots".into(),
                prompt: "Identify performance hotspots. Look for unnecessary allocations, \
                         quadratic loops, and missing caching."
                    .into(),
                context: Some(SAMPLE_SLOW_CODE.into()),
                expect: vec![
                    "O(n".into(),
                    "clone".into(),
                    "cache".into(),
                ],
                forbid: vec![],
                max_tokens: 600,
                weight: 1.3,
            },
            TestCase {
                id: "summarize-json".into(),
                prompt: "Summarize what this JSON document describes in two sentences.".into(),
                context: Some(SAMPLE_JSON.into()),
                expect: vec!["deploy".into(), "service".into()],
                forbid: vec!["cannot".into(), "unable to".into()],
                max_tokens: 200,
                weight: 0.8,
            },
        ],
    }
}

const SAMPLE_DEAD_CODE: &str = r#"
use std::collections::HashMap;
use std::io::{Read, Write}; // Write is never used

pub fn process_data(data: &str) -> String {
    data.to_uppercase()
}

fn unused_helper() -> i32 {
    42
}

pub fn main_logic(input: Vec<String>) -> Vec<String> {
    input.into_iter().map(|s| process_data(&s)).collect()
}

fn another_unused() {
    println!("This is never called");
}
"#;

const SAMPLE_VULNERABLE: &str = r#"
fn execute_query(user_input: &str) -> Result<Data> {
    let query = format!("SELECT * FROM users WHERE name = '{}'", user_input);
    db.execute(&query)
}

fn run_command(cmd: &str) -> String {
    std::process::Command::new("sh").arg("-c").arg(cmd).output().unwrap().stdout
}

const API_KEY: &str = "sk-1234567890abcdef";
"#;

const SAMPLE_SLOW_CODE: &str = r#"
fn find_duplicates(items: &[String]) -> Vec<String> {
    let mut duplicates = Vec::new();
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if items[i] == items[j] && !duplicates.contains(&items[i]) {
                duplicates.push(items[i].clone());
            }
        }
    }
    duplicates
}
"#;

const SAMPLE_JSON: &str = r#"
{
  "kind": "Deployment",
  "service": "billing-api",
  "replicas": 3,
  "strategy": "rolling",
  "healthcheck": "/healthz"
}
"#;
