//! promptbench - LLM prompt benchmarking harness
//!
//! Sends fixed prompts to multiple model backends, scores responses
//! against expected/forbidden substrings, tracks cost and latency, and
//! writes comparison reports. Prior responses are reused by content
//! signature so repeated runs only pay for what changed.

pub mod artifacts;
pub mod backend;
pub mod client;
pub mod config;
pub mod models;
pub mod report;
pub mod scheduler;
pub mod score;
pub mod stats;
pub mod suite;
