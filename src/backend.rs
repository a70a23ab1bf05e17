//! Backend seam for model invocations
//!
//! The scheduler treats a model call as an opaque async operation behind
//! this trait. Production uses the OpenRouter client; tests plug in a
//! scripted mock.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Token usage statistics for one completion
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A completed model invocation
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// Opaque model invocation
#[async_trait]
pub trait Backend: Send + Sync {
    /// Human-readable backend name for logs and reports
    fn name(&self) -> &str;

    /// Send one prompt to one model and return the full response
    async fn complete(&self, model: &str, prompt: &str, max_tokens: u32) -> Result<Completion>;
}

/// Estimate token count from text (~4 chars per token for English)
pub fn estimate_tokens(text: &str) -> u32 {
    (text.len() as f64 / 4.0).ceil() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
