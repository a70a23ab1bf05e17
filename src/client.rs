//! OpenRouter API client
//!
//! Non-streaming Chat Completions calls. The scheduler drives whole
//! request/response cycles and races them against its own timeout, so
//! there is no SSE plumbing and no client-side retry here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backend::{estimate_tokens, Backend, Completion, TokenUsage};
use crate::models::Model;

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const OPENROUTER_MODELS_URL: &str = "https://openrouter.ai/api/v1/models";

/// OpenRouter-backed model invocations
pub struct OpenRouterBackend {
    client: reqwest::Client,
    api_key: String,
    temperature: f32,
}

impl OpenRouterBackend {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            // Low temperature: benchmark runs should be as repeatable as the
            // provider allows
            temperature: 0.2,
        }
    }
}

#[async_trait]
impl Backend for OpenRouterBackend {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, model: &str, prompt: &str, max_tokens: u32) -> Result<Completion> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: Some(max_tokens),
            temperature: Some(self.temperature),
        };

        let response = self
            .client
            .post(OPENROUTER_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "promptbench")
            .json(&request)
            .send()
            .await
            .context("Failed to connect to OpenRouter")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error {}: {}", status, body);
        }

        let data: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat response")?;

        let text = data
            .choices
            .first()
            .and_then(|c| c.message.as_ref())
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let usage = match data.usage {
            Some(u) => TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            },
            // Some providers omit usage; fall back to a length estimate
            None => TokenUsage {
                prompt_tokens: estimate_tokens(prompt),
                completion_tokens: estimate_tokens(&text),
                total_tokens: estimate_tokens(prompt) + estimate_tokens(&text),
            },
        };

        Ok(Completion { text, usage })
    }
}

/// Check connectivity to OpenRouter
pub async fn check_connectivity() -> Result<()> {
    let client = reqwest::Client::new();
    client
        .get(OPENROUTER_MODELS_URL)
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await
        .context("Failed to connect to OpenRouter")?;
    Ok(())
}

/// Fetch the model catalog from OpenRouter
pub async fn fetch_models(api_key: &str) -> Result<Vec<Model>> {
    let client = reqwest::Client::new();

    let response = client
        .get(OPENROUTER_MODELS_URL)
        .header("Authorization", format!("Bearer {}", api_key))
        .send()
        .await
        .context("Failed to fetch models")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("API error {}: {}", status, body);
    }

    let data: ModelsResponse = response
        .json()
        .await
        .context("Failed to parse models response")?;

    let models: Vec<Model> = data
        .data
        .into_iter()
        .map(|m| {
            let (pricing_prompt, pricing_completion) = match m.pricing {
                Some(p) => (
                    p.prompt.parse().unwrap_or(0.0),
                    p.completion.parse().unwrap_or(0.0),
                ),
                None => (0.0, 0.0),
            };

            Model {
                id: m.id,
                name: m.name.unwrap_or_default(),
                context_length: m.context_length.unwrap_or(4096),
                pricing_prompt,
                pricing_completion,
            }
        })
        .collect();

    Ok(models)
}

// ═══════════════════════════════════════════════════════════════
// API Types
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ApiModel>,
}

#[derive(Debug, Deserialize)]
struct ApiModel {
    id: String,
    name: Option<String>,
    context_length: Option<u32>,
    pricing: Option<ApiPricing>,
}

#[derive(Debug, Deserialize)]
struct ApiPricing {
    prompt: String,
    completion: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_response() {
        let json = r#"{
            "choices":[{"message":{"role":"assistant","content":"Hello"}}],
            "usage":{"prompt_tokens":12,"completion_tokens":3,"total_tokens":15}
        }"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.choices[0].message.as_ref().unwrap().content,
            "Hello"
        );
        assert_eq!(resp.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_parse_chat_response_without_usage() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"Hi"}}]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(resp.usage.is_none());
    }

    #[test]
    fn test_parse_models_response() {
        let json = r#"{"data":[{"id":"test/model","context_length":8192,"pricing":{"prompt":"0","completion":"0"}}]}"#;
        let resp: ModelsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.len(), 1);
        assert_eq!(resp.data[0].id, "test/model");
    }
}
