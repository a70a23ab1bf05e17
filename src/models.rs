//! Model catalog management with caching
//!
//! Fetches the model list from OpenRouter, caches it for 24 hours, and
//! exposes per-model pricing for cost computation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::config;

/// Model information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub name: String,
    pub context_length: u32,
    /// $/token for prompt tokens
    pub pricing_prompt: f64,
    /// $/token for completion tokens
    pub pricing_completion: f64,
}

impl Model {
    /// Check if model is free (both prompt and completion pricing are 0)
    pub fn is_free(&self) -> bool {
        self.pricing_prompt == 0.0 && self.pricing_completion == 0.0
    }

    /// Shorter name for report tables
    pub fn display_name(&self) -> String {
        if let Some(name) = self.id.split('/').nth(1) {
            name.to_string()
        } else {
            self.id.clone()
        }
    }

    /// Cost in dollars for one invocation's token usage
    pub fn cost(&self, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        prompt_tokens as f64 * self.pricing_prompt
            + completion_tokens as f64 * self.pricing_completion
    }
}

/// Cached catalog data
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsCache {
    pub models: Vec<Model>,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
}

fn cache_path() -> Result<std::path::PathBuf> {
    Ok(config::cache_dir()?.join("models.json"))
}

/// Load catalog from cache; None if missing or older than 24 hours
pub fn load_cache() -> Result<Option<ModelsCache>> {
    let path = cache_path()?;
    if !path.exists() {
        return Ok(None);
    }

    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;

    let cache: ModelsCache = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let age = chrono::Utc::now() - cache.fetched_at;
    if age > chrono::Duration::hours(24) {
        return Ok(None);
    }

    Ok(Some(cache))
}

/// Save catalog to cache
pub fn save_cache(models: &[Model]) -> Result<()> {
    config::ensure_dirs()?;
    let path = cache_path()?;

    let cache = ModelsCache {
        models: models.to_vec(),
        fetched_at: chrono::Utc::now(),
    };

    let content = serde_json::to_string_pretty(&cache)?;
    fs::write(&path, &content).with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

/// Load catalog from cache or fetch from the API
pub async fn load_or_fetch(api_key: &str) -> Result<Vec<Model>> {
    if let Some(cache) = load_cache()? {
        return Ok(cache.models);
    }

    let models = crate::client::fetch_models(api_key).await?;
    save_cache(&models)?;
    Ok(models)
}

/// Free models only, widest context first
pub fn get_free_models(models: &[Model]) -> Vec<&Model> {
    let mut free: Vec<_> = models.iter().filter(|m| m.is_free()).collect();
    free.sort_by(|a, b| b.context_length.cmp(&a.context_length));
    free
}

/// Look up a model by id
pub fn find<'a>(models: &'a [Model], id: &str) -> Option<&'a Model> {
    models.iter().find(|m| m.id == id)
}
