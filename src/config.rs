//! Configuration management with XDG paths
//!
//! ~/.config/promptbench/config.json - API key, run defaults (0600)
//! ~/.cache/promptbench/models.json  - Cached model catalog
//! ~/.local/state/promptbench/       - Run artifacts

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

const APP_NAME: &str = "promptbench";

/// Get config directory (~/.config/promptbench/)
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .context("Could not determine config directory")?;
    Ok(base.join(APP_NAME))
}

/// Get cache directory (~/.cache/promptbench/)
pub fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .context("Could not determine cache directory")?;
    Ok(base.join(APP_NAME))
}

/// Get state directory (~/.local/state/promptbench/)
pub fn state_dir() -> Result<PathBuf> {
    let base = dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
        .context("Could not determine state directory")?;
    Ok(base.join(APP_NAME))
}

/// Get config file path
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

/// Ensure all directories exist
pub fn ensure_dirs() -> Result<()> {
    fs::create_dir_all(config_dir()?)?;
    fs::create_dir_all(cache_dir()?)?;
    fs::create_dir_all(state_dir()?)?;
    Ok(())
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OpenRouter API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Models to benchmark when --models is not given
    #[serde(default)]
    pub default_models: Vec<String>,

    /// Benchmark only free models by default
    #[serde(default)]
    pub free_only: bool,

    /// Max concurrent model invocations
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Per-job timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Runs per (model, test) pair
    #[serde(default = "default_runs")]
    pub runs_per_test: usize,

    /// Reuse prior run artifacts by content signature
    #[serde(default = "default_true")]
    pub reuse_artifacts: bool,

    /// Output directory for reports
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
}

fn default_max_concurrent() -> usize { 3 }
fn default_timeout_secs() -> u64 { 60 }
fn default_runs() -> usize { 1 }
fn default_true() -> bool { true }
fn default_out_dir() -> String { "bench-results".to_string() }

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            default_models: vec![],
            free_only: false,
            max_concurrent: default_max_concurrent(),
            timeout_secs: default_timeout_secs(),
            runs_per_test: default_runs(),
            reuse_artifacts: default_true(),
            out_dir: default_out_dir(),
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults
    pub fn load() -> Result<Self> {
        ensure_dirs()?;
        let path = config_path()?;

        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to disk with secure permissions
    pub fn save(&self) -> Result<()> {
        ensure_dirs()?;
        let path = config_path()?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, &content)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        // 0600: config holds the API key
        let mut perms = fs::metadata(&path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&path, perms)?;

        Ok(())
    }

    /// Apply a `config set <key> <value>` update
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "key" | "api_key" => self.api_key = Some(value.to_string()),
            "models" => {
                self.default_models = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "free_only" => self.free_only = value.parse().context("Expected true/false")?,
            "max_concurrent" => {
                self.max_concurrent = value.parse().context("Expected a number")?;
            }
            "timeout_secs" => self.timeout_secs = value.parse().context("Expected a number")?,
            "runs_per_test" => self.runs_per_test = value.parse().context("Expected a number")?,
            "reuse_artifacts" => {
                self.reuse_artifacts = value.parse().context("Expected true/false")?;
            }
            "out_dir" => self.out_dir = value.to_string(),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }
}

/// Get API key from config or environment
pub fn get_api_key() -> Result<String> {
    // Environment variable takes precedence
    if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
        if !key.is_empty() {
            return Ok(key);
        }
    }

    let cfg = Config::load()?;
    cfg.api_key.context(
        "No API key configured. Set OPENROUTER_API_KEY or run: promptbench config set key <your-key>",
    )
}
