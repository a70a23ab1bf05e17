//! Run artifact persistence and signature-based reuse
//!
//! Every successful model invocation is saved as a JSON file under
//! ~/.local/state/promptbench/artifacts/, keyed by a content signature
//! over what was actually asked of the backend. Later runs with the same
//! signature consume these artifacts instead of re-invoking the model.
//!
//! The signature deliberately excludes scoring criteria: editing a test's
//! expect/forbid lists re-scores cached responses rather than discarding
//! them.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::backend::TokenUsage;

/// Content signature for one invocation: model, full prompt, token cap.
/// Anything that changes what the backend would be asked changes this.
pub fn signature(model: &str, prompt: &str, max_tokens: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(prompt.as_bytes());
    hasher.update([0u8]);
    hasher.update(max_tokens.to_le_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// One persisted model invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunArtifact {
    pub signature: String,
    pub model: String,
    pub test_id: String,
    pub response: String,
    pub usage: TokenUsage,
    pub latency_ms: u64,
    pub cost: f64,
    pub created_at: DateTime<Utc>,
}

/// On-disk artifact store with an in-memory signature index
pub struct ArtifactStore {
    dir: PathBuf,
    index: HashMap<String, Vec<RunArtifact>>,
}

impl ArtifactStore {
    /// Open the store, scanning the directory into the index.
    /// Unparseable files are skipped with a warning.
    pub fn open(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut index: HashMap<String, Vec<RunArtifact>> = HashMap::new();

        for entry in fs::read_dir(&dir)
            .with_context(|| format!("Failed to read {}", dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let content = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("warning: skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            match serde_json::from_str::<RunArtifact>(&content) {
                Ok(artifact) => {
                    index.entry(artifact.signature.clone()).or_default().push(artifact);
                }
                Err(e) => {
                    eprintln!("warning: skipping {}: {}", path.display(), e);
                }
            }
        }

        // Oldest first so reuse is deterministic across runs
        for artifacts in index.values_mut() {
            artifacts.sort_by_key(|a| a.created_at);
        }

        Ok(Self { dir, index })
    }

    /// Default store location under the XDG state dir
    pub fn default_dir() -> Result<PathBuf> {
        Ok(crate::config::state_dir()?.join("artifacts"))
    }

    /// How many artifacts exist for a signature
    pub fn count(&self, sig: &str) -> usize {
        self.index.get(sig).map_or(0, |v| v.len())
    }

    /// Take up to `n` artifacts for a signature, oldest first.
    /// The artifacts stay in the store; "take" only means "hand out for this
    /// run", so two runs of the same suite reuse the same artifacts.
    pub fn take(&self, sig: &str, n: usize) -> Vec<RunArtifact> {
        match self.index.get(sig) {
            Some(artifacts) => artifacts.iter().take(n).cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Persist an artifact and add it to the index
    pub fn append(&mut self, artifact: RunArtifact) -> Result<()> {
        // Signatures from signature() are 64 hex chars, but a
        // hand-constructed artifact may carry anything
        let prefix = artifact.signature.get(..16).unwrap_or(&artifact.signature);
        let filename = format!("{}-{}.json", prefix, uuid::Uuid::new_v4());
        let path = self.dir.join(filename);

        let content = serde_json::to_string_pretty(&artifact)?;
        fs::write(&path, &content)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        self.index
            .entry(artifact.signature.clone())
            .or_default()
            .push(artifact);

        Ok(())
    }

    /// Total artifacts in the store
    pub fn len(&self) -> usize {
        self.index.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(sig: &str, test_id: &str) -> RunArtifact {
        RunArtifact {
            signature: sig.to_string(),
            model: "test/model".into(),
            test_id: test_id.into(),
            response: "a response".into(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            },
            latency_ms: 120,
            cost: 0.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_signature_stable() {
        let a = signature("m/x", "hello", 100);
        let b = signature("m/x", "hello", 100);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_signature_sensitive_to_inputs() {
        let base = signature("m/x", "hello", 100);
        assert_ne!(base, signature("m/y", "hello", 100));
        assert_ne!(base, signature("m/x", "hello!", 100));
        assert_ne!(base, signature("m/x", "hello", 200));
    }

    #[test]
    fn test_signature_no_field_collision() {
        // NUL separators keep (model, prompt) boundaries unambiguous
        assert_ne!(signature("ab", "c", 1), signature("a", "bc", 1));
    }

    #[test]
    fn test_store_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let sig = signature("m/x", "hello", 100);

        {
            let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();
            let mut art = artifact(&sig, "t1");
            art.signature = sig.clone();
            store.append(art).unwrap();
            assert_eq!(store.count(&sig), 1);
        }

        // Reopen: index rebuilt from disk
        let store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();
        assert_eq!(store.count(&sig), 1);
        let taken = store.take(&sig, 5);
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].test_id, "t1");
    }

    #[test]
    fn test_take_caps_at_n() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();
        let sig = signature("m/x", "p", 50);
        for _ in 0..3 {
            store.append(artifact(&sig, "t1")).unwrap();
        }
        assert_eq!(store.take(&sig, 2).len(), 2);
        assert_eq!(store.take(&sig, 10).len(), 3);
        assert_eq!(store.take("unknown", 10).len(), 0);
    }

    #[test]
    fn test_append_with_short_signature() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();
        store.append(artifact("abc", "t1")).unwrap();
        assert_eq!(store.count("abc"), 1);

        let reopened = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();
        assert_eq!(reopened.count("abc"), 1);
    }

    #[test]
    fn test_bad_file_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("garbage.json"), "not json at all").unwrap();
        let store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_non_json_files_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("README.txt"), "notes").unwrap();
        let store = ArtifactStore::open(tmp.path().to_path_buf()).unwrap();
        assert!(store.is_empty());
    }
}
