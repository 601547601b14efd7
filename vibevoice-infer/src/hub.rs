//! Checkpoint file retrieval through the Hugging Face hub cache.

use std::fs;
use std::path::{Path, PathBuf};

use candle_hf_hub::api::sync::Api;
use tracing::{debug, info};

use crate::{InferError, Result};

/// Fallback tokenizer repo for checkpoints that ship none of their own.
const TOKENIZER_FALLBACK_REPO: &str = "Qwen/Qwen2.5-0.5B";

/// Local paths of the files a checkpoint load needs.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub model_dir: PathBuf,
    pub config: PathBuf,
    pub weights: PathBuf,
    pub tokenizer: PathBuf,
}

/// Fetch (or reuse from the hub cache) the files for `repo_id`.
///
/// A local directory path works too: it is used as-is without touching the
/// network. The hub API honors `HF_HOME` for its cache location.
pub fn fetch_model_files(repo_id: &str) -> Result<ModelFiles> {
    let local = Path::new(repo_id);
    if local.is_dir() {
        debug!(dir = %local.display(), "using local model directory");
        return files_from_dir(local);
    }

    info!(repo = repo_id, "fetching model files");

    let api = Api::new()
        .map_err(|e| InferError::Download(format!("failed to create hub API: {e}")))?;
    let repo = api.model(repo_id.to_string());

    let config = repo
        .get("config.json")
        .map_err(|e| InferError::Download(format!("config.json from {repo_id}: {e}")))?;
    let model_dir = config
        .parent()
        .ok_or_else(|| InferError::Download("config.json has no parent directory".to_string()))?
        .to_path_buf();

    let weights = repo
        .get("model.safetensors")
        .map_err(|e| InferError::Download(format!("model.safetensors from {repo_id}: {e}")))?;

    // Prefer the checkpoint's own tokenizer; fall back to the Qwen base model
    // and keep a copy next to the weights, as the reference checkpoints do.
    let tokenizer = match repo.get("tokenizer.json") {
        Ok(path) => path,
        Err(_) => {
            let dest = model_dir.join("tokenizer.json");
            if !dest.exists() {
                info!(repo = TOKENIZER_FALLBACK_REPO, "downloading fallback tokenizer");
                let src = api
                    .model(TOKENIZER_FALLBACK_REPO.to_string())
                    .get("tokenizer.json")
                    .map_err(|e| {
                        InferError::Download(format!(
                            "tokenizer.json from {TOKENIZER_FALLBACK_REPO}: {e}"
                        ))
                    })?;
                fs::copy(&src, &dest)?;
            }
            dest
        }
    };

    info!(dir = %model_dir.display(), "✓ model files cached");

    Ok(ModelFiles {
        model_dir,
        config,
        weights,
        tokenizer,
    })
}

fn files_from_dir(dir: &Path) -> Result<ModelFiles> {
    let config = dir.join("config.json");
    let weights = dir.join("model.safetensors");
    let tokenizer = dir.join("tokenizer.json");

    for (label, path) in [
        ("config.json", &config),
        ("model.safetensors", &weights),
        ("tokenizer.json", &tokenizer),
    ] {
        if !path.exists() {
            return Err(InferError::Initialization(format!(
                "local model directory {} is missing {label}",
                dir.display()
            )));
        }
    }

    Ok(ModelFiles {
        model_dir: dir.to_path_buf(),
        config,
        weights,
        tokenizer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_dir_must_contain_all_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), "{}").unwrap();

        let err = fetch_model_files(dir.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, InferError::Initialization(_)));
    }

    #[test]
    fn complete_local_dir_resolves_without_network() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["config.json", "model.safetensors", "tokenizer.json"] {
            fs::write(dir.path().join(name), "").unwrap();
        }

        let files = fetch_model_files(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(files.model_dir, dir.path());
        assert!(files.weights.ends_with("model.safetensors"));
    }
}
