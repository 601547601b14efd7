//! Model loading with a two-deep fallback chain.
//!
//! The specialized VibeVoice interface is tried first; checkpoints it cannot
//! claim are loaded as a plain causal LM with an auxiliary processor. The
//! result is a tagged union the caller pattern-matches to pick the synthesis
//! routine.

use candle_transformers::models::qwen2::ModelForCausalLM;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::config::load_llm_config;
use crate::device::Compute;
use crate::hub::{fetch_model_files, ModelFiles};
use crate::prompt_audio::load_prompt_wav;
use crate::session::{language_model_varbuilder, VibeVoiceSession};
use crate::{InferError, Result};

use candle_core::Tensor;
use std::path::Path;

/// Sample rate of the generic processor's feature extractor.
const GENERIC_SAMPLE_RATE: u32 = 16_000;

/// A loaded model, in whichever shape the fallback chain produced.
pub enum LoadedModel {
    /// The specialized VibeVoice interface.
    Specialized(VibeVoiceSession),
    /// Generic causal LM plus the auxiliary processor.
    Generic {
        model: CausalLm,
        processor: Processor,
    },
}

impl LoadedModel {
    pub fn kind(&self) -> &'static str {
        match self {
            LoadedModel::Specialized(_) => "specialized",
            LoadedModel::Generic { .. } => "generic",
        }
    }
}

/// Load `repo_id`, preferring the specialized interface.
pub fn load_model(repo_id: &str, compute: &Compute) -> Result<LoadedModel> {
    let files = fetch_model_files(repo_id)?;

    match VibeVoiceSession::load(&files, compute) {
        Ok(session) => Ok(LoadedModel::Specialized(session)),
        Err(err) => {
            warn!(%err, "specialized interface unavailable, falling back to generic causal LM");
            let model = CausalLm::load(&files, compute)?;
            let processor = Processor::load(&files)?;
            info!("loaded generic causal LM with processor");
            Ok(LoadedModel::Generic { model, processor })
        }
    }
}

/// Generic causal language model handle.
pub struct CausalLm {
    llm: ModelForCausalLM,
    device: candle_core::Device,
}

impl CausalLm {
    pub fn load(files: &ModelFiles, compute: &Compute) -> Result<Self> {
        let config = load_llm_config(&files.config)?;

        let vb = language_model_varbuilder(&files.weights, compute.dtype, &compute.device)?;
        let llm = ModelForCausalLM::new(&config, vb)
            .map_err(|e| InferError::Initialization(format!("causal LM: {e}")))?;

        Ok(Self {
            llm,
            device: compute.device.clone(),
        })
    }

    /// Run one forward pass and return the logits dimensions.
    pub fn forward_pass(&mut self, ids: &[u32]) -> Result<Vec<usize>> {
        if ids.is_empty() {
            return Err(InferError::Generation(
                "cannot forward an empty token sequence".to_string(),
            ));
        }
        self.llm.clear_kv_cache();
        let input = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let logits = self.llm.forward(&input, 0)?;
        debug!(dims = ?logits.dims(), "forward pass complete");
        Ok(logits.dims().to_vec())
    }
}

/// Auxiliary processor for the generic path: tokenizer plus reference-audio
/// loading at the feature extractor's rate.
pub struct Processor {
    tokenizer: Tokenizer,
    sample_rate: u32,
}

impl Processor {
    pub fn load(files: &ModelFiles) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| InferError::Initialization(format!("tokenizer: {e}")))?;
        Ok(Self {
            tokenizer,
            sample_rate: GENERIC_SAMPLE_RATE,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| InferError::Generation(format!("tokenization failed: {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Load and resample the reference audio to the processor's rate.
    pub fn load_prompt(&self, path: &Path) -> Result<Vec<f32>> {
        load_prompt_wav(path, self.sample_rate)
    }
}
