//! Checkpoint configuration parsing.
//!
//! A VibeVoice checkpoint declares its architecture in `config.json`: a
//! `model_type` containing "vibevoice", a nested language-model config, and a
//! diffusion head section. Plain causal-LM checkpoints carry the language
//! model fields at the top level instead.

use std::path::Path;

use candle_transformers::models::qwen2::Config as Qwen2Config;
use serde::Deserialize;
use tracing::debug;

use crate::{InferError, Result};

fn default_sample_rate() -> u32 {
    24_000
}

fn default_ddpm_inference_steps() -> usize {
    10
}

/// Top-level VibeVoice checkpoint config.
#[derive(Debug, Clone, Deserialize)]
pub struct VibeVoiceConfig {
    pub model_type: String,
    #[serde(alias = "decoder_config", alias = "llm_config")]
    pub language_model: Qwen2Config,
    pub diffusion_head_config: DiffusionHeadConfig,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiffusionHeadConfig {
    #[serde(default = "default_ddpm_inference_steps")]
    pub ddpm_num_inference_steps: usize,
    #[serde(default)]
    pub head_layers: usize,
}

impl VibeVoiceConfig {
    /// Parse and validate a checkpoint config.
    ///
    /// Fails for checkpoints that do not declare the VibeVoice architecture;
    /// the caller treats that as the signal to fall back to generic loading.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| InferError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;

        debug!(
            model_type = %config.model_type,
            hidden = config.language_model.hidden_size,
            layers = config.language_model.num_hidden_layers,
            head_layers = config.diffusion_head_config.head_layers,
            ddpm_steps = config.diffusion_head_config.ddpm_num_inference_steps,
            "loaded VibeVoice configuration"
        );

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.model_type.to_ascii_lowercase().contains("vibevoice") {
            return Err(InferError::Config(format!(
                "model_type '{}' is not a VibeVoice architecture",
                self.model_type
            )));
        }

        let lm = &self.language_model;
        if lm.num_attention_heads == 0 || lm.hidden_size % lm.num_attention_heads != 0 {
            return Err(InferError::Config(format!(
                "hidden_size {} is not divisible by {} attention heads",
                lm.hidden_size, lm.num_attention_heads
            )));
        }

        Ok(())
    }
}

/// Load a language-model config from either a plain causal-LM checkpoint or
/// the nested section of a VibeVoice one.
pub fn load_llm_config(path: &Path) -> Result<Qwen2Config> {
    let content = std::fs::read_to_string(path)?;

    if let Ok(config) = serde_json::from_str::<Qwen2Config>(&content) {
        return Ok(config);
    }

    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| InferError::Config(format!("failed to parse config: {e}")))?;
    for key in ["decoder_config", "llm_config", "language_model_config"] {
        if let Some(nested) = value.get(key) {
            return serde_json::from_value(nested.clone())
                .map_err(|e| InferError::Config(format!("failed to parse {key}: {e}")));
        }
    }

    Err(InferError::Config(
        "config.json contains no recognizable language-model section".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LLM_FIELDS: &str = r#"{
        "vocab_size": 151936,
        "hidden_size": 896,
        "intermediate_size": 4864,
        "num_hidden_layers": 24,
        "num_attention_heads": 14,
        "num_key_value_heads": 2,
        "max_position_embeddings": 32768,
        "sliding_window": 32768,
        "max_window_layers": 28,
        "tie_word_embeddings": true,
        "rope_theta": 1000000.0,
        "rms_norm_eps": 1e-6,
        "use_sliding_window": false,
        "hidden_act": "silu"
    }"#;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn vibevoice_config_parses_and_validates() {
        let json = format!(
            r#"{{
                "model_type": "vibevoice_streaming",
                "decoder_config": {LLM_FIELDS},
                "diffusion_head_config": {{ "ddpm_num_inference_steps": 5, "head_layers": 4 }}
            }}"#
        );
        let file = write_config(&json);

        let config = VibeVoiceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.diffusion_head_config.ddpm_num_inference_steps, 5);
        assert_eq!(config.sample_rate, 24_000);
        assert_eq!(config.language_model.hidden_size, 896);
    }

    #[test]
    fn non_vibevoice_model_type_is_rejected() {
        let json = format!(
            r#"{{
                "model_type": "qwen2",
                "decoder_config": {LLM_FIELDS},
                "diffusion_head_config": {{}}
            }}"#
        );
        let file = write_config(&json);

        let err = VibeVoiceConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, InferError::Config(_)));
    }

    #[test]
    fn llm_config_loads_from_top_level_or_nested() {
        let top = write_config(LLM_FIELDS);
        assert_eq!(load_llm_config(top.path()).unwrap().hidden_size, 896);

        let nested = write_config(&format!(
            r#"{{ "model_type": "vibevoice", "llm_config": {LLM_FIELDS} }}"#
        ));
        assert_eq!(load_llm_config(nested.path()).unwrap().hidden_size, 896);
    }

    #[test]
    fn config_without_llm_section_is_rejected() {
        let file = write_config(r#"{ "model_type": "mystery" }"#);
        assert!(load_llm_config(file.path()).is_err());
    }
}
