//! Synthesis dispatch over the two model shapes.

use std::path::Path;

use tracing::{info, warn};

use crate::audio::AudioData;
use crate::loader::{CausalLm, LoadedModel, Processor};
use crate::Result;

/// Diffusion-style generation parameters carried from the command line into
/// the model call.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisParams {
    /// Denoising iterations for the diffusion head.
    pub ddpm_steps: usize,
    /// Classifier-free guidance strength.
    pub cfg_scale: f32,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            ddpm_steps: 10,
            cfg_scale: 1.3,
        }
    }
}

/// Synthesize `text` with whichever model shape was loaded.
pub fn synthesize(
    model: &mut LoadedModel,
    text: &str,
    voice_prompt: &Path,
    params: &SynthesisParams,
) -> Result<AudioData> {
    match model {
        LoadedModel::Specialized(session) => session.synthesize(text, voice_prompt, params),
        LoadedModel::Generic { model, processor } => {
            generic_synthesize(model, processor, text, voice_prompt, params)
        }
    }
}

/// Generic-path synthesis.
///
/// The generic causal-LM interface cannot drive the acoustic head, so this
/// routine verifies the full forward pass with the prompt loaded and writes a
/// fixed-length silent waveform at the processor's rate — the same contract
/// as the forward-pass smoke test.
fn generic_synthesize(
    model: &mut CausalLm,
    processor: &Processor,
    text: &str,
    voice_prompt: &Path,
    params: &SynthesisParams,
) -> Result<AudioData> {
    let prompt = processor.load_prompt(voice_prompt)?;
    info!(
        prompt_samples = prompt.len(),
        ddpm_steps = params.ddpm_steps,
        cfg_scale = params.cfg_scale,
        "running generic forward pass"
    );

    let ids = processor.tokenize(text)?;
    let dims = model.forward_pass(&ids)?;
    info!(?dims, "forward pass OK");

    warn!("generic interface cannot run speech generation, writing silent waveform");
    Ok(AudioData::silence(1.0, processor.sample_rate()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_match_cli_defaults() {
        let params = SynthesisParams::default();
        assert_eq!(params.ddpm_steps, 10);
        assert!((params.cfg_scale - 1.3).abs() < f32::EPSILON);
    }
}
