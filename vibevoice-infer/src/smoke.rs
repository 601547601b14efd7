//! Forward-pass smoke test.
//!
//! Loads a checkpoint's language model and tokenizer, runs a single forward
//! pass on the given text, discards the result, and returns one second of
//! silence. Verifies the environment and dependency stack only; no audio
//! synthesis is attempted.

use tracing::info;

use crate::audio::AudioData;
use crate::device::{resolve_device, DeviceRequest};
use crate::hub::fetch_model_files;
use crate::loader::{CausalLm, Processor};
use crate::Result;

const SMOKE_SAMPLE_RATE: u32 = 24_000;

/// Outcome of a smoke run: the logits dimensions plus the dummy waveform.
#[derive(Debug)]
pub struct SmokeReport {
    pub logits_dims: Vec<usize>,
    pub audio: AudioData,
}

/// Run the forward-pass smoke test on CPU.
pub fn run_forward_smoke(repo_id: &str, text: &str) -> Result<SmokeReport> {
    let compute = resolve_device(DeviceRequest::Cpu)?;
    info!(model = repo_id, "loading model for smoke test");

    let files = fetch_model_files(repo_id)?;
    let mut model = CausalLm::load(&files, &compute)?;
    let processor = Processor::load(&files)?;

    let ids = processor.tokenize(text)?;
    let logits_dims = model.forward_pass(&ids)?;
    info!(?logits_dims, "forward pass OK");

    Ok(SmokeReport {
        logits_dims,
        audio: AudioData::silence(1.0, SMOKE_SAMPLE_RATE),
    })
}
