//! Local inference runner for VibeVoice text-to-speech checkpoints.
//!
//! Model execution is delegated to the candle runtime; this crate provides
//! the glue around it: a download cache for reference voice prompts, device
//! and precision resolution, checkpoint loading with a specialized-to-generic
//! fallback chain, and synthesis dispatch over the resulting model shape.
//!
//! # Quick Start
//!
//! ```no_run
//! use vibevoice_infer::{
//!     load_model, resolve_device, resolve_voice_prompt, synthesize, DeviceRequest,
//!     SynthesisParams, VoiceCache, VoicePreset,
//! };
//!
//! let compute = resolve_device(DeviceRequest::Cpu)?;
//! let cache = VoiceCache::new()?;
//! let prompt = resolve_voice_prompt(None, VoicePreset::Alice, &cache, false)?;
//!
//! let mut model = load_model("microsoft/VibeVoice-1.5B", &compute)?;
//! let audio = synthesize(&mut model, "Hello, world!", &prompt, &SynthesisParams::default())?;
//! audio.save_wav("out.wav")?;
//! # Ok::<(), vibevoice_infer::InferError>(())
//! ```

mod audio;
mod device;
mod error;
mod hub;
mod loader;
mod session;
mod smoke;
mod synthesis;
mod voices;

pub use audio::AudioData;
pub use device::{resolve_device, Compute, DeviceRequest};
pub use error::{InferError, Result};
pub use hub::{fetch_model_files, ModelFiles};
pub use loader::{load_model, CausalLm, LoadedModel, Processor};
pub use session::VibeVoiceSession;
pub use smoke::{run_forward_smoke, SmokeReport};
pub use synthesis::{synthesize, SynthesisParams};
pub use voices::{default_cache_root, resolve_voice_prompt, VoiceCache, VoicePreset};

// Internal modules (pub(crate) for use within the crate only)
pub(crate) mod config;
pub(crate) mod prompt_audio;
