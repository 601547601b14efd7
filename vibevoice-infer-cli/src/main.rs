use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;
use vibevoice_infer::{
    load_model, resolve_device, resolve_voice_prompt, synthesize, DeviceRequest, SynthesisParams,
    VoiceCache, VoicePreset,
};

#[derive(Parser, Debug)]
#[command(name = "vibevoice-infer")]
#[command(version, about = "Run VibeVoice text-to-speech locally")]
struct Cli {
    /// Model repo id or local checkpoint directory
    #[arg(long, default_value = "microsoft/VibeVoice-1.5B")]
    model: String,

    /// Execution device
    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    device: DeviceArg,

    /// Number of denoising steps for the diffusion head
    #[arg(long, default_value_t = 10)]
    ddpm_steps: usize,

    /// Classifier-free guidance scale
    #[arg(long, default_value_t = 1.3)]
    cfg_scale: f32,

    /// Predefined reference voice
    #[arg(long, default_value = "alice")]
    voice: String,

    /// Path to a reference voice WAV (overrides --voice)
    #[arg(long)]
    voice_prompt: Option<PathBuf>,

    /// Text to synthesize
    #[arg(long, required_unless_present = "list_voices")]
    text: Option<String>,

    /// Output WAV path
    #[arg(long, default_value = "out.wav")]
    out: PathBuf,

    /// List the predefined voices and exit
    #[arg(long)]
    list_voices: bool,

    /// Re-download the voice prompt even if cached
    #[arg(long)]
    force_download: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DeviceArg {
    Cpu,
    Cuda,
    Mps,
}

impl From<DeviceArg> for DeviceRequest {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Cpu => DeviceRequest::Cpu,
            DeviceArg::Cuda => DeviceRequest::Cuda,
            DeviceArg::Mps => DeviceRequest::Mps,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_voices {
        for voice in VoicePreset::ALL {
            println!("{:<8} {}", voice.name(), voice.description());
        }
        return Ok(());
    }

    let text = cli
        .text
        .ok_or_else(|| anyhow::anyhow!("--text is required unless --list-voices is given"))?;

    let compute = resolve_device(cli.device.into())?;

    let voice = VoicePreset::parse(&cli.voice)?;
    let cache = VoiceCache::new()?;
    let prompt_path = resolve_voice_prompt(
        cli.voice_prompt.as_deref(),
        voice,
        &cache,
        cli.force_download,
    )?;

    let mut model = load_model(&cli.model, &compute)?;
    info!(kind = model.kind(), "model ready");

    let params = SynthesisParams {
        ddpm_steps: cli.ddpm_steps,
        cfg_scale: cli.cfg_scale,
    };
    let audio = synthesize(&mut model, &text, &prompt_path, &params)?;

    audio.save_wav(&cli.out)?;
    info!(
        "Saved: {} ({:.1}s audio @ {} Hz)",
        cli.out.display(),
        audio.duration_secs(),
        audio.sample_rate()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_voices_does_not_require_text() {
        let cli = Cli::try_parse_from(["vibevoice-infer", "--list-voices"]).unwrap();
        assert!(cli.list_voices);
        assert!(cli.text.is_none());
    }

    #[test]
    fn text_is_required_without_list_voices() {
        let err = Cli::try_parse_from(["vibevoice-infer"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn synthesis_flags_parse() {
        let cli = Cli::try_parse_from([
            "vibevoice-infer",
            "--text",
            "hello",
            "--voice",
            "maya",
            "--ddpm-steps",
            "5",
            "--cfg-scale",
            "2.0",
            "--device",
            "cuda",
            "--force-download",
        ])
        .unwrap();
        assert_eq!(cli.ddpm_steps, 5);
        assert!((cli.cfg_scale - 2.0).abs() < f32::EPSILON);
        assert!(cli.force_download);
        assert!(matches!(cli.device, DeviceArg::Cuda));
    }

    #[test]
    fn defaults_match_documented_surface() {
        let cli = Cli::try_parse_from(["vibevoice-infer", "--text", "hi"]).unwrap();
        assert_eq!(cli.model, "microsoft/VibeVoice-1.5B");
        assert_eq!(cli.ddpm_steps, 10);
        assert_eq!(cli.voice, "alice");
        assert_eq!(cli.out, PathBuf::from("out.wav"));
    }
}
