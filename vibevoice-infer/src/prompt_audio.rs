//! Reference-audio loading for voice prompts.
//!
//! Prompts arrive as arbitrary WAV files; models expect mono audio at their
//! own sample rate, roughly normalized. Resampling uses sinc interpolation to
//! keep the output length consistent with the rate ratio.

use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

use crate::{InferError, Result};

const TARGET_DB_FS: f32 = -25.0;
const EPS: f32 = 1e-6;

/// Load a voice-prompt WAV as mono f32 samples at `target_rate`.
pub fn load_prompt_wav(path: &Path, target_rate: u32) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    debug!(
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        "loading voice prompt"
    );

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<std::result::Result<_, _>>()?,
        (hound::SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2147483648.0))
            .collect::<std::result::Result<_, _>>()?,
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        (format, bits) => {
            return Err(InferError::Audio(format!(
                "unsupported WAV encoding: {format:?} at {bits} bits"
            )));
        }
    };

    if samples.is_empty() {
        return Err(InferError::Audio(format!(
            "voice prompt contains no samples: {}",
            path.display()
        )));
    }

    let mono = mixdown(&samples, spec.channels as usize);
    let mut resampled = if spec.sample_rate == target_rate {
        mono
    } else {
        resample(&mono, spec.sample_rate, target_rate)?
    };

    normalize_db_fs(&mut resampled, TARGET_DB_FS);

    debug!(samples = resampled.len(), rate = target_rate, "voice prompt ready");
    Ok(resampled)
}

/// Average all channels down to mono.
fn mixdown(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    let ratio = target_rate as f64 / source_rate as f64;
    let expected_len = (samples.len() as f64 * ratio).round() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, samples.len(), 1)
        .map_err(|e| InferError::Audio(format!("failed to create resampler: {e}")))?;

    let output = resampler
        .process(&[samples.to_vec()], None)
        .map_err(|e| InferError::Audio(format!("resampling failed: {e}")))?;

    let mut resampled = output
        .into_iter()
        .next()
        .ok_or_else(|| InferError::Audio("resampler produced no output channel".to_string()))?;

    // Pad or trim to the exact expected length so downstream frame counts
    // stay consistent with the rate ratio.
    if resampled.len() < expected_len {
        resampled.resize(expected_len, 0.0);
    } else {
        resampled.truncate(expected_len);
    }

    Ok(resampled)
}

/// Scale to a target dB FS level by RMS, then scale down again if any sample
/// would clip.
fn normalize_db_fs(samples: &mut [f32], target_db_fs: f32) {
    let n = samples.len() as f32;
    if n == 0.0 {
        return;
    }

    let rms = (samples.iter().map(|&s| s * s).sum::<f32>() / n).sqrt();
    let target_amplitude = 10.0_f32.powf(target_db_fs / 20.0);
    let scale = target_amplitude / (rms + EPS);
    for s in samples.iter_mut() {
        *s *= scale;
    }

    let max_abs = samples.iter().fold(0.0_f32, |acc, &s| acc.max(s.abs()));
    if max_abs > 1.0 {
        let clip_scale = 1.0 / (max_abs + EPS);
        for s in samples.iter_mut() {
            *s *= clip_scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            for _ in 0..channels {
                let t = i as f32 / sample_rate as f32;
                let v = (t * 220.0 * std::f32::consts::TAU).sin() * 0.5;
                writer.write_sample((v * i16::MAX as f32) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn stereo_mixes_down_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 2, 8_000, 800);

        let samples = load_prompt_wav(&path, 8_000).unwrap();
        assert_eq!(samples.len(), 800);
    }

    #[test]
    fn resampling_scales_length_by_rate_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, 1, 8_000, 1_000);

        let samples = load_prompt_wav(&path, 16_000).unwrap();
        assert_eq!(samples.len(), 2_000);
    }

    #[test]
    fn normalized_output_never_clips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loud.wav");
        write_wav(&path, 1, 8_000, 400);

        let samples = load_prompt_wav(&path, 8_000).unwrap();
        assert!(samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn empty_wav_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, 1, 8_000, 0);

        assert!(load_prompt_wav(&path, 8_000).is_err());
    }

    #[test]
    fn mixdown_averages_channels() {
        let mixed = mixdown(&[1.0, 0.0, 0.5, 0.5], 2);
        assert_eq!(mixed, vec![0.5, 0.5]);
    }
}
