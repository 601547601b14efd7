//! Audio data container with convenience methods.

use crate::Result;
use std::path::Path;

/// Audio data container with convenience methods.
#[derive(Clone)]
pub struct AudioData {
    /// Raw audio samples (normalized -1.0 to 1.0)
    samples: Vec<f32>,
    /// Sample rate in Hz
    sample_rate: u32,
}

impl AudioData {
    /// Create AudioData from raw samples.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// A silent buffer of the given duration.
    pub fn silence(duration_secs: f32, sample_rate: u32) -> Self {
        let n = (duration_secs * sample_rate as f32).round() as usize;
        Self {
            samples: vec![0.0; n],
            sample_rate,
        }
    }

    /// Get raw audio samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Get sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Get number of samples.
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Save audio to a 16-bit PCM mono WAV file.
    pub fn save_wav(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path, spec)?;

        for &sample in &self.samples {
            let amplitude = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(amplitude)?;
        }

        writer.finalize()?;

        Ok(())
    }
}

impl std::fmt::Debug for AudioData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioData")
            .field("samples", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("duration_secs", &self.duration_secs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_has_expected_length() {
        let audio = AudioData::silence(1.0, 24_000);
        assert_eq!(audio.num_samples(), 24_000);
        assert_eq!(audio.sample_rate(), 24_000);
        assert!(audio.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn written_wav_matches_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let audio = AudioData::from_samples(vec![0.25; 1_200], 24_000);
        audio.save_wav(&path).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, audio.sample_rate());
        assert_eq!(spec.channels, 1);
        assert_eq!(reader.len() as usize, audio.num_samples());
    }

    #[test]
    fn save_wav_clamps_out_of_range_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clipped.wav");

        AudioData::from_samples(vec![2.0, -2.0], 16_000)
            .save_wav(&path)
            .unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![i16::MAX, -i16::MAX]);
    }
}
