//! Predefined reference voices and the on-disk voice-prompt cache.
//!
//! Each voice maps to a fixed upstream URL. Downloads are cached under a
//! content-addressed filename (voice name plus a short hash of the URL), so a
//! changed upstream URL never collides with a stale cache entry.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::{InferError, Result};

const VOICE_REPO_BASE: &str = "https://huggingface.co/microsoft/VibeVoice-1.5B/resolve/main/demo/voices";

/// Read timeout for voice-prompt downloads.
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// One of the six predefined reference voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoicePreset {
    Alice,
    Carter,
    Frank,
    Mary,
    Maya,
    Samuel,
}

impl VoicePreset {
    pub const ALL: [VoicePreset; 6] = [
        VoicePreset::Alice,
        VoicePreset::Carter,
        VoicePreset::Frank,
        VoicePreset::Mary,
        VoicePreset::Maya,
        VoicePreset::Samuel,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VoicePreset::Alice => "alice",
            VoicePreset::Carter => "carter",
            VoicePreset::Frank => "frank",
            VoicePreset::Mary => "mary",
            VoicePreset::Maya => "maya",
            VoicePreset::Samuel => "samuel",
        }
    }

    fn file_name(self) -> &'static str {
        match self {
            VoicePreset::Alice => "en-Alice_woman.wav",
            VoicePreset::Carter => "en-Carter_man.wav",
            VoicePreset::Frank => "en-Frank_man.wav",
            VoicePreset::Mary => "en-Mary_woman_bgm.wav",
            VoicePreset::Maya => "en-Maya_woman.wav",
            VoicePreset::Samuel => "in-Samuel_man.wav",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            VoicePreset::Alice => "English, female, neutral narration",
            VoicePreset::Carter => "English, male, conversational",
            VoicePreset::Frank => "English, male, deep narration",
            VoicePreset::Mary => "English, female, with background music",
            VoicePreset::Maya => "English, female, expressive",
            VoicePreset::Samuel => "Indian English, male, conversational",
        }
    }

    pub fn url(self) -> String {
        format!("{VOICE_REPO_BASE}/{}", self.file_name())
    }

    /// Parse a voice name, case-insensitively.
    ///
    /// Unknown names fail here, before any cache or network access.
    pub fn parse(name: &str) -> Result<Self> {
        let lower = name.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.name() == lower)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|v| v.name()).collect();
                InferError::Voice(format!(
                    "unknown voice '{name}' (expected one of: {})",
                    known.join(", ")
                ))
            })
    }
}

/// Download-and-cache resolver for voice prompt audio.
pub struct VoiceCache {
    root: PathBuf,
}

impl VoiceCache {
    /// Cache rooted at the default location (`$HF_HOME` when set, the
    /// platform cache directory otherwise).
    pub fn new() -> Result<Self> {
        Ok(Self {
            root: default_cache_root()?,
        })
    }

    /// Cache rooted at an explicit directory.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The on-disk path a voice caches to, whether or not it exists yet.
    pub fn cached_path(&self, voice: VoicePreset) -> PathBuf {
        self.root
            .join(format!("{}-{}.wav", voice.name(), short_hash(&voice.url())))
    }

    /// Return a local file containing the voice's reference audio,
    /// downloading it only if absent or when `force` is set.
    pub fn resolve(&self, voice: VoicePreset, force: bool) -> Result<PathBuf> {
        let dest = self.cached_path(voice);

        if !force && dest.exists() {
            debug!(voice = voice.name(), path = %dest.display(), "voice prompt cache hit");
            return Ok(dest);
        }

        fs::create_dir_all(&self.root)?;

        let url = voice.url();
        info!(voice = voice.name(), "downloading voice prompt");
        download(&url, &dest).map_err(|e| {
            InferError::Download(format!("voice prompt '{}': {e:#}", voice.name()))
        })?;
        info!(path = %dest.display(), "voice prompt cached");

        Ok(dest)
    }
}

/// Resolve the voice prompt to use for a run.
///
/// A user-supplied path wins over the preset; it must already exist. Presets
/// go through the download cache.
pub fn resolve_voice_prompt(
    user_path: Option<&Path>,
    voice: VoicePreset,
    cache: &VoiceCache,
    force: bool,
) -> Result<PathBuf> {
    if let Some(path) = user_path {
        if path.exists() {
            debug!(path = %path.display(), "using user-supplied voice prompt");
            return Ok(path.to_path_buf());
        }
        return Err(InferError::Voice(format!(
            "voice prompt file not found: {}",
            path.display()
        )));
    }

    cache.resolve(voice, force)
}

/// Voice prompts cache under `$HF_HOME` when set, matching where the model
/// checkpoints already live; otherwise the platform cache directory.
pub fn default_cache_root() -> Result<PathBuf> {
    if let Ok(hf_home) = std::env::var("HF_HOME") {
        if !hf_home.is_empty() {
            return Ok(PathBuf::from(hf_home)
                .join("vibevoice")
                .join("voice-prompts"));
        }
    }

    let dirs = directories::ProjectDirs::from("", "", "vibevoice-infer").ok_or_else(|| {
        InferError::Io("could not determine platform cache directory".to_string())
    })?;
    Ok(dirs.cache_dir().join("voice-prompts"))
}

fn short_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(&digest[..4])
}

fn download(url: &str, dest: &Path) -> anyhow::Result<()> {
    let agent = ureq::AgentBuilder::new()
        .timeout_read(READ_TIMEOUT)
        .build();

    let mut request = agent.get(url);
    if let Ok(token) = std::env::var("HF_TOKEN") {
        if !token.is_empty() {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
    }

    let response = request
        .call()
        .with_context(|| format!("GET {url} failed"))?;

    // Temp file + rename keeps interrupted downloads out of the cache.
    let tmp = dest.with_extension("download.tmp");
    let result = (|| -> anyhow::Result<()> {
        let mut reader = response.into_reader();
        let file = fs::File::create(&tmp)
            .with_context(|| format!("failed creating {}", tmp.display()))?;
        let mut writer = io::BufWriter::new(file);
        io::copy(&mut reader, &mut writer)
            .with_context(|| format!("failed writing {}", tmp.display()))?;
        fs::rename(&tmp, dest)
            .with_context(|| format!("failed moving {} into place", tmp.display()))?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_preset_names_parse() {
        for voice in VoicePreset::ALL {
            assert_eq!(VoicePreset::parse(voice.name()).unwrap(), voice);
            assert_eq!(
                VoicePreset::parse(&voice.name().to_uppercase()).unwrap(),
                voice
            );
        }
    }

    #[test]
    fn unknown_voice_is_rejected() {
        let err = VoicePreset::parse("bob").unwrap_err();
        assert!(matches!(err, InferError::Voice(_)));
    }

    #[test]
    fn cached_path_is_stable_and_content_addressed() {
        let cache = VoiceCache::at("/tmp/voices");
        for voice in VoicePreset::ALL {
            let a = cache.cached_path(voice);
            let b = cache.cached_path(voice);
            assert_eq!(a, b);

            let stem = a.file_stem().unwrap().to_str().unwrap();
            let (name, hash) = stem.rsplit_once('-').unwrap();
            assert!(name.ends_with(voice.name()));
            assert_eq!(hash.len(), 8);
            assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn cache_hit_short_circuits_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VoiceCache::at(dir.path());

        for voice in VoicePreset::ALL {
            let dest = cache.cached_path(voice);
            fs::write(&dest, b"RIFF").unwrap();

            // Resolving twice must return the identical path without
            // touching the network; a download attempt here would fail.
            let first = cache.resolve(voice, false).unwrap();
            let second = cache.resolve(voice, false).unwrap();
            assert_eq!(first, dest);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn missing_user_prompt_fails_before_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VoiceCache::at(dir.path());
        let missing = dir.path().join("nope.wav");

        let err =
            resolve_voice_prompt(Some(&missing), VoicePreset::Alice, &cache, false).unwrap_err();
        assert!(matches!(err, InferError::Voice(_)));
    }

    #[test]
    fn user_prompt_wins_over_preset() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VoiceCache::at(dir.path());
        let supplied = dir.path().join("mine.wav");
        fs::write(&supplied, b"RIFF").unwrap();

        let resolved =
            resolve_voice_prompt(Some(&supplied), VoicePreset::Alice, &cache, false).unwrap();
        assert_eq!(resolved, supplied);
    }

    #[test]
    fn hf_home_controls_default_cache_root() {
        std::env::set_var("HF_HOME", "/tmp/hf-home-test");
        let root = default_cache_root().unwrap();
        std::env::remove_var("HF_HOME");
        assert!(root.starts_with("/tmp/hf-home-test"));
    }
}
