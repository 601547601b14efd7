//! Error types for local VibeVoice inference.

use thiserror::Error;

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferError>;

/// Errors that can occur while resolving, loading, or running a model.
#[derive(Error, Debug)]
pub enum InferError {
    #[error("Device error: {0}")]
    Device(String),

    #[error("Model initialization failed: {0}")]
    Initialization(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Voice prompt error: {0}")]
    Voice(String),

    #[error("Audio processing error: {0}")]
    Audio(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<candle_core::Error> for InferError {
    fn from(e: candle_core::Error) -> Self {
        InferError::Generation(e.to_string())
    }
}

impl From<std::io::Error> for InferError {
    fn from(e: std::io::Error) -> Self {
        InferError::Io(e.to_string())
    }
}

impl From<anyhow::Error> for InferError {
    fn from(e: anyhow::Error) -> Self {
        InferError::Generation(format!("{e:#}"))
    }
}

impl From<hound::Error> for InferError {
    fn from(e: hound::Error) -> Self {
        InferError::Audio(e.to_string())
    }
}

impl From<serde_json::Error> for InferError {
    fn from(e: serde_json::Error) -> Self {
        InferError::Config(e.to_string())
    }
}
