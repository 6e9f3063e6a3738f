//! Error types for every domain.
//!
//! Most of these never escape their module: the OCR path absorbs failures
//! into sentinel text, and the session turns everything else into speech.
//! They exist so the plumbing underneath can use `?`.

use thiserror::Error;

/// Failures from the remote vision client. Every variant is a fallback
/// trigger for the coordinator.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("no vision API key configured")]
    MissingApiKey,
    /// HTTP 400 whose body says the key is not valid.
    #[error("vision API rejected the API key")]
    InvalidApiKey,
    #[error("vision API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("vision API reported an error for the image: {0}")]
    Api(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed vision response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("image encode failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("encoder task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum LocalOcrError {
    #[error("tesseract failed: {0}")]
    Engine(String),
    #[error("recognition task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("captured image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
    #[error("decode task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    #[error("camera has been released")]
    Released,
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("no speech program found (tried {0})")]
    NoEngine(String),
    #[error("failed to start speech program: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("speech program failed: {0}")]
    Failed(String),
    /// The utterance was cut off by `stop()` or by a newer utterance.
    #[error("utterance interrupted")]
    Interrupted,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("an OCR coordinator already exists in this process")]
    AlreadyConstructed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("keychain error: {0}")]
    Keyring(#[from] keyring::Error),
    #[error("API key is empty")]
    EmptyApiKey,
}

/// Startup failures surfaced by [`crate::run`].
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Speech(#[from] SpeechError),
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
    #[error("stdin read failed: {0}")]
    Input(#[from] std::io::Error),
}
