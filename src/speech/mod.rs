//! Narration: remote synthesis with a local speech fallback.
//!
//! Components:
//! - `remote`: synthesis endpoint client (text → audio URL)
//! - `player`: rodio playback of the synthesized audio with cancellation
//! - `fallback`: local espeak-compatible speech engine
//! - `narrator`: playback session state machine tying the three together

pub mod fallback;
pub mod narrator;
pub mod player;
pub mod remote;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("synthesis request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("synthesis endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed synthesis response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no audio output device")]
    NoDevice,
    #[error("failed to fetch audio: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("failed to decode audio: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("no local speech engine found")]
    Unavailable,
    #[error("failed to run speech engine: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("speech engine exited with {0}")]
    Failed(std::process::ExitStatus),
}

/// Turns narration text into a playable audio reference.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<String, SynthesisError>;
}

/// Plays a synthesized audio reference. Resolves when playback ends or
/// `cancel` fires; the output is released either way.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(&self, url: &str, cancel: CancellationToken) -> Result<(), PlaybackError>;
}

/// Speaks text on the local machine. Resolves when speech ends or
/// `cancel` fires.
#[async_trait]
pub trait LocalSpeech: Send + Sync {
    async fn speak(&self, text: &str, cancel: CancellationToken) -> Result<(), FallbackError>;
}
