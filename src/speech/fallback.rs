//! Local speech through an espeak-compatible engine.
//!
//! Used when the synthesis endpoint is unavailable. Rate, pitch and volume
//! are relative to the engine defaults (1.0 = default).

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{FallbackError, LocalSpeech};
use crate::config::FallbackConfig;

// espeak defaults: 175 wpm, pitch 50 (0-99), amplitude 100 (0-200)
const DEFAULT_WPM: f32 = 175.0;
const DEFAULT_PITCH: f32 = 50.0;
const DEFAULT_AMPLITUDE: f32 = 100.0;

pub struct EspeakSpeech {
    engine: Option<PathBuf>,
    config: FallbackConfig,
}

impl EspeakSpeech {
    pub fn new(config: FallbackConfig) -> Self {
        let engine = config
            .engine
            .clone()
            .or_else(|| which::which("espeak-ng").ok())
            .or_else(|| which::which("espeak").ok());

        match &engine {
            Some(path) => info!("Local speech engine: {}", path.display()),
            None => warn!("No espeak-ng or espeak found; local speech fallback unavailable"),
        }

        Self { engine, config }
    }

    /// Engine arguments for the configured voice settings.
    pub fn voice_args(&self) -> Vec<String> {
        let wpm = (DEFAULT_WPM * self.config.rate).round().max(80.0) as u32;
        let pitch = (DEFAULT_PITCH * self.config.pitch).round().clamp(0.0, 99.0) as u32;
        let amplitude = (DEFAULT_AMPLITUDE * self.config.volume).round().clamp(0.0, 200.0) as u32;
        vec![
            "-s".into(),
            wpm.to_string(),
            "-p".into(),
            pitch.to_string(),
            "-a".into(),
            amplitude.to_string(),
        ]
    }
}

#[async_trait]
impl LocalSpeech for EspeakSpeech {
    async fn speak(&self, text: &str, cancel: CancellationToken) -> Result<(), FallbackError> {
        let engine = self.engine.as_ref().ok_or(FallbackError::Unavailable)?;

        let mut child = Command::new(engine)
            .args(self.voice_args())
            .arg("--")
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        debug!("Local speech started ({} chars)", text.len());

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    debug!("Local speech ended");
                    Ok(())
                } else {
                    Err(FallbackError::Failed(status))
                }
            }
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to stop local speech: {e}");
                }
                info!("Local speech cancelled");
                Ok(())
            }
        }
    }
}
