//! Playback of synthesized audio through rodio.
//!
//! There is exactly one playback slot. Acquiring it stops whatever was
//! playing; the guard returned by `acquire` stops and releases the sink on
//! every exit path, including cancellation and task abort.

use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{AudioOutput, PlaybackError};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

type Slot = Arc<Mutex<Option<(u64, Sink)>>>;

pub struct RodioOutput {
    // Kept alive for the process lifetime
    output_stream: Option<OutputStream>,
    client: Client,
    slot: Slot,
    next_id: AtomicU64,
}

/// Owns the playback slot for one playback.
struct SinkGuard {
    slot: Slot,
    id: u64,
}

impl SinkGuard {
    fn is_finished(&self) -> bool {
        match self.slot.lock() {
            Ok(guard) => match guard.as_ref() {
                Some((id, sink)) if *id == self.id => sink.empty(),
                // Slot taken over by someone else
                _ => true,
            },
            Err(_) => true,
        }
    }
}

impl Drop for SinkGuard {
    fn drop(&mut self) {
        let Ok(mut guard) = self.slot.lock() else {
            return;
        };
        if matches!(guard.as_ref(), Some((id, _)) if *id == self.id) {
            if let Some((_, sink)) = guard.take() {
                // stop() drops queued sources, so the next acquire starts from zero
                sink.stop();
                debug!("Audio sink released");
            }
        }
    }
}

impl RodioOutput {
    /// Open the default output device. Without one, every `play` fails
    /// with `NoDevice` and narration goes to the fallback.
    pub fn open() -> Self {
        let output_stream = match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!("Failed to open audio output: {e}");
                None
            }
        };

        Self {
            output_stream,
            client: Client::new(),
            slot: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        }
    }

    fn acquire(&self, source: Decoder<Cursor<Vec<u8>>>) -> Result<SinkGuard, PlaybackError> {
        let stream = self.output_stream.as_ref().ok_or(PlaybackError::NoDevice)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let sink = Sink::connect_new(stream.mixer());
        sink.append(source);

        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((_, previous)) = slot.replace((id, sink)) {
            previous.stop();
            debug!("Stopped previous audio before starting new playback");
        }

        Ok(SinkGuard {
            slot: self.slot.clone(),
            id,
        })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PlaybackError> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        debug!("Fetched {} bytes of audio", bytes.len());
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl AudioOutput for RodioOutput {
    async fn play(&self, url: &str, cancel: CancellationToken) -> Result<(), PlaybackError> {
        if self.output_stream.is_none() {
            return Err(PlaybackError::NoDevice);
        }

        let bytes = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            bytes = self.fetch(url) => bytes?,
        };

        let source =
            Decoder::new(Cursor::new(bytes)).map_err(|e| PlaybackError::Decode(e.to_string()))?;
        let guard = self.acquire(source)?;
        info!("Audio playback started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Audio playback stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(POLL_INTERVAL) => {
                    if guard.is_finished() {
                        info!("Audio playback ended");
                        return Ok(());
                    }
                }
            }
        }
    }
}
