//! Narration session state machine.
//!
//! Idle → Starting(id) → PlayingRemote(id) → Idle
//!                     ↘ PlayingFallback(id) → Idle
//!
//! State only changes through `start`, `stop`, and the session task that
//! `start` spawns. Every session carries a generation number; a session
//! whose generation is no longer current cannot touch the state, so a late
//! synthesis response after `stop` or a newer `start` is ignored.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{AudioOutput, LocalSpeech, SpeechSynthesizer};
use crate::news::{Article, ArticleId};
use crate::notifier::Alert;

const FAILURE_SUMMARY: &str = "Speech synthesis failed";
const FAILURE_BODY: &str = "Speech synthesis failed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "article", rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Starting(ArticleId),
    PlayingRemote(ArticleId),
    PlayingFallback(ArticleId),
}

impl PlaybackState {
    pub fn article(&self) -> Option<ArticleId> {
        match self {
            Self::Idle => None,
            Self::Starting(id) | Self::PlayingRemote(id) | Self::PlayingFallback(id) => Some(*id),
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Starting(id) => write!(f, "STARTING({id})"),
            Self::PlayingRemote(id) => write!(f, "PLAYING_REMOTE({id})"),
            Self::PlayingFallback(id) => write!(f, "PLAYING_FALLBACK({id})"),
        }
    }
}

struct Session {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct Inner {
    generation: u64,
    session: Option<Session>,
}

struct Shared {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    audio: Arc<dyn AudioOutput>,
    fallback: Arc<dyn LocalSpeech>,
    alert: Arc<dyn Alert>,
    state_tx: watch::Sender<PlaybackState>,
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set(&self, next: PlaybackState) {
        let prev = self.state_tx.send_replace(next);
        if prev != next {
            info!("Narration: {prev} → {next}");
        }
    }

    /// Apply `next` only if `generation` is still the live session.
    fn transition(&self, generation: u64, next: PlaybackState) -> bool {
        let inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        self.set(next);
        true
    }

    /// Return to Idle if `generation` is still live; false for a stale session.
    fn finish(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.session = None;
        self.set(PlaybackState::Idle);
        true
    }

    /// Quiesce the live session, if any. Caller holds the lock.
    fn stop_locked(&self, inner: &mut Inner) {
        inner.generation += 1;
        if let Some(session) = inner.session.take() {
            session.cancel.cancel();
            session.task.abort();
        }
        self.set(PlaybackState::Idle);
    }
}

pub struct Narrator {
    shared: Arc<Shared>,
}

impl Narrator {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        audio: Arc<dyn AudioOutput>,
        fallback: Arc<dyn LocalSpeech>,
        alert: Arc<dyn Alert>,
    ) -> Self {
        let (state_tx, _) = watch::channel(PlaybackState::Idle);
        Self {
            shared: Arc::new(Shared {
                synthesizer,
                audio,
                fallback,
                alert,
                state_tx,
                inner: Mutex::new(Inner {
                    generation: 0,
                    session: None,
                }),
            }),
        }
    }

    pub fn state(&self) -> PlaybackState {
        *self.shared.state_tx.borrow()
    }

    pub fn active(&self) -> Option<ArticleId> {
        self.state().article()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.shared.state_tx.subscribe()
    }

    /// Narrate `article`, stopping whatever is playing first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, article: &Article) {
        let text = article.narration_text();
        let id = article.id;
        info!("Narrating article {id}: \"{}\"", article.title);

        let mut inner = self.shared.lock();
        self.shared.stop_locked(&mut inner);
        let generation = inner.generation;
        self.shared.set(PlaybackState::Starting(id));

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_session(
            self.shared.clone(),
            generation,
            id,
            text,
            cancel.clone(),
        ));
        inner.session = Some(Session { cancel, task });
    }

    /// Stop any narration. Safe to call when idle.
    pub fn stop(&self) {
        let mut inner = self.shared.lock();
        if inner.session.is_none() && self.state() == PlaybackState::Idle {
            return;
        }
        self.shared.stop_locked(&mut inner);
    }
}

impl Drop for Narrator {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        if let Some(session) = inner.session.take() {
            session.cancel.cancel();
            session.task.abort();
        }
    }
}

async fn run_session(
    shared: Arc<Shared>,
    generation: u64,
    id: ArticleId,
    text: String,
    cancel: CancellationToken,
) {
    match shared.synthesizer.synthesize(&text).await {
        Ok(url) => {
            if !shared.transition(generation, PlaybackState::PlayingRemote(id)) {
                return;
            }
            match shared.audio.play(&url, cancel.clone()).await {
                Ok(()) => {
                    shared.finish(generation);
                    return;
                }
                Err(e) => warn!("Audio playback error: {e}, falling back to local speech"),
            }
        }
        Err(e) => warn!("Remote synthesis failed: {e}, falling back to local speech"),
    }

    if !shared.transition(generation, PlaybackState::PlayingFallback(id)) {
        return;
    }

    let result = shared.fallback.speak(&text, cancel).await;
    let current = shared.finish(generation);
    if let Err(e) = result {
        error!("Local speech failed: {e}");
        // State is already Idle; the alert runs detached
        if current {
            let alert = shared.alert.clone();
            tokio::task::spawn_blocking(move || alert.alert(FAILURE_SUMMARY, FAILURE_BODY));
        }
    }
}
