//! Web shell: maps the three views and the theme/narration actions.
//!
//! Routes:
//! - `/` landing, `/explore` gallery, `/voice` news with narration
//! - `POST /theme/toggle`, `POST /theme/system`
//! - `POST /voice/listen/{id}`, `POST /voice/stop`, `GET /voice/state[?wait=secs]`
//!
//! Rendering any page other than `/voice` unmounts the voice view: narration
//! stops and its feed is dropped, so the next visit fetches again.

pub mod views;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::news::{Article, ArticleId, NewsClient};
use crate::speech::narrator::{Narrator, PlaybackState};
use crate::theme::ThemeStore;

/// Seconds between page refreshes while narration is active.
const PLAYING_REFRESH_SECS: u32 = 3;

/// Upper bound for a `/voice/state?wait=` long-poll.
const MAX_STATE_WAIT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Landing,
    Explore,
    Voice,
}

impl Route {
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/" => Some(Self::Landing),
            "/explore" => Some(Self::Explore),
            "/voice" => Some(Self::Voice),
            _ => None,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::Explore => "/explore",
            Self::Voice => "/voice",
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub theme: Arc<ThemeStore>,
    pub news: Arc<NewsClient>,
    pub narrator: Arc<Narrator>,
    pub max_articles: usize,
    /// Articles of the mounted voice view; None until first mounted.
    feed: Arc<AsyncMutex<Option<Vec<Article>>>>,
}

impl AppState {
    pub fn new(
        theme: Arc<ThemeStore>,
        news: Arc<NewsClient>,
        narrator: Arc<Narrator>,
        max_articles: usize,
    ) -> Self {
        Self {
            theme,
            news,
            narrator,
            max_articles,
            feed: Arc::new(AsyncMutex::new(None)),
        }
    }

    async fn unmount_voice(&self) {
        let mut feed = self.feed.lock().await;
        if let Some(id) = self.narrator.active() {
            info!("Left voice view, stopping article {id}");
        }
        self.narrator.stop();
        if feed.take().is_some() {
            debug!("Voice view unmounted");
        }
    }

    fn page(&self, title: &str, refresh_secs: Option<u32>, body: &str) -> Html<String> {
        Html(views::layout(title, self.theme.snapshot(), refresh_secs, body))
    }
}

/// Build the axum router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(Route::Landing.path(), get(handle_landing))
        .route(Route::Explore.path(), get(handle_explore))
        .route(Route::Voice.path(), get(handle_voice))
        .route("/voice/listen/{id}", post(handle_listen))
        .route("/voice/stop", post(handle_stop))
        .route("/voice/state", get(handle_voice_state))
        .route("/theme/toggle", post(handle_theme_toggle))
        .route("/theme/system", post(handle_theme_system))
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .fallback(handle_fallback)
        .with_state(state)
}

/// Start the web UI server; runs until the listener fails.
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<(), std::io::Error> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Web UI listening on http://{addr}");
    axum::serve(listener, router(state)).await
}

// --- Views ---

async fn handle_landing(State(state): State<AppState>) -> Html<String> {
    state.unmount_voice().await;
    state.page("newsvoice", None, &views::landing())
}

async fn handle_explore(State(state): State<AppState>) -> Html<String> {
    state.unmount_voice().await;
    state.page("Explore", None, &views::explore())
}

#[derive(Deserialize)]
struct VoiceQuery {
    #[serde(default)]
    refresh: Option<String>,
}

async fn handle_voice(State(state): State<AppState>, Query(query): Query<VoiceQuery>) -> Html<String> {
    let remount = query.refresh.is_some();
    let mut feed = state.feed.lock().await;

    if feed.is_none() || remount {
        // A fresh mount ends any narration from the previous one
        state.narrator.stop();
        let mut articles = state.news.load_feed().await;
        articles.truncate(state.max_articles);
        *feed = Some(articles);
    }

    let playback = state.narrator.state();
    let refresh = (playback != PlaybackState::Idle).then_some(PLAYING_REFRESH_SECS);
    let body = views::voice(feed.as_deref().unwrap_or_default(), playback);
    state.page("Voice News", refresh, &body)
}

/// Whether the request is a page navigation rather than an asset fetch.
fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

async fn handle_fallback(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    let feature = views::FEATURES
        .iter()
        .find(|f| f.target == uri.path() && Route::from_path(f.target).is_none());

    match feature {
        Some(feature) => {
            state.unmount_voice().await;
            state
                .page(feature.title, None, &views::coming_soon(feature.title))
                .into_response()
        }
        None => {
            debug!("No route for {}", uri.path());
            if accepts_html(&headers) {
                state.unmount_voice().await;
            }
            (StatusCode::NOT_FOUND, state.page("Not Found", None, &views::not_found())).into_response()
        }
    }
}

// --- Narration actions ---

async fn handle_listen(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let id = ArticleId(id);
    let feed = state.feed.lock().await;
    let article = feed
        .as_deref()
        .and_then(|articles| articles.iter().find(|a| a.id == id));

    match article {
        Some(article) => {
            state.narrator.start(article);
            Redirect::to(Route::Voice.path()).into_response()
        }
        None => {
            warn!("Listen requested for unknown article {id}");
            (StatusCode::NOT_FOUND, "unknown article").into_response()
        }
    }
}

async fn handle_stop(State(state): State<AppState>) -> Redirect {
    state.narrator.stop();
    Redirect::to(Route::Voice.path())
}

#[derive(Deserialize)]
struct StateQuery {
    /// Hold the request until the state changes, up to this many seconds.
    #[serde(default)]
    wait: Option<u64>,
}

async fn handle_voice_state(
    State(state): State<AppState>,
    Query(query): Query<StateQuery>,
) -> Json<PlaybackState> {
    let Some(secs) = query.wait else {
        return Json(state.narrator.state());
    };

    let mut rx = state.narrator.subscribe();
    let wait = Duration::from_secs(secs.min(MAX_STATE_WAIT_SECS));
    if tokio::time::timeout(wait, rx.changed()).await.is_err() {
        debug!("State long-poll timed out after {}s", wait.as_secs());
    }
    let current = *rx.borrow();
    Json(current)
}

// --- Theme actions ---

/// Redirect target for theme actions: the routed page the user came from.
fn back_to(headers: &HeaderMap) -> &'static str {
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|r| reqwest::Url::parse(r).ok())
        .and_then(|url| Route::from_path(url.path()))
        .unwrap_or(Route::Landing)
        .path()
}

async fn handle_theme_toggle(State(state): State<AppState>, headers: HeaderMap) -> Redirect {
    state.theme.toggle();
    Redirect::to(back_to(&headers))
}

async fn handle_theme_system(State(state): State<AppState>, headers: HeaderMap) -> Redirect {
    state.theme.reset_to_system();
    Redirect::to(back_to(&headers))
}
