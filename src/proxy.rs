//! Synthesis proxy.
//!
//! Accepts `{voiceId, text, style, format}` on `POST /api/tts`, forwards it
//! to the upstream voice API with the server-side key, and answers
//! `{audioUrl}`. Keeps the key off the client. Runs on port 8081 by default.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{debug, info, warn};

use crate::config::ProxyConfig;

#[derive(Clone)]
pub struct ProxyState {
    client: Client,
    config: Arc<ProxyConfig>,
}

impl ProxyState {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

// --- Request/Response types ---

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct TtsRequest {
    voice_id: String,
    text: String,
    #[serde(default = "default_style")]
    style: String,
    #[serde(default)]
    format: Option<String>,
}

fn default_style() -> String {
    "Conversational".to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TtsResponse {
    audio_url: String,
}

#[derive(Debug, Error)]
enum ProxyError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream returned {status}")]
    Upstream { status: StatusCode, detail: Value },
    #[error("upstream did not return audioFile: {0}")]
    MissingAudio(Value),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            Self::Request(e) => (StatusCode::BAD_GATEWAY, json!(e.to_string())),
            Self::Upstream { status, detail } => (*status, detail.clone()),
            Self::MissingAudio(_) => (StatusCode::INTERNAL_SERVER_ERROR, json!(self.to_string())),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Build the axum router.
pub fn router(state: ProxyState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);
    Router::new()
        .route("/", get(handle_root))
        .route("/api/tts", post(handle_tts))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {o:?}: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Start the proxy as a background tokio task.
pub async fn start_proxy(config: ProxyConfig) {
    if config.api_key.is_empty() {
        warn!("No voice API key configured (MURF_API_KEY); synthesis proxy disabled");
        return;
    }

    let port = config.port;
    let app = router(ProxyState::new(config));
    let addr = format!("127.0.0.1:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            warn!("Failed to bind synthesis proxy on {addr}: {e}");
            return;
        }
    };
    info!("Synthesis proxy listening on {addr}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("Synthesis proxy error: {e}");
        }
    });
}

// --- Handlers ---

async fn handle_root() -> Json<Value> {
    Json(json!({ "message": "newsvoice synthesis proxy is running" }))
}

async fn handle_tts(
    State(state): State<ProxyState>,
    Json(req): Json<TtsRequest>,
) -> Result<Json<TtsResponse>, ProxyError> {
    let payload = json!({
        "voiceId": req.voice_id,
        "text": req.text,
        "style": req.style,
        "format": req.format.unwrap_or_else(|| state.config.format.clone()),
    });
    debug!("Upstream synthesis request: {payload}");

    let resp = state
        .client
        .post(&state.config.upstream)
        .header("api-key", &state.config.api_key)
        .json(&payload)
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;
    debug!("Upstream status {status}: {body}");

    let data: Value = serde_json::from_str(&body).unwrap_or(Value::String(body));
    if status != StatusCode::OK {
        warn!("Upstream synthesis failed with {status}");
        return Err(ProxyError::Upstream {
            status,
            detail: data,
        });
    }

    match data.get("audioFile").and_then(Value::as_str) {
        Some(url) => Ok(Json(TtsResponse {
            audio_url: url.to_string(),
        })),
        None => Err(ProxyError::MissingAudio(data)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn proxy_for(upstream: Router) -> String {
        let upstream = serve(upstream).await;
        let config = ProxyConfig {
            upstream: format!("{upstream}/v1/speech/generate"),
            api_key: "secret".into(),
            ..ProxyConfig::default()
        };
        serve(router(ProxyState::new(config))).await
    }

    fn body() -> Value {
        json!({"voiceId": "en-US-cooper", "text": "Hello. World", "style": "Conversational"})
    }

    #[tokio::test]
    async fn maps_audio_file_to_audio_url() {
        let upstream = Router::new().route(
            "/v1/speech/generate",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["api-key"], "secret");
                assert_eq!(body["format"], "mp3");
                assert_eq!(body["text"], "Hello. World");
                Json(json!({"audioFile": "https://cdn/audio.mp3", "audioLengthInSeconds": 2}))
            }),
        );
        let proxy = proxy_for(upstream).await;

        let resp = Client::new()
            .post(format!("{proxy}/api/tts"))
            .json(&body())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let data: Value = resp.json().await.unwrap();
        assert_eq!(data, json!({"audioUrl": "https://cdn/audio.mp3"}));
    }

    #[tokio::test]
    async fn propagates_upstream_status_and_detail() {
        let upstream = Router::new().route(
            "/v1/speech/generate",
            post(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"errorMessage": "bad key"}))) }),
        );
        let proxy = proxy_for(upstream).await;

        let resp = Client::new()
            .post(format!("{proxy}/api/tts"))
            .json(&body())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let data: Value = resp.json().await.unwrap();
        assert_eq!(data["detail"]["errorMessage"], "bad key");
    }

    #[tokio::test]
    async fn missing_audio_file_is_a_server_error() {
        let upstream = Router::new().route(
            "/v1/speech/generate",
            post(|| async { Json(json!({"warning": "quota"})) }),
        );
        let proxy = proxy_for(upstream).await;

        let resp = Client::new()
            .post(format!("{proxy}/api/tts"))
            .json(&body())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn root_reports_running() {
        let proxy = serve(router(ProxyState::new(ProxyConfig::default()))).await;
        let data: Value = reqwest::get(format!("{proxy}/")).await.unwrap().json().await.unwrap();
        assert!(data["message"].as_str().unwrap().contains("running"));
    }
}
