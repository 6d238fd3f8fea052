//! Client for the synthesis endpoint.
//!
//! POSTs `{voiceId, text, style}` and expects `{audioUrl}` back. Any other
//! outcome is an error the narrator answers with the local fallback.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{SpeechSynthesizer, SynthesisError};
use crate::config::TTSConfig;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisRequest<'a> {
    voice_id: &'a str,
    text: &'a str,
    style: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisResponse {
    audio_url: Option<String>,
}

pub struct RemoteSynthesizer {
    config: TTSConfig,
    client: Client,
}

impl RemoteSynthesizer {
    pub fn new(config: TTSConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for RemoteSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<String, SynthesisError> {
        debug!("Requesting synthesis from {} ({} chars)", self.config.endpoint, text.len());

        let resp = self
            .client
            .post(&self.config.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&SynthesisRequest {
                voice_id: &self.config.voice_id,
                text,
                style: &self.config.style,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Synthesis endpoint error {status}: {body}");
            return Err(SynthesisError::Status { status, body });
        }

        let data: SynthesisResponse = resp
            .json()
            .await
            .map_err(|e| SynthesisError::Malformed(e.to_string()))?;

        match data.audio_url {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(SynthesisError::Malformed(
                "response did not include an audio URL".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> TTSConfig {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        TTSConfig {
            endpoint: format!("http://{addr}/api/tts"),
            ..TTSConfig::default()
        }
    }

    #[tokio::test]
    async fn returns_audio_url_and_sends_voice_settings() {
        let app = Router::new().route(
            "/api/tts",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["voiceId"], "en-US-cooper");
                assert_eq!(body["style"], "Conversational");
                assert_eq!(body["text"], "Title. Summary");
                Json(json!({"audioUrl": "http://audio/1.mp3"}))
            }),
        );
        let synth = RemoteSynthesizer::new(serve(app).await);

        let url = synth.synthesize("Title. Summary").await.unwrap();
        assert_eq!(url, "http://audio/1.mp3");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let app = Router::new().route(
            "/api/tts",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let synth = RemoteSynthesizer::new(serve(app).await);

        match synth.synthesize("x").await {
            Err(SynthesisError::Status { status, body }) => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(body, "upstream down");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_audio_url_is_malformed() {
        let app = Router::new().route("/api/tts", post(|| async { Json(json!({"ok": true})) }));
        let synth = RemoteSynthesizer::new(serve(app).await);

        assert!(matches!(
            synth.synthesize("x").await,
            Err(SynthesisError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        let synth = RemoteSynthesizer::new(TTSConfig {
            endpoint: "http://127.0.0.1:1/api/tts".into(),
            ..TTSConfig::default()
        });

        assert!(matches!(
            synth.synthesize("x").await,
            Err(SynthesisError::Network(_))
        ));
    }
}
