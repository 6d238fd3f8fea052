//! Headline feed: fetch, summarize, and fall back to placeholder stories.
//!
//! Each article gets a process-unique id when it is fetched, so playback
//! state can refer to an article without depending on its list position.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::NewsConfig;

const SUMMARY_WORDS: usize = 20;
const EMPTY_SUMMARY: &str = "Breaking news update...";

static NEXT_ARTICLE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub u64);

impl ArticleId {
    fn next() -> Self {
        Self(NEXT_ARTICLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub source_name: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub summary: String,
}

impl Article {
    /// The text that gets narrated: title followed by the summary.
    pub fn narration_text(&self) -> String {
        format!("{}. {}", self.title, self.summary)
    }
}

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("news request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("news API returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed news response: {0}")]
    Malformed(String),
}

/// First twenty words of the text, with an ellipsis when truncated.
pub fn summarize(text: Option<&str>) -> String {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return EMPTY_SUMMARY.to_string();
    };
    let words: Vec<&str> = text.split(' ').collect();
    if words.len() <= SUMMARY_WORDS {
        return text.to_string();
    }
    format!("{}...", words[..SUMMARY_WORDS].join(" "))
}

// --- Wire format ---

#[derive(Deserialize)]
struct FeedResponse {
    articles: Option<Vec<RawArticle>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    url_to_image: Option<String>,
    source: Option<RawSource>,
    published_at: Option<String>,
}

#[derive(Deserialize)]
struct RawSource {
    name: Option<String>,
}

impl From<RawArticle> for Article {
    fn from(raw: RawArticle) -> Self {
        let title = raw.title.unwrap_or_default();
        let source_text = raw
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .or(Some(title.as_str()));
        let summary = summarize(source_text);
        let published_at = raw
            .published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Self {
            id: ArticleId::next(),
            title,
            description: raw.description,
            image_url: raw.url_to_image,
            source_name: raw.source.and_then(|s| s.name),
            published_at,
            summary,
        }
    }
}

/// Stories shown when the feed cannot be fetched.
pub fn placeholder_articles() -> Vec<Article> {
    [
        (
            "AI Technology Breakthrough Announced",
            "Major tech companies unveil revolutionary AI advancement that could change industry standards.",
            "Tech News",
        ),
        (
            "Global Climate Summit Reaches Agreement",
            "World leaders commit to ambitious climate goals in historic international environmental accord.",
            "Global News",
        ),
        (
            "Space Exploration Mission Success",
            "International space agency achieves milestone in deep space exploration with successful mission.",
            "Space News",
        ),
    ]
    .into_iter()
    .map(|(title, description, source)| Article {
        id: ArticleId::next(),
        title: title.into(),
        description: Some(description.into()),
        image_url: None,
        source_name: Some(source.into()),
        published_at: None,
        summary: format!("{}...", description.trim_end_matches('.')),
    })
    .collect()
}

pub struct NewsClient {
    config: NewsConfig,
    client: Client,
}

impl NewsClient {
    pub fn new(config: NewsConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// One request to the headlines endpoint. Not retried.
    pub async fn fetch_headlines(&self) -> Result<Vec<Article>, NewsError> {
        debug!("Fetching headlines for country '{}'", self.config.country);

        let resp = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("country", self.config.country.as_str()),
                ("apiKey", self.config.api_key.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(NewsError::Status(resp.status()));
        }

        let body: FeedResponse = resp
            .json()
            .await
            .map_err(|e| NewsError::Malformed(e.to_string()))?;
        let articles = body
            .articles
            .ok_or_else(|| NewsError::Malformed("missing articles array".into()))?;

        Ok(articles.into_iter().map(Article::from).collect())
    }

    /// Fetch headlines, substituting placeholder stories on any failure.
    pub async fn load_feed(&self) -> Vec<Article> {
        match self.fetch_headlines().await {
            Ok(articles) => {
                info!("Fetched {} headlines", articles.len());
                articles
            }
            Err(e) => {
                warn!("Error fetching news: {e}, showing placeholder stories");
                placeholder_articles()
            }
        }
    }
}
