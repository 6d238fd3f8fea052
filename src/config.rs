//! Configuration management for newsvoice.
//!
//! Loads config from YAML files in standard locations. Every section has
//! defaults, so a missing or partial file is never fatal.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5173,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub endpoint: String,
    pub country: String,
    pub api_key: String,
    pub max_articles: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://newsapi.org/v2/top-headlines".into(),
            country: "us".into(),
            api_key: String::new(),
            max_articles: 6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TTSConfig {
    pub endpoint: String,
    pub voice_id: String,
    pub style: String,
}

impl Default for TTSConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8081/api/tts".into(),
            voice_id: "en-US-cooper".into(),
            style: "Conversational".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub engine: Option<PathBuf>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            rate: 0.8,
            pitch: 1.0,
            volume: 1.0,
            engine: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// Write the explicit choice to `state_file`; when false it is kept in memory only.
    pub persist: bool,
    pub state_file: Option<PathBuf>,
    pub poll_interval_secs: u64,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            persist: true,
            state_file: None,
            poll_interval_secs: 5,
        }
    }
}

impl ThemeConfig {
    /// Where the explicit theme choice is persisted.
    pub fn state_path(&self) -> PathBuf {
        self.state_file.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("newsvoice/state.json")
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub enabled: bool,
    pub port: u16,
    pub upstream: String,
    pub api_key: String,
    pub format: String,
    pub allowed_origins: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8081,
            upstream: "https://api.murf.ai/v1/speech/generate".into(),
            api_key: String::new(),
            format: "mp3".into(),
            allowed_origins: vec![
                "http://localhost:5173".into(),
                "http://127.0.0.1:5173".into(),
                "http://localhost:3000".into(),
                "http://127.0.0.1:3000".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub notifications: bool,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            notifications: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub news: NewsConfig,
    pub tts: TTSConfig,
    pub fallback: FallbackConfig,
    pub theme: ThemeConfig,
    pub proxy: ProxyConfig,
    pub feedback: FeedbackConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/newsvoice/config.yaml
    /// 3. /etc/newsvoice/config.yaml
    ///
    /// API keys may also come from `NEWS_API_KEY` and `MURF_API_KEY`,
    /// which take precedence over the file.
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/newsvoice/config.yaml")),
                Some(PathBuf::from("/etc/newsvoice/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let mut config = match resolved {
            Some(config_path) => Self::from_file(&config_path),
            None => {
                info!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env();
        config
    }

    fn from_file(config_path: &Path) -> Self {
        match std::fs::read_to_string(config_path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("NEWS_API_KEY") {
            if !key.is_empty() {
                self.news.api_key = key;
            }
        }
        if let Ok(key) = std::env::var("MURF_API_KEY") {
            if !key.is_empty() {
                self.proxy.api_key = key;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let config = Config::parse("news:\n  country: gb\nproxy:\n  port: 9000\n").unwrap();
        assert_eq!(config.news.country, "gb");
        assert_eq!(config.news.max_articles, 6);
        assert_eq!(config.proxy.port, 9000);
        assert_eq!(config.proxy.format, "mp3");
        assert_eq!(config.tts.voice_id, "en-US-cooper");
        assert!((config.fallback.rate - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let config = Config::from_file(Path::new("/nonexistent/newsvoice/config.yaml"));
        assert_eq!(config.server.port, 5173);
    }

    #[test]
    fn explicit_state_file_wins() {
        let theme = ThemeConfig {
            state_file: Some(PathBuf::from("/tmp/x.json")),
            ..ThemeConfig::default()
        };
        assert_eq!(theme.state_path(), PathBuf::from("/tmp/x.json"));
    }

    #[test]
    fn theme_persistence_defaults_on_and_can_be_disabled() {
        assert!(Config::default().theme.persist);
        let config = Config::parse("theme:\n  persist: false\n").unwrap();
        assert!(!config.theme.persist);
        assert_eq!(config.theme.poll_interval_secs, 5);
    }
}
