//! Desktop light/dark preference detection and change watching.

use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{Theme, ThemeStore};

pub trait SystemThemeSource: Send + Sync {
    /// Current desktop preference, or None if it cannot be determined.
    fn detect(&self) -> Option<Theme>;
}

/// Reads the desktop color scheme.
///
/// Order: `NEWSVOICE_COLOR_SCHEME`, GNOME `color-scheme` via gsettings,
/// `GTK_THEME` with a `:dark` variant.
pub struct DesktopTheme;

impl SystemThemeSource for DesktopTheme {
    fn detect(&self) -> Option<Theme> {
        if let Ok(value) = std::env::var("NEWSVOICE_COLOR_SCHEME") {
            if let Some(theme) = Theme::parse(value.trim()) {
                return Some(theme);
            }
        }

        let output = Command::new("gsettings")
            .args(["get", "org.gnome.desktop.interface", "color-scheme"])
            .output();
        if let Ok(output) = output {
            if output.status.success() {
                if let Some(theme) = parse_color_scheme(&String::from_utf8_lossy(&output.stdout)) {
                    return Some(theme);
                }
            }
        }

        std::env::var("GTK_THEME").ok().map(|gtk| {
            if gtk.to_ascii_lowercase().ends_with(":dark") {
                Theme::Dark
            } else {
                Theme::Light
            }
        })
    }
}

/// Parse gsettings output such as `'prefer-dark'`.
pub fn parse_color_scheme(raw: &str) -> Option<Theme> {
    match raw.trim().trim_matches('\'') {
        "prefer-dark" => Some(Theme::Dark),
        "prefer-light" | "default" => Some(Theme::Light),
        _ => None,
    }
}

/// Poll the desktop preference for the lifetime of the application and
/// forward changes to the theme store.
pub async fn watch_system_theme(
    source: Arc<dyn SystemThemeSource>,
    store: Arc<ThemeStore>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last = store.snapshot().system;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("System theme watcher stopped");
                break;
            }
            _ = ticker.tick() => {
                let source = source.clone();
                let detected = tokio::task::spawn_blocking(move || source.detect())
                    .await
                    .ok()
                    .flatten();
                if let Some(theme) = detected {
                    if theme != last {
                        info!("System theme changed: {last} → {theme}");
                        last = theme;
                        store.on_system_change(theme);
                        debug!("Page theme is {}", store.resolved());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::storage::MemoryStore;
    use std::sync::Mutex;

    struct ScriptedTheme(Mutex<Theme>);

    impl SystemThemeSource for ScriptedTheme {
        fn detect(&self) -> Option<Theme> {
            Some(*self.0.lock().unwrap())
        }
    }

    #[test]
    fn parses_gsettings_values() {
        assert_eq!(parse_color_scheme("'prefer-dark'\n"), Some(Theme::Dark));
        assert_eq!(parse_color_scheme("'default'"), Some(Theme::Light));
        assert_eq!(parse_color_scheme("'prefer-light'"), Some(Theme::Light));
        assert_eq!(parse_color_scheme("No such schema"), None);
    }

    #[tokio::test]
    async fn watcher_forwards_changes_to_store() {
        let source = Arc::new(ScriptedTheme(Mutex::new(Theme::Light)));
        let store = Arc::new(ThemeStore::new(Box::new(MemoryStore::default()), Theme::Light));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(watch_system_theme(
            source.clone(),
            store.clone(),
            Duration::from_millis(10),
            cancel.clone(),
        ));

        *source.0.lock().unwrap() = Theme::Dark;
        for _ in 0..100 {
            if store.resolved() == Theme::Dark {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.resolved(), Theme::Dark);
        assert_eq!(store.snapshot().system, Theme::Dark);

        cancel.cancel();
        task.await.unwrap();
    }
}
