//! Theme preference: explicit user choice, else the desktop setting.
//!
//! The explicit choice is persisted under a single `theme` key. While no
//! choice is persisted the resolved theme follows the desktop.

pub mod storage;
pub mod system;

use std::sync::Mutex;

use serde::Serialize;
use tracing::info;

use storage::PreferenceStore;

const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the shell needs to render the theme overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemeSnapshot {
    pub resolved: Theme,
    pub system: Theme,
    pub synced: bool,
}

struct ThemeState {
    resolved: Theme,
    system: Theme,
}

pub struct ThemeStore {
    store: Box<dyn PreferenceStore>,
    state: Mutex<ThemeState>,
}

impl ThemeStore {
    pub fn new(store: Box<dyn PreferenceStore>, system: Theme) -> Self {
        let resolved = store
            .get(THEME_KEY)
            .and_then(|saved| Theme::parse(&saved))
            .unwrap_or(system);
        info!("Theme resolved to {resolved} (system: {system})");

        Self {
            store,
            state: Mutex::new(ThemeState { resolved, system }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ThemeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn resolved(&self) -> Theme {
        self.state().resolved
    }

    pub fn snapshot(&self) -> ThemeSnapshot {
        let state = self.state();
        ThemeSnapshot {
            resolved: state.resolved,
            system: state.system,
            synced: state.resolved == state.system,
        }
    }

    pub fn has_explicit_choice(&self) -> bool {
        self.store.get(THEME_KEY).is_some()
    }

    /// Flip the theme and persist it as the explicit choice.
    pub fn toggle(&self) -> Theme {
        let mut state = self.state();
        state.resolved = state.resolved.toggled();
        self.store.set(THEME_KEY, state.resolved.as_str());
        info!("Theme toggled to {}", state.resolved);
        state.resolved
    }

    /// Forget the explicit choice and follow the desktop again.
    pub fn reset_to_system(&self) -> Theme {
        let mut state = self.state();
        self.store.remove(THEME_KEY);
        state.resolved = state.system;
        info!("Theme reset to system ({})", state.resolved);
        state.resolved
    }

    pub fn on_system_change(&self, system: Theme) {
        let mut state = self.state();
        state.system = system;
        if !self.has_explicit_choice() {
            state.resolved = system;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::storage::MemoryStore;
    use super::*;
    use std::sync::Arc;

    /// Store wrapper that lets the test inspect what was persisted.
    struct Shared(Arc<MemoryStore>);

    impl PreferenceStore for Shared {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }
        fn set(&self, key: &str, value: &str) {
            self.0.set(key, value)
        }
        fn remove(&self, key: &str) {
            self.0.remove(key)
        }
    }

    fn store_with(saved: Option<&str>, system: Theme) -> (ThemeStore, Arc<MemoryStore>) {
        let backing = Arc::new(MemoryStore::default());
        if let Some(saved) = saved {
            backing.set(THEME_KEY, saved);
        }
        (ThemeStore::new(Box::new(Shared(backing.clone())), system), backing)
    }

    #[test]
    fn no_saved_choice_follows_dark_system() {
        let (store, _) = store_with(None, Theme::Dark);
        assert_eq!(store.resolved(), Theme::Dark);
        assert!(store.snapshot().synced);
    }

    #[test]
    fn saved_choice_beats_system() {
        let (store, _) = store_with(Some("light"), Theme::Dark);
        assert_eq!(store.resolved(), Theme::Light);
        assert!(!store.snapshot().synced);
    }

    #[test]
    fn unparseable_saved_choice_is_ignored() {
        let (store, _) = store_with(Some("sepia"), Theme::Dark);
        assert_eq!(store.resolved(), Theme::Dark);
    }

    #[test]
    fn toggling_twice_returns_and_persists_final_value() {
        let (store, backing) = store_with(None, Theme::Light);
        assert_eq!(store.toggle(), Theme::Dark);
        assert_eq!(backing.get(THEME_KEY).as_deref(), Some("dark"));
        assert_eq!(store.toggle(), Theme::Light);
        assert_eq!(store.resolved(), Theme::Light);
        assert_eq!(backing.get(THEME_KEY).as_deref(), Some("light"));
    }

    #[test]
    fn reset_clears_choice_and_uses_current_system() {
        let (store, backing) = store_with(Some("light"), Theme::Light);
        store.on_system_change(Theme::Dark);
        assert_eq!(store.resolved(), Theme::Light);

        assert_eq!(store.reset_to_system(), Theme::Dark);
        assert_eq!(backing.get(THEME_KEY), None);
        assert!(!store.has_explicit_choice());
        assert_eq!(store.resolved(), Theme::Dark);
    }

    #[test]
    fn system_change_applies_only_without_explicit_choice() {
        let (store, _) = store_with(None, Theme::Light);
        store.on_system_change(Theme::Dark);
        assert_eq!(store.resolved(), Theme::Dark);

        store.toggle();
        store.on_system_change(Theme::Light);
        store.on_system_change(Theme::Dark);
        assert_eq!(store.resolved(), Theme::Light);
        assert_eq!(store.snapshot().system, Theme::Dark);
    }
}
