//! Desktop notifications via notify-rust (D-Bus).

use notify_rust::Notification;
use tracing::{debug, warn};

/// Non-blocking user-facing alert.
pub trait Alert: Send + Sync {
    fn alert(&self, summary: &str, body: &str);
}

pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Alert for Notifier {
    fn alert(&self, summary: &str, body: &str) {
        if !self.enabled {
            warn!("{summary}: {body}");
            return;
        }

        debug!("Notification: {summary}");

        if let Err(e) = Notification::new()
            .summary(summary)
            .body(body)
            .icon("audio-volume-high")
            .timeout(5000)
            .show()
        {
            warn!("Failed to show notification: {e}");
        }
    }
}
