//! Transient "copied" indicator for highlighted spans.

use std::time::{Duration, Instant};

use alignwatch_shared::HighlightConfig;

/// How long a copied span stays marked by default.
pub const DEFAULT_COPY_RESET: Duration = Duration::from_millis(2_000);

/// Tracks the most recently copied span text.
///
/// Keyed by the literal span text, so every span with the same text shows as
/// copied. The mark clears once `reset_after` has elapsed.
#[derive(Debug, Clone)]
pub struct CopyFeedback {
    reset_after: Duration,
    copied: Option<(String, Instant)>,
}

impl Default for CopyFeedback {
    fn default() -> Self {
        Self::new(DEFAULT_COPY_RESET)
    }
}

impl From<&HighlightConfig> for CopyFeedback {
    fn from(config: &HighlightConfig) -> Self {
        Self::new(Duration::from_millis(config.copy_reset_ms))
    }
}

impl CopyFeedback {
    pub fn new(reset_after: Duration) -> Self {
        Self {
            reset_after,
            copied: None,
        }
    }

    /// Record that `text` was copied at `now`, replacing any earlier mark.
    pub fn copy(&mut self, text: &str, now: Instant) {
        tracing::trace!(len = text.len(), "span copied");
        self.copied = Some((text.to_string(), now));
    }

    /// The currently marked text, if its window has not elapsed.
    pub fn current(&self, now: Instant) -> Option<&str> {
        self.copied
            .as_ref()
            .filter(|(_, at)| now.saturating_duration_since(*at) < self.reset_after)
            .map(|(text, _)| text.as_str())
    }

    pub fn is_copied(&self, text: &str, now: Instant) -> bool {
        self.current(now) == Some(text)
    }

    /// Drop an elapsed mark. Returns `true` if something was cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.copied.is_some() && self.current(now).is_none() {
            self.copied = None;
            return true;
        }
        false
    }

    pub fn reset_after(&self) -> Duration {
        self.reset_after
    }
}
