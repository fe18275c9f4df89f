//! De-duplicated error logging for polled feeds
//!
//! During an outage every poll fails the same way. Only a change in the error
//! message is logged, plus one line when the feed recovers.

use tracing::{info, warn};

/// Per-feed log throttle
#[derive(Debug)]
pub struct LogThrottle {
    feed: &'static str,
    last_error: Option<String>,
}

impl LogThrottle {
    pub fn new(feed: &'static str) -> Self {
        Self {
            feed,
            last_error: None,
        }
    }

    /// Record a failed poll; returns whether it was logged
    pub fn failure(&mut self, message: &str) -> bool {
        if self.last_error.as_deref() == Some(message) {
            return false;
        }
        warn!(feed = self.feed, error = %message, "Feed request failed");
        self.last_error = Some(message.to_string());
        true
    }

    /// Record a successful poll; returns whether a recovery was logged
    pub fn success(&mut self) -> bool {
        if self.last_error.take().is_none() {
            return false;
        }
        info!(feed = self.feed, "Connection restored");
        true
    }
}
