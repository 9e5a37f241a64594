//! Engine tuning knobs

use std::time::Duration;

/// Reference polling cadence of the directory synchronizer.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);
/// Size of the event backlog page fetched for the selected run.
pub const DEFAULT_EVENT_PAGE_LIMIT: usize = 200;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    pub event_page_limit: usize,
    /// Applies to request/response calls only, never to the live stream.
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            event_page_limit: DEFAULT_EVENT_PAGE_LIMIT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl SyncConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        // A zero period would make tokio's interval panic.
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_event_page_limit(mut self, limit: usize) -> Self {
        self.event_page_limit = limit.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_cadence() {
        let config = SyncConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(4));
        assert_eq!(config.event_page_limit, 200);
    }

    #[test]
    fn builders_clamp_degenerate_values() {
        let config = SyncConfig::default()
            .with_poll_interval(Duration::ZERO)
            .with_event_page_limit(0);
        assert_eq!(config.poll_interval, Duration::from_millis(1));
        assert_eq!(config.event_page_limit, 1);
    }
}
