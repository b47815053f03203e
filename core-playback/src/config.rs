//! # Engine Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Interval between position/duration polls of the active backend.
    ///
    /// Default: 500ms.
    #[serde(default = "default_progress_poll_interval")]
    pub progress_poll_interval: Duration,
}

fn default_progress_poll_interval() -> Duration {
    Duration::from_millis(500)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            progress_poll_interval: default_progress_poll_interval(),
        }
    }
}

impl EngineConfig {
    /// Zero intervals are raised to one millisecond.
    pub fn with_progress_poll_interval(mut self, interval: Duration) -> Self {
        self.progress_poll_interval = interval.max(Duration::from_millis(1));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interval() {
        assert_eq!(
            EngineConfig::default().progress_poll_interval,
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_serde_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_zero_interval_is_raised() {
        let config = EngineConfig::default().with_progress_poll_interval(Duration::ZERO);
        assert_eq!(config.progress_poll_interval, Duration::from_millis(1));
    }
}
