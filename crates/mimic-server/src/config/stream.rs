//! Streaming response configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound accepted for the per-event delay
pub const MAX_DELAY_MS: u64 = 10_000;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct StreamConfig {
    /// Pause between consecutive stream events, in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_delay_ms() -> u64 {
    10
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

impl StreamConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}
