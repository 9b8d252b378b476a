use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning for [`crate::HttpDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Size of the shared worker pool. Values below 1 are treated as 1.
    pub max_concurrent: usize,
    /// Timeout used for requests that carry a zero timeout.
    pub default_timeout_ms: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            default_timeout_ms: 30_000,
        }
    }
}

impl DispatchSettings {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Effective pool size.
    pub fn workers(&self) -> usize {
        self.max_concurrent.max(1)
    }
}
