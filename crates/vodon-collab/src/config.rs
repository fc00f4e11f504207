//! Replication settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::reconnect::BackoffPolicy;
use crate::service::ClientOptions;

/// Where and how to replicate annotation documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollabConfig {
    /// Replication service endpoint.
    pub endpoint: String,
    /// Outgoing update window in milliseconds.
    pub throttle_window_ms: u64,
    /// Delay before the service re-opens a dropped watch stream.
    pub reconnect_stream_delay_ms: u64,
    /// Name shown to peers.
    pub user_name: String,
    pub backoff: BackoffPolicy,
}

impl Default for CollabConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".into(),
            throttle_window_ms: 60,
            reconnect_stream_delay_ms: 1000,
            user_name: "anonymous".into(),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl CollabConfig {
    pub fn throttle_window(&self) -> Duration {
        Duration::from_millis(self.throttle_window_ms)
    }

    /// Options handed to `ReplicationService::connect`.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            user_name: self.user_name.clone(),
            reconnect_stream_delay: Duration::from_millis(self.reconnect_stream_delay_ms),
        }
    }
}
