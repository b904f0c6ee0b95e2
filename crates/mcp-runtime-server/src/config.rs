//! Server-wide configuration (spec §2 ambient config; grounded on
//! `turbomcp-server/src/config.rs`'s plain `Config` structs with
//! `Default`).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum size, in bytes, of a single request's `params` payload.
    /// Oversized requests are rejected with `InvalidRequest` before
    /// dispatch, mirroring the teacher's `max_message_size` check.
    pub max_message_size: usize,
    /// A session idle this long without an attached channel is eligible
    /// for `cleanupInactiveSessions` (spec §4.3).
    pub max_idle: Duration,
    /// How often the background eviction loop scans for idle sessions.
    pub cleanup_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_message_size: 1024 * 1024,
            max_idle: Duration::from_secs(30 * 60),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}
