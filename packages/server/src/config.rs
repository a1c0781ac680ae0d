//! Engine configuration.
//!
//! All tunables are resolved once at startup (CLI flags / environment) and
//! passed into constructors. Nothing reads configuration ad hoc mid-logic.

use crate::domain::ChunkPolicy;

/// Runtime configuration for the broadcast engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Broadcast tick period in milliseconds. 50ms (20Hz) is fast enough for
    /// lip-sync to read as continuous motion without wasting bandwidth.
    pub tick_interval_ms: u64,
    /// How many chat messages each stream retains.
    pub chat_history_capacity: usize,
    /// How many recent chat messages a joining viewer receives.
    pub chat_tail_len: usize,
    /// Subtitle chunking bounds.
    pub chunk_policy: ChunkPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            chat_history_capacity: 100,
            chat_tail_len: 50,
            chunk_policy: ChunkPolicy::default(),
        }
    }
}
