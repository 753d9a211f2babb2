//! Configuration for the per-party pipeline.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How long the iterator may sit with no eligible candidate before a
    /// stall diagnostic is emitted.
    pub stall_timeout_ms: u64,
    /// Events to buffer per pipeline-event subscriber.
    pub event_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stall_timeout_ms: 1_000,
            event_capacity: 256,
        }
    }
}
