//! Health check report

use serde::Serialize;

use crate::buffer::FrameBuffer;
use crate::stats::ServerStats;

/// State of the frame source as seen through the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraState {
    /// At least one frame has been published
    Active,
    /// Nothing published yet
    Waiting,
    /// Buffer shut down
    Stopped,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub camera: CameraState,
    pub generation: u64,
    pub clients: u64,
}

impl HealthReport {
    /// Snapshot the buffer and server counters
    pub fn collect(buffer: &FrameBuffer, stats: &ServerStats) -> Self {
        let generation = buffer.generation();
        let camera = if buffer.is_shut_down() {
            CameraState::Stopped
        } else if generation == 0 {
            CameraState::Waiting
        } else {
            CameraState::Active
        };

        Self {
            status: "ok",
            camera,
            generation,
            clients: stats.active_sessions,
        }
    }

    /// Encode as a JSON document
    pub fn to_json(&self) -> Vec<u8> {
        // Plain struct of strings and integers; serialization cannot fail
        serde_json::to_vec(self).unwrap_or_else(|_| br#"{"status":"ok"}"#.to_vec())
    }
}
