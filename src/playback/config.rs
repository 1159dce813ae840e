use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::stream::LoopTiming;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackConfig {
    /// Reference playback-rate multiplier applied when a session starts.
    pub default_speed: f64,
    /// Scheduling period of each frame loop (one display frame at 60 Hz).
    pub frame_interval_ms: u64,
    pub detect_timeout_ms: u64,
    /// How often the FPS series is republished while running.
    pub metrics_interval_ms: u64,
    /// The reference is displayed at most this wide; the webcam is asked for
    /// the same size.
    pub max_display_width: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_speed: 1.0,
            frame_interval_ms: 16,
            detect_timeout_ms: 1000,
            metrics_interval_ms: 1000,
            max_display_width: 720,
        }
    }
}

impl PlaybackConfig {
    pub fn timing(&self) -> LoopTiming {
        LoopTiming {
            frame_interval: Duration::from_millis(self.frame_interval_ms.max(1)),
            detect_timeout: Duration::from_millis(self.detect_timeout_ms.max(1)),
        }
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_interval_ms.max(1))
    }
}
