use serde::{Deserialize, Serialize};

/// How a webcam frame finds its reference frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchStrategy {
    /// Same frame id in both streams. Ids count processed frames per stream,
    /// so equal ids are not guaranteed to be temporally aligned.
    #[default]
    FrameId,
    /// Reference frame detected closest in time on the shared session clock.
    NearestTimestamp,
}

/// Tunable thresholds for pose comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComparisonConfig {
    /// A joint matches when its pixel distance is strictly below this.
    pub threshold_px: f64,
    pub strategy: MatchStrategy,
    /// Only used by `MatchStrategy::NearestTimestamp`.
    pub timestamp_tolerance_ms: f64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            threshold_px: 80.0,
            strategy: MatchStrategy::FrameId,
            timestamp_tolerance_ms: 50.0,
        }
    }
}
