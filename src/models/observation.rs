use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Keypoint, Resolution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamKind {
    /// The pre-recorded reference video.
    Video,
    /// The live camera being scored.
    Webcam,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Video => "video",
            StreamKind::Webcam => "webcam",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison result for one joint of one webcam frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceRecord {
    pub joint_id: usize,
    /// `f64::INFINITY` when the webcam pose has no joint at this index.
    pub distance_px: f64,
    pub within_threshold: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub scored: usize,
    pub matched: usize,
}

impl ComparisonSummary {
    pub fn ratio(&self) -> f64 {
        if self.scored == 0 {
            return 0.0;
        }
        self.matched as f64 / self.scored as f64
    }
}

/// One fully processed frame from one stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameObservation {
    pub stream: StreamKind,
    /// Local to the stream; strictly increasing within one history buffer.
    pub frame_id: u64,
    /// Stream-local media time in seconds.
    pub media_time: f64,
    /// Session clock time in ms at which detection was requested.
    pub detected_at_ms: f64,
    pub fps: Option<f64>,
    pub pose_count: usize,
    /// First detected pose only; empty when `pose_count == 0`.
    pub keypoints: Vec<Keypoint>,
    pub resolution: Resolution,
    /// Webcam only. `None` while no reference frame was available; an empty
    /// list when the reference frame had no pose.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distances: Option<Vec<DistanceRecord>>,
}

impl FrameObservation {
    pub fn has_pose(&self) -> bool {
        !self.keypoints.is_empty()
    }

    pub fn keypoint(&self, joint_id: usize) -> Option<&Keypoint> {
        self.keypoints.get(joint_id)
    }

    pub fn is_scored(&self) -> bool {
        self.distances.is_some()
    }

    /// `None` until the comparator has attached distances to this frame.
    pub fn comparison_summary(&self) -> Option<ComparisonSummary> {
        let distances = self.distances.as_ref()?;
        Some(ComparisonSummary {
            scored: distances.len(),
            matched: distances.iter().filter(|d| d.within_threshold).count(),
        })
    }
}
