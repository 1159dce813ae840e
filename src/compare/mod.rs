pub mod config;

use crate::history::HistoryReader;
use crate::models::{DistanceRecord, FrameObservation};

pub use config::{ComparisonConfig, MatchStrategy};

/// Scores webcam frames against the reference history.
#[derive(Clone)]
pub struct Comparator {
    reference: HistoryReader,
    config: ComparisonConfig,
}

impl Comparator {
    pub fn new(reference: HistoryReader, config: ComparisonConfig) -> Self {
        Self { reference, config }
    }

    /// Per-joint distances for `webcam`, or `None` when no reference
    /// observation is available for it yet. A reference frame without a
    /// pose yields an empty list.
    pub fn compare(&self, webcam: &FrameObservation) -> Option<Vec<DistanceRecord>> {
        let threshold = self.config.threshold_px;
        match self.config.strategy {
            MatchStrategy::FrameId => self
                .reference
                .with_frame(webcam.frame_id, |reference| {
                    score_pose(reference, webcam, threshold)
                }),
            MatchStrategy::NearestTimestamp => self.reference.read(|frames| {
                nearest_by_time(frames, webcam.detected_at_ms, self.config.timestamp_tolerance_ms)
                    .map(|reference| score_pose(reference, webcam, threshold))
            }),
        }
    }

    /// Attaches the comparison to `webcam` in place. Returns false when the
    /// frame was skipped for lack of a reference.
    pub fn annotate(&self, webcam: &mut FrameObservation) -> bool {
        match self.compare(webcam) {
            Some(distances) => {
                webcam.distances = Some(distances);
                true
            }
            None => false,
        }
    }
}

/// Distance of every reference joint to the webcam joint at the same index.
/// Webcam joints are looked up positionally; a missing one scores as an
/// infinite distance.
pub fn score_pose(
    reference: &FrameObservation,
    webcam: &FrameObservation,
    threshold_px: f64,
) -> Vec<DistanceRecord> {
    reference
        .keypoints
        .iter()
        .enumerate()
        .map(|(index, expected)| {
            let distance_px = webcam
                .keypoints
                .get(index)
                .map(|actual| expected.pixel_distance(actual))
                .unwrap_or(f64::INFINITY);
            DistanceRecord {
                joint_id: expected.joint_id,
                distance_px,
                within_threshold: distance_px < threshold_px,
            }
        })
        .collect()
}

fn nearest_by_time(
    frames: &[FrameObservation],
    at_ms: f64,
    tolerance_ms: f64,
) -> Option<&FrameObservation> {
    let split = frames.partition_point(|obs| obs.detected_at_ms < at_ms);
    let before = split.checked_sub(1).and_then(|i| frames.get(i));
    let after = frames.get(split);
    let best = match (before, after) {
        (Some(b), Some(a)) => {
            if (at_ms - b.detected_at_ms) <= (a.detected_at_ms - at_ms) {
                b
            } else {
                a
            }
        }
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => return None,
    };
    ((best.detected_at_ms - at_ms).abs() <= tolerance_ms).then_some(best)
}
