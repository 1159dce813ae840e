use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    compare::Comparator,
    history::HistoryBuffer,
    inference::{Detection, PoseDetector},
    models::{FrameObservation, Keypoint, Resolution, StreamKind, Topology},
    source::MediaSource,
};

use super::LoopContext;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at crate root)
use crate::{log_error, log_info, log_warn};

pub(super) struct FrameWorker {
    pub stream: StreamKind,
    pub source: Arc<dyn MediaSource>,
    pub detector: Arc<dyn PoseDetector>,
    pub history: Arc<HistoryBuffer>,
    pub comparator: Option<Comparator>,
    pub context: LoopContext,
}

pub(super) async fn frame_loop(
    worker: FrameWorker,
    from_frame_id: u64,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval(worker.context.timing.frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    let mut frame_id = from_frame_id;
    loop {
        if let Err(err) = worker.process_frame(frame_id).await {
            log_error!("{} frame {} dropped: {err:?}", worker.stream, frame_id);
        }
        frame_id += 1;

        // Checked before scheduling, not before processing: a pause that
        // lands mid-frame still lets that frame finish and append.
        if worker.source.is_ended() || worker.source.is_paused() {
            log_info!(
                "{} source {} stopped playing; loop exiting after frame {}",
                worker.stream,
                worker.source.label(),
                frame_id - 1
            );
            break;
        }

        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("{} loop cancelled before frame {}", worker.stream, frame_id);
                break;
            }
            _ = ticker.tick() => {}
        }
    }
}

impl FrameWorker {
    async fn process_frame(&self, frame_id: u64) -> Result<()> {
        let Some(frame) = self.source.capture_frame() else {
            log_warn!(
                "{} source {} produced no frame for {}",
                self.stream,
                self.source.label(),
                frame_id
            );
            return Ok(());
        };

        let resolution = frame.resolution();
        let media_time = frame.media_time;
        let now_ms = self.context.clock.now_ms();
        let previous_ms = self
            .history
            .reader()
            .read(|frames| frames.last().map(|obs| obs.detected_at_ms));
        let fps = compute_fps(previous_ms, now_ms);

        let detect = self.detector.detect(frame, now_ms);
        let detection = match time::timeout(self.context.timing.detect_timeout, detect).await {
            Ok(Ok(detection)) => detection,
            Ok(Err(err)) => {
                log_warn!("{} detection failed on frame {}: {err:?}", self.stream, frame_id);
                Detection::empty()
            }
            Err(_) => {
                log_warn!(
                    "{} detection timeout (> {}ms) on frame {}",
                    self.stream,
                    self.context.timing.detect_timeout.as_millis(),
                    frame_id
                );
                Detection::empty()
            }
        };

        let mut observation = build_observation(
            self.stream,
            frame_id,
            media_time,
            now_ms,
            fps,
            resolution,
            &detection,
            &self.context.topology,
        );

        if observation.pose_count == 0 {
            log_warn!("{}: no landmarks detected in frame {}", self.stream, frame_id);
        }

        if let Some(comparator) = &self.comparator {
            if !comparator.annotate(&mut observation) {
                log::trace!("{} frame {} has no reference yet", self.stream, frame_id);
            }
        }

        self.history
            .append(observation.clone())
            .context("history append rejected")?;
        self.context.sink.frame_processed(&observation);
        Ok(())
    }
}

/// Instantaneous rate from the previous detection, rounded to 2 decimals.
pub(super) fn compute_fps(previous_ms: Option<f64>, now_ms: f64) -> Option<f64> {
    let delta = now_ms - previous_ms?;
    if delta <= 0.0 {
        return None;
    }
    Some((1000.0 / delta * 100.0).round() / 100.0)
}

/// Keeps only the first pose, and only when it matches the topology;
/// anything else is recorded as a frame without detections.
#[allow(clippy::too_many_arguments)]
pub(super) fn build_observation(
    stream: StreamKind,
    frame_id: u64,
    media_time: f64,
    detected_at_ms: f64,
    fps: Option<f64>,
    resolution: Resolution,
    detection: &Detection,
    topology: &Topology,
) -> FrameObservation {
    let keypoints: Vec<Keypoint> = match detection.first_pose() {
        Some(pose) if pose.joints.len() == topology.joint_count() => pose
            .joints
            .iter()
            .enumerate()
            .map(|(joint_id, landmark)| {
                Keypoint::from_normalized(
                    joint_id,
                    [landmark.x, landmark.y, landmark.z],
                    landmark.visibility,
                    resolution,
                )
            })
            .collect(),
        Some(pose) => {
            log::warn!(
                "{} frame {}: pose has {} joints, {} expects {}",
                stream,
                frame_id,
                pose.joints.len(),
                topology.name(),
                topology.joint_count()
            );
            Vec::new()
        }
        None => Vec::new(),
    };

    if detection.poses.len() > 1 {
        log::debug!(
            "{} frame {}: {} poses detected, tracking the first",
            stream,
            frame_id,
            detection.poses.len()
        );
    }
    // Single-subject tracking.
    let pose_count = usize::from(!keypoints.is_empty());

    FrameObservation {
        stream,
        frame_id,
        media_time,
        detected_at_ms,
        fps,
        pose_count,
        keypoints,
        resolution,
        distances: None,
    }
}
