//! Fixtures shared by unit tests across modules.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use anyhow::{anyhow, bail, Result};
use image::RgbImage;

use crate::{
    events::EventSink,
    inference::{DetectFuture, DetectedPose, Detection, Landmark, PoseDetector},
    metrics::FpsPoint,
    models::{FrameObservation, Keypoint, Resolution, StreamKind},
    playback::{PlaybackSnapshot, PlaybackStatus},
    source::{Frame, MediaSource, PlayFuture},
};

const FIXTURE_SIZE: u32 = 1000;

/// A frame at 1000x1000 so pixel coordinates read like normalized ones
/// scaled by 1000.
pub fn observation(stream: StreamKind, frame_id: u64, keypoints: Vec<Keypoint>) -> FrameObservation {
    FrameObservation {
        stream,
        frame_id,
        media_time: frame_id as f64 / 30.0,
        detected_at_ms: frame_id as f64 * 33.0,
        fps: Some(30.0),
        pose_count: usize::from(!keypoints.is_empty()),
        keypoints,
        resolution: Resolution::new(FIXTURE_SIZE, FIXTURE_SIZE),
        distances: None,
    }
}

pub fn keypoint_at(joint_id: usize, px: f64, py: f64) -> Keypoint {
    let size = FIXTURE_SIZE as f64;
    Keypoint {
        joint_id,
        normalized: [px / size, py / size, 0.0],
        pixel: [px, py],
        visibility: 1.0,
    }
}

pub fn assert_strictly_increasing(frames: &[FrameObservation]) {
    for pair in frames.windows(2) {
        assert!(
            pair[0].frame_id < pair[1].frame_id,
            "frame ids not increasing: {} then {}",
            pair[0].frame_id,
            pair[1].frame_id
        );
    }
}

/// Polls `condition` until it holds or roughly two seconds pass.
pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..1000 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    condition()
}

/// Detector returning every joint at the frame centre.
pub struct ScriptedDetector {
    joints: usize,
    ready: AtomicBool,
    failing: AtomicBool,
    hanging: AtomicBool,
    latency: Mutex<Duration>,
    calls: AtomicUsize,
}

impl ScriptedDetector {
    pub fn new(joints: usize) -> Self {
        Self {
            joints,
            ready: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            hanging: AtomicBool::new(false),
            latency: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_hanging(&self, hanging: bool) {
        self.hanging.store(hanging, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Number of detections requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PoseDetector for ScriptedDetector {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn detect(&self, _frame: Frame, _timestamp_ms: f64) -> DetectFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hanging.load(Ordering::SeqCst) {
            return Box::pin(std::future::pending::<Result<Detection>>());
        }
        if self.failing.load(Ordering::SeqCst) {
            return Box::pin(async { Err::<Detection, _>(anyhow!("scripted failure")) });
        }
        let joints = (0..self.joints)
            .map(|_| Landmark {
                x: 0.5,
                y: 0.5,
                z: 0.0,
                visibility: 1.0,
            })
            .collect();
        let detection = Detection::single(DetectedPose { joints });
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            Ok(detection)
        })
    }
}

/// Source controlled directly by the test. Starts paused and ready at 64x48.
pub struct ManualSource {
    label: String,
    image: Arc<RgbImage>,
    ready: AtomicBool,
    paused: AtomicBool,
    ended: AtomicBool,
    reject_play: AtomicBool,
    rate: Mutex<f64>,
}

impl ManualSource {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            image: Arc::new(RgbImage::new(64, 48)),
            ready: AtomicBool::new(true),
            paused: AtomicBool::new(true),
            ended: AtomicBool::new(false),
            reject_play: AtomicBool::new(false),
            rate: Mutex::new(1.0),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_ended(&self, ended: bool) {
        self.ended.store(ended, Ordering::SeqCst);
    }

    pub fn set_reject_play(&self, reject: bool) {
        self.reject_play.store(reject, Ordering::SeqCst);
    }

    pub fn playback_rate(&self) -> f64 {
        *self.rate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrites the rate without going through the controller.
    pub fn force_playback_rate(&self, rate: f64) {
        *self.rate.lock().unwrap_or_else(PoisonError::into_inner) = rate;
    }
}

impl MediaSource for ManualSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn resolution(&self) -> Resolution {
        Resolution::new(self.image.width(), self.image.height())
    }

    fn current_time(&self) -> f64 {
        0.0
    }

    fn play(&self) -> PlayFuture<'_> {
        Box::pin(async move {
            if self.reject_play.load(Ordering::SeqCst) {
                bail!("play() rejected for {}", self.label);
            }
            self.paused.store(false, Ordering::SeqCst);
            Ok(())
        })
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    fn set_playback_rate(&self, rate: f64) -> Result<()> {
        self.force_playback_rate(rate);
        Ok(())
    }

    fn capture_frame(&self) -> Option<Frame> {
        Some(Frame {
            image: Arc::clone(&self.image),
            media_time: 0.0,
        })
    }
}

/// Sink that keeps everything it receives.
#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<FrameObservation>>,
    metrics: Mutex<Vec<Vec<FpsPoint>>>,
    statuses: Mutex<Vec<PlaybackStatus>>,
}

impl RecordingSink {
    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn frames(&self) -> Vec<FrameObservation> {
        self.frames.lock().unwrap().clone()
    }

    pub fn metrics_count(&self) -> usize {
        self.metrics.lock().unwrap().len()
    }

    pub fn last_metrics_len(&self) -> Option<usize> {
        self.metrics.lock().unwrap().last().map(Vec::len)
    }

    pub fn statuses(&self) -> Vec<PlaybackStatus> {
        self.statuses.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn playback_changed(&self, snapshot: &PlaybackSnapshot) {
        self.statuses.lock().unwrap().push(snapshot.state.status);
    }

    fn frame_processed(&self, observation: &FrameObservation) {
        self.frames.lock().unwrap().push(observation.clone());
    }

    fn metrics_updated(&self, series: &[FpsPoint]) {
        self.metrics.lock().unwrap().push(series.to_vec());
    }
}
