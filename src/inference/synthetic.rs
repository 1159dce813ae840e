use anyhow::anyhow;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
    f64::consts::TAU,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, PoisonError,
    },
    time::Duration,
};

use crate::source::Frame;

use super::{DetectFuture, DetectedPose, Detection, Landmark, PoseDetector};

/// Produces a deterministic, slowly swaying single pose from the frame's
/// media time, with optional uniform jitter to imitate a live performer.
pub struct SyntheticPoseDetector {
    joint_count: usize,
    jitter: f64,
    latency: Duration,
    ready: AtomicBool,
    rng: Mutex<StdRng>,
}

impl SyntheticPoseDetector {
    pub fn new(joint_count: usize) -> Self {
        Self {
            joint_count,
            jitter: 0.0,
            latency: Duration::ZERO,
            ready: AtomicBool::new(true),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Uniform noise added to each normalized coordinate, in `[-jitter, jitter]`.
    pub fn with_jitter(mut self, jitter: f64, seed: u64) -> Self {
        self.jitter = jitter.abs();
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    fn pose_at(&self, media_time: f64) -> DetectedPose {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let span = self.joint_count.max(1) as f64;
        let joints = (0..self.joint_count)
            .map(|j| {
                let phase = media_time * TAU * 0.5 + j as f64 * 0.3;
                let mut x = 0.3 + 0.4 * (j as f64 / span);
                let mut y = 0.5 + 0.1 * phase.sin();
                if self.jitter > 0.0 {
                    x += rng.gen_range(-self.jitter..=self.jitter);
                    y += rng.gen_range(-self.jitter..=self.jitter);
                }
                Landmark {
                    x,
                    y,
                    z: 0.0,
                    visibility: 0.99,
                }
            })
            .collect();
        DetectedPose { joints }
    }
}

impl PoseDetector for SyntheticPoseDetector {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn detect(&self, frame: Frame, _timestamp_ms: f64) -> DetectFuture {
        if !self.is_ready() {
            return Box::pin(async { Err::<Detection, _>(anyhow!("pose detector is not loaded")) });
        }
        let pose = self.pose_at(frame.media_time);
        let latency = self.latency;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            Ok(Detection::single(pose))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::sync::Arc;

    fn frame_at(media_time: f64) -> Frame {
        Frame {
            image: Arc::new(RgbImage::new(4, 4)),
            media_time,
        }
    }

    #[tokio::test]
    async fn test_pose_is_deterministic_without_jitter() {
        let detector = SyntheticPoseDetector::new(33);
        let a = detector.detect(frame_at(1.25), 0.0).await.unwrap();
        let b = detector.detect(frame_at(1.25), 99.0).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.first_pose().unwrap().joints.len(), 33);
    }

    #[tokio::test]
    async fn test_jitter_stays_bounded() {
        let detector = SyntheticPoseDetector::new(5).with_jitter(0.01, 7);
        let clean = SyntheticPoseDetector::new(5);
        let noisy = detector.detect(frame_at(0.5), 0.0).await.unwrap();
        let reference = clean.detect(frame_at(0.5), 0.0).await.unwrap();
        for (n, r) in noisy.poses[0].joints.iter().zip(&reference.poses[0].joints) {
            assert!((n.x - r.x).abs() <= 0.01 + 1e-12);
            assert!((n.y - r.y).abs() <= 0.01 + 1e-12);
        }
    }

    #[tokio::test]
    async fn test_unready_detector_rejects() {
        let detector = SyntheticPoseDetector::new(3);
        detector.set_ready(false);
        assert!(detector.detect(frame_at(0.0), 0.0).await.is_err());
    }
}
