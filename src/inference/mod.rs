pub mod synthetic;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{future::Future, pin::Pin};

use crate::source::Frame;

pub use synthetic::SyntheticPoseDetector;

pub type DetectFuture = Pin<Box<dyn Future<Output = Result<Detection>> + Send + 'static>>;

/// One joint as reported by the pose model, in normalized source coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub visibility: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectedPose {
    pub joints: Vec<Landmark>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub poses: Vec<DetectedPose>,
}

impl Detection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(pose: DetectedPose) -> Self {
        Self { poses: vec![pose] }
    }

    pub fn first_pose(&self) -> Option<&DetectedPose> {
        self.poses.first()
    }
}

/// The external pose-inference capability.
///
/// `detect` must not block the caller; the returned future resolves once
/// the model has produced a result for `frame`.
pub trait PoseDetector: Send + Sync {
    fn is_ready(&self) -> bool;

    fn detect(&self, frame: Frame, timestamp_ms: f64) -> DetectFuture;
}
