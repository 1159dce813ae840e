pub mod clock;
pub mod synthetic;

use anyhow::{bail, Result};
use image::RgbImage;
use std::{future::Future, pin::Pin, sync::Arc};

use crate::models::Resolution;

pub use clock::PlaybackClock;
pub use synthetic::{LiveCamera, RecordedVideo};

pub type PlayFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A single decoded frame handed to the pose detector.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: Arc<RgbImage>,
    /// Media time of the source when the frame was grabbed, in seconds.
    pub media_time: f64,
}

impl Frame {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.image.width(), self.image.height())
    }
}

/// An addressable video or camera element.
///
/// Implementations use interior mutability; every method takes `&self` so a
/// source can be shared between its stream loop and the playback controller.
pub trait MediaSource: Send + Sync {
    fn label(&self) -> &str;

    /// True once the source has a valid stream with a known resolution.
    fn is_ready(&self) -> bool;

    fn resolution(&self) -> Resolution;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Start or resume playback. May be rejected (e.g. autoplay restrictions).
    fn play(&self) -> PlayFuture<'_>;

    fn pause(&self);

    fn is_paused(&self) -> bool;

    fn is_ended(&self) -> bool;

    fn set_playback_rate(&self, rate: f64) -> Result<()> {
        let _ = rate;
        bail!("{} does not support a playback rate", self.label())
    }

    fn capture_frame(&self) -> Option<Frame>;
}
