use anyhow::{bail, Result};
use image::RgbImage;
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use crate::models::Resolution;

use super::{Frame, MediaSource, PlayFuture, PlaybackClock};

fn blank_image(resolution: Resolution) -> Arc<RgbImage> {
    Arc::new(RgbImage::new(resolution.width, resolution.height))
}

fn lock(clock: &Mutex<PlaybackClock>) -> MutexGuard<'_, PlaybackClock> {
    clock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A finite, rate-controllable recording. Frames are blank images at the
/// recording's native resolution; the pose comes from the detector.
pub struct RecordedVideo {
    label: String,
    resolution: Resolution,
    image: Arc<RgbImage>,
    clock: Mutex<PlaybackClock>,
}

impl RecordedVideo {
    pub fn new(label: impl Into<String>, resolution: Resolution, duration_secs: f64) -> Self {
        Self {
            label: label.into(),
            resolution,
            image: blank_image(resolution),
            clock: Mutex::new(PlaybackClock::new(Some(duration_secs))),
        }
    }

    pub fn playback_rate(&self) -> f64 {
        lock(&self.clock).rate()
    }
}

impl MediaSource for RecordedVideo {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_ready(&self) -> bool {
        !self.resolution.is_empty()
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn current_time(&self) -> f64 {
        lock(&self.clock).position()
    }

    fn play(&self) -> PlayFuture<'_> {
        Box::pin(async move {
            if !self.is_ready() {
                bail!("{} has no loaded media", self.label);
            }
            lock(&self.clock).start(Instant::now());
            Ok(())
        })
    }

    fn pause(&self) {
        lock(&self.clock).pause(Instant::now());
    }

    fn is_paused(&self) -> bool {
        !lock(&self.clock).is_running()
    }

    fn is_ended(&self) -> bool {
        lock(&self.clock).is_ended()
    }

    fn set_playback_rate(&self, rate: f64) -> Result<()> {
        if !(rate.is_finite() && rate > 0.0) {
            bail!("invalid playback rate {rate}");
        }
        lock(&self.clock).set_rate(rate, Instant::now());
        Ok(())
    }

    fn capture_frame(&self) -> Option<Frame> {
        if !self.is_ready() {
            return None;
        }
        Some(Frame {
            image: Arc::clone(&self.image),
            media_time: self.current_time(),
        })
    }
}

/// An unbounded live feed. It never ends and has no intrinsic speed.
pub struct LiveCamera {
    label: String,
    resolution: Resolution,
    image: Arc<RgbImage>,
    clock: Mutex<PlaybackClock>,
}

impl LiveCamera {
    pub fn new(label: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            label: label.into(),
            resolution,
            image: blank_image(resolution),
            clock: Mutex::new(PlaybackClock::new(None)),
        }
    }
}

impl MediaSource for LiveCamera {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_ready(&self) -> bool {
        !self.resolution.is_empty()
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn current_time(&self) -> f64 {
        lock(&self.clock).position()
    }

    fn play(&self) -> PlayFuture<'_> {
        Box::pin(async move {
            if !self.is_ready() {
                bail!("{} has no active stream", self.label);
            }
            lock(&self.clock).start(Instant::now());
            Ok(())
        })
    }

    fn pause(&self) {
        lock(&self.clock).pause(Instant::now());
    }

    fn is_paused(&self) -> bool {
        !lock(&self.clock).is_running()
    }

    fn is_ended(&self) -> bool {
        false
    }

    fn capture_frame(&self) -> Option<Frame> {
        if !self.is_ready() {
            return None;
        }
        Some(Frame {
            image: Arc::clone(&self.image),
            media_time: self.current_time(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recorded_video_play_pause() {
        let video = RecordedVideo::new("clip", Resolution::new(64, 36), 10.0);
        assert!(video.is_paused());
        video.play().await.unwrap();
        assert!(!video.is_paused());
        video.pause();
        assert!(video.is_paused());
        assert!(!video.is_ended());
    }

    #[tokio::test]
    async fn test_unloaded_video_rejects_play() {
        let video = RecordedVideo::new("empty", Resolution::default(), 10.0);
        assert!(!video.is_ready());
        assert!(video.play().await.is_err());
        assert!(video.capture_frame().is_none());
    }

    #[test]
    fn test_recorded_video_rate_validation() {
        let video = RecordedVideo::new("clip", Resolution::new(64, 36), 10.0);
        assert!(video.set_playback_rate(0.0).is_err());
        assert!(video.set_playback_rate(f64::NAN).is_err());
        video.set_playback_rate(1.5).unwrap();
        assert_eq!(video.playback_rate(), 1.5);
    }

    #[test]
    fn test_camera_has_no_rate_and_never_ends() {
        let camera = LiveCamera::new("cam0", Resolution::new(64, 48));
        assert!(camera.set_playback_rate(2.0).is_err());
        assert!(!camera.is_ended());
        let frame = camera.capture_frame().unwrap();
        assert_eq!(frame.resolution(), Resolution::new(64, 48));
    }
}
