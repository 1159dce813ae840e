use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Resolution;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Starting,
    Running,
    Paused,
    Ended,
}

impl PlaybackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "Idle",
            PlaybackStatus::Starting => "Starting",
            PlaybackStatus::Running => "Running",
            PlaybackStatus::Paused => "Paused",
            PlaybackStatus::Ended => "Ended",
        }
    }

    /// A new session may start from here.
    pub fn can_start(&self) -> bool {
        matches!(self, PlaybackStatus::Idle | PlaybackStatus::Ended)
    }

    /// Loops or sources may be active.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PlaybackStatus::Starting | PlaybackStatus::Running | PlaybackStatus::Paused
        )
    }
}

/// Display size of the reference and the capture size requested from the
/// webcam so both panes line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayLayout {
    pub reference: Resolution,
    pub webcam_constraint: Resolution,
}

impl DisplayLayout {
    pub fn for_reference(native: Resolution, max_width: u32) -> Self {
        let fitted = native.fit_width(max_width);
        Self {
            reference: fitted,
            webcam_constraint: fitted,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Reference playback-rate multiplier, read whenever the reference is
    /// (re)started.
    pub speed: f64,
    pub last_video_frame_id: Option<u64>,
    pub last_webcam_frame_id: Option<u64>,
    pub display: Option<DisplayLayout>,
    pub last_error: Option<String>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            session_id: None,
            started_at: None,
            ended_at: None,
            speed: 1.0,
            last_video_frame_id: None,
            last_webcam_frame_id: None,
            display: None,
            last_error: None,
        }
    }
}

impl PlaybackState {
    pub fn new(speed: f64) -> Self {
        Self {
            speed,
            ..Self::default()
        }
    }

    pub fn begin_starting(
        &mut self,
        session_id: String,
        started_at: DateTime<Utc>,
        display: DisplayLayout,
    ) -> Result<()> {
        if !self.status.can_start() {
            bail!("cannot start a session while {}", self.status.as_str());
        }
        *self = Self {
            status: PlaybackStatus::Starting,
            session_id: Some(session_id),
            started_at: Some(started_at),
            display: Some(display),
            ..Self::new(self.speed)
        };
        Ok(())
    }

    pub fn mark_running(&mut self) -> Result<()> {
        if self.status != PlaybackStatus::Starting {
            bail!("cannot run from {}", self.status.as_str());
        }
        self.status = PlaybackStatus::Running;
        Ok(())
    }

    /// Start failed; back to idle with the reason kept for display.
    pub fn fail_start(&mut self, error: String) {
        *self = Self {
            last_error: Some(error),
            ..Self::new(self.speed)
        };
    }

    pub fn pause(&mut self, last_video: Option<u64>, last_webcam: Option<u64>) -> Result<()> {
        if self.status != PlaybackStatus::Running {
            bail!("cannot pause while {}", self.status.as_str());
        }
        self.status = PlaybackStatus::Paused;
        self.last_video_frame_id = last_video;
        self.last_webcam_frame_id = last_webcam;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.status != PlaybackStatus::Paused {
            bail!("cannot resume while {}", self.status.as_str());
        }
        self.status = PlaybackStatus::Running;
        self.last_error = None;
        Ok(())
    }

    pub fn end(
        &mut self,
        ended_at: DateTime<Utc>,
        last_video: Option<u64>,
        last_webcam: Option<u64>,
    ) -> Result<()> {
        if !matches!(self.status, PlaybackStatus::Running | PlaybackStatus::Paused) {
            bail!("cannot end while {}", self.status.as_str());
        }
        self.status = PlaybackStatus::Ended;
        self.ended_at = Some(ended_at);
        self.last_video_frame_id = last_video;
        self.last_webcam_frame_id = last_webcam;
        Ok(())
    }

    /// Back to idle, keeping only the configured speed.
    pub fn reset(&mut self) {
        *self = Self::new(self.speed);
    }
}
