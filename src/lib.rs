pub mod compare;
pub mod events;
pub mod history;
pub mod inference;
pub mod metrics;
pub mod models;
pub mod playback;
pub mod settings;
pub mod source;
pub mod stream;
mod utils;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::{Context, Result};
use log::{info, warn};
use std::{path::PathBuf, sync::Arc, time::Duration};

use events::LogSink;
use inference::SyntheticPoseDetector;
use metrics::mean_match_ratio;
use models::{Resolution, Topology};
use playback::{PlaybackController, PlaybackStatus};
use settings::{Settings, SettingsStore};
use source::{LiveCamera, RecordedVideo};
use stream::StreamInput;

const SETTINGS_ENV: &str = "POSEMIRROR_SETTINGS";
const DEMO_DURATION_SECS: f64 = 6.0;

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("PoseMirror starting up...");

    let settings = match std::env::var_os(SETTINGS_ENV) {
        Some(path) => SettingsStore::new(PathBuf::from(path))?.settings(),
        None => Settings::default(),
    };
    settings.validate().context("invalid settings")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(demo_session(settings))
}

/// Plays a synthetic reference against a jittery synthetic performer,
/// pausing once halfway, until the reference ends.
async fn demo_session(settings: Settings) -> Result<()> {
    let topology = Topology::blazepose();
    let joints = topology.joint_count();
    let native = Resolution::new(1280, 720);
    let display = native.fit_width(settings.playback.max_display_width);

    let reference = Arc::new(RecordedVideo::new("reference.mp4", native, DEMO_DURATION_SECS));
    let camera = Arc::new(LiveCamera::new("default camera", display));
    let reference_detector = Arc::new(SyntheticPoseDetector::new(joints));
    let performer_detector = Arc::new(
        SyntheticPoseDetector::new(joints)
            .with_jitter(0.05, 7)
            .with_latency(Duration::from_millis(8)),
    );

    let controller = PlaybackController::new(
        StreamInput::new(reference, reference_detector),
        StreamInput::new(camera, performer_detector),
        topology,
        &settings,
        Arc::new(LogSink),
    );

    controller.start().await?;
    tokio::time::sleep(Duration::from_secs_f64(DEMO_DURATION_SECS / 3.0)).await;
    controller.pause().await?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    controller.resume().await?;

    let deadline = Duration::from_secs_f64(DEMO_DURATION_SECS * 2.0);
    let ended = tokio::time::timeout(deadline, async {
        loop {
            if controller.get_state().await.status == PlaybackStatus::Ended {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await;
    if ended.is_err() {
        warn!("reference did not end within {:?}; stopping", deadline);
        controller.stop().await?;
        return Ok(());
    }

    let snapshot = controller.get_snapshot().await;
    match mean_match_ratio(&controller.webcam_history()) {
        Some(ratio) => info!(
            "session complete: {} video frames, {} webcam frames, {:.1}% joints matched",
            snapshot.video_frames,
            snapshot.webcam_frames,
            ratio * 100.0
        ),
        None => info!(
            "session complete: {} video frames, {} webcam frames, nothing scored",
            snapshot.video_frames, snapshot.webcam_frames
        ),
    }
    Ok(())
}
