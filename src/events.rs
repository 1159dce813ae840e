use serde::Serialize;

use crate::{
    metrics::FpsPoint,
    models::FrameObservation,
    playback::PlaybackSnapshot,
};

/// Outbound notifications for whatever renders the session: the drawing
/// routine, the FPS chart and the playback controls.
pub trait EventSink: Send + Sync {
    fn playback_changed(&self, snapshot: &PlaybackSnapshot);

    /// Called exactly once per appended observation.
    fn frame_processed(&self, observation: &FrameObservation);

    fn metrics_updated(&self, series: &[FpsPoint]);
}

/// Writes every event to the log as JSON.
pub struct LogSink;

#[derive(Serialize)]
struct FrameProcessedEvent<'a> {
    observation: &'a FrameObservation,
    matched: Option<usize>,
}

#[derive(Serialize)]
struct MetricsUpdatedEvent<'a> {
    frames: usize,
    latest: Option<&'a FpsPoint>,
}

fn to_json<T: Serialize>(payload: &T) -> String {
    serde_json::to_string(payload).unwrap_or_else(|err| format!("<unserializable: {err}>"))
}

impl EventSink for LogSink {
    fn playback_changed(&self, snapshot: &PlaybackSnapshot) {
        log::info!("playback-state-changed {}", to_json(snapshot));
    }

    fn frame_processed(&self, observation: &FrameObservation) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        let payload = FrameProcessedEvent {
            observation,
            matched: observation.comparison_summary().map(|s| s.matched),
        };
        log::debug!("frame-processed {}", to_json(&payload));
    }

    fn metrics_updated(&self, series: &[FpsPoint]) {
        let payload = MetricsUpdatedEvent {
            frames: series.len(),
            latest: series.last(),
        };
        log::debug!("metrics-updated {}", to_json(&payload));
    }
}
