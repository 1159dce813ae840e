use anyhow::{Context, Result};
use log::{debug, warn};
use std::{sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::{events::EventSink, history::HistoryReader};

use super::fps_series;

/// Periodically recomputes the FPS series off the frame loops and publishes
/// it to the sink.
pub struct MetricsReporter {
    video: HistoryReader,
    webcam: HistoryReader,
    sink: Arc<dyn EventSink>,
    interval: Duration,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl MetricsReporter {
    pub fn new(
        video: HistoryReader,
        webcam: HistoryReader,
        sink: Arc<dyn EventSink>,
        interval: Duration,
    ) -> Self {
        Self {
            video,
            webcam,
            sink,
            interval,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }

        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let video = self.video.clone();
        let webcam = self.webcam.clone();
        let sink = Arc::clone(&self.sink);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = publish(&video, &webcam, sink.as_ref()).await {
                            warn!("fps series publish failed: {err:?}");
                        }
                    }
                    _ = token.cancelled() => {
                        debug!("metrics reporter shutting down");
                        break;
                    }
                }
            }
        });

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
    }

    /// Stops the periodic task and publishes one final series so the last
    /// frames of a paused or ended session are shown.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("metrics reporter task failed to join")?;
        }
        self.publish_now().await
    }

    pub async fn publish_now(&self) -> Result<()> {
        publish(&self.video, &self.webcam, self.sink.as_ref()).await
    }
}

async fn publish(video: &HistoryReader, webcam: &HistoryReader, sink: &dyn EventSink) -> Result<()> {
    let video = video.clone();
    let webcam = webcam.clone();
    let series = tokio::task::spawn_blocking(move || fps_series(&video, &webcam))
        .await
        .context("fps series worker join failed")?;
    sink.metrics_updated(&series);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryBuffer;
    use crate::models::StreamKind;
    use crate::testing::{observation, wait_until, RecordingSink};

    #[tokio::test]
    async fn test_publishes_while_running_and_on_stop() {
        let video = HistoryBuffer::new(StreamKind::Video);
        let webcam = HistoryBuffer::new(StreamKind::Webcam);
        video.append(observation(StreamKind::Video, 0, Vec::new())).unwrap();
        let sink = Arc::new(RecordingSink::default());

        let mut reporter = MetricsReporter::new(
            video.reader(),
            webcam.reader(),
            sink.clone(),
            Duration::from_millis(5),
        );
        reporter.start();
        assert!(reporter.is_running());
        assert!(wait_until(|| sink.metrics_count() >= 2).await);

        webcam.append(observation(StreamKind::Webcam, 0, Vec::new())).unwrap();
        webcam.append(observation(StreamKind::Webcam, 1, Vec::new())).unwrap();
        reporter.stop().await.unwrap();
        assert!(!reporter.is_running());
        assert_eq!(sink.last_metrics_len(), Some(2));
    }
}
