use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use log::{error, info, warn};
use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle, time};
use uuid::Uuid;

use crate::{
    compare::Comparator,
    events::EventSink,
    history::HistoryReader,
    metrics::{fps_series, FpsPoint, MetricsReporter},
    models::{ComparisonSummary, StreamKind, Topology},
    settings::Settings,
    source::MediaSource,
    stream::{LoopContext, SessionClock, StreamInput, StreamLoop},
};

use super::{DisplayLayout, PlaybackConfig, PlaybackState, PlaybackStatus};

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub video_frames: usize,
    pub webcam_frames: usize,
    /// Comparison of the most recent scored webcam frame.
    pub latest_score: Option<ComparisonSummary>,
}

/// Starts, pauses, resumes and ends both stream loops together.
///
/// Every lifecycle operation holds `transition` for its whole duration, so
/// requests are applied one at a time.
#[derive(Clone)]
pub struct PlaybackController {
    state: Arc<Mutex<PlaybackState>>,
    transition: Arc<Mutex<()>>,
    video: Arc<Mutex<StreamLoop>>,
    webcam: Arc<Mutex<StreamLoop>>,
    video_history: HistoryReader,
    webcam_history: HistoryReader,
    reporter: Arc<Mutex<MetricsReporter>>,
    end_watcher: Arc<Mutex<Option<JoinHandle<()>>>>,
    sink: Arc<dyn EventSink>,
    config: PlaybackConfig,
}

impl PlaybackController {
    pub fn new(
        video: StreamInput,
        webcam: StreamInput,
        topology: Topology,
        settings: &Settings,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let config = settings.playback.clone();
        let context = LoopContext {
            topology: Arc::new(topology),
            sink: Arc::clone(&sink),
            clock: SessionClock::new(),
            timing: config.timing(),
        };

        let video_loop = StreamLoop::new(StreamKind::Video, video, context.clone());
        let video_history = video_loop.history();
        let comparator = Comparator::new(video_history.clone(), settings.comparison.clone());
        let webcam_loop =
            StreamLoop::new(StreamKind::Webcam, webcam, context).with_comparator(comparator);
        let webcam_history = webcam_loop.history();

        let reporter = MetricsReporter::new(
            video_history.clone(),
            webcam_history.clone(),
            Arc::clone(&sink),
            config.metrics_interval(),
        );

        Self {
            state: Arc::new(Mutex::new(PlaybackState::new(config.default_speed))),
            transition: Arc::new(Mutex::new(())),
            video: Arc::new(Mutex::new(video_loop)),
            webcam: Arc::new(Mutex::new(webcam_loop)),
            video_history,
            webcam_history,
            reporter: Arc::new(Mutex::new(reporter)),
            end_watcher: Arc::new(Mutex::new(None)),
            sink,
            config,
        }
    }

    pub fn video_history(&self) -> HistoryReader {
        self.video_history.clone()
    }

    pub fn webcam_history(&self) -> HistoryReader {
        self.webcam_history.clone()
    }

    pub fn fps_series(&self) -> Vec<FpsPoint> {
        fps_series(&self.video_history, &self.webcam_history)
    }

    pub async fn get_state(&self) -> PlaybackState {
        self.state.lock().await.clone()
    }

    pub async fn get_snapshot(&self) -> PlaybackSnapshot {
        let state = self.state.lock().await.clone();
        let latest_score = self.webcam_history.read(|frames| {
            frames
                .iter()
                .rev()
                .find_map(|frame| frame.comparison_summary())
        });
        PlaybackSnapshot {
            state,
            video_frames: self.video_history.len(),
            webcam_frames: self.webcam_history.len(),
            latest_score,
        }
    }

    pub async fn is_streaming(&self) -> (bool, bool) {
        let video = self.video.lock().await.is_running();
        let webcam = self.webcam.lock().await.is_running();
        (video, webcam)
    }

    /// Idle/Ended → Starting → Running. Both sources must start playing
    /// before either loop is started; otherwise the session falls back to
    /// Idle with the error recorded.
    pub async fn start(&self) -> Result<PlaybackState> {
        let _transition = self.transition.lock().await;

        {
            let state = self.state.lock().await;
            if !state.status.can_start() {
                return Err(anyhow!("session already {}", state.status.as_str()));
            }
        }

        let (video_source, webcam_source) = self.sources().await;
        if let Err(err) = self.check_ready(&video_source, &webcam_source).await {
            return self.fail_start(err).await;
        }

        let session_id = Uuid::new_v4().to_string();
        let speed = {
            let mut state = self.state.lock().await;
            state.begin_starting(
                session_id.clone(),
                Utc::now(),
                DisplayLayout::for_reference(
                    video_source.resolution(),
                    self.config.max_display_width,
                ),
            )?;
            state.speed
        };
        self.emit_state_changed().await;

        if let Err(err) = video_source.set_playback_rate(speed) {
            return self.fail_start(err).await;
        }

        if let Err(err) = tokio::try_join!(video_source.play(), webcam_source.play()) {
            video_source.pause();
            webcam_source.pause();
            return self
                .fail_start(err.context("failed to start playback"))
                .await;
        }

        // The previous session's frozen histories survive a failed start.
        if let Err(err) = self.clear_histories().await {
            video_source.pause();
            webcam_source.pause();
            return self.fail_start(err).await;
        }

        let video_started = self.video.lock().await.start(0);
        let webcam_started = self.webcam.lock().await.start(0);
        if !(video_started && webcam_started) {
            self.halt_loops().await;
            video_source.pause();
            webcam_source.pause();
            return self
                .fail_start(anyhow!("stream loops could not be started"))
                .await;
        }

        self.state.lock().await.mark_running()?;
        self.spawn_end_watcher(video_source).await;
        self.reporter.lock().await.start();

        info!("session {} running at {}x speed", session_id, speed);
        self.emit_state_changed().await;
        Ok(self.get_state().await)
    }

    /// Running → Paused. The last appended frame id of each stream is kept
    /// for resume. If the reference has already reached its end the session
    /// ends instead.
    pub async fn pause(&self) -> Result<PlaybackState> {
        let _transition = self.transition.lock().await;

        {
            let state = self.state.lock().await;
            if state.status != PlaybackStatus::Running {
                bail!("no running session to pause");
            }
        }

        let (video_source, webcam_source) = self.sources().await;
        video_source.pause();
        webcam_source.pause();
        // The reference clock is frozen now, so this cannot race the watcher.
        if video_source.is_ended() {
            return self.end_session().await;
        }
        self.cancel_end_watcher().await;
        self.halt_loops().await;
        self.stop_reporter().await;

        let (last_video, last_webcam) = self.last_frame_ids();
        self.state.lock().await.pause(last_video, last_webcam)?;
        info!(
            "session paused at {:.2}s of {}, frames video={:?} webcam={:?}",
            video_source.current_time(),
            video_source.label(),
            last_video,
            last_webcam
        );

        self.emit_state_changed().await;
        Ok(self.get_state().await)
    }

    /// Paused → Running. Each loop continues at its own last frame id + 1;
    /// nothing already recorded is replayed. A reference that already sits
    /// at its end is not restarted; the session ends instead.
    pub async fn resume(&self) -> Result<PlaybackState> {
        let _transition = self.transition.lock().await;

        let speed = {
            let state = self.state.lock().await;
            if state.status != PlaybackStatus::Paused {
                bail!("no paused session to resume");
            }
            state.speed
        };

        let (video_source, webcam_source) = self.sources().await;
        if video_source.is_ended() {
            return self.end_session().await;
        }

        let played = match video_source.set_playback_rate(speed) {
            Ok(()) => tokio::try_join!(video_source.play(), webcam_source.play()).map(|_| ()),
            Err(err) => Err(err),
        };
        if let Err(err) = played {
            video_source.pause();
            webcam_source.pause();
            let err = err.context("failed to resume playback");
            error!("{err:?}");
            self.state.lock().await.last_error = Some(format!("{err:#}"));
            self.emit_state_changed().await;
            return Err(err);
        }

        let video_from = self.video_history.next_frame_id();
        let webcam_from = self.webcam_history.next_frame_id();
        let video_started = self.video.lock().await.start(video_from);
        let webcam_started = self.webcam.lock().await.start(webcam_from);
        if !(video_started && webcam_started) {
            self.halt_loops().await;
            video_source.pause();
            webcam_source.pause();
            let err = anyhow!("stream loops could not be restarted");
            self.state.lock().await.last_error = Some(err.to_string());
            self.emit_state_changed().await;
            return Err(err);
        }

        self.state.lock().await.resume()?;
        self.spawn_end_watcher(video_source).await;
        self.reporter.lock().await.start();

        info!(
            "session resumed at frames video={} webcam={}",
            video_from, webcam_from
        );
        self.emit_state_changed().await;
        Ok(self.get_state().await)
    }

    /// Sets the reference playback-rate multiplier. Applied to a live
    /// session immediately and on every later (re)start; the webcam has no
    /// speed and frame ids are unaffected.
    pub async fn set_speed(&self, speed: f64) -> Result<PlaybackState> {
        if !(speed.is_finite() && speed > 0.0) {
            bail!("speed must be a positive number, got {speed}");
        }

        let _transition = self.transition.lock().await;
        let status = {
            let mut state = self.state.lock().await;
            state.speed = speed;
            state.status
        };

        if status.is_active() {
            let (video_source, _) = self.sources().await;
            video_source
                .set_playback_rate(speed)
                .context("failed to apply playback speed")?;
        }

        self.emit_state_changed().await;
        Ok(self.get_state().await)
    }

    /// Stops any active session and discards both histories.
    pub async fn stop(&self) -> Result<PlaybackState> {
        let _transition = self.transition.lock().await;
        self.reset_session().await?;
        info!("session stopped; histories cleared");
        self.emit_state_changed().await;
        Ok(self.get_state().await)
    }

    /// Loads a new reference source. Any session in progress is stopped and
    /// both histories are discarded.
    pub async fn load_reference(&self, source: Arc<dyn MediaSource>) -> Result<PlaybackState> {
        let _transition = self.transition.lock().await;
        self.reset_session().await?;
        let label = source.label().to_string();
        self.video.lock().await.replace_source(source)?;
        info!("reference source {} loaded", label);
        self.emit_state_changed().await;
        Ok(self.get_state().await)
    }

    /// Running → Ended once the reference reaches its natural end. Histories
    /// stay as recorded until the next session starts.
    async fn handle_reference_ended(&self) -> Result<()> {
        let _transition = self.transition.lock().await;

        if self.state.lock().await.status != PlaybackStatus::Running {
            return Ok(());
        }
        self.end_session().await.map(|_| ())
    }

    /// Running/Paused → Ended. Caller holds `transition`.
    async fn end_session(&self) -> Result<PlaybackState> {
        let (video_source, webcam_source) = self.sources().await;
        video_source.pause();
        webcam_source.pause();
        self.cancel_end_watcher().await;
        self.halt_loops().await;
        self.stop_reporter().await;

        let (last_video, last_webcam) = self.last_frame_ids();
        self.state
            .lock()
            .await
            .end(Utc::now(), last_video, last_webcam)?;
        info!(
            "reference {} ended at {:.2}s; session frozen with {} video and {} webcam frames",
            video_source.label(),
            video_source.current_time(),
            self.video_history.len(),
            self.webcam_history.len()
        );

        self.emit_state_changed().await;
        Ok(self.get_state().await)
    }

    async fn reset_session(&self) -> Result<()> {
        let status = self.state.lock().await.status;
        if status.is_active() {
            let (video_source, webcam_source) = self.sources().await;
            video_source.pause();
            webcam_source.pause();
        }
        self.cancel_end_watcher().await;
        self.halt_loops().await;
        if self.reporter.lock().await.is_running() {
            self.stop_reporter().await;
        }
        self.clear_histories().await?;
        self.state.lock().await.reset();
        Ok(())
    }

    async fn sources(&self) -> (Arc<dyn MediaSource>, Arc<dyn MediaSource>) {
        let video = self.video.lock().await.source();
        let webcam = self.webcam.lock().await.source();
        (video, webcam)
    }

    async fn check_ready(
        &self,
        video_source: &Arc<dyn MediaSource>,
        webcam_source: &Arc<dyn MediaSource>,
    ) -> Result<()> {
        let video_detector = self.video.lock().await.detector();
        let webcam_detector = self.webcam.lock().await.detector();
        if !video_detector.is_ready() {
            bail!("video pose detector not loaded yet");
        }
        if !webcam_detector.is_ready() {
            bail!("webcam pose detector not loaded yet");
        }
        if !video_source.is_ready() {
            bail!("reference video {} is not loaded", video_source.label());
        }
        if !webcam_source.is_ready() {
            bail!("webcam {} has no active stream", webcam_source.label());
        }
        Ok(())
    }

    async fn fail_start<T>(&self, err: anyhow::Error) -> Result<T> {
        warn!("session start failed: {err:#}");
        self.state.lock().await.fail_start(format!("{err:#}"));
        self.emit_state_changed().await;
        Err(err)
    }

    async fn clear_histories(&self) -> Result<()> {
        self.video.lock().await.clear_history()?;
        self.webcam.lock().await.clear_history()?;
        Ok(())
    }

    /// Stops both loops, letting in-flight frames land.
    async fn halt_loops(&self) {
        if let Err(e) = self.video.lock().await.stop().await {
            error!("Failed to stop video loop: {e:?}");
        }
        if let Err(e) = self.webcam.lock().await.stop().await {
            error!("Failed to stop webcam loop: {e:?}");
        }
    }

    async fn stop_reporter(&self) {
        if let Err(e) = self.reporter.lock().await.stop().await {
            error!("Failed to stop metrics reporter: {e:?}");
        }
    }

    fn last_frame_ids(&self) -> (Option<u64>, Option<u64>) {
        (
            self.video_history.last_frame_id(),
            self.webcam_history.last_frame_id(),
        )
    }

    async fn spawn_end_watcher(&self, video_source: Arc<dyn MediaSource>) {
        let mut watcher_guard = self.end_watcher.lock().await;
        if let Some(handle) = watcher_guard.take() {
            handle.abort();
        }

        let controller = self.clone();
        let poll_interval = self.config.timing().frame_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(poll_interval);
            loop {
                interval.tick().await;

                if controller.state.lock().await.status != PlaybackStatus::Running {
                    break;
                }

                if video_source.is_ended() {
                    // Detached so aborting the watcher cannot interrupt the
                    // transition halfway.
                    let controller = controller.clone();
                    tokio::spawn(async move {
                        if let Err(e) = controller.handle_reference_ended().await {
                            error!("Failed to end session: {e:?}");
                        }
                    });
                    break;
                }
            }
        });

        *watcher_guard = Some(handle);
    }

    async fn cancel_end_watcher(&self) {
        if let Some(handle) = self.end_watcher.lock().await.take() {
            handle.abort();
        }
    }

    async fn emit_state_changed(&self) {
        let snapshot = self.get_snapshot().await;
        self.sink.playback_changed(&snapshot);
    }
}
