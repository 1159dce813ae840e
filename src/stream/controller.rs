use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    compare::Comparator,
    events::EventSink,
    history::{HistoryBuffer, HistoryReader},
    inference::PoseDetector,
    models::{StreamKind, Topology},
    source::MediaSource,
};

use super::{
    loop_worker::{frame_loop, FrameWorker},
    SessionClock, StreamInput,
};

#[derive(Debug, Clone, Copy)]
pub struct LoopTiming {
    /// Delay between the end of one frame and the start of the next.
    pub frame_interval: Duration,
    /// Detections slower than this count as zero-pose frames.
    pub detect_timeout: Duration,
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(16),
            detect_timeout: Duration::from_secs(1),
        }
    }
}

/// Collaborators shared by both loops of a session.
#[derive(Clone)]
pub struct LoopContext {
    pub topology: Arc<Topology>,
    pub sink: Arc<dyn EventSink>,
    pub clock: SessionClock,
    pub timing: LoopTiming,
}

/// Drives capture, inference and history append for one stream.
///
/// At most one frame loop task exists per `StreamLoop`.
pub struct StreamLoop {
    stream: StreamKind,
    input: StreamInput,
    context: LoopContext,
    history: Arc<HistoryBuffer>,
    comparator: Option<Comparator>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl StreamLoop {
    pub fn new(stream: StreamKind, input: StreamInput, context: LoopContext) -> Self {
        Self {
            stream,
            input,
            context,
            history: Arc::new(HistoryBuffer::new(stream)),
            comparator: None,
            handle: None,
            cancel_token: None,
        }
    }

    /// Score every frame of this stream against another stream's history.
    pub fn with_comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = Some(comparator);
        self
    }

    pub fn history(&self) -> HistoryReader {
        self.history.reader()
    }

    pub fn source(&self) -> Arc<dyn MediaSource> {
        Arc::clone(&self.input.source)
    }

    pub fn detector(&self) -> Arc<dyn PoseDetector> {
        Arc::clone(&self.input.detector)
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Begins processing at `from_frame_id`. Returns false, without
    /// spawning anything, when the loop is already running or when the
    /// detector or source is not ready.
    pub fn start(&mut self, from_frame_id: u64) -> bool {
        if self.is_running() {
            warn!("{} loop already running; ignoring start", self.stream);
            return false;
        }
        if !self.input.detector.is_ready() {
            warn!("{} pose detector not loaded yet; loop not started", self.stream);
            return false;
        }
        if !self.input.source.is_ready() {
            warn!(
                "{} source {} has no frames yet; loop not started",
                self.stream,
                self.input.source.label()
            );
            return false;
        }

        let cancel_token = CancellationToken::new();
        let worker = FrameWorker {
            stream: self.stream,
            source: Arc::clone(&self.input.source),
            detector: Arc::clone(&self.input.detector),
            history: Arc::clone(&self.history),
            comparator: self.comparator.clone(),
            context: self.context.clone(),
        };

        info!("{} loop starting at frame {}", self.stream, from_frame_id);
        self.handle = Some(tokio::spawn(frame_loop(
            worker,
            from_frame_id,
            cancel_token.clone(),
        )));
        self.cancel_token = Some(cancel_token);
        true
    }

    /// Cancels the next scheduled frame and waits for the loop to exit. A
    /// frame already being processed still completes and is appended.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .with_context(|| format!("{} loop task failed to join", self.stream))
        } else {
            Ok(())
        }
    }

    pub fn clear_history(&self) -> Result<()> {
        if self.is_running() {
            bail!("cannot clear {} history while its loop is running", self.stream);
        }
        self.history.clear();
        Ok(())
    }

    pub fn replace_source(&mut self, source: Arc<dyn MediaSource>) -> Result<()> {
        if self.is_running() {
            bail!("cannot replace {} source while its loop is running", self.stream);
        }
        self.input.source = source;
        Ok(())
    }
}
