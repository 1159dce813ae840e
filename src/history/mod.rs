use anyhow::{bail, Result};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use crate::models::{FrameObservation, StreamKind};

/// Append-only, frame-indexed history of one stream.
///
/// The buffer itself is the single write handle and is held by the stream
/// loop; everyone else reads through a cloned [`HistoryReader`].
pub struct HistoryBuffer {
    stream: StreamKind,
    frames: Arc<RwLock<Vec<FrameObservation>>>,
}

/// Read-only view over a [`HistoryBuffer`]. Readers borrow the live vector
/// under a read lock instead of copying it.
#[derive(Clone)]
pub struct HistoryReader {
    frames: Arc<RwLock<Vec<FrameObservation>>>,
}

impl HistoryBuffer {
    pub fn new(stream: StreamKind) -> Self {
        Self {
            stream,
            frames: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn reader(&self) -> HistoryReader {
        HistoryReader {
            frames: Arc::clone(&self.frames),
        }
    }

    /// Appends one observation. Frame ids must be strictly increasing; gaps
    /// are allowed.
    pub fn append(&self, observation: FrameObservation) -> Result<()> {
        if observation.stream != self.stream {
            bail!(
                "{} observation cannot be appended to the {} history",
                observation.stream,
                self.stream
            );
        }
        let mut frames = self.frames.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(last) = frames.last() {
            if observation.frame_id <= last.frame_id {
                bail!(
                    "{} frame {} is not after frame {}",
                    self.stream,
                    observation.frame_id,
                    last.frame_id
                );
            }
        }
        frames.push(observation);
        Ok(())
    }

    /// Session reset only; history is otherwise never edited.
    pub fn clear(&self) {
        self.frames
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl HistoryReader {
    fn guard(&self) -> RwLockReadGuard<'_, Vec<FrameObservation>> {
        self.frames.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` over the current observations without copying them.
    pub fn read<R>(&self, f: impl FnOnce(&[FrameObservation]) -> R) -> R {
        f(&self.guard())
    }

    /// Runs `f` on the observation with `frame_id`, if it was recorded.
    pub fn with_frame<R>(&self, frame_id: u64, f: impl FnOnce(&FrameObservation) -> R) -> Option<R> {
        let frames = self.guard();
        frames
            .binary_search_by_key(&frame_id, |obs| obs.frame_id)
            .ok()
            .map(|index| f(&frames[index]))
    }

    pub fn at(&self, frame_id: u64) -> Option<FrameObservation> {
        self.with_frame(frame_id, |obs| obs.clone())
    }

    /// Owned copy of the whole history, for export.
    pub fn snapshot(&self) -> Vec<FrameObservation> {
        self.guard().clone()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    pub fn last_frame_id(&self) -> Option<u64> {
        self.guard().last().map(|obs| obs.frame_id)
    }

    /// Frame id a resumed loop should continue from.
    pub fn next_frame_id(&self) -> u64 {
        self.last_frame_id().map_or(0, |id| id + 1)
    }
}
