pub mod clock;
pub mod controller;
mod loop_worker;

use std::sync::Arc;

use crate::{inference::PoseDetector, source::MediaSource};

pub use clock::SessionClock;
pub use controller::{LoopContext, LoopTiming, StreamLoop};

/// The media source and pose detector feeding one stream.
#[derive(Clone)]
pub struct StreamInput {
    pub source: Arc<dyn MediaSource>,
    pub detector: Arc<dyn PoseDetector>,
}

impl StreamInput {
    pub fn new(source: Arc<dyn MediaSource>, detector: Arc<dyn PoseDetector>) -> Self {
        Self { source, detector }
    }
}
