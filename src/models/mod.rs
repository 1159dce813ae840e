pub mod keypoint;
pub mod observation;
pub mod topology;

pub use keypoint::{Keypoint, Resolution};
pub use observation::{ComparisonSummary, DistanceRecord, FrameObservation, StreamKind};
pub use topology::Topology;
