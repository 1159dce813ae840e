use serde::{Deserialize, Serialize};

/// One index-aligned sample of both streams' frame rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FpsPoint {
    /// Position in the histories, not a stream frame id.
    pub frame_id: usize,
    pub video: Option<f64>,
    pub webcam: Option<f64>,
}
