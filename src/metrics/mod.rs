mod reporter;
mod types;

pub use reporter::MetricsReporter;
pub use types::FpsPoint;

use crate::{history::HistoryReader, models::FrameObservation};

/// Projects both histories onto one series of `max(len)` points. A stream
/// contributes `None` past its own length or where it has no usable fps.
///
/// Pure: recomputing over unchanged histories gives the same series.
pub fn fps_series(video: &HistoryReader, webcam: &HistoryReader) -> Vec<FpsPoint> {
    video.read(|video_frames| {
        webcam.read(|webcam_frames| {
            let frames = video_frames.len().max(webcam_frames.len());
            (0..frames)
                .map(|index| FpsPoint {
                    frame_id: index,
                    video: usable_fps(video_frames.get(index)),
                    webcam: usable_fps(webcam_frames.get(index)),
                })
                .collect()
        })
    })
}

fn usable_fps(observation: Option<&FrameObservation>) -> Option<f64> {
    observation?
        .fps
        .filter(|fps| fps.is_finite() && *fps != 0.0)
}

/// Mean per-frame match ratio over webcam frames that had joints to score.
pub fn mean_match_ratio(webcam: &HistoryReader) -> Option<f64> {
    webcam.read(|frames| {
        let ratios: Vec<f64> = frames
            .iter()
            .filter_map(|obs| obs.comparison_summary())
            .filter(|summary| summary.scored > 0)
            .map(|summary| summary.ratio())
            .collect();
        if ratios.is_empty() {
            None
        } else {
            Some(ratios.iter().sum::<f64>() / ratios.len() as f64)
        }
    })
}
