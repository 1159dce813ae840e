use serde::{Deserialize, Serialize};

/// Pixel size of a source frame at capture time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    /// Shrink to at most `max_width` pixels wide, keeping the aspect ratio.
    /// Resolutions that already fit are returned unchanged.
    pub fn fit_width(self, max_width: u32) -> Self {
        if self.width <= max_width || self.is_empty() {
            return self;
        }
        let height = (max_width as f64 / self.aspect_ratio()).round() as u32;
        Self {
            width: max_width,
            height: height.max(1),
        }
    }
}

/// One tracked joint in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keypoint {
    pub joint_id: usize,
    /// Source-relative coordinates as reported by the detector.
    pub normalized: [f64; 3],
    /// `normalized` scaled by the resolution recorded for the frame.
    pub pixel: [f64; 2],
    pub visibility: f64,
}

impl Keypoint {
    pub fn from_normalized(
        joint_id: usize,
        normalized: [f64; 3],
        visibility: f64,
        resolution: Resolution,
    ) -> Self {
        Self {
            joint_id,
            normalized,
            pixel: [
                normalized[0] * resolution.width as f64,
                normalized[1] * resolution.height as f64,
            ],
            visibility,
        }
    }

    /// Euclidean distance between the pixel positions of two keypoints.
    pub fn pixel_distance(&self, other: &Keypoint) -> f64 {
        let dx = self.pixel[0] - other.pixel[0];
        let dy = self.pixel[1] - other.pixel[1];
        dx.hypot(dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_scaled_by_capture_resolution() {
        let kp = Keypoint::from_normalized(3, [0.5, 0.25, -0.1], 0.9, Resolution::new(640, 480));
        assert_eq!(kp.pixel, [320.0, 120.0]);
        assert_eq!(kp.normalized[2], -0.1);
    }

    #[test]
    fn test_pixel_distance() {
        let a = Keypoint::from_normalized(0, [0.0, 0.0, 0.0], 1.0, Resolution::new(100, 100));
        let b = Keypoint::from_normalized(0, [0.3, 0.4, 0.0], 1.0, Resolution::new(100, 100));
        assert!((a.pixel_distance(&b) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_width_keeps_aspect_ratio() {
        let fitted = Resolution::new(1920, 1080).fit_width(720);
        assert_eq!(fitted, Resolution::new(720, 405));
    }

    #[test]
    fn test_fit_width_leaves_small_sources_alone() {
        let small = Resolution::new(640, 480);
        assert_eq!(small.fit_width(720), small);
        assert_eq!(Resolution::default().fit_width(720), Resolution::default());
    }
}
