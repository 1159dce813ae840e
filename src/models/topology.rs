use anyhow::{bail, Result};

const BLAZEPOSE_JOINTS: [&str; 33] = [
    "nose",
    "left_eye_inner",
    "left_eye",
    "left_eye_outer",
    "right_eye_inner",
    "right_eye",
    "right_eye_outer",
    "left_ear",
    "right_ear",
    "mouth_left",
    "mouth_right",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_pinky",
    "right_pinky",
    "left_index",
    "right_index",
    "left_thumb",
    "right_thumb",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
    "left_heel",
    "right_heel",
    "left_foot_index",
    "right_foot_index",
];

const BLAZEPOSE_CONNECTIONS: [(usize, usize); 35] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 7),
    (0, 4),
    (4, 5),
    (5, 6),
    (6, 8),
    (9, 10),
    (11, 12),
    (11, 13),
    (13, 15),
    (15, 17),
    (15, 19),
    (15, 21),
    (17, 19),
    (12, 14),
    (14, 16),
    (16, 18),
    (16, 20),
    (16, 22),
    (18, 20),
    (11, 23),
    (12, 24),
    (23, 24),
    (23, 25),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (29, 31),
    (30, 32),
    (27, 31),
    (28, 32),
];

/// Fixed, ordered joint set shared by both streams, plus its skeleton graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    name: String,
    joints: Vec<String>,
    connections: Vec<(usize, usize)>,
}

impl Topology {
    pub fn new(
        name: impl Into<String>,
        joints: Vec<String>,
        connections: Vec<(usize, usize)>,
    ) -> Result<Self> {
        if joints.is_empty() {
            bail!("topology must have at least one joint");
        }
        if let Some((a, b)) = connections
            .iter()
            .find(|(a, b)| *a >= joints.len() || *b >= joints.len())
        {
            bail!("connection ({a}, {b}) is outside {} joints", joints.len());
        }
        Ok(Self {
            name: name.into(),
            joints,
            connections,
        })
    }

    /// The 33-landmark BlazePose body model.
    pub fn blazepose() -> Self {
        Self {
            name: "blazepose".into(),
            joints: BLAZEPOSE_JOINTS.iter().map(|s| s.to_string()).collect(),
            connections: BLAZEPOSE_CONNECTIONS.to_vec(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn joint_name(&self, joint_id: usize) -> Option<&str> {
        self.joints.get(joint_id).map(String::as_str)
    }

    pub fn connections(&self) -> &[(usize, usize)] {
        &self.connections
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::blazepose()
    }
}
