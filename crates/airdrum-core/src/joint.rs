//! Tracked joints and per-frame pose data
//!
//! The pose provider tags every sample with a [`JointId`] once, at ingestion.
//! Downstream code asks the id for its [`JointRole`] instead of inspecting names.

use glam::Vec3;
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Anatomical role of a joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointRole {
    /// Left or right wrist
    Wrist,
    /// Left or right ankle
    Ankle,
    /// Left or right knee
    Knee,
    /// Nose (reference only, never triggers)
    Nose,
}

impl JointRole {
    /// Wrists play hand zones
    pub fn is_hand(self) -> bool {
        matches!(self, JointRole::Wrist)
    }

    /// Knees and ankles play foot zones
    pub fn is_foot(self) -> bool {
        matches!(self, JointRole::Knee | JointRole::Ankle)
    }
}

/// Identifier of a tracked joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointId {
    /// Left wrist
    LeftWrist,
    /// Right wrist
    RightWrist,
    /// Left ankle
    LeftAnkle,
    /// Right ankle
    RightAnkle,
    /// Left knee
    LeftKnee,
    /// Right knee
    RightKnee,
    /// Nose
    Nose,
}

impl JointId {
    /// All joints the pose provider reports
    pub const ALL: [JointId; 7] = [
        JointId::LeftWrist,
        JointId::RightWrist,
        JointId::LeftAnkle,
        JointId::RightAnkle,
        JointId::LeftKnee,
        JointId::RightKnee,
        JointId::Nose,
    ];

    /// Hand joints in detection order (right before left)
    pub const HANDS: [JointId; 2] = [JointId::RightWrist, JointId::LeftWrist];

    /// Knees, tested before the ankle fallback
    pub const KNEES: [JointId; 2] = [JointId::LeftKnee, JointId::RightKnee];

    /// Ankles, tested only when no knee found a foot zone
    pub const ANKLES: [JointId; 2] = [JointId::LeftAnkle, JointId::RightAnkle];

    /// Role tag of this joint
    pub fn role(self) -> JointRole {
        match self {
            JointId::LeftWrist | JointId::RightWrist => JointRole::Wrist,
            JointId::LeftAnkle | JointId::RightAnkle => JointRole::Ankle,
            JointId::LeftKnee | JointId::RightKnee => JointRole::Knee,
            JointId::Nose => JointRole::Nose,
        }
    }

    /// Stable snake_case name, as used in recordings and logs
    pub fn name(self) -> &'static str {
        match self {
            JointId::LeftWrist => "left_wrist",
            JointId::RightWrist => "right_wrist",
            JointId::LeftAnkle => "left_ankle",
            JointId::RightAnkle => "right_ankle",
            JointId::LeftKnee => "left_knee",
            JointId::RightKnee => "right_knee",
            JointId::Nose => "nose",
        }
    }
}

impl JointId {
    /// Parse a snake_case joint name; `None` for joints that are not tracked
    pub fn from_name(name: &str) -> Option<Self> {
        JointId::ALL.into_iter().find(|joint| joint.name() == name)
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One tracked anatomical point at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointSample {
    /// Which joint
    pub joint: JointId,
    /// Normalized position; x/y in [0,1] of the camera frame, z relative depth
    pub position: Vec3,
    /// Seconds
    pub timestamp: f64,
}

impl JointSample {
    /// Create a new sample
    pub fn new(joint: JointId, position: Vec3, timestamp: f64) -> Self {
        Self {
            joint,
            position,
            timestamp,
        }
    }

    /// Role tag of the sampled joint
    pub fn role(&self) -> JointRole {
        self.joint.role()
    }
}

/// All joints observed in one pose frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    /// Frame timestamp in seconds
    pub timestamp: f64,
    /// Joint positions present this frame; absent joints are simply missing
    #[serde(deserialize_with = "tracked_joints")]
    pub joints: HashMap<JointId, Vec3>,
}

// Providers report more landmarks than we track; untracked names are dropped
fn tracked_joints<'de, D>(deserializer: D) -> Result<HashMap<JointId, Vec3>, D::Error>
where
    D: Deserializer<'de>,
{
    struct JointsVisitor;

    impl<'de> Visitor<'de> for JointsVisitor {
        type Value = HashMap<JointId, Vec3>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of joint names to positions")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut joints = HashMap::new();
            while let Some(name) = map.next_key::<String>()? {
                match JointId::from_name(&name) {
                    Some(joint) => {
                        joints.insert(joint, map.next_value::<Vec3>()?);
                    }
                    None => {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
            }
            Ok(joints)
        }
    }

    deserializer.deserialize_map(JointsVisitor)
}

impl PoseFrame {
    /// Create an empty frame
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            joints: HashMap::new(),
        }
    }

    /// Builder-style insert
    pub fn with_joint(mut self, joint: JointId, position: Vec3) -> Self {
        self.joints.insert(joint, position);
        self
    }

    /// Insert or replace a joint position
    pub fn insert(&mut self, joint: JointId, position: Vec3) {
        self.joints.insert(joint, position);
    }

    /// Position of a joint, if present
    pub fn position(&self, joint: JointId) -> Option<Vec3> {
        self.joints.get(&joint).copied()
    }

    /// Iterate the frame as samples
    pub fn samples(&self) -> impl Iterator<Item = JointSample> + '_ {
        self.joints
            .iter()
            .map(move |(joint, position)| JointSample::new(*joint, *position, self.timestamp))
    }

    /// Number of joints present
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// True when no joint was tracked this frame
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles() {
        assert_eq!(JointId::LeftWrist.role(), JointRole::Wrist);
        assert_eq!(JointId::RightKnee.role(), JointRole::Knee);
        assert_eq!(JointId::LeftAnkle.role(), JointRole::Ankle);
        assert_eq!(JointId::Nose.role(), JointRole::Nose);
        assert!(JointRole::Wrist.is_hand());
        assert!(JointRole::Knee.is_foot());
        assert!(!JointRole::Nose.is_hand() && !JointRole::Nose.is_foot());
    }

    #[test]
    fn test_joint_names_match_serde() {
        for joint in JointId::ALL {
            let json = serde_json::to_string(&joint).unwrap();
            assert_eq!(json, format!("\"{}\"", joint.name()));
        }
    }

    #[test]
    fn test_untracked_joints_are_dropped() {
        let json = r#"{"timestamp": 0.2, "joints": {
            "left_elbow": [0.1, 0.2, 0.0],
            "right_wrist": [0.7, 0.5, 0.0],
            "left_hip": {"visibility": 0.9}
        }}"#;
        let frame: PoseFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(
            frame.position(JointId::RightWrist),
            Some(Vec3::new(0.7, 0.5, 0.0))
        );
        assert_eq!(JointId::from_name("left_elbow"), None);
        assert_eq!(JointId::from_name("nose"), Some(JointId::Nose));
    }

    #[test]
    fn test_frame_samples_carry_timestamp() {
        let frame = PoseFrame::new(1.5)
            .with_joint(JointId::Nose, Vec3::new(0.5, 0.1, 0.0))
            .with_joint(JointId::LeftWrist, Vec3::new(0.2, 0.5, 0.0));
        assert_eq!(frame.len(), 2);
        assert!(frame.samples().all(|s| s.timestamp == 1.5));
        assert_eq!(frame.position(JointId::RightWrist), None);
    }
}
