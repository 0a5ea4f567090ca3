//! Finite-difference joint speed estimation
//!
//! The estimator owns the last-position cache, the only vision-side state
//! that outlives a single frame.

use crate::joint::{JointId, PoseFrame};
use glam::Vec3;
use std::collections::HashMap;

/// Speed per joint for the current frame, in normalized units per second.
///
/// Joints absent from the frame have no entry.
pub type VelocityTable = HashMap<JointId, f32>;

/// Last observed position of a joint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedPosition {
    /// Position
    pub position: Vec3,
    /// Observation time in seconds
    pub timestamp: f64,
}

/// Converts successive joint positions into scalar speeds
#[derive(Debug, Clone, Default)]
pub struct VelocityEstimator {
    last_positions: HashMap<JointId, CachedPosition>,
}

impl VelocityEstimator {
    /// Create an estimator with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Speed of `joint` moving to `position` at `timestamp`.
    ///
    /// Returns 0.0 for the first sample of a joint and for non-positive time
    /// deltas. The cache is overwritten in every case.
    pub fn velocity(&mut self, joint: JointId, position: Vec3, timestamp: f64) -> f32 {
        let current = CachedPosition {
            position,
            timestamp,
        };

        match self.last_positions.insert(joint, current) {
            None => 0.0,
            Some(prev) => {
                let dt = timestamp - prev.timestamp;
                if dt <= 0.0 || !dt.is_finite() {
                    0.0
                } else {
                    let distance = position.distance(prev.position);
                    let speed = (distance as f64 / dt) as f32;
                    if speed.is_finite() {
                        speed
                    } else {
                        0.0
                    }
                }
            }
        }
    }

    /// Compute speeds for every joint present in a frame
    pub fn update_frame(&mut self, frame: &PoseFrame) -> VelocityTable {
        frame
            .joints
            .iter()
            .map(|(joint, position)| (*joint, self.velocity(*joint, *position, frame.timestamp)))
            .collect()
    }

    /// Cached sample for a joint
    pub fn last_position(&self, joint: JointId) -> Option<CachedPosition> {
        self.last_positions.get(&joint).copied()
    }

    /// Clear the cache (tracker reset)
    pub fn reset(&mut self) {
        self.last_positions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_is_zero() {
        let mut est = VelocityEstimator::new();
        assert_eq!(
            est.velocity(JointId::LeftWrist, Vec3::new(0.9, 0.1, 0.3), 10.0),
            0.0
        );
        assert!(est.last_position(JointId::LeftWrist).is_some());
    }

    #[test]
    fn test_distance_over_dt() {
        let mut est = VelocityEstimator::new();
        est.velocity(JointId::RightWrist, Vec3::new(0.0, 0.0, 0.0), 0.0);
        let v = est.velocity(JointId::RightWrist, Vec3::new(0.3, 0.4, 0.0), 0.5);
        assert!((v - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_non_positive_dt_is_zero_and_updates_cache() {
        let mut est = VelocityEstimator::new();
        est.velocity(JointId::Nose, Vec3::ZERO, 1.0);
        assert_eq!(est.velocity(JointId::Nose, Vec3::ONE, 1.0), 0.0);
        assert_eq!(est.last_position(JointId::Nose).unwrap().position, Vec3::ONE);
        assert_eq!(est.velocity(JointId::Nose, Vec3::ZERO, 0.5), 0.0);
    }

    #[test]
    fn test_absent_joint_is_omitted() {
        let mut est = VelocityEstimator::new();
        let frame = PoseFrame::new(0.0).with_joint(JointId::LeftKnee, Vec3::ZERO);
        let table = est.update_frame(&frame);
        assert_eq!(table.len(), 1);
        assert!(!table.contains_key(&JointId::RightKnee));
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut est = VelocityEstimator::new();
        est.velocity(JointId::LeftAnkle, Vec3::ZERO, 0.0);
        est.reset();
        assert_eq!(est.velocity(JointId::LeftAnkle, Vec3::ONE, 1.0), 0.0);
    }
}
