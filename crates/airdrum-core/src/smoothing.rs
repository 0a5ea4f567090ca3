//! Rolling-mean position smoothing applied at the pose ingestion boundary.

use crate::joint::{JointId, PoseFrame};
use glam::Vec3;
use std::collections::{HashMap, VecDeque};

/// Default number of raw samples averaged per joint
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Per-joint moving average over the last `window` raw positions
#[derive(Debug, Clone)]
pub struct PositionSmoother {
    window: usize,
    history: HashMap<JointId, VecDeque<Vec3>>,
}

impl Default for PositionSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_WINDOW)
    }
}

impl PositionSmoother {
    /// Create a smoother; a window of 0 is treated as 1 (pass-through)
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            history: HashMap::new(),
        }
    }

    /// Window size
    pub fn window(&self) -> usize {
        self.window
    }

    /// Push a raw position and return the smoothed one.
    ///
    /// The first sample for a joint passes through unchanged.
    pub fn smooth(&mut self, joint: JointId, raw: Vec3) -> Vec3 {
        let history = self
            .history
            .entry(joint)
            .or_insert_with(|| VecDeque::with_capacity(self.window));
        history.push_back(raw);
        while history.len() > self.window {
            history.pop_front();
        }

        let sum: Vec3 = history.iter().copied().sum();
        sum / history.len() as f32
    }

    /// Smooth every joint in a frame, keeping the timestamp
    pub fn smooth_frame(&mut self, frame: &PoseFrame) -> PoseFrame {
        let mut out = PoseFrame::new(frame.timestamp);
        for (joint, position) in &frame.joints {
            out.insert(*joint, self.smooth(*joint, *position));
        }
        out
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_passes_through() {
        let mut smoother = PositionSmoother::default();
        let p = Vec3::new(0.3, 0.4, 0.1);
        assert_eq!(smoother.smooth(JointId::LeftWrist, p), p);
    }

    #[test]
    fn test_window_drops_oldest() {
        let mut smoother = PositionSmoother::new(2);
        smoother.smooth(JointId::Nose, Vec3::splat(0.0));
        smoother.smooth(JointId::Nose, Vec3::splat(1.0));
        // Window now holds [1.0, 0.5]
        let out = smoother.smooth(JointId::Nose, Vec3::splat(0.5));
        assert!((out.x - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_joints_are_independent() {
        let mut smoother = PositionSmoother::new(5);
        smoother.smooth(JointId::LeftWrist, Vec3::splat(1.0));
        let out = smoother.smooth(JointId::RightWrist, Vec3::splat(0.0));
        assert_eq!(out, Vec3::ZERO);
    }
}
