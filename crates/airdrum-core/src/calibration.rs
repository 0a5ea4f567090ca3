//! Session calibration
//!
//! - [`HeightCalibrator`] watches wrist and ankle heights for a few seconds
//!   and derives a stacked height-band kit fitted to the player's reach.
//! - [`CalibrationProfile`] records per-joint ranges and maps raw positions
//!   into the drum space the default kit is laid out in.

use crate::joint::{JointId, JointRole, PoseFrame};
use crate::zone::{TriggerZone, ZoneShape};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{info, warn};

/// Hand pads from the top of the reach downwards
pub const HAND_PADS: [&str; 5] = ["crash", "hihat", "tom2", "snare", "tom1"];

const PAD_MARGIN: f32 = 0.1;
const MIN_PAD_HEIGHT: f32 = 0.05;
const MIN_HAND_SAMPLES: usize = 10;
const MIN_FOOT_SAMPLES: usize = 10;

/// Height calibration parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Calibration window in seconds
    pub duration_secs: f64,
    /// Capacity of each height buffer
    pub buffer_size: usize,
    /// Hand samples needed before the window may auto-finish
    pub min_auto_samples: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            duration_secs: 3.0,
            buffer_size: 100,
            min_auto_samples: 20,
        }
    }
}

/// Outcome of a height calibration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationResult {
    /// Zone table to hand to [`crate::zone::ZoneMapHandle::recalibrate`]
    pub zones: Vec<TriggerZone>,
    /// Hand reach (top, bottom); `None` when the default layout was used
    pub hand_range: Option<(f32, f32)>,
    /// Foot range (top, bottom); `None` when the default layout was used
    pub foot_range: Option<(f32, f32)>,
    /// Too few samples; the default layout was returned
    pub defaulted: bool,
}

/// Collects wrist/ankle heights and derives a height-band kit
#[derive(Debug, Clone)]
pub struct HeightCalibrator {
    config: CalibrationConfig,
    hand_heights: VecDeque<f32>,
    foot_heights: VecDeque<f32>,
    started_at: Option<f64>,
    calibrated: bool,
    frames: u64,
}

impl Default for HeightCalibrator {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}

impl HeightCalibrator {
    /// Create an idle calibrator
    pub fn new(config: CalibrationConfig) -> Self {
        let capacity = config.buffer_size.max(1);
        Self {
            config,
            hand_heights: VecDeque::with_capacity(capacity),
            foot_heights: VecDeque::with_capacity(capacity),
            started_at: None,
            calibrated: false,
            frames: 0,
        }
    }

    /// Begin a calibration window at `now`, discarding earlier samples
    pub fn start(&mut self, now: f64) {
        self.hand_heights.clear();
        self.foot_heights.clear();
        self.started_at = Some(now);
        self.calibrated = false;
        self.frames = 0;
        info!(
            "Height calibration started ({:.1}s window)",
            self.config.duration_secs
        );
    }

    /// A window is open
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// The last window produced a zone table
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Frames fed into the current window
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Buffered (hand, foot) samples
    pub fn sample_counts(&self) -> (usize, usize) {
        (self.hand_heights.len(), self.foot_heights.len())
    }

    /// Progress of the window in [0,1]
    pub fn progress(&self, now: f64) -> f64 {
        match self.started_at {
            None if self.calibrated => 1.0,
            None => 0.0,
            Some(start) if self.config.duration_secs > 0.0 => {
                ((now - start) / self.config.duration_secs).clamp(0.0, 1.0)
            }
            Some(_) => 1.0,
        }
    }

    /// Record a wrist height; values outside [0,1] are ignored
    pub fn add_hand_height(&mut self, y: f32) {
        push_bounded(&mut self.hand_heights, y, self.config.buffer_size);
    }

    /// Record an ankle height; values outside [0,1] are ignored
    pub fn add_foot_height(&mut self, y: f32) {
        push_bounded(&mut self.foot_heights, y, self.config.buffer_size);
    }

    /// Feed a frame. Returns the result once the window has elapsed and
    /// enough hand samples were seen.
    pub fn update(&mut self, frame: &PoseFrame) -> Option<CalibrationResult> {
        let start = self.started_at?;

        for sample in frame.samples() {
            match sample.role() {
                JointRole::Wrist => self.add_hand_height(sample.position.y),
                JointRole::Ankle => self.add_foot_height(sample.position.y),
                _ => {}
            }
        }
        self.frames += 1;

        let elapsed = frame.timestamp - start;
        if elapsed >= self.config.duration_secs
            && self.hand_heights.len() > self.config.min_auto_samples
        {
            Some(self.finish())
        } else {
            None
        }
    }

    /// Close the window and compute the zone table
    pub fn finish(&mut self) -> CalibrationResult {
        self.started_at = None;
        self.calibrated = true;

        if self.hand_heights.len() < MIN_HAND_SAMPLES {
            warn!(
                "Only {} hand samples collected, using the default height layout",
                self.hand_heights.len()
            );
            return CalibrationResult {
                zones: default_height_kit(),
                hand_range: None,
                foot_range: None,
                defaulted: true,
            };
        }

        let hands = sorted(&self.hand_heights);
        let hand_range = (percentile(&hands, 5.0), percentile(&hands, 95.0));

        let foot_range = if self.foot_heights.len() > MIN_FOOT_SAMPLES {
            let feet = sorted(&self.foot_heights);
            (percentile(&feet, 10.0), percentile(&feet, 90.0))
        } else {
            let max = (hand_range.1 + 0.3).min(1.0);
            ((hand_range.1 + 0.1).min(max), max)
        };

        let zones = height_kit(hand_range, foot_range);
        info!(
            "Height calibration finished: hands {:.2}-{:.2}, feet {:.2}-{:.2}",
            hand_range.0, hand_range.1, foot_range.0, foot_range.1
        );

        CalibrationResult {
            zones,
            hand_range: Some(hand_range),
            foot_range: Some(foot_range),
            defaulted: false,
        }
    }
}

fn push_bounded(buffer: &mut VecDeque<f32>, y: f32, capacity: usize) {
    if !(0.0..=1.0).contains(&y) {
        return;
    }
    if buffer.len() >= capacity.max(1) {
        buffer.pop_front();
    }
    buffer.push_back(y);
}

fn sorted(values: &VecDeque<f32>) -> Vec<f32> {
    let mut v: Vec<f32> = values.iter().copied().collect();
    v.sort_by(f32::total_cmp);
    v
}

/// Linear-interpolated percentile of sorted, non-empty data
fn percentile(sorted: &[f32], p: f32) -> f32 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f32;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f32;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Five stacked hand bands over the hand reach plus a kick band over the
/// foot range.
pub fn height_kit(hand_range: (f32, f32), foot_range: (f32, f32)) -> Vec<TriggerZone> {
    let (hand_top, hand_bottom) = hand_range;
    let per_pad = (hand_bottom - hand_top) / HAND_PADS.len() as f32;

    let mut zones: Vec<TriggerZone> = HAND_PADS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let lo = hand_top + per_pad * i as f32;
            let hi = lo + per_pad;
            let margin = per_pad * PAD_MARGIN;

            let y_min = (lo + margin).max(0.0);
            let mut y_max = (hi - margin).min(1.0);
            if y_min >= y_max {
                y_max = y_min + MIN_PAD_HEIGHT;
            }

            TriggerZone::hand(*name, ZoneShape::HeightBand { y_min, y_max })
        })
        .collect();

    let (foot_top, foot_bottom) = foot_range;
    zones.push(TriggerZone::foot(
        "kick",
        ZoneShape::HeightBand {
            y_min: foot_top,
            y_max: foot_bottom,
        },
    ));
    zones
}

/// Stacked height layout used when calibration has too little data.
///
/// Bands carry no explicit proximity, so intensity is scored on height only.
pub fn default_height_kit() -> Vec<TriggerZone> {
    let band = |id: &str, y_min: f32, y_max: f32| {
        TriggerZone::hand(id, ZoneShape::HeightBand { y_min, y_max })
    };
    vec![
        band("crash", 0.0, 0.25),
        band("hihat", 0.20, 0.40),
        band("tom2", 0.40, 0.60),
        band("snare", 0.60, 0.80),
        band("tom1", 0.75, 0.95),
        TriggerZone::foot(
            "kick",
            ZoneShape::HeightBand {
                y_min: 0.85,
                y_max: 1.0,
            },
        ),
    ]
}

/// Observed range of one joint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointRange {
    /// Component-wise minimum
    pub min: Vec3,
    /// Component-wise maximum
    pub max: Vec3,
    /// Mean position
    pub mean: Vec3,
    /// Samples that contributed
    pub samples: usize,
}

/// Running extent of one joint's positions
#[derive(Debug, Clone, Copy)]
struct RangeAccumulator {
    min: Vec3,
    max: Vec3,
    sum: Vec3,
    count: usize,
}

impl RangeAccumulator {
    fn new(first: Vec3) -> Self {
        Self {
            min: first,
            max: first,
            sum: first,
            count: 1,
        }
    }

    fn add(&mut self, position: Vec3) {
        self.min = self.min.min(position);
        self.max = self.max.max(position);
        self.sum += position;
        self.count += 1;
    }

    fn range(&self) -> JointRange {
        JointRange {
            min: self.min,
            max: self.max,
            mean: self.sum / self.count as f32,
            samples: self.count,
        }
    }
}

/// Per-joint movement ranges recorded over a session
///
/// Memory stays constant however long the session runs.
#[derive(Debug, Clone, Default)]
pub struct CalibrationProfile {
    samples: HashMap<JointId, RangeAccumulator>,
    ranges: HashMap<JointId, JointRange>,
    complete: bool,
}

impl CalibrationProfile {
    /// Joints need more than this many samples to get a range
    pub const MIN_SAMPLES: usize = 10;
    /// Qualifying joints needed for a complete profile
    pub const MIN_JOINTS: usize = 3;

    /// Empty profile
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every joint of a frame
    pub fn record(&mut self, frame: &PoseFrame) {
        for (joint, position) in &frame.joints {
            if position.is_finite() {
                self.samples
                    .entry(*joint)
                    .and_modify(|acc| acc.add(*position))
                    .or_insert_with(|| RangeAccumulator::new(*position));
            }
        }
    }

    /// Compute ranges. Returns whether the profile is complete.
    pub fn finish(&mut self) -> bool {
        self.ranges = self
            .samples
            .iter()
            .filter(|(_, acc)| acc.count > Self::MIN_SAMPLES)
            .map(|(joint, acc)| (*joint, acc.range()))
            .collect();
        self.complete = self.ranges.len() >= Self::MIN_JOINTS;
        if self.complete {
            info!("Calibration profile complete: {} joints", self.ranges.len());
        } else {
            warn!(
                "Calibration profile incomplete: {} of {} joints",
                self.ranges.len(),
                Self::MIN_JOINTS
            );
        }
        self.complete
    }

    /// Enough joints qualified
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Range of one joint after [`finish`](Self::finish)
    pub fn range(&self, joint: JointId) -> Option<&JointRange> {
        self.ranges.get(&joint)
    }

    /// Map a raw position into drum space.
    ///
    /// Wrists use the union of both wrist ranges; ankles use the left ankle
    /// range. Everything else passes through.
    pub fn normalize(&self, joint: JointId, position: Vec3) -> Vec3 {
        if !self.complete {
            return position;
        }
        let bounds = match joint.role() {
            JointRole::Wrist => {
                match (
                    self.ranges.get(&JointId::LeftWrist),
                    self.ranges.get(&JointId::RightWrist),
                ) {
                    (Some(l), Some(r)) => Some((l.min.min(r.min), l.max.max(r.max))),
                    _ => None,
                }
            }
            JointRole::Ankle => self
                .ranges
                .get(&JointId::LeftAnkle)
                .map(|range| (range.min, range.max)),
            _ => None,
        };
        let Some((min, max)) = bounds else {
            return position;
        };

        let size = (max - min).max(Vec3::splat(0.01));
        let n = (position - min) / size;
        Vec3::new(0.2 + n.x * 0.6, 0.3 + n.y * 0.4, position.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::ZoneMap;

    #[test]
    fn test_percentile_interpolates() {
        let data = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&data, 0.0), 0.0);
        assert_eq!(percentile(&data, 50.0), 2.0);
        assert!((percentile(&data, 95.0) - 3.8).abs() < 1e-5);
        assert_eq!(percentile(&[0.7], 10.0), 0.7);
    }

    #[test]
    fn test_too_few_samples_uses_defaults() {
        let mut calibrator = HeightCalibrator::default();
        calibrator.start(0.0);
        calibrator.add_hand_height(0.5);
        let result = calibrator.finish();
        assert!(result.defaulted);
        assert_eq!(result.zones.len(), 6);
        assert!(calibrator.is_calibrated());
        assert!(ZoneMap::new(result.zones).is_ok());
    }

    #[test]
    fn test_out_of_range_heights_ignored() {
        let mut calibrator = HeightCalibrator::default();
        calibrator.add_hand_height(-0.1);
        calibrator.add_hand_height(1.5);
        calibrator.add_foot_height(0.9);
        assert_eq!(calibrator.sample_counts(), (0, 1));
    }

    #[test]
    fn test_bands_do_not_overlap() {
        let zones = height_kit((0.2, 0.7), (0.8, 0.95));
        let bands: Vec<(f32, f32)> = zones
            .iter()
            .filter_map(|z| match z.shape {
                ZoneShape::HeightBand { y_min, y_max } => Some((y_min, y_max)),
                _ => None,
            })
            .collect();
        assert_eq!(bands.len(), 6);
        for pair in bands[..5].windows(2) {
            assert!(pair[0].1 < pair[1].0);
        }
        assert!(zones[5].is_foot_only());
        assert!(ZoneMap::new(zones).is_ok());
    }

    #[test]
    fn test_auto_finish_after_window() {
        let mut calibrator = HeightCalibrator::default();
        calibrator.start(0.0);
        let mut result = None;
        for i in 0..60 {
            let t = i as f64 / 15.0;
            let y = 0.2 + 0.5 * (i % 10) as f32 / 10.0;
            let frame = PoseFrame::new(t)
                .with_joint(JointId::LeftWrist, Vec3::new(0.3, y, 0.0))
                .with_joint(JointId::RightWrist, Vec3::new(0.7, y, 0.0));
            if let Some(r) = calibrator.update(&frame) {
                result = Some(r);
                break;
            }
        }
        let result = result.expect("calibration should finish");
        assert!(!result.defaulted);
        let (top, bottom) = result.foot_range.unwrap();
        assert!(top <= bottom && bottom <= 1.0);
        assert!(!calibrator.is_running());
    }

    #[test]
    fn test_profile_normalizes_wrists() {
        let mut profile = CalibrationProfile::new();
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            let frame = PoseFrame::new(i as f64)
                .with_joint(JointId::LeftWrist, Vec3::new(0.1 + 0.2 * t, 0.2 + 0.4 * t, 0.0))
                .with_joint(JointId::RightWrist, Vec3::new(0.5 + 0.2 * t, 0.2 + 0.4 * t, 0.0))
                .with_joint(JointId::Nose, Vec3::new(0.5, 0.1, 0.0));
            profile.record(&frame);
        }
        assert!(profile.finish());

        let mid = profile.normalize(JointId::RightWrist, Vec3::new(0.4, 0.4, 0.3));
        assert!((mid.x - 0.5).abs() < 1e-4);
        assert!((mid.y - 0.5).abs() < 1e-4);
        assert_eq!(mid.z, 0.3);

        let nose = Vec3::new(0.5, 0.1, 0.0);
        assert_eq!(profile.normalize(JointId::Nose, nose), nose);
    }

    #[test]
    fn test_profile_range_tracks_extent_and_mean() {
        let mut profile = CalibrationProfile::new();
        for i in 0..=20 {
            let x = if i % 2 == 0 { 0.2 } else { 0.6 };
            let frame = PoseFrame::new(i as f64)
                .with_joint(JointId::LeftAnkle, Vec3::new(x, 0.9, 0.0))
                .with_joint(JointId::RightAnkle, Vec3::new(x, 0.9, 0.0))
                .with_joint(JointId::LeftKnee, Vec3::new(x, 0.7, 0.0));
            profile.record(&frame);
        }
        assert!(profile.finish());

        let range = profile.range(JointId::LeftAnkle).unwrap();
        assert_eq!(range.samples, 21);
        assert_eq!(range.min.x, 0.2);
        assert_eq!(range.max.x, 0.6);
        // 11 readings at 0.2, 10 at 0.6
        assert!((range.mean.x - (11.0 * 0.2 + 10.0 * 0.6) / 21.0).abs() < 1e-5);
        assert_eq!(range.min.y, range.max.y);
    }

    #[test]
    fn test_incomplete_profile_passes_through() {
        let mut profile = CalibrationProfile::new();
        profile.record(&PoseFrame::new(0.0).with_joint(JointId::LeftWrist, Vec3::ONE));
        assert!(!profile.finish());
        assert_eq!(profile.normalize(JointId::LeftWrist, Vec3::ZERO), Vec3::ZERO);
    }
}
