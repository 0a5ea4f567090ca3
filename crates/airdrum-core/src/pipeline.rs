//! Per-frame pose pipeline
//!
//! `PoseFrame -> velocities -> hits -> intensities -> HitEvent`. The zone
//! snapshot is taken once at the start of each frame, so a concurrent
//! recalibration only becomes visible on the next frame.

use crate::hit_detector::{DetectorConfig, HitDetector};
use crate::intensity::{IntensityConfig, IntensityResolver};
use crate::joint::{JointId, PoseFrame};
use crate::sink::HitSink;
use crate::velocity::VelocityEstimator;
use crate::zone::{ZoneId, ZoneMapHandle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One registered drum hit, ready for a sound sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitEvent {
    /// Zone that fired
    pub zone_id: ZoneId,
    /// Strike intensity in `[floor, ceiling]`
    pub intensity: f32,
    /// Joint that struck the zone
    pub source_joint: JointId,
    /// Frame timestamp in seconds
    pub timestamp: f64,
}

/// Running counters of a pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    /// Frames processed
    pub frames: u64,
    /// Accepted hits per zone
    pub hits_per_zone: BTreeMap<ZoneId, u64>,
    /// Candidates dropped by the cooldown
    pub suppressed: u64,
    /// Zone map generation seen by the last frame
    pub zone_generation: u64,
}

impl PipelineStats {
    /// Total accepted hits
    pub fn total_hits(&self) -> u64 {
        self.hits_per_zone.values().sum()
    }
}

/// Pose-driven trigger pipeline
pub struct DrumPipeline {
    zones: ZoneMapHandle,
    velocity: VelocityEstimator,
    detector: HitDetector,
    resolver: IntensityResolver,
    stats: PipelineStats,
}

impl DrumPipeline {
    /// Create a pipeline over a shared zone handle
    pub fn new(zones: ZoneMapHandle, detector: DetectorConfig, intensity: IntensityConfig) -> Self {
        Self {
            zones,
            velocity: VelocityEstimator::new(),
            detector: HitDetector::new(detector),
            resolver: IntensityResolver::new(intensity),
            stats: PipelineStats::default(),
        }
    }

    /// Zone handle; clone it to recalibrate from another thread
    pub fn zones(&self) -> &ZoneMapHandle {
        &self.zones
    }

    /// Counters since creation or the last reset
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Process one pose frame and return the hits it produced, in detection order
    pub fn process_frame(&mut self, frame: &PoseFrame) -> Vec<HitEvent> {
        let zones = self.zones.snapshot();
        let velocities = self.velocity.update_frame(frame);

        let suppressed_before = self.detector.suppressed_count();
        let hits = self
            .detector
            .detect(&zones, &frame.joints, &velocities, frame.timestamp);

        let events: Vec<HitEvent> = hits
            .into_iter()
            .filter_map(|hit| {
                let zone = zones.zone(&hit.zone_id)?;
                let intensity = self.resolver.intensity(zone, hit.position, hit.velocity);
                debug!(
                    "Hit {} by {} at {:.3}s: intensity {:.2} (v={:.2})",
                    hit.zone_id, hit.joint, frame.timestamp, intensity, hit.velocity
                );
                Some(HitEvent {
                    zone_id: hit.zone_id,
                    intensity,
                    source_joint: hit.joint,
                    timestamp: frame.timestamp,
                })
            })
            .collect();

        self.stats.frames += 1;
        self.stats.suppressed += self.detector.suppressed_count() - suppressed_before;
        self.stats.zone_generation = zones.generation();
        for event in &events {
            *self
                .stats
                .hits_per_zone
                .entry(event.zone_id.clone())
                .or_insert(0) += 1;
        }

        events
    }

    /// Forget velocity history, cooldowns and counters
    pub fn reset(&mut self) {
        self.velocity.reset();
        self.detector.reset_cooldowns();
        self.stats = PipelineStats::default();
    }
}

/// Hand every event to every sink. Sink failures are logged and skipped.
///
/// Returns the number of successful deliveries.
pub fn dispatch(events: &[HitEvent], sinks: &mut [Box<dyn HitSink>]) -> usize {
    let mut delivered = 0;
    for event in events {
        for sink in sinks.iter_mut() {
            match sink.play(event) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Sink '{}' failed on {}: {}", sink.name(), event.zone_id, e),
            }
        }
    }
    delivered
}
