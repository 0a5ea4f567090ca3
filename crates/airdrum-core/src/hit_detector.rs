//! Per-frame hit detection
//!
//! Wrists are tested right before left against hand zones, each wrist
//! landing in at most one zone. Knees, then ankles as a fallback, are tested
//! against foot-only zones, and at most one foot hit is produced per frame.
//! Every candidate then passes through the per-zone cooldown.

use crate::cooldown::{CooldownTable, DEFAULT_COOLDOWN_SECS};
use crate::joint::JointId;
use crate::velocity::VelocityTable;
use crate::zone::{TriggerZone, ZoneId, ZoneMap};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Default minimum joint speed (normalized units per second)
pub const DEFAULT_VELOCITY_THRESHOLD: f32 = 0.2;

/// Detector parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Global minimum speed for a joint to be tested at all
    pub velocity_threshold: f32,
    /// Minimum seconds between two accepted hits on one zone
    pub cooldown_secs: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            velocity_threshold: DEFAULT_VELOCITY_THRESHOLD,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
        }
    }
}

/// A zone hit that survived the cooldown
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedHit {
    /// Zone that fired
    pub zone_id: ZoneId,
    /// Joint that struck it
    pub joint: JointId,
    /// Joint position this frame
    pub position: Vec3,
    /// Joint speed this frame
    pub velocity: f32,
}

/// Stateful hit detector; owns the cooldown table
#[derive(Debug, Clone)]
pub struct HitDetector {
    config: DetectorConfig,
    cooldowns: CooldownTable,
    suppressed: u64,
}

impl Default for HitDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl HitDetector {
    /// Create a detector
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            cooldowns: CooldownTable::new(config.cooldown_secs),
            suppressed: 0,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Candidates dropped by the cooldown since creation
    pub fn suppressed_count(&self) -> u64 {
        self.suppressed
    }

    /// Cooldown bookkeeping
    pub fn cooldowns(&self) -> &CooldownTable {
        &self.cooldowns
    }

    /// Clear the cooldown table (session restart)
    pub fn reset_cooldowns(&mut self) {
        self.cooldowns.reset();
    }

    /// Detect hits for one frame, in detection order
    pub fn detect(
        &mut self,
        zones: &ZoneMap,
        positions: &HashMap<JointId, Vec3>,
        velocities: &VelocityTable,
        now: f64,
    ) -> Vec<DetectedHit> {
        let mut hits = Vec::new();

        for joint in JointId::HANDS {
            let Some((position, velocity)) = self.armed(joint, positions, velocities) else {
                continue;
            };
            let role = joint.role();
            let candidate = zones
                .zones_for(role)
                .filter(|z| !z.is_foot_only())
                .find(|z| self.zone_armed(z, velocity) && z.contains(position));
            if let Some(zone) = candidate {
                self.accept(zone, joint, position, velocity, now, &mut hits);
            }
        }

        // Ankles only get a chance when no knee found a foot zone
        for group in [JointId::KNEES, JointId::ANKLES] {
            let mut found = false;
            for joint in group {
                let Some((position, velocity)) = self.armed(joint, positions, velocities) else {
                    continue;
                };
                let role = joint.role();
                let candidate = zones
                    .zones_for(role)
                    .filter(|z| z.is_foot_only())
                    .find(|z| self.zone_armed(z, velocity) && z.contains(position));
                if let Some(zone) = candidate {
                    self.accept(zone, joint, position, velocity, now, &mut hits);
                    found = true;
                    break;
                }
            }
            if found {
                break;
            }
        }

        hits
    }

    /// Set of zone ids fired this frame
    pub fn detect_hits(
        &mut self,
        zones: &ZoneMap,
        positions: &HashMap<JointId, Vec3>,
        velocities: &VelocityTable,
        now: f64,
    ) -> HashSet<ZoneId> {
        self.detect(zones, positions, velocities, now)
            .into_iter()
            .map(|hit| hit.zone_id)
            .collect()
    }

    fn armed(
        &self,
        joint: JointId,
        positions: &HashMap<JointId, Vec3>,
        velocities: &VelocityTable,
    ) -> Option<(Vec3, f32)> {
        let position = *positions.get(&joint)?;
        let velocity = velocities.get(&joint).copied().unwrap_or(0.0);
        (velocity >= self.config.velocity_threshold).then_some((position, velocity))
    }

    fn zone_armed(&self, zone: &TriggerZone, velocity: f32) -> bool {
        velocity >= zone.velocity_threshold.unwrap_or(self.config.velocity_threshold)
    }

    fn accept(
        &mut self,
        zone: &TriggerZone,
        joint: JointId,
        position: Vec3,
        velocity: f32,
        now: f64,
        hits: &mut Vec<DetectedHit>,
    ) {
        if self.cooldowns.try_fire(&zone.id, now) {
            trace!("{} hit {} at {:.3} (v={:.3})", joint, zone.id, now, velocity);
            hits.push(DetectedHit {
                zone_id: zone.id.clone(),
                joint,
                position,
                velocity,
            });
        } else {
            self.suppressed += 1;
            trace!("{} hit on {} suppressed by cooldown", joint, zone.id);
        }
    }
}
