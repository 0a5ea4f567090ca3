//! Strike intensity from proximity and motion speed

use crate::zone::{TriggerZone, ZoneRole};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Intensity mapping parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensityConfig {
    /// Speed multiplier for hand zones
    pub hand_damping: f32,
    /// Speed multiplier for foot zones
    pub foot_damping: f32,
    /// Lowest intensity handed to sinks; keeps every hit audible
    pub floor: f32,
    /// Highest intensity handed to sinks
    pub ceiling: f32,
}

impl Default for IntensityConfig {
    fn default() -> Self {
        Self {
            hand_damping: 0.3,
            foot_damping: 0.5,
            floor: 0.3,
            ceiling: 1.0,
        }
    }
}

impl IntensityConfig {
    /// Damping factor for a zone role
    pub fn damping(&self, role: ZoneRole) -> f32 {
        match role {
            ZoneRole::Hand => self.hand_damping,
            ZoneRole::Foot => self.foot_damping,
        }
    }
}

/// Maps a registered hit to a normalized strike intensity
#[derive(Debug, Clone, Copy, Default)]
pub struct IntensityResolver {
    config: IntensityConfig,
}

impl IntensityResolver {
    /// Create a resolver
    pub fn new(config: IntensityConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &IntensityConfig {
        &self.config
    }

    /// Proximity-only intensity: 1 at the reference center, 0 at or beyond
    /// its radius.
    pub fn positional(&self, zone: &TriggerZone, position: Vec3) -> f32 {
        let proximity = zone.proximity_for(position);
        if proximity.radius <= 0.0 {
            return 0.0;
        }
        let distance = position.distance(proximity.center);
        if !distance.is_finite() || distance > proximity.radius {
            return 0.0;
        }
        (1.0 - distance / proximity.radius).clamp(0.0, 1.0)
    }

    /// Proximity combined with speed, before the floor/ceiling clamp
    pub fn combined(&self, zone: &TriggerZone, position: Vec3, velocity: f32) -> f32 {
        let motion = velocity * self.config.damping(zone.role());
        let motion = if motion.is_nan() { 0.0 } else { motion };
        self.positional(zone, position).max(motion)
    }

    /// Final intensity for a registered hit, in `[floor, ceiling]`
    pub fn intensity(&self, zone: &TriggerZone, position: Vec3, velocity: f32) -> f32 {
        self.combined(zone, position, velocity)
            .clamp(self.config.floor, self.config.ceiling)
    }
}
