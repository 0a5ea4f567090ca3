//! Trigger zones - named regions of normalized joint space mapped to drums
//!
//! # Overview
//!
//! - **ZoneShape**: the geometric predicate (radial, height band or box).
//! - **TriggerZone**: a named shape plus trigger parameters and the joint
//!   roles allowed to play it.
//! - **ZoneMap**: an immutable, ordered snapshot of all zones.
//! - **ZoneMapHandle**: shared handle through which a recalibration swaps in
//!   a whole new snapshot between frames.

use crate::joint::JointRole;
use crate::{CoreError, Result};
use arc_swap::ArcSwap;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Zone identifier, e.g. `"kick"` or `"snare"`
pub type ZoneId = String;

/// Geometric predicate of a zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZoneShape {
    /// Euclidean distance to a center point
    Radial {
        /// Zone center
        center: Vec3,
        /// Maximum distance from the center that still counts as a hit
        trigger_radius: f32,
    },
    /// Horizontal band; only y is tested
    HeightBand {
        /// Top of the band (image y grows downward)
        y_min: f32,
        /// Bottom of the band
        y_max: f32,
    },
    /// Axis-aligned rectangle in x/y; z is ignored
    Box {
        /// Left edge
        x_min: f32,
        /// Right edge
        x_max: f32,
        /// Top edge
        y_min: f32,
        /// Bottom edge
        y_max: f32,
    },
}

impl ZoneShape {
    /// Whether `position` lies inside the shape (bounds inclusive)
    pub fn contains(&self, position: Vec3) -> bool {
        match *self {
            ZoneShape::Radial {
                center,
                trigger_radius,
            } => position.distance(center) <= trigger_radius,
            ZoneShape::HeightBand { y_min, y_max } => y_min <= position.y && position.y <= y_max,
            ZoneShape::Box {
                x_min,
                x_max,
                y_min,
                y_max,
            } => {
                x_min <= position.x
                    && position.x <= x_max
                    && y_min <= position.y
                    && position.y <= y_max
            }
        }
    }

    /// Radial reference used for proximity intensity when the zone does not
    /// configure one explicitly.
    ///
    /// Axes the shape ignores are taken from `position`, so they contribute
    /// no distance.
    pub fn proximity_for(&self, position: Vec3) -> Proximity {
        match *self {
            ZoneShape::Radial {
                center,
                trigger_radius,
            } => Proximity {
                center,
                radius: trigger_radius,
            },
            ZoneShape::HeightBand { y_min, y_max } => Proximity {
                center: Vec3::new(position.x, (y_min + y_max) * 0.5, position.z),
                radius: (y_max - y_min) * 0.5,
            },
            ZoneShape::Box {
                x_min,
                x_max,
                y_min,
                y_max,
            } => {
                let half_w = (x_max - x_min) * 0.5;
                let half_h = (y_max - y_min) * 0.5;
                Proximity {
                    center: Vec3::new(x_min + half_w, y_min + half_h, position.z),
                    radius: (half_w * half_w + half_h * half_h).sqrt(),
                }
            }
        }
    }

    fn validate(&self, id: &str) -> Result<()> {
        let bad = |msg: &str| Err(CoreError::InvalidZone(format!("{}: {}", id, msg)));
        match *self {
            ZoneShape::Radial {
                center,
                trigger_radius,
            } => {
                if !center.is_finite() || !trigger_radius.is_finite() {
                    return bad("non-finite radial geometry");
                }
                if trigger_radius <= 0.0 {
                    return bad("trigger_radius must be positive");
                }
            }
            ZoneShape::HeightBand { y_min, y_max } => {
                if !y_min.is_finite() || !y_max.is_finite() {
                    return bad("non-finite height band");
                }
                if y_min > y_max {
                    return bad("y_min > y_max");
                }
            }
            ZoneShape::Box {
                x_min,
                x_max,
                y_min,
                y_max,
            } => {
                if ![x_min, x_max, y_min, y_max].iter().all(|v| v.is_finite()) {
                    return bad("non-finite box");
                }
                if x_min > x_max || y_min > y_max {
                    return bad("box min exceeds max");
                }
            }
        }
        Ok(())
    }
}

/// Center and radius of the legacy radial proximity model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Proximity {
    /// Reference point
    pub center: Vec3,
    /// Distance at which proximity intensity reaches zero
    pub radius: f32,
}

/// Which limb family plays a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneRole {
    /// Played by wrists
    Hand,
    /// Played only by knees/ankles
    Foot,
}

/// A named trigger region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerZone {
    /// Zone name
    pub id: ZoneId,
    /// Geometric predicate
    pub shape: ZoneShape,
    /// Minimum joint speed to arm this zone; `None` uses the detector's global threshold
    #[serde(default)]
    pub velocity_threshold: Option<f32>,
    /// Joint roles allowed to play the zone
    pub assignable_joints: Vec<JointRole>,
    /// Explicit reference for proximity intensity
    #[serde(default)]
    pub proximity: Option<Proximity>,
}

impl TriggerZone {
    /// Zone played by wrists
    pub fn hand(id: impl Into<ZoneId>, shape: ZoneShape) -> Self {
        Self {
            id: id.into(),
            shape,
            velocity_threshold: None,
            assignable_joints: vec![JointRole::Wrist],
            proximity: None,
        }
    }

    /// Zone played by knees or ankles
    pub fn foot(id: impl Into<ZoneId>, shape: ZoneShape) -> Self {
        Self {
            id: id.into(),
            shape,
            velocity_threshold: None,
            assignable_joints: vec![JointRole::Knee, JointRole::Ankle],
            proximity: None,
        }
    }

    /// Set a zone-specific arming threshold
    pub fn with_velocity_threshold(mut self, threshold: f32) -> Self {
        self.velocity_threshold = Some(threshold);
        self
    }

    /// Set an explicit proximity reference
    pub fn with_proximity(mut self, center: Vec3, radius: f32) -> Self {
        self.proximity = Some(Proximity { center, radius });
        self
    }

    /// Whether a joint of `role` may play this zone
    pub fn accepts(&self, role: JointRole) -> bool {
        self.assignable_joints.contains(&role)
    }

    /// True when only knees/ankles may play the zone
    pub fn is_foot_only(&self) -> bool {
        !self.assignable_joints.is_empty() && self.assignable_joints.iter().all(|r| r.is_foot())
    }

    /// Limb family of the zone
    pub fn role(&self) -> ZoneRole {
        if self.is_foot_only() {
            ZoneRole::Foot
        } else {
            ZoneRole::Hand
        }
    }

    /// Shape containment test
    pub fn contains(&self, position: Vec3) -> bool {
        self.shape.contains(position)
    }

    /// Proximity reference for a joint at `position`
    pub fn proximity_for(&self, position: Vec3) -> Proximity {
        self.proximity
            .unwrap_or_else(|| self.shape.proximity_for(position))
    }

    /// Check the zone is well-formed
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::InvalidZone("zone id is empty".to_string()));
        }
        if self.assignable_joints.is_empty() {
            return Err(CoreError::InvalidZone(format!(
                "{}: no assignable joints",
                self.id
            )));
        }
        if let Some(threshold) = self.velocity_threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(CoreError::InvalidZone(format!(
                    "{}: invalid velocity_threshold {}",
                    self.id, threshold
                )));
            }
        }
        if let Some(p) = self.proximity {
            if !p.center.is_finite() || !p.radius.is_finite() || p.radius <= 0.0 {
                return Err(CoreError::InvalidZone(format!(
                    "{}: invalid proximity reference",
                    self.id
                )));
            }
        }
        self.shape.validate(&self.id)
    }
}

/// Immutable, ordered zone registry
///
/// Hand zones come first in registration order, followed by foot-only zones.
/// This order breaks ties when shapes overlap.
#[derive(Debug, Clone, Default)]
pub struct ZoneMap {
    zones: Vec<TriggerZone>,
    index: HashMap<ZoneId, usize>,
    generation: u64,
}

impl ZoneMap {
    /// Build a validated map at generation 0
    pub fn new(zones: Vec<TriggerZone>) -> Result<Self> {
        Self::with_generation(zones, 0)
    }

    fn with_generation(zones: Vec<TriggerZone>, generation: u64) -> Result<Self> {
        for zone in &zones {
            zone.validate()?;
        }

        let (mut ordered, feet): (Vec<_>, Vec<_>) =
            zones.into_iter().partition(|z| !z.is_foot_only());
        ordered.extend(feet);

        let mut index = HashMap::with_capacity(ordered.len());
        for (i, zone) in ordered.iter().enumerate() {
            if index.insert(zone.id.clone(), i).is_some() {
                return Err(CoreError::DuplicateZone(zone.id.clone()));
            }
        }

        Ok(Self {
            zones: ordered,
            index,
            generation,
        })
    }

    /// Look up a zone by id
    pub fn zone(&self, id: &str) -> Option<&TriggerZone> {
        self.index.get(id).map(|&i| &self.zones[i])
    }

    /// All zones in tie-breaking order
    pub fn all_zones(&self) -> &[TriggerZone] {
        &self.zones
    }

    /// Zones a joint of `role` may play, in order
    pub fn zones_for(&self, role: JointRole) -> impl Iterator<Item = &TriggerZone> {
        self.zones.iter().filter(move |z| z.accepts(role))
    }

    /// Snapshot generation; bumped by every recalibration
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of zones
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// True when no zones are configured
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Shared handle to the current zone snapshot
///
/// Readers take a snapshot once per frame; a recalibration replaces the
/// whole table, so an in-flight frame never sees a half-updated map.
#[derive(Debug, Clone)]
pub struct ZoneMapHandle {
    current: Arc<ArcSwap<ZoneMap>>,
}

impl ZoneMapHandle {
    /// Wrap an initial map
    pub fn new(map: ZoneMap) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(map)),
        }
    }

    /// Build from a zone list
    pub fn from_zones(zones: Vec<TriggerZone>) -> Result<Self> {
        Ok(Self::new(ZoneMap::new(zones)?))
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<ZoneMap> {
        self.current.load_full()
    }

    /// Current generation
    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Replace every zone at once. Returns the new generation.
    ///
    /// The new table is validated before the swap; on error the current
    /// snapshot stays in place.
    pub fn recalibrate(&self, zones: Vec<TriggerZone>) -> Result<u64> {
        let staged = ZoneMap::new(zones)?;
        let previous = self.current.rcu(|cur| {
            let mut next = staged.clone();
            next.generation = cur.generation + 1;
            next
        });
        let generation = previous.generation + 1;
        info!(
            "Zone map recalibrated: generation {} ({} zones)",
            generation,
            staged.len()
        );
        Ok(generation)
    }
}

/// The seated kit: snare on the right, hi-hat on the left, kick played by the
/// knees (or ankles) in the low centre of the frame.
pub fn seated_kit() -> Vec<TriggerZone> {
    vec![
        TriggerZone::hand(
            "snare",
            ZoneShape::Box {
                x_min: 0.64,
                x_max: 0.86,
                y_min: 0.33,
                y_max: 0.67,
            },
        )
        .with_proximity(Vec3::new(0.75, 0.5, 0.0), 0.18),
        TriggerZone::hand(
            "hihat",
            ZoneShape::Box {
                x_min: 0.14,
                x_max: 0.36,
                y_min: 0.33,
                y_max: 0.67,
            },
        )
        .with_proximity(Vec3::new(0.25, 0.5, 0.0), 0.18),
        TriggerZone::foot(
            "kick",
            ZoneShape::Box {
                x_min: 0.28,
                x_max: 0.72,
                y_min: 0.665,
                y_max: 1.0,
            },
        )
        .with_proximity(Vec3::new(0.5, 0.85, 0.0), 0.2),
    ]
}
