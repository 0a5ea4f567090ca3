//! Airdrum Core - Trigger Engine
//!
//! This crate turns a stream of normalized body-joint positions into discrete,
//! velocity-sensitive drum hits:
//! - Joint tagging and position smoothing
//! - Per-joint velocity estimation
//! - Trigger zones (radial, height band, box) with atomic recalibration
//! - Hit detection with per-zone cooldown
//! - Proximity/velocity intensity mapping
//! - A sensor-agnostic trigger system for foot, hand and microphone signals

#![warn(missing_docs)]

pub use glam::Vec3;
use thiserror::Error;

// Pose input
pub mod joint;
pub mod smoothing;
pub mod velocity;
pub use joint::{JointId, JointRole, JointSample, PoseFrame};
pub use smoothing::PositionSmoother;
pub use velocity::{VelocityEstimator, VelocityTable};

// Zones and detection
pub mod cooldown;
pub mod hit_detector;
pub mod intensity;
pub mod zone;
pub use cooldown::CooldownTable;
pub use hit_detector::{DetectedHit, DetectorConfig, HitDetector};
pub use intensity::{IntensityConfig, IntensityResolver};
pub use zone::{
    seated_kit, Proximity, TriggerZone, ZoneId, ZoneMap, ZoneMapHandle, ZoneRole, ZoneShape,
};

// Orchestration and output
pub mod pipeline;
pub mod sink;
pub use pipeline::{dispatch, DrumPipeline, HitEvent, PipelineStats};
pub use sink::{HitSink, LogSink, RecordingSink, SinkError};

// Non-visual sources
pub mod trigger_system;
pub use trigger_system::{
    LatencyBudget, SensorReadings, SoundEvent, TriggerReading, TriggerSource, UnifiedConfig,
    UnifiedResult, UnifiedTriggerSystem,
};

// Session setup
pub mod calibration;
pub mod config;
pub mod logging;
pub use calibration::{CalibrationProfile, CalibrationResult, HeightCalibrator};
pub use config::EngineConfig;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed zone definition
    #[error("Invalid zone: {0}")]
    InvalidZone(String),

    /// Two zones share an id
    #[error("Duplicate zone id: {0}")]
    DuplicateZone(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file extension not recognised
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Deserialization or serialization failure
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
