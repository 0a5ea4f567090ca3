//! Engine configuration
//!
//! Loaded once at startup from TOML, RON or JSON (chosen by extension) and
//! validated before any frame is processed.

use crate::calibration::CalibrationConfig;
use crate::hit_detector::DetectorConfig;
use crate::intensity::IntensityConfig;
use crate::logging::LogConfig;
use crate::smoothing::DEFAULT_SMOOTHING_WINDOW;
use crate::trigger_system::{SourceConfig, TriggerSource, UnifiedConfig};
use crate::zone::{seated_kit, TriggerZone, ZoneMap};
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// Refuse configuration files larger than this
pub const MAX_CONFIG_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// General MIDI percussion channel (channel 10, zero-based)
pub const GM_DRUM_CHANNEL: u8 = 9;

/// MIDI forwarding settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiForwarding {
    /// Forward hits as MIDI notes
    pub enabled: bool,
    /// Substring of the output port name; `None` picks the first port
    pub port_name: Option<String>,
    /// Zero-based MIDI channel
    pub channel: u8,
}

impl Default for MidiForwarding {
    fn default() -> Self {
        Self {
            enabled: false,
            port_name: None,
            channel: GM_DRUM_CHANNEL,
        }
    }
}

/// OSC forwarding settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscForwarding {
    /// Forward hits as OSC messages
    pub enabled: bool,
    /// Target host
    pub host: String,
    /// Target UDP port
    pub port: u16,
}

impl Default for OscForwarding {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Outbound forwarding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// MIDI output
    pub midi: MidiForwarding,
    /// OSC output
    pub osc: OscForwarding,
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hit detection
    pub detector: DetectorConfig,
    /// Intensity mapping
    pub intensity: IntensityConfig,
    /// Zone table, in registration order
    pub zones: Vec<TriggerZone>,
    /// Non-visual trigger sources
    pub unified: UnifiedConfig,
    /// Raw positions averaged per joint before velocity estimation
    pub smoothing_window: usize,
    /// Height calibration
    pub calibration: CalibrationConfig,
    /// Logging
    pub log: LogConfig,
    /// MIDI/OSC forwarding
    pub forwarding: ForwardingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            intensity: IntensityConfig::default(),
            zones: seated_kit(),
            unified: UnifiedConfig::default(),
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            calibration: CalibrationConfig::default(),
            log: LogConfig::default(),
            forwarding: ForwardingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Ron,
    Json,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("toml");
        match extension {
            "toml" => Ok(Format::Toml),
            "ron" => Ok(Format::Ron),
            "json" => Ok(Format::Json),
            other => Err(CoreError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let format = Format::from_path(path)?;

        let size = std::fs::metadata(path)?.len();
        if size > MAX_CONFIG_FILE_SIZE {
            return Err(CoreError::InvalidConfig(format!(
                "{} is {} bytes (limit {})",
                path.display(),
                size,
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let mut content = String::new();
        File::open(path)?.read_to_string(&mut content)?;
        let config = Self::parse(&content, format)?;
        config.validate()?;

        info!(
            "Loaded configuration from {} ({} zones)",
            path.display(),
            config.zones.len()
        );
        Ok(config)
    }

    fn parse(content: &str, format: Format) -> Result<Self> {
        match format {
            Format::Toml => toml::from_str(content).map_err(|e| CoreError::Parse(e.to_string())),
            Format::Ron => ron::from_str(content).map_err(|e| CoreError::Parse(e.to_string())),
            Format::Json => {
                serde_json::from_str(content).map_err(|e| CoreError::Parse(e.to_string()))
            }
        }
    }

    /// Write the configuration in the format matching the extension
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = match Format::from_path(path)? {
            Format::Toml => {
                toml::to_string_pretty(self).map_err(|e| CoreError::Parse(e.to_string()))?
            }
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| CoreError::Parse(e.to_string()))?,
            Format::Json => {
                serde_json::to_string_pretty(self).map_err(|e| CoreError::Parse(e.to_string()))?
            }
        };
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Check the whole tree. Called once after loading.
    pub fn validate(&self) -> Result<()> {
        // Builds the map to check zones individually and ids for uniqueness
        ZoneMap::new(self.zones.clone())?;

        let d = &self.detector;
        non_negative("detector.velocity_threshold", d.velocity_threshold)?;
        if !d.cooldown_secs.is_finite() || d.cooldown_secs < 0.0 {
            return Err(invalid(format!(
                "detector.cooldown_secs must be >= 0, got {}",
                d.cooldown_secs
            )));
        }

        let i = &self.intensity;
        non_negative("intensity.hand_damping", i.hand_damping)?;
        non_negative("intensity.foot_damping", i.foot_damping)?;
        non_negative("intensity.floor", i.floor)?;
        non_negative("intensity.ceiling", i.ceiling)?;
        if i.floor > i.ceiling {
            return Err(invalid(format!(
                "intensity.floor {} exceeds ceiling {}",
                i.floor, i.ceiling
            )));
        }

        for source in TriggerSource::ALL {
            validate_source(source, self.unified.source(source))?;
        }
        let volume = &self.unified.volume;
        if !volume.min.is_finite() || !volume.max.is_finite() || volume.min > volume.max {
            return Err(invalid(format!(
                "unified.volume range {}..{} is invalid",
                volume.min, volume.max
            )));
        }
        if !self.unified.debounce_secs.is_finite() || self.unified.debounce_secs < 0.0 {
            return Err(invalid("unified.debounce_secs must be >= 0".to_string()));
        }

        if self.forwarding.midi.channel > 15 {
            return Err(invalid(format!(
                "forwarding.midi.channel {} out of range 0-15",
                self.forwarding.midi.channel
            )));
        }

        Ok(())
    }
}

fn invalid(msg: String) -> CoreError {
    CoreError::InvalidConfig(msg)
}

fn non_negative(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{} must be finite and >= 0, got {}", name, value)))
    }
}

fn validate_source(source: TriggerSource, config: &SourceConfig) -> Result<()> {
    let name = source.name();
    non_negative(&format!("unified.{}.threshold", name), config.threshold)?;
    if !config.max_value.is_finite() {
        return Err(invalid(format!("unified.{}.max_value must be finite", name)));
    }
    if config.buffer_capacity == 0 || config.window == 0 {
        return Err(invalid(format!(
            "unified.{}: buffer_capacity and window must be positive",
            name
        )));
    }
    if config.window > config.buffer_capacity {
        return Err(invalid(format!(
            "unified.{}: window {} exceeds buffer capacity {}",
            name, config.window, config.buffer_capacity
        )));
    }
    Ok(())
}
