//! Sensor-agnostic trigger system for non-visual inputs
//!
//! Three independent sources feed scalar readings:
//! - **Foot**: accelerometer magnitude in g, averaged over the last 3 readings
//! - **Hand**: normalized hand speed, averaged over the last 3 readings
//! - **Mic**: normalized amplitude, peak of the last 5 readings
//!
//! Each source keeps its own rolling buffer and debounce time. Intensities
//! ramp linearly from the threshold to an assumed maximum and are mapped to
//! playback volume through a sub-linear curve.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Exponent of the dynamic volume curve
pub const VOLUME_EXPONENT: f32 = 0.7;

/// Lowest hand speed used by latency compensation
const MIN_COMPENSATION_VELOCITY: f32 = 0.01;

/// Non-visual trigger source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// Foot-mounted accelerometer
    Foot,
    /// Hand velocity signal
    Hand,
    /// Contact microphone on a surface
    Mic,
}

impl TriggerSource {
    /// All sources in processing order
    pub const ALL: [TriggerSource; 3] = [TriggerSource::Foot, TriggerSource::Hand, TriggerSource::Mic];

    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            TriggerSource::Foot => "foot",
            TriggerSource::Hand => "hand",
            TriggerSource::Mic => "mic",
        }
    }
}

/// How a source collapses its recent readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Mean of the window; suppresses single-sample spikes
    Average,
    /// Maximum of the window; percussive transients are peaks
    Peak,
}

/// Per-source trigger parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Level at which the source triggers (inclusive)
    pub threshold: f32,
    /// Level mapped to full intensity
    pub max_value: f32,
    /// Rolling buffer capacity
    pub buffer_capacity: usize,
    /// Number of most recent readings reduced per call
    pub window: usize,
    /// Reduction over the window
    pub reduction: Reduction,
}

impl SourceConfig {
    /// Accelerometer defaults: 1.5 g threshold, 2.0 g max
    pub fn foot() -> Self {
        Self {
            threshold: 1.5,
            max_value: 2.0,
            buffer_capacity: 10,
            window: 3,
            reduction: Reduction::Average,
        }
    }

    /// Hand velocity defaults: 0.5 threshold, 1.0 max
    pub fn hand() -> Self {
        Self {
            threshold: 0.5,
            max_value: 1.0,
            buffer_capacity: 10,
            window: 3,
            reduction: Reduction::Average,
        }
    }

    /// Microphone defaults: 0.2 threshold, peak over 5 of 20 buffered readings
    pub fn mic() -> Self {
        Self {
            threshold: 0.2,
            max_value: 1.0,
            buffer_capacity: 20,
            window: 5,
            reduction: Reduction::Peak,
        }
    }
}

/// Fields given in a config section; the rest come from the source's defaults
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SourceOverrides {
    threshold: Option<f32>,
    max_value: Option<f32>,
    buffer_capacity: Option<usize>,
    window: Option<usize>,
    reduction: Option<Reduction>,
}

impl SourceOverrides {
    fn apply(self, base: SourceConfig) -> SourceConfig {
        SourceConfig {
            threshold: self.threshold.unwrap_or(base.threshold),
            max_value: self.max_value.unwrap_or(base.max_value),
            buffer_capacity: self.buffer_capacity.unwrap_or(base.buffer_capacity),
            window: self.window.unwrap_or(base.window),
            reduction: self.reduction.unwrap_or(base.reduction),
        }
    }
}

fn foot_source<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<SourceConfig, D::Error> {
    Ok(SourceOverrides::deserialize(d)?.apply(SourceConfig::foot()))
}

fn hand_source<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<SourceConfig, D::Error> {
    Ok(SourceOverrides::deserialize(d)?.apply(SourceConfig::hand()))
}

fn mic_source<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<SourceConfig, D::Error> {
    Ok(SourceOverrides::deserialize(d)?.apply(SourceConfig::mic()))
}

/// Expected round-trip latency components in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyBudget {
    /// Microphone capture
    pub mic_ms: f32,
    /// Foot sensor link
    pub foot_ms: f32,
    /// Pose estimation
    pub pose_ms: f32,
    /// Compensation algorithm
    pub compensation_ms: f32,
    /// Sound synthesis
    pub synth_ms: f32,
}

impl Default for LatencyBudget {
    fn default() -> Self {
        Self {
            mic_ms: 3.0,
            foot_ms: 10.0,
            pose_ms: 25.0,
            compensation_ms: 5.0,
            synth_ms: 5.0,
        }
    }
}

impl LatencyBudget {
    /// Budget from explicit components
    pub fn new(mic_ms: f32, foot_ms: f32, pose_ms: f32, compensation_ms: f32, synth_ms: f32) -> Self {
        Self {
            mic_ms,
            foot_ms,
            pose_ms,
            compensation_ms,
            synth_ms,
        }
    }

    /// Sum of all components
    pub fn total_ms(&self) -> f32 {
        self.mic_ms + self.foot_ms + self.pose_ms + self.compensation_ms + self.synth_ms
    }
}

/// Intensity to volume mapping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeCurve {
    /// Volume at zero intensity
    pub min: f32,
    /// Volume at full intensity
    pub max: f32,
}

impl Default for VolumeCurve {
    fn default() -> Self {
        Self { min: 0.2, max: 1.0 }
    }
}

impl VolumeCurve {
    /// Volume for an intensity in [0,1]
    pub fn apply(&self, intensity: f32) -> f32 {
        dynamic_volume(intensity, self.min, self.max)
    }
}

/// `min + (max - min) * intensity^0.7`, with intensity clamped to [0,1]
pub fn dynamic_volume(intensity: f32, min: f32, max: f32) -> f32 {
    let intensity = if intensity.is_nan() {
        0.0
    } else {
        intensity.clamp(0.0, 1.0)
    };
    min + (max - min) * intensity.powf(VOLUME_EXPONENT)
}

/// Advisory compensation for pose latency given the hand speed.
///
/// Faster strikes need less compensation. The result lies in
/// `[0, pose_latency_ms]`.
pub fn latency_compensation(pose_latency_ms: f32, hand_velocity: f32) -> f32 {
    let velocity = if hand_velocity.is_nan() {
        MIN_COMPENSATION_VELOCITY
    } else {
        hand_velocity.max(MIN_COMPENSATION_VELOCITY)
    };
    let compensation = pose_latency_ms / velocity / 2.0;
    compensation.max(0.0).min(pose_latency_ms.max(0.0))
}

/// Largest value of a signal, 0.0 when empty
pub fn peak(signal: &[f32]) -> f32 {
    signal.iter().copied().reduce(f32::max).unwrap_or(0.0)
}

/// Sound played for each source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundMap {
    /// Sound for foot triggers
    pub foot: String,
    /// Sound for hand triggers
    pub hand: String,
    /// Sound for mic triggers
    pub mic: String,
}

impl Default for SoundMap {
    fn default() -> Self {
        Self {
            foot: "kick".to_string(),
            hand: "snare".to_string(),
            mic: "snare".to_string(),
        }
    }
}

impl SoundMap {
    /// Sound id for a source
    pub fn sound_for(&self, source: TriggerSource) -> &str {
        match source {
            TriggerSource::Foot => &self.foot,
            TriggerSource::Hand => &self.hand,
            TriggerSource::Mic => &self.mic,
        }
    }
}

fn default_debounce_secs() -> f64 {
    0.05
}

/// Configuration of the unified trigger system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifiedConfig {
    /// Foot accelerometer source
    #[serde(deserialize_with = "foot_source")]
    pub foot: SourceConfig,
    /// Hand velocity source
    #[serde(deserialize_with = "hand_source")]
    pub hand: SourceConfig,
    /// Microphone source
    #[serde(deserialize_with = "mic_source")]
    pub mic: SourceConfig,
    /// Volume curve
    pub volume: VolumeCurve,
    /// Default latency budget
    pub latency: LatencyBudget,
    /// Minimum seconds between two sound events of one source
    pub debounce_secs: f64,
    /// Source to sound mapping
    pub sounds: SoundMap,
}

impl Default for UnifiedConfig {
    fn default() -> Self {
        Self {
            foot: SourceConfig::foot(),
            hand: SourceConfig::hand(),
            mic: SourceConfig::mic(),
            volume: VolumeCurve::default(),
            latency: LatencyBudget::default(),
            debounce_secs: default_debounce_secs(),
            sounds: SoundMap::default(),
        }
    }
}

impl UnifiedConfig {
    /// Parameters of one source
    pub fn source(&self, source: TriggerSource) -> &SourceConfig {
        match source {
            TriggerSource::Foot => &self.foot,
            TriggerSource::Hand => &self.hand,
            TriggerSource::Mic => &self.mic,
        }
    }
}

/// Rolling readings and debounce time of one source
#[derive(Debug, Clone)]
pub struct TriggerSourceState {
    buffer: VecDeque<f32>,
    capacity: usize,
    /// Time of the last emitted sound event
    pub last_trigger_time: Option<f64>,
}

impl TriggerSourceState {
    /// Empty state with a fixed capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            last_trigger_time: None,
        }
    }

    /// Append a reading, dropping the oldest when full
    pub fn push(&mut self, value: f32) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    /// Reduce the last `window` readings.
    ///
    /// Until the buffer holds a full window the latest reading is used on
    /// its own, so a loud warm-up reading cannot linger.
    pub fn reduce(&self, window: usize, reduction: Reduction) -> f32 {
        let window = window.max(1);
        let Some(&latest) = self.buffer.back() else {
            return 0.0;
        };
        if self.buffer.len() < window {
            return latest;
        }
        let recent = self.buffer.iter().skip(self.buffer.len() - window).copied();
        match reduction {
            Reduction::Average => recent.sum::<f32>() / window as f32,
            Reduction::Peak => recent.fold(f32::MIN, f32::max),
        }
    }

    /// Buffered readings
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True before the first reading
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.last_trigger_time = None;
    }
}

/// Outcome of feeding one reading to a source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerReading {
    /// Reduced level reached the threshold
    pub triggered: bool,
    /// Linear ramp from threshold to max, in [0,1]
    pub intensity: f32,
    /// Reduced level (window mean or peak)
    pub level: f32,
}

/// Sound to play for a trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundEvent {
    /// Sound id, e.g. `"kick"`
    pub sound_id: String,
    /// Playback volume
    pub volume: f32,
    /// Strike intensity
    pub intensity: f32,
    /// Source that triggered
    pub source: TriggerSource,
    /// Seconds
    pub timestamp: f64,
}

/// Raw readings available in one processing step
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorReadings {
    /// Foot acceleration in g
    pub foot_g: Option<f32>,
    /// Normalized hand velocity
    pub hand_velocity: Option<f32>,
    /// Normalized microphone amplitude
    pub mic_amplitude: Option<f32>,
}

/// Per-source result of a unified processing step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    /// Trigger decision and intensity
    #[serde(flatten)]
    pub reading: TriggerReading,
    /// Raw input value
    pub raw: f32,
    /// Triggered, but inside the debounce window so no sound was emitted
    pub debounced: bool,
    /// Advisory latency compensation (hand only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compensation_ms: Option<f32>,
    /// Peak of the raw input (mic only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak: Option<f32>,
}

/// Result of one unified processing step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedResult {
    /// Expected round-trip latency
    pub latency_budget_ms: f32,
    /// Foot result, if a foot reading was supplied
    pub foot: Option<SourceResult>,
    /// Hand result, if a hand reading was supplied
    pub hand: Option<SourceResult>,
    /// Mic result, if a mic reading was supplied
    pub mic: Option<SourceResult>,
    /// Sounds to play
    pub sounds: Vec<SoundEvent>,
    /// Seconds
    pub timestamp: f64,
}

/// Snapshot of a source for statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceStatistics {
    /// Configured threshold
    pub threshold: f32,
    /// Buffered readings
    pub buffered: usize,
    /// Buffer capacity
    pub capacity: usize,
}

/// Snapshot of the whole system
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerStatistics {
    /// Total latency of the configured budget
    pub total_latency_ms: f32,
    /// Volume curve
    pub volume: VolumeCurve,
    /// Foot source
    pub foot: SourceStatistics,
    /// Hand source
    pub hand: SourceStatistics,
    /// Mic source
    pub mic: SourceStatistics,
}

/// Trigger system for foot, hand and microphone readings
#[derive(Debug, Clone)]
pub struct UnifiedTriggerSystem {
    config: UnifiedConfig,
    foot: TriggerSourceState,
    hand: TriggerSourceState,
    mic: TriggerSourceState,
}

impl Default for UnifiedTriggerSystem {
    fn default() -> Self {
        Self::new(UnifiedConfig::default())
    }
}

impl UnifiedTriggerSystem {
    /// Create a trigger system
    pub fn new(config: UnifiedConfig) -> Self {
        Self {
            foot: TriggerSourceState::new(config.foot.buffer_capacity),
            hand: TriggerSourceState::new(config.hand.buffer_capacity),
            mic: TriggerSourceState::new(config.mic.buffer_capacity),
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &UnifiedConfig {
        &self.config
    }

    /// State of one source
    pub fn state(&self, source: TriggerSource) -> &TriggerSourceState {
        match source {
            TriggerSource::Foot => &self.foot,
            TriggerSource::Hand => &self.hand,
            TriggerSource::Mic => &self.mic,
        }
    }

    fn state_mut(&mut self, source: TriggerSource) -> &mut TriggerSourceState {
        match source {
            TriggerSource::Foot => &mut self.foot,
            TriggerSource::Hand => &mut self.hand,
            TriggerSource::Mic => &mut self.mic,
        }
    }

    /// Feed one reading to a source. `threshold` overrides the configured
    /// threshold for this call only.
    pub fn trigger(
        &mut self,
        source: TriggerSource,
        value: f32,
        threshold: Option<f32>,
    ) -> TriggerReading {
        let params = *self.config.source(source);
        let threshold = threshold.unwrap_or(params.threshold);

        // Non-finite readings are treated as silence
        let value = if value.is_finite() { value } else { 0.0 };

        let state = self.state_mut(source);
        state.push(value);
        let level = state.reduce(params.window, params.reduction);

        let triggered = level >= threshold;
        let span = params.max_value - threshold;
        let intensity = if span > 0.0 && span.is_finite() {
            ((level - threshold) / span).clamp(0.0, 1.0)
        } else if triggered {
            1.0
        } else {
            0.0
        };

        trace!(
            "{} reading {:.3} -> level {:.3}, triggered={}, intensity={:.3}",
            source.name(),
            value,
            level,
            triggered,
            intensity
        );

        TriggerReading {
            triggered,
            intensity,
            level,
        }
    }

    /// Foot accelerometer reading in g
    pub fn trigger_foot(&mut self, acceleration_g: f32, threshold: Option<f32>) -> TriggerReading {
        self.trigger(TriggerSource::Foot, acceleration_g, threshold)
    }

    /// Normalized hand velocity reading
    pub fn trigger_hand(&mut self, velocity: f32, threshold: Option<f32>) -> TriggerReading {
        self.trigger(TriggerSource::Hand, velocity, threshold)
    }

    /// Normalized microphone amplitude reading
    pub fn trigger_mic(&mut self, amplitude: f32, threshold: Option<f32>) -> TriggerReading {
        self.trigger(TriggerSource::Mic, amplitude, threshold)
    }

    /// Total of the configured latency budget
    pub fn latency_budget(&self) -> f32 {
        self.config.latency.total_ms()
    }

    /// Volume for an intensity using the configured curve
    pub fn dynamic_volume(&self, intensity: f32) -> f32 {
        self.config.volume.apply(intensity)
    }

    /// Advisory compensation using the configured pose latency
    pub fn latency_compensation(&self, hand_velocity: f32) -> f32 {
        latency_compensation(self.config.latency.pose_ms, hand_velocity)
    }

    /// Sound event for a trigger, or `None` when not triggered
    pub fn sound_for_trigger(
        &self,
        source: TriggerSource,
        triggered: bool,
        intensity: f32,
        timestamp: f64,
    ) -> Option<SoundEvent> {
        if !triggered {
            return None;
        }
        Some(SoundEvent {
            sound_id: self.config.sounds.sound_for(source).to_string(),
            volume: self.dynamic_volume(intensity),
            intensity,
            source,
            timestamp,
        })
    }

    /// Process whichever readings are present. Absent readings are skipped.
    pub fn process_unified(&mut self, readings: SensorReadings, now: f64) -> UnifiedResult {
        let mut result = UnifiedResult {
            latency_budget_ms: self.latency_budget(),
            foot: None,
            hand: None,
            mic: None,
            sounds: Vec::new(),
            timestamp: now,
        };

        if let Some(acceleration) = readings.foot_g {
            let reading = self.trigger_foot(acceleration, None);
            let debounced = self.emit(TriggerSource::Foot, reading, now, &mut result.sounds);
            result.foot = Some(SourceResult {
                reading,
                raw: acceleration,
                debounced,
                compensation_ms: None,
                peak: None,
            });
        }

        if let Some(velocity) = readings.hand_velocity {
            let reading = self.trigger_hand(velocity, None);
            let debounced = self.emit(TriggerSource::Hand, reading, now, &mut result.sounds);
            result.hand = Some(SourceResult {
                reading,
                raw: velocity,
                debounced,
                compensation_ms: Some(self.latency_compensation(velocity)),
                peak: None,
            });
        }

        if let Some(amplitude) = readings.mic_amplitude {
            let reading = self.trigger_mic(amplitude, None);
            let debounced = self.emit(TriggerSource::Mic, reading, now, &mut result.sounds);
            result.mic = Some(SourceResult {
                reading,
                raw: amplitude,
                debounced,
                compensation_ms: None,
                peak: Some(peak(&[amplitude])),
            });
        }

        result
    }

    /// Push a sound event unless debounced. Returns true when debounced.
    fn emit(
        &mut self,
        source: TriggerSource,
        reading: TriggerReading,
        now: f64,
        sounds: &mut Vec<SoundEvent>,
    ) -> bool {
        if !reading.triggered {
            return false;
        }
        let debounce = self.config.debounce_secs;
        let state = self.state_mut(source);
        if let Some(last) = state.last_trigger_time {
            if now - last < debounce {
                return true;
            }
        }
        state.last_trigger_time = Some(now);

        if let Some(event) = self.sound_for_trigger(source, true, reading.intensity, now) {
            debug!(
                "{} trigger -> {} (volume {:.2})",
                source.name(),
                event.sound_id,
                event.volume
            );
            sounds.push(event);
        }
        false
    }

    /// Thresholds, volume range and buffer fill
    pub fn statistics(&self) -> TriggerStatistics {
        let stats = |source: TriggerSource| {
            let state = self.state(source);
            SourceStatistics {
                threshold: self.config.source(source).threshold,
                buffered: state.len(),
                capacity: state.capacity(),
            }
        };
        TriggerStatistics {
            total_latency_ms: self.latency_budget(),
            volume: self.config.volume,
            foot: stats(TriggerSource::Foot),
            hand: stats(TriggerSource::Hand),
            mic: stats(TriggerSource::Mic),
        }
    }

    /// Clear all buffers and debounce times
    pub fn reset(&mut self) {
        for source in TriggerSource::ALL {
            self.state_mut(source).clear();
        }
    }
}
