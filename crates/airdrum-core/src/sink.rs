//! Sound sink seam
//!
//! Sinks receive [`HitEvent`]s after detection. Delivery is fire-and-forget:
//! a failing sink never affects detection state.

use crate::pipeline::HitEvent;
use std::error::Error;
use tracing::info;

/// Error type returned by sinks
pub type SinkError = Box<dyn Error + Send + Sync>;

/// Consumer of hit events (synth, MIDI port, OSC target, ...)
pub trait HitSink: Send {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Play or forward one hit
    fn play(&mut self, event: &HitEvent) -> Result<(), SinkError>;
}

/// Logs every hit at info level
#[derive(Debug, Default)]
pub struct LogSink;

impl HitSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn play(&mut self, event: &HitEvent) -> Result<(), SinkError> {
        info!(
            "{:>8.3}s  {:<6} {:.2} ({})",
            event.timestamp, event.zone_id, event.intensity, event.source_joint
        );
        Ok(())
    }
}

/// Keeps every hit in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Vec<HitEvent>,
}

impl RecordingSink {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events in delivery order
    pub fn events(&self) -> &[HitEvent] {
        &self.events
    }

    /// Take the recorded events
    pub fn drain(&mut self) -> Vec<HitEvent> {
        std::mem::take(&mut self.events)
    }
}

impl HitSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn play(&mut self, event: &HitEvent) -> Result<(), SinkError> {
        self.events.push(event.clone());
        Ok(())
    }
}
