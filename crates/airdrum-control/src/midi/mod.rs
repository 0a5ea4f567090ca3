//! MIDI forwarding
//!
//! Hits are sent as a note-on immediately followed by a note-off on the
//! General MIDI percussion channel. Each zone is debounced separately.

#[cfg(feature = "midi")]
mod output;

#[cfg(feature = "midi")]
pub use output::*;

use crate::error::{ControlError, Result};
use airdrum_core::config::{MidiForwarding, GM_DRUM_CHANNEL};
use airdrum_core::sink::{HitSink, SinkError};
use airdrum_core::{CooldownTable, HitEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Default minimum seconds between two notes for one zone
pub const DEFAULT_NOTE_DEBOUNCE_SECS: f64 = 0.05;

/// MIDI message types sent for hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MidiMessage {
    /// Note on
    NoteOn {
        /// Zero-based channel
        channel: u8,
        /// Note number
        note: u8,
        /// Velocity 1-127
        velocity: u8,
    },
    /// Note off
    NoteOff {
        /// Zero-based channel
        channel: u8,
        /// Note number
        note: u8,
    },
}

impl MidiMessage {
    /// Parse a note message from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 3 {
            return None;
        }

        let status = bytes[0];
        let channel = status & 0x0F;
        let note = bytes[1];

        match status & 0xF0 {
            // Note On with velocity 0 is treated as Note Off
            0x90 if bytes[2] == 0 => Some(MidiMessage::NoteOff { channel, note }),
            0x90 => Some(MidiMessage::NoteOn {
                channel,
                note,
                velocity: bytes[2],
            }),
            0x80 => Some(MidiMessage::NoteOff { channel, note }),
            _ => None,
        }
    }

    /// Convert to raw MIDI bytes
    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOff { channel, note } => [0x80 | (channel & 0x0F), note & 0x7F, 0],
        }
    }
}

/// Intensity in [0,1] to a MIDI velocity; never 0 so the note-on stays a note-on
pub fn intensity_to_velocity(intensity: f32) -> u8 {
    let intensity = if intensity.is_nan() {
        0.0
    } else {
        intensity.clamp(0.0, 1.0)
    };
    ((intensity * 127.0).floor() as u8).max(1)
}

/// Zone id to note number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrumNoteMap {
    notes: HashMap<String, u8>,
}

impl Default for DrumNoteMap {
    fn default() -> Self {
        Self::general_midi()
    }
}

impl DrumNoteMap {
    /// Empty map
    pub fn empty() -> Self {
        Self {
            notes: HashMap::new(),
        }
    }

    /// General MIDI percussion notes for the standard kit pieces
    pub fn general_midi() -> Self {
        Self::empty()
            .with_note("kick", 36)
            .with_note("snare", 38)
            .with_note("hihat", 42)
            .with_note("tom1", 47)
            .with_note("tom2", 48)
            .with_note("crash", 49)
    }

    /// Add or replace a mapping
    pub fn with_note(mut self, zone: impl Into<String>, note: u8) -> Self {
        self.notes.insert(zone.into(), note & 0x7F);
        self
    }

    /// Note for a zone
    pub fn note_for(&self, zone: &str) -> Option<u8> {
        self.notes.get(zone).copied()
    }
}

/// Raw MIDI output
pub trait MidiPort: Send {
    /// Send one message
    fn send(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Discards everything; used when no port is available
#[derive(Debug, Default)]
pub struct NullPort;

impl MidiPort for NullPort {
    fn send(&mut self, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// Forwards hits to a MIDI port
pub struct MidiForwarder<P: MidiPort> {
    port: P,
    notes: DrumNoteMap,
    channel: u8,
    debounce: CooldownTable,
    sent: u64,
}

impl<P: MidiPort> MidiForwarder<P> {
    /// Forwarder on the GM drum channel with the GM note map
    pub fn new(port: P) -> Self {
        Self {
            port,
            notes: DrumNoteMap::general_midi(),
            channel: GM_DRUM_CHANNEL,
            debounce: CooldownTable::new(DEFAULT_NOTE_DEBOUNCE_SECS),
            sent: 0,
        }
    }

    /// Forwarder configured from the engine settings
    pub fn from_config(port: P, config: &MidiForwarding) -> Result<Self> {
        Self::new(port).with_channel(config.channel)
    }

    /// Use another zero-based channel
    pub fn with_channel(mut self, channel: u8) -> Result<Self> {
        if channel > 15 {
            return Err(ControlError::InvalidParameter(format!(
                "MIDI channel {} out of range 0-15",
                channel
            )));
        }
        self.channel = channel;
        Ok(self)
    }

    /// Use another note map
    pub fn with_notes(mut self, notes: DrumNoteMap) -> Self {
        self.notes = notes;
        self
    }

    /// Use another per-zone debounce window
    pub fn with_debounce(mut self, secs: f64) -> Self {
        self.debounce = CooldownTable::new(secs);
        self
    }

    /// Notes sent so far
    pub fn sent_count(&self) -> u64 {
        self.sent
    }

    /// Underlying port
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Send a hit. Returns `Ok(false)` when the zone is still debounced.
    pub fn forward(&mut self, zone: &str, intensity: f32, now: f64) -> Result<bool> {
        let note = self
            .notes
            .note_for(zone)
            .ok_or_else(|| ControlError::UnknownZone(zone.to_string()))?;

        if !self.debounce.try_fire(zone, now) {
            trace!("MIDI note for {} debounced", zone);
            return Ok(false);
        }

        let velocity = intensity_to_velocity(intensity);
        let on = MidiMessage::NoteOn {
            channel: self.channel,
            note,
            velocity,
        };
        let off = MidiMessage::NoteOff {
            channel: self.channel,
            note,
        };
        self.port.send(&on.to_bytes())?;
        self.port.send(&off.to_bytes())?;
        self.sent += 1;

        debug!("MIDI {} -> note {} vel {}", zone, note, velocity);
        Ok(true)
    }
}

impl<P: MidiPort> HitSink for MidiForwarder<P> {
    fn name(&self) -> &str {
        "midi"
    }

    fn play(&mut self, event: &HitEvent) -> std::result::Result<(), SinkError> {
        self.forward(&event.zone_id, event.intensity, event.timestamp)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CapturePort {
        messages: Vec<Vec<u8>>,
    }

    impl MidiPort for CapturePort {
        fn send(&mut self, bytes: &[u8]) -> Result<()> {
            self.messages.push(bytes.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_note_on_then_off() {
        let mut forwarder = MidiForwarder::new(CapturePort::default());
        assert!(forwarder.forward("snare", 1.0, 0.0).unwrap());
        let sent = &forwarder.port().messages;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], vec![0x99, 38, 127]);
        assert_eq!(sent[1], vec![0x89, 38, 0]);
    }

    #[test]
    fn test_velocity_mapping() {
        assert_eq!(intensity_to_velocity(1.0), 127);
        assert_eq!(intensity_to_velocity(0.5), 63);
        assert_eq!(intensity_to_velocity(0.0), 1);
        assert_eq!(intensity_to_velocity(f32::NAN), 1);
        assert_eq!(intensity_to_velocity(3.0), 127);
    }

    #[test]
    fn test_debounce_per_zone() {
        let mut forwarder = MidiForwarder::new(CapturePort::default());
        assert!(forwarder.forward("kick", 0.8, 1.0).unwrap());
        assert!(!forwarder.forward("kick", 0.8, 1.02).unwrap());
        assert!(forwarder.forward("hihat", 0.8, 1.02).unwrap());
        assert!(forwarder.forward("kick", 0.8, 1.06).unwrap());
        assert_eq!(forwarder.sent_count(), 3);
    }

    #[test]
    fn test_unknown_zone_rejected() {
        let mut forwarder = MidiForwarder::new(NullPort);
        assert!(matches!(
            forwarder.forward("cowbell", 1.0, 0.0),
            Err(ControlError::UnknownZone(z)) if z == "cowbell"
        ));
        let mut forwarder = forwarder.with_notes(DrumNoteMap::general_midi().with_note("cowbell", 56));
        assert!(forwarder.forward("cowbell", 1.0, 0.0).unwrap());
    }

    #[test]
    fn test_channel_range() {
        assert!(MidiForwarder::new(NullPort).with_channel(16).is_err());
        let config = MidiForwarding {
            channel: 3,
            ..Default::default()
        };
        assert!(MidiForwarder::from_config(NullPort, &config).is_ok());
    }

    #[test]
    fn test_message_parse() {
        let on = MidiMessage::NoteOn {
            channel: 9,
            note: 36,
            velocity: 100,
        };
        assert_eq!(MidiMessage::from_bytes(&on.to_bytes()), Some(on));
        assert_eq!(
            MidiMessage::from_bytes(&[0x99, 36, 0]),
            Some(MidiMessage::NoteOff { channel: 9, note: 36 })
        );
        assert_eq!(MidiMessage::from_bytes(&[0xB0, 1, 2]), None);
    }
}
