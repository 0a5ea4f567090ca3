//! Airdrum Control - Hit Forwarding
//!
//! Outbound sinks that forward detected drum hits to other software:
//! - **MIDI**: General MIDI percussion notes on channel 10
//! - **OSC**: `/drum/<zone>` messages over UDP
//!
//! Both implement [`airdrum_core::HitSink`], so they plug into the same
//! fire-and-forget dispatch as the local sound sink.
//!
//! ## Feature Flags
//!
//! - `midi`: Enable MIDI port output (requires `midir`)
//! - `osc`: Enable OSC output (requires `rosc`)

#![warn(missing_docs)]

/// Error types
pub mod error;

/// MIDI note mapping and output
pub mod midi;

#[cfg(feature = "osc")]
/// OSC output
pub mod osc;

// Re-exports
pub use error::{ControlError, Result};
pub use midi::{DrumNoteMap, MidiForwarder, MidiMessage, MidiPort, NullPort};

#[cfg(feature = "midi")]
pub use midi::MidirPort;

#[cfg(feature = "osc")]
pub use osc::OscForwarder;
