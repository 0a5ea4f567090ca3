//! Error types for hit forwarding
use thiserror::Error;

/// Forwarding errors
#[derive(Error, Debug)]
pub enum ControlError {
    /// Generic MIDI error
    #[error("MIDI error: {0}")]
    MidiError(String),

    /// MIDI initialization error
    #[error("MIDI init error: {0}")]
    #[cfg(feature = "midi")]
    MidiInitError(#[from] midir::InitError),

    /// MIDI transmission error
    #[error("MIDI send error: {0}")]
    #[cfg(feature = "midi")]
    MidiSendError(#[from] midir::SendError),

    /// OSC error
    #[error("OSC error: {0}")]
    OscError(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Zone has no mapping for this output
    #[error("Unknown zone: {0}")]
    UnknownZone(String),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for forwarding operations
pub type Result<T> = std::result::Result<T, ControlError>;
