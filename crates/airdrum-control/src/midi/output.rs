//! MIDI output through midir

use super::MidiPort;
use crate::error::{ControlError, Result};
use midir::{MidiOutput, MidiOutputConnection};
use tracing::info;

const CLIENT_NAME: &str = "airdrum";

/// Names of the available MIDI output ports
pub fn list_output_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new(CLIENT_NAME)?;
    Ok(midi_out
        .ports()
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect())
}

/// A connected midir output port
pub struct MidirPort {
    conn: MidiOutputConnection,
    name: String,
}

impl MidirPort {
    /// Connect to the first port whose name contains `hint` (case-insensitive),
    /// or to the first port when no hint is given.
    pub fn open(hint: Option<&str>) -> Result<Self> {
        let midi_out = MidiOutput::new(CLIENT_NAME)?;
        let ports = midi_out.ports();
        if ports.is_empty() {
            return Err(ControlError::MidiError(
                "no MIDI output ports available".to_string(),
            ));
        }

        let index = match hint {
            None => 0,
            Some(hint) => {
                let hint = hint.to_lowercase();
                ports
                    .iter()
                    .position(|p| {
                        midi_out
                            .port_name(p)
                            .map(|n| n.to_lowercase().contains(&hint))
                            .unwrap_or(false)
                    })
                    .ok_or_else(|| {
                        ControlError::MidiError(format!("no MIDI output port matches '{}'", hint))
                    })?
            }
        };

        let port = &ports[index];
        let name = midi_out
            .port_name(port)
            .unwrap_or_else(|_| "Unknown".to_string());
        let conn = midi_out
            .connect(port, "airdrum-out")
            .map_err(|e| ControlError::MidiError(format!("connect to '{}': {}", name, e)))?;

        info!("Opened MIDI output port: {}", name);
        Ok(Self { conn, name })
    }

    /// Port name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl MidiPort for MidirPort {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.conn.send(bytes)?;
        Ok(())
    }
}
