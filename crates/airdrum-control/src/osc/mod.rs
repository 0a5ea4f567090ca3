//! OSC forwarding
//!
//! Every hit becomes one `/drum/<zone>` message carrying the intensity as a
//! single float, sent as a UDP datagram.

use crate::error::{ControlError, Result};
use airdrum_core::config::OscForwarding;
use airdrum_core::sink::{HitSink, SinkError};
use airdrum_core::HitEvent;
use rosc::{encoder, OscMessage, OscPacket, OscType};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use tracing::{debug, info};

/// Address prefix of hit messages
pub const ADDRESS_PREFIX: &str = "/drum/";

/// OSC address for a zone
pub fn hit_address(zone: &str) -> Result<String> {
    if zone.is_empty() || zone.chars().any(|c| c.is_whitespace() || "#*,?[]{}/".contains(c)) {
        return Err(ControlError::OscError(format!(
            "zone id '{}' is not a valid OSC address part",
            zone
        )));
    }
    Ok(format!("{}{}", ADDRESS_PREFIX, zone))
}

/// Build the message for a hit
pub fn build_hit_message(zone: &str, intensity: f32) -> Result<OscMessage> {
    Ok(OscMessage {
        addr: hit_address(zone)?,
        args: vec![OscType::Float(intensity)],
    })
}

/// Encode a message into a datagram
pub fn encode_message(msg: OscMessage) -> Result<Vec<u8>> {
    encoder::encode(&OscPacket::Message(msg)).map_err(|e| ControlError::OscError(e.to_string()))
}

/// Sends hits to one OSC target over UDP
pub struct OscForwarder {
    socket: UdpSocket,
    target: SocketAddr,
    sent: u64,
}

impl OscForwarder {
    /// Bind an ephemeral local socket and resolve the target
    pub fn new(target: impl ToSocketAddrs) -> Result<Self> {
        let target = target
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| ControlError::OscError("target address did not resolve".to_string()))?;
        let bind_addr = if target.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr)?;
        info!("OSC forwarding to {}", target);
        Ok(Self {
            socket,
            target,
            sent: 0,
        })
    }

    /// Forwarder for the configured host and port
    pub fn from_config(config: &OscForwarding) -> Result<Self> {
        Self::new((config.host.as_str(), config.port))
    }

    /// Resolved target
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Messages sent so far
    pub fn sent_count(&self) -> u64 {
        self.sent
    }

    /// Send one hit
    pub fn send(&mut self, zone: &str, intensity: f32) -> Result<()> {
        let data = encode_message(build_hit_message(zone, intensity)?)?;
        self.socket.send_to(&data, self.target)?;
        self.sent += 1;
        debug!("OSC {}{} {:.2}", ADDRESS_PREFIX, zone, intensity);
        Ok(())
    }
}

impl HitSink for OscForwarder {
    fn name(&self) -> &str {
        "osc"
    }

    fn play(&mut self, event: &HitEvent) -> std::result::Result<(), SinkError> {
        self.send(&event.zone_id, event.intensity)?;
        Ok(())
    }
}
