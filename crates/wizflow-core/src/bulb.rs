//! Bulb records
//!
//! A bulb record ties a physical WiZ bulb (identified by its MAC address) to
//! its current IP address and a starting DMX slot. Records are supplied by
//! the bulb store and treated as read-only by the bridge.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Number of consecutive DMX slots a bulb occupies (R, G, B, C, W, Dimmer).
pub const SLOTS_PER_BULB: usize = 6;

/// A configured bulb.
///
/// `channel` is the 1-based DMX start channel as entered by the operator.
/// The bulb reads the six slots at 0-based data indices
/// `channel-1 ..= channel+4`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulbRecord {
    /// Stable identity, canonical form: lowercase hex with colon separators.
    pub mac: String,
    /// Current IPv4 address. May change between store reloads.
    pub ip: Ipv4Addr,
    /// Human label, used in logs.
    #[serde(default)]
    pub name: String,
    /// Free-form tag (e.g. the bulb model). Not interpreted by the bridge.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// 1-based DMX start channel.
    pub channel: u16,
}

impl BulbRecord {
    /// First 0-based index into the DMX slot array this bulb reads.
    pub fn dmx_base(&self) -> usize {
        (self.channel as usize).saturating_sub(1)
    }

    /// Log label: the operator-assigned name, falling back to the MAC.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.mac
        } else {
            &self.name
        }
    }

    /// Validate the record, canonicalizing the MAC in place.
    pub fn validate(&mut self) -> Result<(), ModelError> {
        self.mac = normalize_mac(&self.mac).ok_or_else(|| ModelError::InvalidMac(self.mac.clone()))?;
        if self.channel < 1 || self.channel > 512 {
            return Err(ModelError::InvalidChannel(self.channel));
        }
        Ok(())
    }
}

/// Canonicalize a MAC address to lowercase colon-separated hex.
///
/// Accepts 12 hex digits with optional `:`, `-` or `.` separators, as seen
/// in discovery replies (`"a8bb50d1e201"`) and operator input
/// (`"A8-BB-50-D1-E2-01"`). Returns `None` for anything else.
pub fn normalize_mac(input: &str) -> Option<String> {
    let digits: String = input
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect();
    if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let lower = digits.to_ascii_lowercase();
    let mut out = String::with_capacity(17);
    for (i, chunk) in lower.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(':');
        }
        out.push(chunk[0] as char);
        out.push(chunk[1] as char);
    }
    Some(out)
}
