//! Pilot vectors
//!
//! A pilot vector is the semantic light state carried by six consecutive DMX
//! slots: red, green, blue, cold white, warm white and a dimmer. The dimmer
//! slot is rescaled from 0-255 to the 0-100 range the WiZ protocol expects;
//! a dimmer of zero means the bulb is off.

use serde::{Deserialize, Serialize};

/// Semantic light state for one bulb.
///
/// The default value (all channels zero, off) matches the bridge's initial
/// `last_received` / `last_sent` assumption for a freshly loaded bulb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PilotState {
    /// Red, 0-255.
    pub r: u8,
    /// Green, 0-255.
    pub g: u8,
    /// Blue, 0-255.
    pub b: u8,
    /// Cold white, 0-255.
    pub c: u8,
    /// Warm white, 0-255.
    pub w: u8,
    /// Brightness, 0-100.
    pub dimming: u8,
    /// Power state. Derived: `dimming > 0`.
    pub state: bool,
}

impl PilotState {
    /// Extract a pilot vector from a DMX slot array.
    ///
    /// `channel` is the 1-based start channel from the bulb record; the six
    /// slots live at 0-based indices `channel-1 ..= channel+4`. Reads past
    /// the end of the frame yield 0, so a bulb patched beyond the received
    /// frame length simply stays dark.
    pub fn from_dmx_slots(data: &[u8], channel: u16) -> Self {
        let base = (channel as usize).saturating_sub(1);
        let slot = |offset: usize| data.get(base + offset).copied().unwrap_or(0);

        let dimming = scale_dimmer(slot(5));
        Self {
            r: slot(0),
            g: slot(1),
            b: slot(2),
            c: slot(3),
            w: slot(4),
            dimming,
            state: dimming > 0,
        }
    }
}

/// Rescale a raw 0-255 dimmer slot to the WiZ 0-100 dimming range.
fn scale_dimmer(raw: u8) -> u8 {
    ((raw as f32 / 255.0) * 100.0).round().clamp(0.0, 100.0) as u8
}
