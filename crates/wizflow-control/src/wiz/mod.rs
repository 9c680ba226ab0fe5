//! WiZ bulb protocol
//!
//! WiZ bulbs speak JSON over UDP on port 38899, one request or reply per
//! datagram, no framing. The bridge uses two methods:
//! - `setPilot` writes the light state (fire-and-forget),
//! - `getPilot` reads it back (used for off-transition verification and for
//!   LAN discovery via directed broadcast).

pub mod client;
pub mod discovery;
pub mod protocol;

pub use client::WizClient;
pub use discovery::{discover, discover_at, DiscoveredBulb};
pub use protocol::{parse_get_pilot_reply, PilotResult, SetPilotParams};
