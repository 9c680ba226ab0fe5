//! WizFlow Control - Art-Net to WiZ bridging
//!
//! This crate turns live DMX frames into WiZ bulb control traffic:
//! - **Art-Net**: ArtDmx decoding on UDP 6454
//! - **WiZ**: setPilot/getPilot codec, shared control socket, LAN discovery
//! - **Bridge**: change detection, per-bulb queues with drop-oldest
//!   coalescing pumps, off-transition verification
//! - **Store**: the bulb record interface the bridge reloads from
//! - **Supervisor**: child-process restart loop with exponential backoff
//!
//! ## Modules
//!
//! - [`artnet`] - Art-Net packet decoding
//! - [`wiz`] - WiZ protocol, control socket and discovery
//! - [`bridge`] - the bridge engine
//! - [`store`] - bulb record store
//! - [`supervisor`] - bridge process supervision
//! - [`error`] - error types

#![warn(missing_docs)]

/// Art-Net packet decoding
pub mod artnet;
/// The bridge engine
pub mod bridge;
/// Error types
pub mod error;
/// Bulb record store
pub mod store;
/// Bridge process supervision
pub mod supervisor;
/// WiZ protocol, control socket and discovery
pub mod wiz;

pub use bridge::BridgeEngine;
pub use error::{ControlError, Result};
pub use store::{BulbStore, JsonFileStore};
pub use supervisor::{Supervisor, SupervisorStatus};
pub use wiz::{discover, DiscoveredBulb, WizClient};
