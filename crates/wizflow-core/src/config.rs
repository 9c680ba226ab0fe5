//! Bridge configuration
//!
//! All protocol constants and bind addresses live here so tests can run the
//! whole stack against loopback sockets on ephemeral ports. The defaults
//! match a production deployment: Art-Net on 6454, WiZ on 38899, universe 0.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The UDP port WiZ bulbs listen on.
pub const WIZ_PORT: u16 = 38899;

/// The UDP port Art-Net consoles transmit to.
pub const ARTNET_PORT: u16 = 6454;

/// Runtime configuration for the bridge engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Local bind address for the Art-Net receive socket.
    pub artnet_bind: SocketAddr,
    /// Local bind address for the shared WiZ control socket.
    pub wiz_bind: SocketAddr,
    /// Destination port for bulb control datagrams.
    pub wiz_port: u16,
    /// The single Art-Net universe this bridge listens to.
    pub universe: u16,
    /// Per-bulb queue capacity; overflow evicts the oldest entry.
    pub queue_capacity: usize,
    /// Settle delay between an off-transition send and its verification.
    pub post_off_delay_ms: u64,
    /// How long to wait for a getPilot reply during verification.
    pub verify_timeout_ms: u64,
    /// How many times a failed off-transition is re-queued.
    pub max_off_retries: u8,
    /// Interval between bulb store reloads.
    pub reload_interval_secs: u64,
    /// Interval between per-bulb stats log lines.
    pub stats_interval_secs: u64,
    /// How long a discovery scan collects replies.
    pub discovery_window_ms: u64,
    /// Path of the JSON bulb store.
    pub store_path: PathBuf,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            artnet_bind: SocketAddr::from(([0, 0, 0, 0], ARTNET_PORT)),
            wiz_bind: SocketAddr::from(([0, 0, 0, 0], WIZ_PORT)),
            wiz_port: WIZ_PORT,
            universe: 0,
            queue_capacity: 10,
            post_off_delay_ms: 200,
            verify_timeout_ms: 1000,
            max_off_retries: 3,
            reload_interval_secs: 60,
            stats_interval_secs: 30,
            discovery_window_ms: 3000,
            store_path: PathBuf::from("bulbs.json"),
        }
    }
}

impl BridgeConfig {
    /// Settle delay before verifying an off-transition.
    pub fn post_off_delay(&self) -> Duration {
        Duration::from_millis(self.post_off_delay_ms)
    }

    /// Reply window for one verification attempt.
    pub fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }

    /// Bulb store reload interval.
    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs)
    }

    /// Stats log interval.
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }

    /// Discovery collection window.
    pub fn discovery_window(&self) -> Duration {
        Duration::from_millis(self.discovery_window_ms)
    }
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Bridge engine settings.
    pub bridge: BridgeConfig,
    /// Logging settings.
    pub log: crate::logging::LogConfig,
}
