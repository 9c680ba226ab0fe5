//! WizFlow Core - Domain Model and Data Structures
//!
//! This crate contains the core domain model for WizFlow, including:
//! - Bulb records (identity, addressing, DMX channel assignment)
//! - Pilot vectors (the semantic light state derived from raw DMX slots)
//! - Bridge and logging configuration

#![warn(missing_docs)]

use thiserror::Error;

pub mod bulb;
pub mod config;
pub mod logging;
pub mod pilot;

pub use bulb::{normalize_mac, BulbRecord};
pub use config::{AppConfig, BridgeConfig};
pub use logging::LogConfig;
pub use pilot::PilotState;

/// Errors produced while validating domain model values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The MAC address could not be parsed into canonical form.
    #[error("invalid MAC address: {0}")]
    InvalidMac(String),

    /// The DMX start channel is outside 1..=512.
    #[error("invalid DMX channel {0} (must be 1-512)")]
    InvalidChannel(u16),
}
