//! Tether Runtime - The long-lived service object
//!
//! This crate wires everything together:
//! - Configuration (defaults and environment overrides)
//! - Logging setup
//! - The runtime: owns the request bridge, installs the network hook and
//!   keeps the audio library watcher running

pub mod config;
pub mod logging;
pub mod runtime;

pub use config::*;
pub use logging::*;
pub use runtime::*;
