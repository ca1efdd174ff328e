//! Tether Bridge - Cross-context messaging
//!
//! This crate provides:
//! - The host window message channel (listeners, ordered async dispatch)
//! - The request bridge: action requests correlated with peer results
//! - One-way event notifications

pub mod bridge;
pub mod window;

pub use bridge::*;
pub use window::*;
