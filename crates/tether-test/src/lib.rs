//! Tether Test Harness - Simulated host and end-to-end validation
//!
//! This crate provides:
//! - Simulated host objects (network requests, sounds, the audio library)
//! - A scripted peer answering action requests on the host window
//! - End-to-end integration testing

pub mod host;
pub mod integration;
pub mod peer;

pub use host::*;
pub use integration::*;
pub use peer::*;
