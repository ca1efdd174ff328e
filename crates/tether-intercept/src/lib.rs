//! Tether Intercept - Observing host functions without changing them
//!
//! This crate provides:
//! - Method slots: replaceable host methods injected as capabilities
//! - Interceptor bindings: an original function and the wrapper around it
//! - The network completion hook (new session data)
//! - The audio playback hook, re-attached when the library is replaced
//! - A watcher polling for dynamically injected host objects

pub mod audio;
pub mod diagnostics;
pub mod network;
pub mod slot;
pub mod watcher;

pub use audio::*;
pub use diagnostics::*;
pub use network::*;
pub use slot::*;
pub use watcher::*;
