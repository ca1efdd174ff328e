//! Tether Core - Fundamental types shared by every Tether crate
//!
//! This crate defines:
//! - The message envelope exchanged over the host window channel
//! - Event tags emitted by the interceptors
//! - The error type and result alias
//! - Collaborator interfaces (event notifier, locale sources, element ids)

pub mod collab;
pub mod error;
pub mod message;

pub use collab::*;
pub use error::*;
pub use message::*;
