//! Collaborator interfaces
//!
//! Small capabilities Tether consumes from the host page or exposes to its
//! neighbours. None of them carry protocol state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::TetherResult;

/// Locale used when no host source provides one
pub const DEFAULT_LOCALE: &str = "en";

/// Sink for one-way event notifications
pub trait EventNotifier: Send + Sync {
    /// Emit `event` carrying `value`. No acknowledgement is expected.
    fn notify(&self, event: &str, value: Value) -> TetherResult<()>;
}

impl<N: EventNotifier + ?Sized> EventNotifier for Arc<N> {
    fn notify(&self, event: &str, value: Value) -> TetherResult<()> {
        (**self).notify(event, value)
    }
}

/// A place the host exposes its UI language (page global, cookie)
pub trait LocaleSource {
    fn ui_locale(&self) -> Option<String>;
}

/// Resolve the UI locale: first non-blank source wins, in order
pub fn resolve_ui_locale(sources: &[&dyn LocaleSource]) -> String {
    sources
        .iter()
        .filter_map(|source| source.ui_locale())
        .map(|locale| locale.trim().to_string())
        .find(|locale| !locale.is_empty())
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string())
}

/// Lookup of element ids already present in the host document
pub trait ElementIdRegistry {
    fn contains(&self, id: &str) -> bool;
}

/// Generates element ids unused by the host document
#[derive(Debug)]
pub struct UniqueIdGenerator {
    counter: AtomicU64,
}

impl UniqueIdGenerator {
    pub fn new() -> Self {
        UniqueIdGenerator {
            counter: AtomicU64::new(1),
        }
    }

    /// Next `prefix<n>` id that the registry does not know about
    pub fn next(&self, prefix: &str, registry: &dyn ElementIdRegistry) -> String {
        loop {
            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            let id = format!("{prefix}{n}");
            if !registry.contains(&id) {
                return id;
            }
        }
    }
}

impl Default for UniqueIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
