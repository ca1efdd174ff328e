//! Watching for host objects injected after startup
//!
//! A [`Watcher`] polls a [`BindingSource`] on a fixed interval and reports
//! when the object it exposes appears or is replaced. What to do about it is
//! up to the caller, so the polling policy stays independent of the hook.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default delay between two polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Something that may expose a bindable object
pub trait BindingSource: Send + Sync + 'static {
    type Target: Send + Sync + 'static;

    /// Is the library entry point present yet?
    fn is_available(&self) -> bool;

    /// The object to bind to, when available
    fn current_binding(&self) -> Option<Arc<Self::Target>>;
}

/// Result of one poll
#[derive(Debug)]
pub enum Observation<T> {
    /// Nothing to bind to yet
    Unavailable,
    /// Same object as last time
    Unchanged,
    /// A new object; `first` is true the first time anything is seen
    Changed { target: Arc<T>, first: bool },
}

type SameFn<T> = Box<dyn Fn(&Arc<T>, &Arc<T>) -> bool + Send + Sync>;

/// Polls a binding source and tracks the last object seen
pub struct Watcher<B: BindingSource> {
    source: B,
    interval: Duration,
    last: Option<Arc<B::Target>>,
    same: SameFn<B::Target>,
}

impl<B: BindingSource> Watcher<B> {
    /// Watch `source`, comparing objects by identity
    pub fn new(source: B, interval: Duration) -> Self {
        Watcher {
            source,
            interval,
            last: None,
            same: Box::new(|a, b| Arc::ptr_eq(a, b)),
        }
    }

    /// Use a different test for "same object"
    pub fn with_equality<F>(mut self, same: F) -> Self
    where
        F: Fn(&Arc<B::Target>, &Arc<B::Target>) -> bool + Send + Sync + 'static,
    {
        self.same = Box::new(same);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last(&self) -> Option<&Arc<B::Target>> {
        self.last.as_ref()
    }

    /// Check the source once
    ///
    /// The last object is kept when the source disappears, so a library that
    /// comes back with the same object is not rebound.
    pub fn poll(&mut self) -> Observation<B::Target> {
        if !self.source.is_available() {
            return Observation::Unavailable;
        }
        let Some(current) = self.source.current_binding() else {
            return Observation::Unavailable;
        };

        if let Some(last) = &self.last {
            if (self.same)(last, &current) {
                return Observation::Unchanged;
            }
        }

        let first = self.last.is_none();
        self.last = Some(Arc::clone(&current));
        Observation::Changed {
            target: current,
            first,
        }
    }

    /// Poll forever on the interval, calling `on_change` for each new object
    pub fn spawn<F>(mut self, mut on_change: F) -> JoinHandle<()>
    where
        F: FnMut(Arc<B::Target>) + Send + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Observation::Changed { target, first } = self.poll() {
                    tracing::debug!(first, "watched binding changed");
                    on_change(target);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Slot {
        current: Mutex<Option<Arc<String>>>,
    }

    impl BindingSource for Arc<Slot> {
        type Target = String;

        fn is_available(&self) -> bool {
            self.current.lock().is_some()
        }

        fn current_binding(&self) -> Option<Arc<String>> {
            self.current.lock().clone()
        }
    }

    #[test]
    fn test_poll_transitions() {
        let slot = Arc::new(Slot::default());
        let mut watcher = Watcher::new(Arc::clone(&slot), DEFAULT_POLL_INTERVAL);

        assert!(matches!(watcher.poll(), Observation::Unavailable));

        let a = Arc::new("a".to_string());
        *slot.current.lock() = Some(Arc::clone(&a));
        assert!(matches!(watcher.poll(), Observation::Changed { first: true, .. }));
        assert!(matches!(watcher.poll(), Observation::Unchanged));

        // Equal contents, different object
        *slot.current.lock() = Some(Arc::new("a".to_string()));
        assert!(matches!(watcher.poll(), Observation::Changed { first: false, .. }));
    }

    #[test]
    fn test_disappearing_source_keeps_last() {
        let slot = Arc::new(Slot::default());
        let mut watcher = Watcher::new(Arc::clone(&slot), DEFAULT_POLL_INTERVAL);
        let a = Arc::new("a".to_string());

        *slot.current.lock() = Some(Arc::clone(&a));
        watcher.poll();
        *slot.current.lock() = None;
        assert!(matches!(watcher.poll(), Observation::Unavailable));

        *slot.current.lock() = Some(Arc::clone(&a));
        assert!(matches!(watcher.poll(), Observation::Unchanged));
        assert!(Arc::ptr_eq(watcher.last().unwrap(), &a));
    }

    #[test]
    fn test_custom_equality() {
        let slot = Arc::new(Slot::default());
        let mut watcher = Watcher::new(Arc::clone(&slot), DEFAULT_POLL_INTERVAL)
            .with_equality(|a, b| a.as_str() == b.as_str());

        *slot.current.lock() = Some(Arc::new("a".to_string()));
        watcher.poll();
        *slot.current.lock() = Some(Arc::new("a".to_string()));
        assert!(matches!(watcher.poll(), Observation::Unchanged));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_watcher_reports_changes() {
        let slot = Arc::new(Slot::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let handle = Watcher::new(Arc::clone(&slot), DEFAULT_POLL_INTERVAL)
            .spawn(move |target: Arc<String>| sink.lock().push(target.to_string()));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(seen.lock().is_empty());

        *slot.current.lock() = Some(Arc::new("first".to_string()));
        tokio::time::sleep(Duration::from_millis(120)).await;
        *slot.current.lock() = Some(Arc::new("second".to_string()));
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(*seen.lock(), vec!["first".to_string(), "second".to_string()]);
        handle.abort();
    }
}
