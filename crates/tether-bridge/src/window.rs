//! Host window message channel
//!
//! Every script running in the page shares this channel. Messages are
//! queued on post and dispatched to listeners later, in FIFO order, by a
//! background loop; a message posted from inside a listener is therefore
//! never delivered re-entrantly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use tether_core::{TetherError, TetherResult};

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a browsing context posting on the channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

impl WindowId {
    /// Allocate a process-unique id
    pub fn next() -> Self {
        WindowId(NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle returned by [`HostWindow::add_listener`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What a listener wants after handling an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerControl {
    Keep,
    Detach,
}

/// A message being dispatched
#[derive(Debug)]
pub struct MessageEvent {
    source: WindowId,
    data: Value,
    propagation_stopped: bool,
}

impl MessageEvent {
    fn new(source: WindowId, data: Value) -> Self {
        MessageEvent {
            source,
            data,
            propagation_stopped: false,
        }
    }

    /// The context that posted the message
    pub fn source(&self) -> WindowId {
        self.source
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Mark the event as consumed. Listeners on the same window still run.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Message listener
pub type Listener = Arc<dyn Fn(&mut MessageEvent) -> ListenerControl + Send + Sync>;

/// Channel counters
#[derive(Clone, Debug, Default)]
pub struct WindowStats {
    pub messages_posted: u64,
    pub messages_dispatched: u64,
    pub deliveries: u64,
    pub propagation_stopped: u64,
}

enum Queued {
    Message { source: WindowId, data: Value },
    Barrier(oneshot::Sender<()>),
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: AtomicU64,
    entries: Mutex<Vec<(ListenerId, Listener)>>,
}

impl ListenerRegistry {
    fn add(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push((id, listener));
        id
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    fn contains(&self, id: ListenerId) -> bool {
        self.entries.lock().iter().any(|(entry, _)| *entry == id)
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Deliver to the listeners registered when dispatch starts, skipping
    /// any removed meanwhile. No lock is held while a listener runs.
    fn dispatch(&self, event: &mut MessageEvent) -> u64 {
        let snapshot: Vec<(ListenerId, Listener)> = self.entries.lock().clone();
        let mut delivered = 0;

        for (id, listener) in snapshot {
            if !self.contains(id) {
                continue;
            }
            delivered += 1;
            if listener(event) == ListenerControl::Detach {
                self.remove(id);
            }
        }

        delivered
    }
}

/// The hosting window's message channel
pub struct HostWindow {
    id: WindowId,
    queue: mpsc::UnboundedSender<Queued>,
    listeners: Arc<ListenerRegistry>,
    stats: Arc<Mutex<WindowStats>>,
}

impl HostWindow {
    /// Open a window and start its dispatch loop
    ///
    /// Must be called from within a Tokio runtime. The loop stops once the
    /// window is dropped.
    pub fn open() -> Arc<Self> {
        let (queue, rx) = mpsc::unbounded_channel();
        let listeners = Arc::new(ListenerRegistry::default());
        let stats = Arc::new(Mutex::new(WindowStats::default()));

        start_dispatch_loop(Arc::clone(&listeners), Arc::clone(&stats), rx);

        Arc::new(HostWindow {
            id: WindowId::next(),
            queue,
            listeners,
            stats,
        })
    }

    /// This window's identity, the `source` of everything it posts
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Post a message from this window to every listener
    pub fn post_message(&self, data: Value) -> TetherResult<()> {
        self.deliver_from(self.id, data)
    }

    /// Queue a message that originates from another context
    pub fn deliver_from(&self, source: WindowId, data: Value) -> TetherResult<()> {
        self.queue
            .send(Queued::Message { source, data })
            .map_err(|_| TetherError::ChannelClosed)?;
        self.stats.lock().messages_posted += 1;
        Ok(())
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&mut MessageEvent) -> ListenerControl + Send + Sync + 'static,
    {
        self.listeners.add(Arc::new(listener))
    }

    /// Remove a listener; returns false if it was already gone
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Wait until every message queued so far has been dispatched
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.queue.send(Queued::Barrier(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    pub fn stats(&self) -> WindowStats {
        self.stats.lock().clone()
    }
}

/// Start the background dispatch loop
fn start_dispatch_loop(
    listeners: Arc<ListenerRegistry>,
    stats: Arc<Mutex<WindowStats>>,
    mut rx: mpsc::UnboundedReceiver<Queued>,
) {
    tokio::spawn(async move {
        while let Some(queued) = rx.recv().await {
            match queued {
                Queued::Message { source, data } => {
                    let mut event = MessageEvent::new(source, data);
                    let delivered = listeners.dispatch(&mut event);

                    let mut stats = stats.lock();
                    stats.messages_dispatched += 1;
                    stats.deliveries += delivered;
                    if event.is_propagation_stopped() {
                        stats.propagation_stopped += 1;
                    }
                }
                Queued::Barrier(done) => {
                    let _ = done.send(());
                }
            }
        }
        tracing::debug!("host window closed, dispatch loop stopped");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder(window: &HostWindow) -> Arc<Mutex<Vec<(WindowId, Value)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        window.add_listener(move |event| {
            sink.lock().push((event.source(), event.data().clone()));
            ListenerControl::Keep
        });
        seen
    }

    #[tokio::test]
    async fn test_messages_dispatched_in_order() {
        let window = HostWindow::open();
        let seen = recorder(&window);

        for i in 0..5 {
            window.post_message(json!(i)).unwrap();
        }
        window.flush().await;

        let values: Vec<Value> = seen.lock().iter().map(|(_, v)| v.clone()).collect();
        assert_eq!(values, vec![json!(0), json!(1), json!(2), json!(3), json!(4)]);
        assert_eq!(window.stats().messages_dispatched, 5);
    }

    #[tokio::test]
    async fn test_source_identity() {
        let window = HostWindow::open();
        let seen = recorder(&window);
        let frame = WindowId::next();

        window.post_message(json!("own")).unwrap();
        window.deliver_from(frame, json!("frame")).unwrap();
        window.flush().await;

        let seen = seen.lock();
        assert_eq!(seen[0].0, window.id());
        assert_eq!(seen[1].0, frame);
        assert_ne!(frame, window.id());
    }

    #[tokio::test]
    async fn test_listener_detaches_itself() {
        let window = HostWindow::open();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&hits);
        window.add_listener(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            ListenerControl::Detach
        });

        window.post_message(json!(1)).unwrap();
        window.post_message(json!(2)).unwrap();
        window.flush().await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(window.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_removed_during_dispatch_is_skipped() {
        let window = HostWindow::open();
        let late_hits = Arc::new(AtomicU64::new(0));

        // The first listener removes the second one before it runs
        let target: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));
        let registry = Arc::clone(&window.listeners);
        let victim = Arc::clone(&target);
        window.add_listener(move |_| {
            if let Some(id) = victim.lock().take() {
                registry.remove(id);
            }
            ListenerControl::Keep
        });
        let counter = Arc::clone(&late_hits);
        let id = window.add_listener(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            ListenerControl::Keep
        });
        *target.lock() = Some(id);

        window.post_message(json!("x")).unwrap();
        window.flush().await;

        assert_eq!(late_hits.load(Ordering::SeqCst), 0);
        assert!(!window.remove_listener(id));
    }

    #[tokio::test]
    async fn test_stop_propagation_recorded() {
        let window = HostWindow::open();
        window.add_listener(|event| {
            if event.data() == &json!("stop") {
                event.stop_propagation();
            }
            ListenerControl::Keep
        });
        let seen = recorder(&window);

        window.post_message(json!("stop")).unwrap();
        window.post_message(json!("go")).unwrap();
        window.flush().await;

        // Same-window listeners still see a stopped event
        assert_eq!(seen.lock().len(), 2);
        assert_eq!(window.stats().propagation_stopped, 1);
    }
}
