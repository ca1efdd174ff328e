//! Request bridge
//!
//! Action requests and event notifications share the host window channel.
//! Only requests need bookkeeping: each one gets an entry in a correlation
//! table keyed by action name, and a single window listener settles the
//! entries when a matching `action-result` arrives from this same window.
//!
//! There is no timeout, retry or de-duplication. A peer that never answers
//! leaves the request pending.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use tether_core::{
    ActionRequest, ActionResult, EventNotification, EventNotifier, Message, TetherError,
    TetherResult,
};

use crate::{HostWindow, ListenerControl, ListenerId, MessageEvent, WindowId};

/// Outcome delivered to a waiting request
type Outcome = TetherResult<Option<Value>>;

/// Bridge counters
#[derive(Clone, Debug, Default)]
pub struct BridgeStats {
    pub requests_sent: u64,
    pub requests_resolved: u64,
    pub requests_rejected: u64,
    pub notifications_sent: u64,
}

struct PendingRequest {
    id: u64,
    reply: oneshot::Sender<Outcome>,
}

/// Outstanding requests, keyed by action
#[derive(Default)]
struct CorrelationTable {
    next_id: AtomicU64,
    entries: Mutex<HashMap<String, Vec<PendingRequest>>>,
}

impl CorrelationTable {
    fn register(&self, action: &str) -> (u64, oneshot::Receiver<Outcome>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, rx) = oneshot::channel();
        self.entries
            .lock()
            .entry(action.to_string())
            .or_default()
            .push(PendingRequest { id, reply });
        (id, rx)
    }

    fn cancel(&self, action: &str, id: u64) {
        let mut entries = self.entries.lock();
        if let Some(waiting) = entries.get_mut(action) {
            waiting.retain(|request| request.id != id);
            if waiting.is_empty() {
                entries.remove(action);
            }
        }
    }

    fn pending(&self, action: &str) -> usize {
        self.entries.lock().get(action).map_or(0, Vec::len)
    }

    /// Settle every request waiting on `result.action`; returns how many
    fn settle(&self, result: &ActionResult) -> usize {
        let Some(waiting) = self.entries.lock().remove(&result.action) else {
            return 0;
        };

        let count = waiting.len();
        for request in waiting {
            debug!(
                action = %result.action,
                request = request.id,
                success = result.is_success(),
                "settling action request"
            );
            let outcome = if result.is_success() {
                Ok(result.value.clone())
            } else {
                Err(TetherError::ActionRejected {
                    action: result.action.clone(),
                })
            };
            // The caller may have stopped waiting
            let _ = request.reply.send(outcome);
        }
        count
    }
}

/// Sends action requests to the peer and emits event notifications
pub struct RequestBridge {
    window: Arc<HostWindow>,
    pending: Arc<CorrelationTable>,
    stats: Arc<Mutex<BridgeStats>>,
    listener: ListenerId,
}

impl RequestBridge {
    /// Attach a bridge to `window`
    pub fn new(window: Arc<HostWindow>) -> Self {
        let pending = Arc::new(CorrelationTable::default());
        let stats = Arc::new(Mutex::new(BridgeStats::default()));

        let listener = {
            let own = window.id();
            let pending = Arc::clone(&pending);
            let stats = Arc::clone(&stats);
            window.add_listener(move |event| {
                handle_result(own, &pending, &stats, event);
                ListenerControl::Keep
            })
        };

        RequestBridge {
            window,
            pending,
            stats,
            listener,
        }
    }

    pub fn window(&self) -> &Arc<HostWindow> {
        &self.window
    }

    /// Ask the peer to perform `action`
    ///
    /// The request is registered and posted when this is called, not when
    /// the returned future is first polled. The future resolves to the
    /// result value (`None` if the peer sent none), fails with
    /// [`TetherError::ActionRejected`] on a non-success result, and stays
    /// pending if no result ever arrives.
    pub fn send_action_request(
        &self,
        action: &str,
        value: Value,
    ) -> impl Future<Output = Outcome> + Send + 'static {
        let sent = self.post_request(action, value);
        async move {
            let reply = sent?;
            reply.await.map_err(|_| TetherError::ChannelClosed)?
        }
    }

    /// Send a request for its effects only, discarding the outcome
    pub fn fire_action_request(&self, action: &str, value: Value) {
        let request = self.send_action_request(action, value);
        let action = action.to_string();
        tokio::spawn(async move {
            if let Err(error) = request.await {
                debug!(%action, %error, "ignored action request failure");
            }
        });
    }

    /// Emit a one-way notification
    pub fn send_event_notification(&self, event: &str, value: Value) -> TetherResult<()> {
        let data = Message::from(EventNotification::new(event, value)).to_value()?;
        self.window.post_message(data)?;
        self.stats.lock().notifications_sent += 1;
        debug!(event, "event notification sent");
        Ok(())
    }

    /// Number of requests for `action` still waiting for a result
    pub fn pending_requests(&self, action: &str) -> usize {
        self.pending.pending(action)
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats.lock().clone()
    }

    fn post_request(&self, action: &str, value: Value) -> TetherResult<oneshot::Receiver<Outcome>> {
        let data = Message::from(ActionRequest::new(action, value)).to_value()?;

        // Register before posting so no result can be missed
        let (id, reply) = self.pending.register(action);
        if let Err(error) = self.window.post_message(data) {
            self.pending.cancel(action, id);
            return Err(error);
        }

        self.stats.lock().requests_sent += 1;
        debug!(action, request = id, "action request sent");
        Ok(reply)
    }
}

impl EventNotifier for RequestBridge {
    fn notify(&self, event: &str, value: Value) -> TetherResult<()> {
        self.send_event_notification(event, value)
    }
}

impl Drop for RequestBridge {
    fn drop(&mut self) {
        self.window.remove_listener(self.listener);
    }
}

/// Window listener: settle pending requests matched by a same-window result
fn handle_result(
    own: WindowId,
    pending: &CorrelationTable,
    stats: &Mutex<BridgeStats>,
    event: &mut MessageEvent,
) {
    if event.source() != own {
        return;
    }
    let Some(Message::ActionResult(result)) = Message::from_value(event.data()) else {
        return;
    };

    let settled = pending.settle(&result) as u64;
    if settled == 0 {
        return;
    }

    event.stop_propagation();
    let mut stats = stats.lock();
    if result.is_success() {
        stats.requests_resolved += settled;
    } else {
        stats.requests_rejected += settled;
    }
}
