//! Scripted peer on the host window
//!
//! Stands in for the script running in the page context: it answers
//! action requests with scripted replies and records every notification.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;

use tether_bridge::{HostWindow, ListenerControl, ListenerId, WindowId};
use tether_core::{ActionRequest, ActionResult, EventNotification, Message, TetherResult};

/// How the peer answers one request
#[derive(Clone, Debug, PartialEq)]
pub enum PeerReply {
    Succeed(Option<Value>),
    Fail(Option<Value>),
    /// Post this JSON as the reply, unchecked
    Raw(Value),
    /// Never answer
    Ignore,
}

type Handler = Arc<dyn Fn(&Value) -> PeerReply + Send + Sync>;

#[derive(Default)]
struct PeerState {
    handlers: Mutex<HashMap<String, Handler>>,
    requests: Mutex<Vec<ActionRequest>>,
    notifications: Mutex<Vec<EventNotification>>,
}

/// A simulated page script listening on the host window
pub struct SimulatedPeer {
    window: Weak<HostWindow>,
    listener: ListenerId,
    state: Arc<PeerState>,
}

impl SimulatedPeer {
    /// Start listening on `window`
    pub fn attach(window: &Arc<HostWindow>) -> Self {
        let state = Arc::new(PeerState::default());
        let weak = Arc::downgrade(window);

        let listener = {
            let state = Arc::clone(&state);
            let weak = weak.clone();
            window.add_listener(move |event| {
                match Message::from_value(event.data()) {
                    Some(Message::ActionRequest(request)) => {
                        if let Some(window) = weak.upgrade() {
                            state.answer(&window, request);
                        }
                    }
                    Some(Message::EventNotification(notification)) => {
                        state.notifications.lock().push(notification);
                    }
                    _ => {}
                }
                ListenerControl::Keep
            })
        };

        SimulatedPeer {
            window: weak,
            listener,
            state,
        }
    }

    /// Answer requests for `action` with `handler(value)`
    pub fn on_action<F>(&self, action: &str, handler: F)
    where
        F: Fn(&Value) -> PeerReply + Send + Sync + 'static,
    {
        self.state
            .handlers
            .lock()
            .insert(action.to_string(), Arc::new(handler));
    }

    /// Answer every request for `action` with the same reply
    pub fn reply_with(&self, action: &str, reply: PeerReply) {
        self.on_action(action, move |_| reply.clone());
    }

    /// Requests seen so far, answered or not
    pub fn requests(&self) -> Vec<ActionRequest> {
        self.state.requests.lock().clone()
    }

    pub fn notifications(&self) -> Vec<EventNotification> {
        self.state.notifications.lock().clone()
    }

    /// Post an unsolicited result on the window
    pub fn post_result(&self, result: ActionResult) -> TetherResult<()> {
        if let Some(window) = self.window.upgrade() {
            window.post_message(Message::from(result).to_value()?)?;
        }
        Ok(())
    }

    /// Deliver a result as if it came from another window
    pub fn post_result_from(&self, source: WindowId, result: ActionResult) -> TetherResult<()> {
        if let Some(window) = self.window.upgrade() {
            window.deliver_from(source, Message::from(result).to_value()?)?;
        }
        Ok(())
    }
}

impl PeerState {
    fn answer(&self, window: &HostWindow, request: ActionRequest) {
        let handler = self.handlers.lock().get(&request.action).cloned();
        let reply = handler.map_or(PeerReply::Ignore, |handler| handler(&request.value));
        let action = request.action.clone();
        self.requests.lock().push(request);

        let result = match reply {
            PeerReply::Succeed(value) => ActionResult::success(action, value),
            PeerReply::Fail(value) => ActionResult {
                value,
                ..ActionResult::failure(action)
            },
            PeerReply::Raw(data) => {
                let _ = window.post_message(data);
                return;
            }
            PeerReply::Ignore => return,
        };
        if let Ok(data) = Message::from(result).to_value() {
            // The window may be closing; the request then stays pending
            let _ = window.post_message(data);
        }
    }
}

impl Drop for SimulatedPeer {
    fn drop(&mut self) {
        if let Some(window) = self.window.upgrade() {
            window.remove_listener(self.listener);
        }
    }
}
