//! Network completion hook
//!
//! Wraps the host's request `open` method. Requests to the new practice
//! session endpoint get a one-shot load listener, attached before the call
//! is forwarded, that reports the session payload as a `session-loaded`
//! notification. Every other request passes straight through.

use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use tether_core::{EventNotifier, TetherError, TetherResult, EVENT_SESSION_LOADED};

use crate::{observe, report_observation_failure, InterceptorBinding, MethodSlot};

/// URL of the endpoint used by the host to start a new practice session
pub const SESSION_URL_PATTERN: &str = r"/\d{4}-\d{2}-\d{2}/sessions";

/// Slot claim held by the network hook
pub const NETWORK_HOOK: &str = "tether.network";

/// Arguments of a request `open` call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenArgs {
    pub method: String,
    pub url: String,
    pub is_async: bool,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl OpenArgs {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        OpenArgs {
            method: method.into(),
            url: url.into(),
            is_async: true,
            user: None,
            password: None,
        }
    }
}

/// Listener run once when a request completes
pub type LoadListener<R> = Box<dyn FnOnce(&R) + Send>;

/// A host network request
pub trait NetworkRequest: Send + Sync + Sized + 'static {
    fn add_load_listener(&self, listener: LoadListener<Self>);

    /// Response already decoded by the host, if any
    fn response(&self) -> Option<Value>;

    /// Raw response text; `None` when the host does not expose it
    fn response_text(&self) -> Option<String>;
}

/// Objects and arrays count as structured data
fn is_object(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

/// Extract the session payload of a completed request
///
/// Uses the decoded response when it is an object, the parsed response
/// text otherwise. Anything that is not an object in the end is ignored.
pub fn session_payload<R: NetworkRequest>(request: &R) -> TetherResult<Option<Value>> {
    let data = match request.response() {
        Some(value) if is_object(&value) => value,
        _ => {
            let text = request
                .response_text()
                .ok_or_else(|| TetherError::Observation("response text unavailable".to_string()))?;
            serde_json::from_str(&text)?
        }
    };

    Ok(is_object(&data).then_some(data))
}

/// Interceptor installed on a request `open` slot
pub struct NetworkHook<R, O> {
    binding: InterceptorBinding<R, OpenArgs, O>,
    pattern: Regex,
}

impl<R: NetworkRequest, O: 'static> NetworkHook<R, O> {
    /// Wrap `slot`; `pattern` selects the session endpoint URLs
    ///
    /// Fails with [`TetherError::AlreadyInstalled`] if a network hook
    /// already wraps this slot.
    pub fn install(
        slot: &MethodSlot<R, OpenArgs, O>,
        notifier: Arc<dyn EventNotifier>,
        pattern: &str,
    ) -> TetherResult<Self> {
        let pattern =
            Regex::new(pattern).map_err(|error| TetherError::InvalidPattern(error.to_string()))?;

        let matcher = pattern.clone();
        let binding = InterceptorBinding::install_exclusive(slot, NETWORK_HOOK, move |original| {
            observe(
                original,
                "Could not watch the request",
                move |request: &R, args: &OpenArgs| {
                    if matcher.is_match(&args.url) {
                        tracing::debug!(url = %args.url, "watching new session request");
                        watch_session_load(request, Arc::clone(&notifier));
                    }
                    Ok(())
                },
            )
        })
        .ok_or_else(|| TetherError::AlreadyInstalled(NETWORK_HOOK.to_string()))?;

        Ok(NetworkHook { binding, pattern })
    }

    /// Does `url` point at the session endpoint?
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    pub fn binding(&self) -> &InterceptorBinding<R, OpenArgs, O> {
        &self.binding
    }
}

fn watch_session_load<R: NetworkRequest>(request: &R, notifier: Arc<dyn EventNotifier>) {
    request.add_load_listener(Box::new(move |request: &R| {
        let handled = session_payload(request).and_then(|payload| match payload {
            Some(data) => notifier.notify(EVENT_SESSION_LOADED, data),
            None => Ok(()),
        });
        if let Err(error) = handled {
            report_observation_failure("Could not handle the new session data", &error);
        }
    }));
}
