//! Message envelope definitions
//!
//! Every message on the host window channel is a JSON object discriminated
//! by its `type` field. Anything that does not parse as one of the three
//! known kinds is ignored by Tether, since other scripts share the channel.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{TetherError, TetherResult};

/// Envelope type of an action request
pub const MESSAGE_TYPE_ACTION_REQUEST: &str = "action-request";
/// Envelope type of an action result
pub const MESSAGE_TYPE_ACTION_RESULT: &str = "action-result";
/// Envelope type of an event notification
pub const MESSAGE_TYPE_EVENT_NOTIFICATION: &str = "event-notification";

/// Result value reported by the peer on success
pub const ACTION_RESULT_SUCCESS: &str = "success";
/// Result value written by Tether for failures
pub const ACTION_RESULT_FAILURE: &str = "failure";

/// A new practice session was loaded by the host
pub const EVENT_SESSION_LOADED: &str = "session-loaded";
/// The host audio library started playing a sound
pub const EVENT_SOUND_PLAYED: &str = "sound-played";

/// A message exchanged over the host window channel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Message {
    ActionRequest(ActionRequest),
    ActionResult(ActionResult),
    EventNotification(EventNotification),
}

impl Message {
    /// Parse raw channel data
    pub fn parse(data: &Value) -> TetherResult<Self> {
        Message::deserialize(data).map_err(|error| TetherError::InvalidMessage(error.to_string()))
    }

    /// Parse raw channel data, returning `None` for foreign or malformed data
    pub fn from_value(data: &Value) -> Option<Self> {
        Self::parse(data).ok()
    }

    /// Serialize into the wire representation
    pub fn to_value(&self) -> TetherResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// The envelope `type` of this message
    pub fn kind(&self) -> &'static str {
        match self {
            Message::ActionRequest(_) => MESSAGE_TYPE_ACTION_REQUEST,
            Message::ActionResult(_) => MESSAGE_TYPE_ACTION_RESULT,
            Message::EventNotification(_) => MESSAGE_TYPE_EVENT_NOTIFICATION,
        }
    }
}

/// Request for the peer to perform an action
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default)]
    pub value: Value,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>, value: Value) -> Self {
        ActionRequest {
            action: action.into(),
            value,
        }
    }
}

/// Outcome reported by the peer
///
/// Anything other than the exact string `"success"` (including a missing or
/// non-string field) is a failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActionStatus {
    Success,
    #[default]
    Failure,
}

impl Serialize for ActionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ActionStatus::Success => serializer.serialize_str(ACTION_RESULT_SUCCESS),
            ActionStatus::Failure => serializer.serialize_str(ACTION_RESULT_FAILURE),
        }
    }
}

impl<'de> Deserialize<'de> for ActionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        if raw.as_str() == Some(ACTION_RESULT_SUCCESS) {
            Ok(ActionStatus::Success)
        } else {
            Ok(ActionStatus::Failure)
        }
    }
}

/// Result of an action, posted back by the peer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action: String,
    #[serde(default)]
    pub result: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ActionResult {
    pub fn success(action: impl Into<String>, value: Option<Value>) -> Self {
        ActionResult {
            action: action.into(),
            result: ActionStatus::Success,
            value,
        }
    }

    pub fn failure(action: impl Into<String>) -> Self {
        ActionResult {
            action: action.into(),
            result: ActionStatus::Failure,
            value: None,
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.result == ActionStatus::Success
    }
}

/// One-way notification of an observed host event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventNotification {
    pub event: String,
    #[serde(default)]
    pub value: Value,
}

impl EventNotification {
    pub fn new(event: impl Into<String>, value: Value) -> Self {
        EventNotification {
            event: event.into(),
            value,
        }
    }
}

impl From<ActionRequest> for Message {
    fn from(request: ActionRequest) -> Self {
        Message::ActionRequest(request)
    }
}

impl From<ActionResult> for Message {
    fn from(result: ActionResult) -> Self {
        Message::ActionResult(result)
    }
}

impl From<EventNotification> for Message {
    fn from(notification: EventNotification) -> Self {
        Message::EventNotification(notification)
    }
}
