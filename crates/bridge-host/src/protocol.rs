use domain::{BridgeError, BridgeEvent};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// One command sent by the host
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRequest {
    pub callback_id: String,
    pub action: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl HostRequest {
    pub fn new(callback_id: impl Into<String>, action: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            callback_id: callback_id.into(),
            action: action.into(),
            args,
        }
    }

    /// Positional argument, `None` when absent or null
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index).filter(|v| !v.is_null())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Result delivered to a host callback.
///
/// `keep_callback` tells the host more results follow for the same id.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostResponse {
    pub callback_id: String,
    pub status: ResponseStatus,
    pub message: Value,
    pub keep_callback: bool,
}

impl HostResponse {
    pub fn ok(callback_id: impl Into<String>, message: Value) -> Self {
        Self {
            callback_id: callback_id.into(),
            status: ResponseStatus::Ok,
            message,
            keep_callback: false,
        }
    }

    pub fn progress(callback_id: impl Into<String>, message: Value) -> Self {
        Self {
            keep_callback: true,
            ..Self::ok(callback_id, message)
        }
    }

    pub fn error(callback_id: impl Into<String>, error: &HostError) -> Self {
        Self {
            callback_id: callback_id.into(),
            status: ResponseStatus::Error,
            message: json!({ "code": error.code(), "message": error.to_string() }),
            keep_callback: false,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}

/// Line written to the host's output stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HostOutput {
    Response(HostResponse),
    Event { event: BridgeEvent },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

impl HostError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Bridge(e) => e.code(),
            Self::UnknownAction(_) => "UnknownAction",
            Self::MalformedRequest(_) => "MalformedRequest",
        }
    }

    pub(crate) fn payload(message: impl Into<String>) -> Self {
        Self::Bridge(BridgeError::InvalidPayload(message.into()))
    }
}
