use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::BridgeError;

/// Command sent from the controller to the bridge.
///
/// On the wire this is `{"type": "get_object_info", "params": {"name": "Cube"}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Command {
    /// Command name (e.g., "get_scene_info", "create_object")
    #[serde(rename = "type", alias = "command")]
    pub name: String,
    /// Command parameters
    #[serde(default, alias = "parameters", alias = "args")]
    pub params: Map<String, Value>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Map::new(),
        }
    }

    /// Build a command from a JSON value holding the parameters.
    /// Anything other than an object is treated as "no parameters".
    pub fn with_params(name: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            params,
        }
    }
}

/// Outcome of a command
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[serde(alias = "ok")]
    Success,
    Error,
}

/// Machine-readable error category carried by error responses
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorKind {
    DecodeError,
    UnknownCommand,
    InvalidParams,
    InvalidType,
    NotFound,
    ExecutionError,
    CaptureError,
    RenderError,
    HostUnavailable,
    Internal,
}

/// Response sent from the bridge back to the controller.
/// Exactly one is produced per decoded command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub status: Status,
    /// Result payload on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Human-readable error message on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error category on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl Response {
    pub fn ok(result: Value) -> Self {
        Self {
            status: Status::Success,
            result: Some(result),
            message: None,
            kind: None,
        }
    }

    pub fn err(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            result: None,
            message: Some(message.into()),
            kind: Some(kind),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

impl From<BridgeError> for Response {
    fn from(err: BridgeError) -> Self {
        Response::err(err.kind(), err.to_string())
    }
}

impl From<Result<Value, BridgeError>> for Response {
    fn from(result: Result<Value, BridgeError>) -> Self {
        match result {
            Ok(value) => Response::ok(value),
            Err(err) => err.into(),
        }
    }
}
