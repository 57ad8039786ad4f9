use thiserror::Error;

use super::protocol::ErrorKind;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid parameters for {command}: {reason}")]
    InvalidParams { command: String, reason: String },

    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("Code execution error: {0}")]
    Execution(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Host unavailable: {0}")]
    HostUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        BridgeError::NotFound {
            what,
            name: name.into(),
        }
    }

    pub fn invalid_params(command: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::InvalidParams {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Wire category for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::UnknownCommand(_) => ErrorKind::UnknownCommand,
            BridgeError::InvalidParams { .. } => ErrorKind::InvalidParams,
            BridgeError::InvalidType(_) => ErrorKind::InvalidType,
            BridgeError::NotFound { .. } => ErrorKind::NotFound,
            BridgeError::Execution(_) => ErrorKind::ExecutionError,
            BridgeError::Capture(_) => ErrorKind::CaptureError,
            BridgeError::Render(_) => ErrorKind::RenderError,
            BridgeError::HostUnavailable(_) => ErrorKind::HostUnavailable,
            BridgeError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Malformed frame on the wire
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Malformed frame: {0}")]
    Syntax(String),

    #[error("Invalid command structure: {0}")]
    Structure(String),

    #[error("Frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },
}
