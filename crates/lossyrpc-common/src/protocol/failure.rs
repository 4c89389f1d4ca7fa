//! lossyrpc Failure Types
//!
//! Every remote operation reserves one result slot for a [`RemoteObjectError`].
//! The server fills it when the operation itself fails; the stub fills it when
//! anything between the caller and the operation goes wrong.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::LossyrpcError;

/// Message placed in the failure slot when the call never produced a reply.
pub const GENERIC_REMOTE_ERROR: &str = "remote object error";

/// Where a call failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Arguments could not be encoded (no I/O was attempted)
    Encoding,
    /// Connection, write or read failure
    Transport,
    /// Reply missing, undecodable or shaped unlike the declared signature
    Protocol,
    /// Unknown operation or arguments rejected before invocation
    Dispatch,
    /// The invoked operation reported a failure
    Application,
    /// The send retry budget ran out
    Timeout,
}

/// The failure-indicator value carried by every remote operation's result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteObjectError {
    pub kind: FailureKind,
    pub message: String,
}

impl RemoteObjectError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failure reported by the service object itself.
    ///
    /// ```
    /// use lossyrpc_common::{FailureKind, RemoteObjectError};
    ///
    /// let err = RemoteObjectError::application("Division by zero is not allowed");
    /// assert_eq!(err.kind, FailureKind::Application);
    /// ```
    pub fn application(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Application, message)
    }

    /// Failure with the generic "remote object error" message.
    pub fn generic(kind: FailureKind) -> Self {
        Self::new(kind, GENERIC_REMOTE_ERROR)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RemoteObjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RemoteObjectError {}

impl From<&LossyrpcError> for FailureKind {
    fn from(err: &LossyrpcError) -> Self {
        match err {
            LossyrpcError::Transport(_) | LossyrpcError::Io(_) | LossyrpcError::Bind { .. } => {
                FailureKind::Transport
            }
            LossyrpcError::Protocol(_) | LossyrpcError::JsonSerialization(_) => FailureKind::Protocol,
            LossyrpcError::Dispatch(_) => FailureKind::Dispatch,
            LossyrpcError::Application(_) => FailureKind::Application,
            LossyrpcError::Timeout(_) => FailureKind::Timeout,
            LossyrpcError::Validation(_) | LossyrpcError::Config(_) => FailureKind::Encoding,
        }
    }
}
