//! lossyrpc Reply Types
//!
//! This module defines the reply envelope sent back once per connection.

use serde::{Deserialize, Serialize};

use super::failure::{FailureKind, RemoteObjectError};

/// Positional result values of an operation.
pub type RpcResult = Vec<serde_json::Value>;

/// A reply envelope returned from a service to a stub.
///
/// # Reply Flow
///
/// 1. Service receives and decodes one `Request`
/// 2. Service invokes the operation and builds a `Reply` (success or failure)
/// 3. Reply is serialized to JSON and sent on the same connection
/// 4. The connection is closed
///
/// # Wire Format
///
/// ```text
/// {"success": true,  "Result": [8.0], "Error": null}
/// {"success": false, "Result": null,  "Error": "Division by zero is not allowed", "Kind": "application"}
/// ```
///
/// `Kind` is only emitted when set. Replies without a `success` field are
/// accepted; success is then inferred from `Error` being null and `Result`
/// being present.
///
/// # Example
///
/// ```
/// use lossyrpc_common::protocol::reply::Reply;
/// use serde_json::json;
///
/// let success = Reply::success(vec![json!(3.5)]);
/// assert!(success.is_success());
///
/// let failure = Reply::error("Division by zero is not allowed");
/// assert!(!failure.is_success());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "WireReply")]
pub struct Reply {
    /// Whether the operation was found, invoked and returned normally
    pub success: bool,
    /// Result values (present on success)
    #[serde(rename = "Result")]
    pub result: Option<RpcResult>,
    /// Error message (present on failure)
    #[serde(rename = "Error")]
    pub error: Option<String>,
    /// Where the failure happened, when known
    #[serde(rename = "Kind", skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
}

#[derive(Deserialize)]
struct WireReply {
    success: Option<bool>,
    #[serde(rename = "Result", default)]
    result: Option<RpcResult>,
    #[serde(rename = "Error", default)]
    error: Option<String>,
    #[serde(rename = "Kind", default)]
    kind: Option<FailureKind>,
}

impl From<WireReply> for Reply {
    fn from(wire: WireReply) -> Self {
        let success = wire
            .success
            .unwrap_or(wire.error.is_none() && wire.result.is_some());
        Reply {
            success,
            result: wire.result,
            error: wire.error,
            kind: wire.kind,
        }
    }
}

impl Reply {
    /// Creates a successful reply carrying the operation's values.
    pub fn success(result: RpcResult) -> Self {
        Reply {
            success: true,
            result: Some(result),
            error: None,
            kind: None,
        }
    }

    /// Creates a failed reply with an application-level message.
    pub fn error(error: impl Into<String>) -> Self {
        Reply {
            success: false,
            result: None,
            error: Some(error.into()),
            kind: Some(FailureKind::Application),
        }
    }

    /// Creates a failed reply from a failure-slot value, keeping its kind.
    pub fn failure(failure: RemoteObjectError) -> Self {
        Reply {
            success: false,
            result: None,
            error: Some(failure.message),
            kind: Some(failure.kind),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Converts a failed reply into the failure-slot value a stub hands back.
    ///
    /// Returns `None` for successful replies.
    pub fn to_failure(&self) -> Option<RemoteObjectError> {
        if self.success {
            return None;
        }
        let kind = self.kind.unwrap_or(FailureKind::Application);
        Some(match &self.error {
            Some(message) => RemoteObjectError::new(kind, message.clone()),
            None => RemoteObjectError::generic(kind),
        })
    }
}
