use serde::{Deserialize, Serialize};

pub type MethodName = String;
pub type RpcArgs = Vec<serde_json::Value>;

/// A request envelope: the name of a remote operation and its positional arguments.
///
/// Exactly one request is sent per connection.
///
/// ```text
/// {"method": "add", "args": [5, 3]}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub method: MethodName,
    #[serde(default)]
    pub args: RpcArgs,
}

impl Request {
    pub fn new(method: impl Into<String>, args: RpcArgs) -> Self {
        Request {
            method: method.into(),
            args,
        }
    }
}
