pub mod error;
pub mod failure;
pub mod reply;
pub mod request;


pub use error::{LossyrpcError, Result};
pub use failure::{FailureKind, RemoteObjectError};
pub use reply::{Reply, RpcResult};
pub use request::{MethodName, Request, RpcArgs};
