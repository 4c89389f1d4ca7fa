//! lossyrpc Client
//!
//! This crate turns an interface definition into a [`Stub`]: one callable
//! [`RemoteOperation`] per declared operation. Every send attempt opens a
//! fresh connection; once a request is delivered, exactly one reply is read
//! on that connection before it is closed.
//!
//! Calls never return an error. Whatever goes wrong, the [`Outcome`] carries
//! zero values for the declared results and a populated failure slot.
//!
//! # Example
//!
//! ```no_run
//! use lossyrpc_client::Stub;
//! use lossyrpc_common::transport::FaultConfig;
//! use lossyrpc_common::{InterfaceDef, OperationSig, ValueKind};
//! use serde_json::json;
//!
//! # async fn run() -> lossyrpc_common::Result<()> {
//! let iface = InterfaceDef::new("Calculator").operation(
//!     OperationSig::new("add")
//!         .param(ValueKind::Float)
//!         .param(ValueKind::Float)
//!         .returns(ValueKind::Float)
//!         .fails(),
//! );
//! let stub = Stub::new(iface, "127.0.0.1:9000", FaultConfig::default())?;
//!
//! let outcome = stub.call("add", vec![json!(5), json!(3)]).await;
//! assert_eq!(outcome.value(), json!(8.0));
//! # Ok(())
//! # }
//! ```

pub mod endpoint;
pub mod outcome;
pub mod retry;
pub mod stub;

pub use endpoint::Endpoint;
pub use outcome::Outcome;
pub use retry::RetryConfig;
pub use stub::{RemoteOperation, Stub};
