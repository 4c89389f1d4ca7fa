//! lossyrpc Common Types and Transport
//!
//! This crate provides the wire envelope, the unreliable TCP transport and the
//! interface contracts shared by lossyrpc services and stubs.
//!
//! # Overview
//!
//! lossyrpc fulfils a local interface definition with a service object running
//! in another process. Every call travels over a deliberately unreliable
//! channel that can drop, delay and time out messages on demand. This crate
//! contains the pieces both sides agree on:
//!
//! - **Protocol Layer**: Request/Reply envelopes, failure types and errors
//! - **Contract Layer**: Interface definitions and registration-time validation
//! - **Transport Layer**: Framed TCP with configurable fault injection
//!
//! # Architecture
//!
//! The wire protocol is intentionally small:
//! - **Transport**: TCP, one request/reply exchange per connection
//! - **Serialization**: JSON
//! - **Message Format**: `[4-byte length prefix as u32 big-endian] + [JSON data]`
//! - **Max Message Size**: 16 MiB
//!
//! # Components
//!
//! - [`protocol`] - Envelope types (Request, Reply, RemoteObjectError) and errors
//! - [`contract`] - Interface definitions and validators
//! - [`transport`] - Unreliable transport, fault configuration and codec
//!
//! # Example
//!
//! ```
//! use lossyrpc_common::{Request, Reply};
//! use serde_json::json;
//!
//! let request = Request::new("add", vec![json!(5), json!(3)]);
//! let reply = Reply::success(vec![json!(8)]);
//! assert_eq!(request.method, "add");
//! assert!(reply.is_success());
//! ```

pub mod contract;
pub mod protocol;
pub mod transport;

pub use contract::{
    validate_interface, InterfaceDef, OperationSig, ResultSlot, ValueKind,
};
pub use protocol::*;
