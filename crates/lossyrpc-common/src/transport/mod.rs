//! lossyrpc Transport Layer
//!
//! This module provides the unreliable TCP transport and the codec used to
//! exchange envelopes between stubs and services.
//!
//! # Architecture
//!
//! - **Transport**: TCP, one request/reply exchange per connection
//! - **Codec**: JSON serialization for envelopes
//! - **Wire Format**: `[4-byte length prefix as u32 big-endian] + [JSON data]`
//! - **Faults**: Simulated packet loss, delay and read timeouts
//!
//! # Components
//!
//! - **[`Codec`]** / **[`JsonCodec`]**: Encode/decode envelopes to JSON
//! - **[`UnreliableTransport`]**: Framed send/receive with fault injection
//! - **[`FaultConfig`]**: Loss, delay and timeout settings
//!
//! # Example
//!
//! ```no_run
//! use lossyrpc_common::transport::{FaultConfig, JsonCodec, SendOutcome, UnreliableTransport};
//! use lossyrpc_common::protocol::Request;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> lossyrpc_common::Result<()> {
//! let mut transport = UnreliableTransport::connect("127.0.0.1:8080", FaultConfig::reliable()).await?;
//!
//! let request = Request::new("add", vec![json!(5), json!(3)]);
//! let payload = JsonCodec::encode_request(&request)?;
//! if transport.send(&payload).await? == SendOutcome::Dropped {
//!     eprintln!("request was lost");
//! }
//! let reply = transport.receive().await?;
//! transport.close().await;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod faults;
pub mod unreliable;

pub use codec::{Codec, JsonCodec};
pub use faults::FaultConfig;
pub use unreliable::{Received, SendOutcome, UnreliableTransport, MAX_MESSAGE_SIZE};
