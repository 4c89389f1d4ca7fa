use crate::protocol::error::{LossyrpcError, Result};
use crate::protocol::{Reply, Request};

/// Codec for encoding/decoding envelopes
///
/// Currently only JSON is supported, but the enum allows for future
/// extensibility (e.g., MessagePack, CBOR, etc.).
///
/// # Example
///
/// ```
/// use lossyrpc_common::transport::Codec;
/// use lossyrpc_common::protocol::Request;
/// use serde_json::json;
///
/// let codec = Codec::new();
/// let request = Request::new("add", vec![json!(5), json!(3)]);
///
/// let encoded = codec.encode_request(&request).unwrap();
/// let decoded = codec.decode_request(&encoded).unwrap();
/// assert_eq!(request, decoded);
/// ```
pub enum Codec {
    /// JSON codec (currently the only supported format)
    Json(JsonCodec),
}

impl Codec {
    /// Create a new codec (JSON is the only supported format)
    pub fn new() -> Self {
        Codec::Json(JsonCodec)
    }

    pub fn encode_request(&self, request: &Request) -> Result<Vec<u8>> {
        match self {
            Codec::Json(_) => JsonCodec::encode_request(request),
        }
    }

    pub fn decode_request(&self, data: &[u8]) -> Result<Request> {
        match self {
            Codec::Json(_) => JsonCodec::decode_request(data),
        }
    }

    pub fn encode_reply(&self, reply: &Reply) -> Result<Vec<u8>> {
        match self {
            Codec::Json(_) => JsonCodec::encode_reply(reply),
        }
    }

    pub fn decode_reply(&self, data: &[u8]) -> Result<Reply> {
        match self {
            Codec::Json(_) => JsonCodec::decode_reply(data),
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON codec for envelopes
///
/// Decoding failures are reported as [`LossyrpcError::Protocol`] so callers can
/// tell an undecodable envelope apart from I/O trouble.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a request to bytes
    pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(request)?)
    }

    /// Decode a request from bytes
    ///
    /// # Errors
    ///
    /// Returns `Protocol` if the payload is not a request envelope
    pub fn decode_request(data: &[u8]) -> Result<Request> {
        serde_json::from_slice(data)
            .map_err(|e| LossyrpcError::Protocol(format!("undecodable request: {}", e)))
    }

    /// Encode a reply to bytes
    pub fn encode_reply(reply: &Reply) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(reply)?)
    }

    /// Decode a reply from bytes
    ///
    /// # Errors
    ///
    /// Returns `Protocol` if the payload is not a reply envelope
    pub fn decode_reply(data: &[u8]) -> Result<Reply> {
        serde_json::from_slice(data)
            .map_err(|e| LossyrpcError::Protocol(format!("undecodable reply: {}", e)))
    }
}
