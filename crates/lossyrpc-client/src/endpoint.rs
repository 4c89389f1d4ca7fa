use lossyrpc_common::protocol::error::{LossyrpcError, Result};
use lossyrpc_common::transport::{FaultConfig, JsonCodec, Received, SendOutcome, UnreliableTransport};
use lossyrpc_common::{Reply, Request};
use std::time::Instant;

use crate::retry::RetryConfig;

/// A service address plus the transport settings used to reach it.
///
/// Creates a fresh connection for each send attempt; nothing is pooled or
/// kept alive between calls.
#[derive(Debug, Clone)]
pub struct Endpoint {
    target: String,
    faults: FaultConfig,
    retry: RetryConfig,
}

impl Endpoint {
    pub fn new(target: impl Into<String>, faults: FaultConfig) -> Self {
        Self {
            target: target.into(),
            faults,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn faults(&self) -> &FaultConfig {
        &self.faults
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn validate(&self) -> Result<()> {
        self.faults.validate()?;
        self.retry.validate()
    }

    /// Performs one request/reply exchange.
    ///
    /// Each send attempt opens its own connection. A dropped send closes that
    /// connection and the next attempt reconnects, within the retry budget.
    /// Once a send is delivered, exactly one reply is read on the same
    /// connection and the connection is closed.
    ///
    /// # Errors
    ///
    /// - `Transport` if connecting, writing or reading fails, or the service
    ///   closes the connection without replying
    /// - `Timeout` if the retry budget runs out or no reply arrives in time
    /// - `Protocol` if the reply cannot be decoded
    pub async fn exchange(&self, request: &Request) -> Result<Reply> {
        let payload = JsonCodec::encode_request(request)?;

        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            if !self.retry.allows(attempts, started) {
                tracing::debug!(
                    "Giving up on {} after {} dropped send(s)",
                    self.target,
                    attempts
                );
                return Err(LossyrpcError::Timeout(started.elapsed().as_millis() as u64));
            }
            attempts += 1;

            let mut transport = UnreliableTransport::connect(&self.target, self.faults.clone()).await?;
            let outcome = transport.send(&payload).await;
            let result = match outcome {
                Ok(SendOutcome::Delivered) => Some(self.await_reply(&mut transport).await),
                Ok(SendOutcome::Dropped) => {
                    tracing::debug!("Send {} to {} dropped, reconnecting", attempts, self.target);
                    None
                }
                Err(e) => Some(Err(e)),
            };
            transport.close().await;

            if let Some(result) = result {
                return result;
            }
        }
    }

    async fn await_reply(&self, transport: &mut UnreliableTransport) -> Result<Reply> {
        match transport.receive().await? {
            Received::Frame(bytes) => JsonCodec::decode_reply(&bytes),
            Received::Closed => Err(LossyrpcError::Transport(format!(
                "{} closed the connection without replying",
                self.target
            ))),
            Received::TimedOut => Err(LossyrpcError::Timeout(self.faults.timeout.as_millis() as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_exchange_against_closed_port_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Endpoint::new(addr.to_string(), FaultConfig::reliable());
        let err = endpoint
            .exchange(&Request::new("add", vec![json!(1), json!(2)]))
            .await
            .unwrap_err();
        assert!(matches!(err, LossyrpcError::Transport(_)));
    }

    #[tokio::test]
    async fn test_full_loss_exhausts_retry_budget() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let faults = FaultConfig::reliable().with_loss(1.0).with_timeout(5, 0);
        let endpoint = Endpoint::new(addr.to_string(), faults)
            .with_retry(RetryConfig::default().with_max_attempts(3));

        let started = Instant::now();
        let err = endpoint
            .exchange(&Request::new("add", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, LossyrpcError::Timeout(_)));
        assert!(started.elapsed() >= std::time::Duration::from_millis(15));
    }

    #[tokio::test]
    async fn test_each_attempt_uses_a_fresh_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let acceptor = tokio::spawn(async move {
            let mut accepted = 0u32;
            while tokio::time::timeout(std::time::Duration::from_millis(300), listener.accept())
                .await
                .is_ok()
            {
                accepted += 1;
            }
            accepted
        });

        let faults = FaultConfig::reliable().with_loss(1.0).with_timeout(5, 0);
        let endpoint = Endpoint::new(addr.to_string(), faults)
            .with_retry(RetryConfig::default().with_max_attempts(4));
        let err = endpoint.exchange(&Request::new("add", vec![])).await.unwrap_err();
        assert!(matches!(err, LossyrpcError::Timeout(_)));

        assert_eq!(acceptor.await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold the connection without ever replying.
        let holder = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            drop(stream);
        });

        let endpoint = Endpoint::new(addr.to_string(), FaultConfig::reliable().with_timeout(30, 0));
        let err = endpoint.exchange(&Request::new("add", vec![])).await.unwrap_err();
        assert!(matches!(err, LossyrpcError::Timeout(30)));
        holder.abort();
    }
}
