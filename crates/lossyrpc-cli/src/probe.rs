use std::time::Duration;
use tokio::net::TcpStream;

/// Default time to wait for a connection when probing.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Returns true if something is accepting TCP connections at `addr`.
///
/// The connection is closed immediately without sending anything. A service
/// treats that as a client that hung up before its request.
pub async fn probe(addr: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            tracing::debug!("Probe of {} failed: {}", addr, e);
            false
        }
        Err(_) => {
            tracing::debug!("Probe of {} timed out", addr);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        assert!(probe(&addr, PROBE_TIMEOUT).await);
    }

    #[tokio::test]
    async fn test_probe_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(!probe(&addr, PROBE_TIMEOUT).await);
    }

    #[tokio::test]
    async fn test_probe_bad_address() {
        assert!(!probe("definitely not an address", PROBE_TIMEOUT).await);
    }
}
