use lossyrpc_common::transport::FaultConfig;
use lossyrpc_server::{coordination_interface, CoordinationObject, Service};
use std::future::Future;
use std::sync::Arc;

/// Serves the coordination example until `shutdown` resolves.
///
/// Returns the number of calls dispatched while running.
///
/// # Errors
///
/// Returns an error if the service cannot be registered or its port cannot
/// be bound.
pub async fn serve(
    host: &str,
    port: u16,
    faults: FaultConfig,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<u64> {
    let object = Arc::new(CoordinationObject::new());
    let service = Service::builder()
        .interface(coordination_interface())
        .object(object.into_service_object())
        .host(host)
        .port(port)
        .faults(faults)
        .build()?;

    let addr = service.start().await?;
    tracing::info!("Serving `{}` on {}", service.interface_name(), addr);
    tracing::info!("Faults: {:?}", service.faults());

    shutdown.await;

    tracing::info!("Shutting down");
    service.stop().await;
    let calls = service.call_count();
    tracing::info!("Handled {} call(s)", calls);
    Ok(calls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lossyrpc_client::Stub;
    use serde_json::json;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_serve_counts_calls_until_shutdown() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            serve("127.0.0.1", port, FaultConfig::reliable(), async {
                let _ = stop_rx.await;
            })
            .await
        });

        let addr = format!("127.0.0.1:{}", port);
        let mut ready = false;
        for _ in 0..50 {
            if crate::probe(&addr, crate::probe::PROBE_TIMEOUT).await {
                ready = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(ready, "service did not come up");

        let stub = Stub::new(coordination_interface(), addr, FaultConfig::reliable()).unwrap();
        let outcome = stub.call("method", vec![json!(5), json!(false)]).await;
        assert_eq!(outcome.value(), json!([5, ""]));

        stop_tx.send(()).unwrap();
        // The probe connection is accepted but never dispatched.
        assert_eq!(server.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_serve_reports_bind_failure() {
        let holder = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = holder.local_addr().unwrap().port();

        let result = serve("127.0.0.1", port, FaultConfig::reliable(), async {}).await;
        assert!(result.is_err());
    }
}
