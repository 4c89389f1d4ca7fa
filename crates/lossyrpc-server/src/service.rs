//! Service Lifecycle
//!
//! A [`Service`] binds an interface definition, a service object, a port and
//! a fault configuration to a `Stopped -> Running -> Stopped` lifecycle.
//!
//! # Architecture
//!
//! While running, the service owns one acceptor task:
//! - The acceptor waits on the listener and on a shutdown signal
//! - Every accepted connection gets its own handler task
//! - A handler reads exactly one request, dispatches it, writes one reply and
//!   closes the connection
//!
//! `stop()` signals the acceptor and waits for it to drop the listener, so the
//! port is free again once `stop()` returns. Handlers that are already
//! running are not cancelled.

use lossyrpc_common::protocol::error::{LossyrpcError, Result};
use lossyrpc_common::transport::{FaultConfig, JsonCodec, Received, SendOutcome, UnreliableTransport};
use lossyrpc_common::{FailureKind, InterfaceDef, RemoteObjectError, Reply};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::dispatch::Dispatcher;
use crate::object::ServiceObject;

/// Default bind host: every interface.
pub const DEFAULT_HOST: &str = "0.0.0.0";

struct Running {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    acceptor: JoinHandle<()>,
}

enum State {
    Stopped,
    Running(Running),
}

impl State {
    /// Falls back to `Stopped` once the acceptor has exited on its own.
    fn reap(&mut self, interface: &str) {
        if let State::Running(running) = self {
            if running.acceptor.is_finished() {
                tracing::warn!("Acceptor for `{}` on {} has exited, marking stopped", interface, running.addr);
                *self = State::Stopped;
            }
        }
    }
}

/// Everything a connection handler needs, shared across handlers.
struct HandlerContext {
    dispatcher: Arc<Dispatcher>,
    calls: Arc<AtomicU64>,
    faults: FaultConfig,
}

/// A service object served over the unreliable transport.
///
/// # Example
///
/// ```no_run
/// use lossyrpc_server::{coordination_interface, CoordinationObject, Service};
/// use std::sync::Arc;
///
/// # async fn run() -> lossyrpc_common::Result<()> {
/// let object = Arc::new(CoordinationObject::new()).into_service_object();
/// let service = Service::builder()
///     .interface(coordination_interface())
///     .object(object)
///     .port(0)
///     .build()?;
///
/// let addr = service.start().await?;
/// println!("serving on {}", addr);
/// service.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Service {
    dispatcher: Arc<Dispatcher>,
    host: String,
    port: u16,
    faults: FaultConfig,
    calls: Arc<AtomicU64>,
    state: Mutex<State>,
}

impl Service {
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::default()
    }

    /// Binds the listener and spawns the acceptor.
    ///
    /// Starting a running service is not an error: a warning is logged and
    /// the address already bound is returned. A service whose acceptor died
    /// after an accept failure counts as stopped and binds again.
    ///
    /// # Errors
    ///
    /// Returns `Bind` if the port cannot be bound. The service stays stopped.
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut state = self.state.lock().await;
        state.reap(self.dispatcher.interface_name());
        if let State::Running(running) = &*state {
            tracing::warn!("Service `{}` is already running on {}", self.dispatcher.interface_name(), running.addr);
            return Ok(running.addr);
        }

        let listener = TcpListener::bind((self.host.as_str(), self.port))
            .await
            .map_err(|source| LossyrpcError::Bind {
                port: self.port,
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| LossyrpcError::Bind {
            port: self.port,
            source,
        })?;

        let ctx = Arc::new(HandlerContext {
            dispatcher: Arc::clone(&self.dispatcher),
            calls: Arc::clone(&self.calls),
            faults: self.faults.clone(),
        });
        let (shutdown, shutdown_rx) = oneshot::channel();
        let acceptor = tokio::spawn(accept_loop(listener, shutdown_rx, ctx));

        *state = State::Running(Running {
            addr,
            shutdown,
            acceptor,
        });
        tracing::info!(
            "Service `{}` ({}) listening on {}",
            self.dispatcher.interface_name(),
            self.dispatcher.object_type(),
            addr
        );
        Ok(addr)
    }

    /// Stops accepting connections and releases the port.
    ///
    /// Returns `false`, with a warning, if the service was not running or its
    /// acceptor had already exited.
    pub async fn stop(&self) -> bool {
        let mut state = self.state.lock().await;
        state.reap(self.dispatcher.interface_name());
        let running = match std::mem::replace(&mut *state, State::Stopped) {
            State::Running(running) => running,
            State::Stopped => {
                tracing::warn!("Service `{}` is not running", self.dispatcher.interface_name());
                return false;
            }
        };

        // The acceptor may already be gone after an accept failure.
        let _ = running.shutdown.send(());
        if let Err(e) = running.acceptor.await {
            tracing::error!("Acceptor task failed: {}", e);
        }

        tracing::info!(
            "Service `{}` stopped after {} call(s)",
            self.dispatcher.interface_name(),
            self.call_count()
        );
        true
    }

    pub async fn is_running(&self) -> bool {
        let mut state = self.state.lock().await;
        state.reap(self.dispatcher.interface_name());
        matches!(*state, State::Running(_))
    }

    /// Address the listener is bound to, while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let mut state = self.state.lock().await;
        state.reap(self.dispatcher.interface_name());
        match &*state {
            State::Running(running) => Some(running.addr),
            State::Stopped => None,
        }
    }

    /// Number of requests dispatched so far, whatever their outcome.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn faults(&self) -> &FaultConfig {
        &self.faults
    }

    pub fn interface_name(&self) -> &str {
        self.dispatcher.interface_name()
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("dispatcher", &self.dispatcher)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("calls", &self.call_count())
            .finish()
    }
}

/// Builder for [`Service`]. All validation happens in [`ServiceBuilder::build`],
/// before any socket is opened.
pub struct ServiceBuilder {
    interface: Option<InterfaceDef>,
    object: Option<ServiceObject>,
    host: String,
    port: u16,
    faults: FaultConfig,
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self {
            interface: None,
            object: None,
            host: DEFAULT_HOST.to_string(),
            port: 0,
            faults: FaultConfig::default(),
        }
    }
}

impl ServiceBuilder {
    pub fn interface(mut self, interface: InterfaceDef) -> Self {
        self.interface = Some(interface);
        self
    }

    pub fn object(mut self, object: ServiceObject) -> Self {
        self.object = Some(object);
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Port to listen on. `0` picks an ephemeral port at start.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn faults(mut self, faults: FaultConfig) -> Self {
        self.faults = faults;
        self
    }

    /// Validates the registration and creates a stopped service.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the interface or object is missing or invalid,
    /// or if they do not match. Returns `Config` for bad fault settings.
    pub fn build(self) -> Result<Service> {
        let interface = self.interface.ok_or_else(|| {
            LossyrpcError::Validation("no interface definition supplied".to_string())
        })?;
        let object = self
            .object
            .ok_or_else(|| LossyrpcError::Validation("no service object supplied".to_string()))?;
        self.faults.validate()?;

        let dispatcher = Dispatcher::new(interface, object)?;
        tracing::debug!("Registered {:?}", dispatcher);

        Ok(Service {
            dispatcher: Arc::new(dispatcher),
            host: self.host,
            port: self.port,
            faults: self.faults,
            calls: Arc::new(AtomicU64::new(0)),
            state: Mutex::new(State::Stopped),
        })
    }
}

async fn accept_loop(
    listener: TcpListener,
    mut shutdown: oneshot::Receiver<()>,
    ctx: Arc<HandlerContext>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::debug!("Acceptor shutting down");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!("Accepted connection from {}", peer);
                    let ctx = Arc::clone(&ctx);
                    tokio::spawn(handle_connection(stream, peer, ctx));
                }
                Err(e) => {
                    tracing::error!("Accept failed, acceptor exiting: {}", e);
                    break;
                }
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, ctx: Arc<HandlerContext>) {
    let mut transport = UnreliableTransport::new(stream, ctx.faults.clone());
    serve_one(&mut transport, peer, &ctx).await;
    transport.close().await;
}

/// One request/reply exchange. Pre-dispatch failures end it without a reply.
async fn serve_one(transport: &mut UnreliableTransport, peer: SocketAddr, ctx: &HandlerContext) {
    let payload = match transport.receive().await {
        Ok(Received::Frame(bytes)) if !bytes.is_empty() => bytes,
        Ok(Received::Frame(_)) => {
            tracing::debug!("Empty request from {}, closing", peer);
            return;
        }
        Ok(Received::Closed) => {
            tracing::debug!("{} closed the connection before sending a request", peer);
            return;
        }
        Ok(Received::TimedOut) => {
            tracing::debug!("Timed out waiting for a request from {}", peer);
            return;
        }
        Err(e) => {
            tracing::debug!("Failed to read request from {}: {}", peer, e);
            return;
        }
    };

    let request = match JsonCodec::decode_request(&payload) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Dropping undecodable request from {}: {}", peer, e);
            return;
        }
    };

    tracing::debug!("Dispatching `{}` for {}", request.method, peer);
    let reply = match ctx.dispatcher.dispatch(request).await {
        Ok(reply) => {
            ctx.calls.fetch_add(1, Ordering::SeqCst);
            reply
        }
        Err(e) => {
            tracing::warn!("Dispatch miss from {}: {}", peer, e);
            Reply::failure(RemoteObjectError::new(FailureKind::from(&e), e.to_string()))
        }
    };

    let bytes = match JsonCodec::encode_reply(&reply) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to encode reply for {}: {}", peer, e);
            return;
        }
    };
    match transport.send(&bytes).await {
        Ok(SendOutcome::Delivered) => {}
        Ok(SendOutcome::Dropped) => tracing::debug!("Reply to {} was dropped", peer),
        Err(e) => tracing::debug!("Failed to send reply to {}: {}", peer, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::{coordination_interface, CoordinationObject};

    fn coordination_service(port: u16) -> Service {
        Service::builder()
            .interface(coordination_interface())
            .object(Arc::new(CoordinationObject::new()).into_service_object())
            .host("127.0.0.1")
            .port(port)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_interface_and_object() {
        let no_iface = Service::builder()
            .object(Arc::new(CoordinationObject::new()).into_service_object())
            .build();
        assert!(matches!(no_iface, Err(LossyrpcError::Validation(_))));

        let no_object = Service::builder().interface(coordination_interface()).build();
        assert!(matches!(no_object, Err(LossyrpcError::Validation(_))));
    }

    #[test]
    fn test_build_rejects_bad_faults() {
        let result = Service::builder()
            .interface(coordination_interface())
            .object(Arc::new(CoordinationObject::new()).into_service_object())
            .faults(FaultConfig::reliable().with_loss(2.0))
            .build();
        assert!(matches!(result, Err(LossyrpcError::Config(_))));
    }

    #[tokio::test]
    async fn test_start_stop_transitions() {
        let service = coordination_service(0);
        assert!(!service.is_running().await);
        assert_eq!(service.local_addr().await, None);

        let addr = service.start().await.unwrap();
        assert!(service.is_running().await);
        assert_eq!(service.local_addr().await, Some(addr));
        assert_ne!(addr.port(), 0);

        assert!(service.stop().await);
        assert!(!service.is_running().await);
        assert!(!service.stop().await);
    }

    #[tokio::test]
    async fn test_start_twice_is_a_noop() {
        let service = coordination_service(0);
        let first = service.start().await.unwrap();
        let second = service.start().await.unwrap();
        assert_eq!(first, second);
        service.stop().await;
    }

    #[tokio::test]
    async fn test_bind_failure_leaves_service_stopped() {
        let holder = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = holder.local_addr().unwrap().port();

        let service = coordination_service(port);
        match service.start().await {
            Err(LossyrpcError::Bind { port: p, .. }) => assert_eq!(p, port),
            other => panic!("expected bind error, got {:?}", other),
        }
        assert!(!service.is_running().await);
    }

    #[tokio::test]
    async fn test_stop_releases_the_port() {
        let first = coordination_service(0);
        let port = first.start().await.unwrap().port();
        first.stop().await;

        let second = coordination_service(port);
        assert_eq!(second.start().await.unwrap().port(), port);
        second.stop().await;
    }

    #[tokio::test]
    async fn test_dead_acceptor_counts_as_stopped() {
        let service = coordination_service(0);
        service.start().await.unwrap();
        if let State::Running(running) = &*service.state.lock().await {
            running.acceptor.abort();
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert!(!service.is_running().await);
        assert_eq!(service.local_addr().await, None);

        service.start().await.unwrap();
        assert!(service.is_running().await);
        assert!(service.stop().await);
    }

    #[tokio::test]
    async fn test_stop_after_dead_acceptor_reports_not_running() {
        let service = coordination_service(0);
        service.start().await.unwrap();
        if let State::Running(running) = &*service.state.lock().await {
            running.acceptor.abort();
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert!(!service.stop().await);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let service = coordination_service(0);
        service.start().await.unwrap();
        service.stop().await;
        service.start().await.unwrap();
        assert!(service.is_running().await);
        service.stop().await;
    }
}
