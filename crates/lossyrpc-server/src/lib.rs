//! lossyrpc Server
//!
//! This crate binds a service object to an interface definition and serves it
//! over the unreliable transport.
//!
//! # Components
//!
//! - [`object`] - Service objects: typed operation tables built from closures
//! - [`dispatch`] - Name-to-handler dispatch with argument checks
//! - [`service`] - The `Service` lifecycle, acceptor and per-connection handlers
//! - [`coordination`] - A rendezvous object used to exercise concurrent calls
//!
//! # Example
//!
//! ```no_run
//! use lossyrpc_common::{InterfaceDef, OperationSig, ValueKind};
//! use lossyrpc_server::{RemoteObject, Service, ServiceObject};
//! use serde_json::json;
//!
//! struct Calculator;
//! impl RemoteObject for Calculator {}
//!
//! # async fn run() -> lossyrpc_common::Result<()> {
//! let iface = InterfaceDef::new("Calculator").operation(
//!     OperationSig::new("add")
//!         .param(ValueKind::Float)
//!         .param(ValueKind::Float)
//!         .returns(ValueKind::Float)
//!         .fails(),
//! );
//! let object = ServiceObject::new(Calculator)
//!     .operation("add", |_, args| Ok(vec![json!(args.f64(0)? + args.f64(1)?)]))
//!     .build();
//!
//! let service = Service::builder().interface(iface).object(object).port(9000).build()?;
//! service.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod coordination;
pub mod dispatch;
pub mod object;
pub mod service;

pub use coordination::{coordination_interface, Arrival, CoordinationObject, Rendezvous};
pub use dispatch::Dispatcher;
pub use object::{validate_service_object, Args, OpResult, RemoteObject, ServiceObject};
pub use service::{Service, ServiceBuilder};
