//! Request Dispatch
//!
//! The [`Dispatcher`] is the explicit operation table a service serves from.
//! It is built once, at registration, after both the interface and the
//! service object have been validated and matched against each other.

use lossyrpc_common::protocol::error::{LossyrpcError, Result};
use lossyrpc_common::{
    validate_interface, InterfaceDef, OperationSig, RemoteObjectError, Reply, Request,
};
use std::collections::HashMap;

use crate::object::{validate_service_object, Args, Handler, ServiceObject};

struct Route {
    sig: OperationSig,
    handler: Handler,
}

/// Maps operation names to their signature and handler.
pub struct Dispatcher {
    interface_name: String,
    object_type: &'static str,
    routes: HashMap<String, Route>,
}

impl Dispatcher {
    /// Pairs every declared operation with the object's handler for it.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if either input fails validation, if the object
    /// lacks a handler for a declared operation, or if it binds an operation
    /// the interface does not declare.
    pub fn new(interface: InterfaceDef, object: ServiceObject) -> Result<Self> {
        validate_interface(&interface)?;
        validate_service_object(&object)?;

        let object_type = object.type_name();
        let mut handlers: HashMap<String, Handler> = object.into_handlers().into_iter().collect();

        let mut routes = HashMap::with_capacity(interface.operations.len());
        for sig in interface.operations {
            let handler = handlers.remove(&sig.name).ok_or_else(|| {
                LossyrpcError::Validation(format!(
                    "`{}` does not implement `{}.{}`",
                    object_type, interface.name, sig.name
                ))
            })?;
            routes.insert(sig.name.clone(), Route { sig, handler });
        }

        if let Some(extra) = handlers.keys().next() {
            return Err(LossyrpcError::Validation(format!(
                "`{}` binds `{}`, which `{}` does not declare",
                object_type, extra, interface.name
            )));
        }

        Ok(Self {
            interface_name: interface.name,
            object_type,
            routes,
        })
    }

    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    pub fn object_type(&self) -> &'static str {
        self.object_type
    }

    pub fn contains(&self, method: &str) -> bool {
        self.routes.contains_key(method)
    }

    /// Invokes the operation named by `request`.
    ///
    /// Blocking handlers run on tokio's blocking pool. Whatever the handler
    /// does, a dispatched request always yields a reply:
    ///
    /// - `Ok(values)` of the declared shape becomes a success reply
    /// - `Ok(values)` of any other shape becomes an `Application` failure
    /// - `Err(failure)` is carried in the reply as is
    /// - a panic becomes an `Application` failure
    ///
    /// # Errors
    ///
    /// Returns `Dispatch` if the operation is unknown or the arguments do not
    /// match its parameters. Nothing is invoked in that case.
    pub async fn dispatch(&self, request: Request) -> Result<Reply> {
        let route = self.routes.get(&request.method).ok_or_else(|| {
            LossyrpcError::Dispatch(format!(
                "`{}` has no operation `{}`",
                self.interface_name, request.method
            ))
        })?;
        route.sig.check_args(&request.args)?;

        let handler = route.handler.clone();
        let args = Args::new(request.args);
        let outcome = match tokio::task::spawn_blocking(move || handler(args)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Operation `{}` panicked: {}", request.method, e);
                return Ok(Reply::failure(RemoteObjectError::application(
                    "operation panicked",
                )));
            }
        };

        Ok(match outcome {
            Ok(values) => match route.sig.check_results(&values) {
                Ok(()) => Reply::success(values),
                Err(e) => {
                    tracing::warn!("Operation `{}` returned a bad shape: {}", request.method, e);
                    Reply::failure(RemoteObjectError::application(e.to_string()))
                }
            },
            Err(failure) => Reply::failure(failure),
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("interface", &self.interface_name)
            .field("object", &self.object_type)
            .field("operations", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}
