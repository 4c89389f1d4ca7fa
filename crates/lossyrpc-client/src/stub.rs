//! Stub Factory
//!
//! A [`Stub`] is generated from an [`InterfaceDef`] at runtime: it holds one
//! [`RemoteOperation`] per declared operation, each sharing the same
//! [`Endpoint`]. Argument and result shapes are checked against the declared
//! signature on every call, so a mismatched service shows up as a failure
//! outcome instead of a wrongly typed value.

use lossyrpc_common::protocol::error::Result;
use lossyrpc_common::transport::FaultConfig;
use lossyrpc_common::{
    validate_interface, FailureKind, InterfaceDef, OperationSig, RemoteObjectError, Request,
};
use serde_json::Value;
use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::outcome::Outcome;

/// One remote operation bound to an endpoint.
#[derive(Debug, Clone)]
pub struct RemoteOperation {
    sig: OperationSig,
    endpoint: Arc<Endpoint>,
}

impl RemoteOperation {
    pub fn name(&self) -> &str {
        &self.sig.name
    }

    pub fn signature(&self) -> &OperationSig {
        &self.sig
    }

    /// Calls the operation with positional arguments.
    ///
    /// Arguments that do not match the declared parameters fail with an
    /// `Encoding` failure before any connection is opened. Exchange failures
    /// carry the generic "remote object error" message and the kind of the
    /// underlying error. A failed reply carries the service's own message.
    pub async fn call(&self, args: Vec<Value>) -> Outcome {
        if let Err(e) = self.sig.check_args(&args) {
            tracing::debug!("Not sending `{}`: {}", self.sig.name, e);
            return Outcome::failed(&self.sig, RemoteObjectError::generic(FailureKind::Encoding));
        }

        let request = Request::new(self.sig.name.clone(), args);
        let reply = match self.endpoint.exchange(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!("`{}` on {} failed: {}", self.sig.name, self.endpoint.target(), e);
                return Outcome::failed(&self.sig, RemoteObjectError::generic(FailureKind::from(&e)));
            }
        };

        if let Some(failure) = reply.to_failure() {
            return Outcome::failed(&self.sig, failure);
        }
        let values = match reply.result {
            Some(values) => values,
            None => {
                tracing::debug!("`{}` replied success without a result", self.sig.name);
                return Outcome::failed(&self.sig, RemoteObjectError::generic(FailureKind::Protocol));
            }
        };
        if let Err(e) = self.sig.check_results(&values) {
            tracing::debug!("`{}` reply does not match its signature: {}", self.sig.name, e);
            return Outcome::failed(&self.sig, RemoteObjectError::generic(FailureKind::Protocol));
        }
        Outcome::ok(values)
    }
}

/// Client-side proxy for an interface.
#[derive(Debug, Clone)]
pub struct Stub {
    interface_name: String,
    endpoint: Arc<Endpoint>,
    operations: Vec<RemoteOperation>,
}

impl Stub {
    /// Generates a stub for `interface` at `target` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the interface is invalid and `Config` if the
    /// fault settings are. No connection is made.
    pub fn new(interface: InterfaceDef, target: impl Into<String>, faults: FaultConfig) -> Result<Self> {
        Self::with_endpoint(interface, Endpoint::new(target, faults))
    }

    /// Like [`Stub::new`], with a fully configured endpoint.
    pub fn with_endpoint(interface: InterfaceDef, endpoint: Endpoint) -> Result<Self> {
        validate_interface(&interface)?;
        endpoint.validate()?;

        let endpoint = Arc::new(endpoint);
        let operations = interface
            .operations
            .into_iter()
            .map(|sig| RemoteOperation {
                sig,
                endpoint: Arc::clone(&endpoint),
            })
            .collect();

        Ok(Self {
            interface_name: interface.name,
            endpoint,
            operations,
        })
    }

    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn get(&self, name: &str) -> Option<&RemoteOperation> {
        self.operations.iter().find(|op| op.name() == name)
    }

    pub fn operations(&self) -> &[RemoteOperation] {
        &self.operations
    }

    /// Calls the named operation.
    ///
    /// A name the interface does not declare yields a `Dispatch` failure with
    /// no values and no I/O.
    pub async fn call(&self, name: &str, args: Vec<Value>) -> Outcome {
        match self.get(name) {
            Some(op) => op.call(args).await,
            None => {
                tracing::debug!("`{}` declares no operation `{}`", self.interface_name, name);
                Outcome::failed(
                    &OperationSig::new(name),
                    RemoteObjectError::generic(FailureKind::Dispatch),
                )
            }
        }
    }
}
