//! Service Objects
//!
//! A [`ServiceObject`] is the concrete, stateful implementation behind a
//! service: one value of a type implementing [`RemoteObject`], plus an
//! explicit table mapping each operation name to a typed handler closure.
//!
//! Handlers receive a shared reference to the object and the positional
//! arguments of the call. Objects that need to mutate state use interior
//! mutability, since several connections may invoke operations at once.

use lossyrpc_common::protocol::error::{LossyrpcError, Result};
use lossyrpc_common::{FailureKind, RemoteObjectError};
use serde_json::Value;
use std::any::type_name;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Marker for types that may back a service.
///
/// Only types defined in the implementing crate can opt in, so primitives
/// and std collections are never accepted as service objects.
pub trait RemoteObject: Send + Sync + 'static {}

/// What a handler returns: the declared result values, or the failure slot.
pub type OpResult = std::result::Result<Vec<Value>, RemoteObjectError>;

pub(crate) type Handler = Arc<dyn Fn(Args) -> OpResult + Send + Sync>;

/// Positional arguments of one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn f64(&self, index: usize) -> std::result::Result<f64, RemoteObjectError> {
        self.get(index)
            .and_then(Value::as_f64)
            .ok_or_else(|| Self::mismatch(index, "a number"))
    }

    pub fn i64(&self, index: usize) -> std::result::Result<i64, RemoteObjectError> {
        self.get(index)
            .and_then(Value::as_i64)
            .ok_or_else(|| Self::mismatch(index, "an integer"))
    }

    pub fn bool(&self, index: usize) -> std::result::Result<bool, RemoteObjectError> {
        self.get(index)
            .and_then(Value::as_bool)
            .ok_or_else(|| Self::mismatch(index, "a boolean"))
    }

    pub fn str(&self, index: usize) -> std::result::Result<&str, RemoteObjectError> {
        self.get(index)
            .and_then(Value::as_str)
            .ok_or_else(|| Self::mismatch(index, "a string"))
    }

    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }

    fn mismatch(index: usize, expected: &str) -> RemoteObjectError {
        RemoteObjectError::new(
            FailureKind::Dispatch,
            format!("argument {} is not {}", index, expected),
        )
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// A service object together with its operation table.
pub struct ServiceObject {
    type_name: &'static str,
    handlers: Vec<(String, Handler)>,
}

impl ServiceObject {
    /// Starts an operation table for `object`.
    pub fn new<T: RemoteObject>(object: T) -> ServiceObjectBuilder<T> {
        Self::shared(Arc::new(object))
    }

    /// Like [`ServiceObject::new`], for an object the caller keeps a handle to.
    pub fn shared<T: RemoteObject>(object: Arc<T>) -> ServiceObjectBuilder<T> {
        ServiceObjectBuilder {
            object,
            handlers: Vec::new(),
        }
    }

    /// Name of the concrete type behind this object.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub(crate) fn into_handlers(self) -> Vec<(String, Handler)> {
        self.handlers
    }
}

impl fmt::Debug for ServiceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceObject")
            .field("type_name", &self.type_name)
            .field("operations", &self.operation_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder returned by [`ServiceObject::new`].
pub struct ServiceObjectBuilder<T> {
    object: Arc<T>,
    handlers: Vec<(String, Handler)>,
}

impl<T: RemoteObject> ServiceObjectBuilder<T> {
    /// Binds `name` to a handler over the object.
    pub fn operation<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&T, Args) -> OpResult + Send + Sync + 'static,
    {
        let object = Arc::clone(&self.object);
        let handler: Handler = Arc::new(move |args| handler(&object, args));
        self.handlers.push((name.into(), handler));
        self
    }

    pub fn build(self) -> ServiceObject {
        ServiceObject {
            type_name: type_name::<T>(),
            handlers: self.handlers,
        }
    }
}

/// Validates a service object for remote use.
///
/// Fails with [`LossyrpcError::Validation`] unless the object exposes at least
/// one operation and no operation name is bound twice.
pub fn validate_service_object(object: &ServiceObject) -> Result<()> {
    if object.is_empty() {
        return Err(LossyrpcError::Validation(format!(
            "service object `{}` exposes no operations",
            object.type_name()
        )));
    }

    let mut seen = HashSet::new();
    for name in object.operation_names() {
        if name.trim().is_empty() {
            return Err(LossyrpcError::Validation(format!(
                "service object `{}` binds an unnamed operation",
                object.type_name()
            )));
        }
        if !seen.insert(name) {
            return Err(LossyrpcError::Validation(format!(
                "operation `{}` is bound more than once on `{}`",
                name,
                object.type_name()
            )));
        }
    }
    Ok(())
}
