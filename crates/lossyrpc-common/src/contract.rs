//! Interface Contracts
//!
//! An [`InterfaceDef`] is the agreed set of remote operations shared by a
//! service and its stubs. Each operation declares its positional parameter
//! kinds and an ordered result shape. Every result shape must reserve at least
//! one [`ResultSlot::Failure`] slot for a
//! [`RemoteObjectError`](crate::protocol::RemoteObjectError); this is checked
//! once, at registration, by [`validate_interface`].
//!
//! # Example
//!
//! ```
//! use lossyrpc_common::contract::{InterfaceDef, OperationSig, ValueKind, validate_interface};
//!
//! let calculator = InterfaceDef::new("Calculator")
//!     .operation(
//!         OperationSig::new("add")
//!             .param(ValueKind::Float)
//!             .param(ValueKind::Float)
//!             .returns(ValueKind::Float)
//!             .fails(),
//!     )
//!     .operation(OperationSig::new("usage").returns(ValueKind::Int).fails());
//!
//! assert!(validate_interface(&calculator).is_ok());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::protocol::error::{LossyrpcError, Result};

/// Shape of a single argument or result value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
    /// Any JSON value, including null
    Any,
}

impl ValueKind {
    /// The neutral value a stub returns for this slot when a call fails.
    pub fn zero(&self) -> Value {
        match self {
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Int => Value::from(0),
            ValueKind::Float => Value::from(0.0),
            ValueKind::Str => Value::String(String::new()),
            ValueKind::List => Value::Array(Vec::new()),
            ValueKind::Map => Value::Object(serde_json::Map::new()),
            ValueKind::Any => Value::Null,
        }
    }

    /// Whether `value` fits this slot. `Float` accepts any JSON number.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ValueKind::Bool => value.is_boolean(),
            ValueKind::Int => value.is_i64() || value.is_u64(),
            ValueKind::Float => value.is_number(),
            ValueKind::Str => value.is_string(),
            ValueKind::List => value.is_array(),
            ValueKind::Map => value.is_object(),
            ValueKind::Any => true,
        }
    }
}

/// One slot of an operation's declared result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResultSlot {
    Value(ValueKind),
    /// Reserved for the operation's `RemoteObjectError`
    Failure,
}

/// Signature of one remote operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationSig {
    pub name: String,
    pub params: Vec<ValueKind>,
    pub results: Vec<ResultSlot>,
}

impl OperationSig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn param(mut self, kind: ValueKind) -> Self {
        self.params.push(kind);
        self
    }

    pub fn returns(mut self, kind: ValueKind) -> Self {
        self.results.push(ResultSlot::Value(kind));
        self
    }

    /// Appends the failure-indicator slot.
    pub fn fails(mut self) -> Self {
        self.results.push(ResultSlot::Failure);
        self
    }

    /// Kinds of the non-failure result slots, in declaration order.
    pub fn value_slots(&self) -> impl Iterator<Item = ValueKind> + '_ {
        self.results.iter().filter_map(|slot| match slot {
            ResultSlot::Value(kind) => Some(*kind),
            ResultSlot::Failure => None,
        })
    }

    pub fn value_slot_count(&self) -> usize {
        self.value_slots().count()
    }

    pub fn has_failure_slot(&self) -> bool {
        self.results.contains(&ResultSlot::Failure)
    }

    /// Zero-valued results for every value slot.
    pub fn zero_values(&self) -> Vec<Value> {
        self.value_slots().map(|kind| kind.zero()).collect()
    }

    /// Checks positional arguments against the declared parameters.
    pub fn check_args(&self, args: &[Value]) -> Result<()> {
        if args.len() != self.params.len() {
            return Err(LossyrpcError::Dispatch(format!(
                "`{}` takes {} argument(s), got {}",
                self.name,
                self.params.len(),
                args.len()
            )));
        }
        for (index, (kind, value)) in self.params.iter().zip(args).enumerate() {
            if !kind.accepts(value) {
                return Err(LossyrpcError::Dispatch(format!(
                    "`{}` argument {} expected {:?}, got {}",
                    self.name, index, kind, value
                )));
            }
        }
        Ok(())
    }

    /// Checks returned values against the declared value slots.
    pub fn check_results(&self, values: &[Value]) -> Result<()> {
        let expected = self.value_slot_count();
        if values.len() != expected {
            return Err(LossyrpcError::Protocol(format!(
                "`{}` declares {} result value(s), got {}",
                self.name,
                expected,
                values.len()
            )));
        }
        for (kind, value) in self.value_slots().zip(values) {
            if !kind.accepts(value) {
                return Err(LossyrpcError::Protocol(format!(
                    "`{}` result expected {:?}, got {}",
                    self.name, kind, value
                )));
            }
        }
        Ok(())
    }
}

/// A named set of remote operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterfaceDef {
    pub name: String,
    pub operations: Vec<OperationSig>,
}

impl InterfaceDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: Vec::new(),
        }
    }

    pub fn operation(mut self, sig: OperationSig) -> Self {
        self.operations.push(sig);
        self
    }

    pub fn get(&self, name: &str) -> Option<&OperationSig> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.iter().map(|op| op.name.as_str())
    }
}

/// Validates an interface definition for remote use.
///
/// Fails with [`LossyrpcError::Validation`] unless the definition is
/// structured (named, with at least one uniquely named operation, none of
/// them reserved `_`-prefixed names) and every operation's result shape
/// includes the failure-indicator slot.
pub fn validate_interface(def: &InterfaceDef) -> Result<()> {
    if def.name.trim().is_empty() {
        return Err(LossyrpcError::Validation(
            "interface definition has no name".to_string(),
        ));
    }
    if def.operations.is_empty() {
        return Err(LossyrpcError::Validation(format!(
            "interface `{}` declares no operations",
            def.name
        )));
    }

    let mut seen = HashSet::new();
    for op in &def.operations {
        if op.name.trim().is_empty() {
            return Err(LossyrpcError::Validation(format!(
                "interface `{}` has an unnamed operation",
                def.name
            )));
        }
        if op.name.starts_with('_') {
            return Err(LossyrpcError::Validation(format!(
                "operation `{}` uses a reserved name",
                op.name
            )));
        }
        if !seen.insert(op.name.as_str()) {
            return Err(LossyrpcError::Validation(format!(
                "operation `{}` is declared more than once",
                op.name
            )));
        }
        if !op.has_failure_slot() {
            return Err(LossyrpcError::Validation(format!(
                "operation `{}` does not return a RemoteObjectError",
                op.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn calculator() -> InterfaceDef {
        InterfaceDef::new("Calculator")
            .operation(
                OperationSig::new("add")
                    .param(ValueKind::Float)
                    .param(ValueKind::Float)
                    .returns(ValueKind::Float)
                    .fails(),
            )
            .operation(
                OperationSig::new("divide")
                    .param(ValueKind::Float)
                    .param(ValueKind::Float)
                    .returns(ValueKind::Float)
                    .fails(),
            )
    }

    #[test]
    fn test_valid_interface() {
        assert!(validate_interface(&calculator()).is_ok());
    }

    #[test]
    fn test_missing_failure_slot_rejected() {
        let bad = InterfaceDef::new("Bad").operation(
            OperationSig::new("method")
                .param(ValueKind::Int)
                .param(ValueKind::Bool)
                .returns(ValueKind::Int)
                .returns(ValueKind::Str),
        );
        let err = validate_interface(&bad).unwrap_err();
        assert!(matches!(err, LossyrpcError::Validation(_)));
        assert!(err.to_string().contains("RemoteObjectError"));
    }

    #[test]
    fn test_empty_interface_rejected() {
        let err = validate_interface(&InterfaceDef::new("Empty")).unwrap_err();
        assert!(matches!(err, LossyrpcError::Validation(_)));
    }

    #[test]
    fn test_duplicate_operation_rejected() {
        let dup = calculator().operation(OperationSig::new("add").fails());
        assert!(matches!(
            validate_interface(&dup),
            Err(LossyrpcError::Validation(_))
        ));
    }

    #[test]
    fn test_reserved_name_rejected() {
        let reserved = InterfaceDef::new("Reserved").operation(OperationSig::new("_private").fails());
        assert!(validate_interface(&reserved).is_err());
    }

    #[test]
    fn test_failure_only_result_is_valid() {
        let rendezvous = InterfaceDef::new("Sync").operation(OperationSig::new("rendezvous").fails());
        assert!(validate_interface(&rendezvous).is_ok());
    }

    #[test]
    fn test_zero_values_skip_failure_slot() {
        let sig = OperationSig::new("divide")
            .returns(ValueKind::Float)
            .returns(ValueKind::Str)
            .fails();
        assert_eq!(sig.zero_values(), vec![json!(0.0), json!("")]);
        assert_eq!(sig.value_slot_count(), 2);
    }

    #[test]
    fn test_check_args() {
        let iface = calculator();
        let add = iface.get("add").unwrap();
        assert!(add.check_args(&[json!(5), json!(3.5)]).is_ok());
        assert!(add.check_args(&[json!(5)]).is_err());
        assert!(add.check_args(&[json!("5"), json!(3)]).is_err());
    }

    #[test]
    fn test_check_results() {
        let iface = calculator();
        let add = iface.get("add").unwrap();
        assert!(add.check_results(&[json!(8.0)]).is_ok());
        assert!(add.check_results(&[]).is_err());
        assert!(add.check_results(&[json!(true)]).is_err());
    }

    #[test]
    fn test_value_kind_accepts() {
        assert!(ValueKind::Float.accepts(&json!(8)));
        assert!(ValueKind::Int.accepts(&json!(8)));
        assert!(!ValueKind::Int.accepts(&json!(8.5)));
        assert!(ValueKind::Any.accepts(&json!(null)));
        assert!(!ValueKind::Str.accepts(&json!(null)));
    }
}
