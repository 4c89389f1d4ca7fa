use lossyrpc_common::{OperationSig, RemoteObjectError};
use serde_json::Value;

/// Result of one stub call: the declared result values plus the failure slot.
///
/// A failed call still carries one value per declared result slot, each set
/// to its kind's zero value.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    values: Vec<Value>,
    failure: Option<RemoteObjectError>,
}

impl Outcome {
    pub fn ok(values: Vec<Value>) -> Self {
        Self {
            values,
            failure: None,
        }
    }

    /// Zero values for every result slot of `sig`, with `failure` populated.
    pub fn failed(sig: &OperationSig, failure: RemoteObjectError) -> Self {
        Self {
            values: sig.zero_values(),
            failure: Some(failure),
        }
    }

    /// The result as a single value.
    ///
    /// An operation with one value slot yields that bare value; any other
    /// shape yields the values as an array.
    pub fn value(&self) -> Value {
        match self.values.as_slice() {
            [single] => single.clone(),
            values => Value::Array(values.to_vec()),
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn failure(&self) -> Option<&RemoteObjectError> {
        self.failure.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }

    pub fn into_result(self) -> Result<Vec<Value>, RemoteObjectError> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self.values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lossyrpc_common::{FailureKind, ValueKind};
    use serde_json::json;

    #[test]
    fn test_single_slot_is_bare() {
        assert_eq!(Outcome::ok(vec![json!(8.0)]).value(), json!(8.0));
        assert_eq!(Outcome::ok(vec![json!(1), json!("a")]).value(), json!([1, "a"]));
        assert_eq!(Outcome::ok(vec![]).value(), json!([]));
    }

    #[test]
    fn test_failed_outcome_has_zero_values() {
        let sig = OperationSig::new("method")
            .param(ValueKind::Int)
            .returns(ValueKind::Int)
            .returns(ValueKind::Str)
            .fails();
        let outcome = Outcome::failed(&sig, RemoteObjectError::generic(FailureKind::Transport));

        assert!(!outcome.is_ok());
        assert_eq!(outcome.values(), &[json!(0), json!("")]);
        assert_eq!(outcome.failure().unwrap().message(), "remote object error");
        assert!(outcome.into_result().is_err());
    }
}
