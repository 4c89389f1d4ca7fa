//! Rendezvous Coordination
//!
//! A small service object used to exercise concurrent calls against one
//! service. Its `rendezvous` operation is a two-party meeting point: the first
//! caller to arrive raises the `woken` flag and releases the signal, and every
//! later caller waits on that signal before returning.
//!
//! The wait goes through a [`Condvar`] bound to the same mutex that guards the
//! flag, so the lock is released atomically while a caller is blocked and no
//! arrival can ever deadlock on it.

use lossyrpc_common::{InterfaceDef, OperationSig, ValueKind};
use serde_json::json;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::object::{RemoteObject, ServiceObject};

#[derive(Debug, Default)]
struct RendezvousState {
    woken: bool,
    released: bool,
}

/// Which side of the rendezvous a caller ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// Raised the flag and released the signal
    First,
    /// Found the flag raised and waited for the signal
    Later,
}

/// Two-party synchronization point.
#[derive(Debug, Default)]
pub struct Rendezvous {
    state: Mutex<RendezvousState>,
    signal: Condvar,
}

impl Rendezvous {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RendezvousState> {
        // The state is two booleans; a panicked holder cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arrives at the meeting point.
    ///
    /// The first caller returns immediately; later callers block until the
    /// signal has been released.
    pub fn arrive(&self) -> Arrival {
        let mut state = self.lock();
        if !state.woken {
            state.woken = true;
            state.released = true;
            self.signal.notify_all();
            tracing::debug!("Rendezvous: first arrival");
            return Arrival::First;
        }

        let _released = self
            .signal
            .wait_while(state, |s| !s.released)
            .unwrap_or_else(PoisonError::into_inner);
        tracing::debug!("Rendezvous: later arrival released");
        Arrival::Later
    }

    /// Like [`Rendezvous::arrive`], but a later caller gives up after
    /// `timeout`. Returns `None` if the signal was not released in time.
    #[cfg(test)]
    fn arrive_timeout(&self, timeout: std::time::Duration) -> Option<Arrival> {
        let mut state = self.lock();
        if !state.woken {
            state.woken = true;
            state.released = true;
            self.signal.notify_all();
            return Some(Arrival::First);
        }

        let (_state, result) = self
            .signal
            .wait_timeout_while(state, timeout, |s| !s.released)
            .unwrap_or_else(PoisonError::into_inner);
        (!result.timed_out()).then_some(Arrival::Later)
    }

    /// Releases the signal without arriving.
    #[cfg(test)]
    fn wake(&self) {
        let mut state = self.lock();
        state.released = true;
        self.signal.notify_all();
    }

    /// Returns to the initial state. Callers already waiting stay blocked
    /// until the next release.
    #[cfg(test)]
    fn reset(&self) {
        let mut state = self.lock();
        state.woken = false;
        state.released = false;
    }

    pub fn is_woken(&self) -> bool {
        self.lock().woken
    }
}

/// Service object exposing a [`Rendezvous`] and an echo-style `method`.
#[derive(Debug, Default)]
pub struct CoordinationObject {
    rendezvous: Rendezvous,
    calls: Mutex<u64>,
}

impl RemoteObject for CoordinationObject {}

impl CoordinationObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rendezvous(&self) -> &Rendezvous {
        &self.rendezvous
    }

    /// Echoes `value`, or its negation with an error text when `return_error`
    /// is set.
    pub fn method(&self, value: i64, return_error: bool) -> (i64, String) {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        *calls += 1;
        if return_error {
            (-value, format!("Error for value {}", value))
        } else {
            (value, String::new())
        }
    }

    /// Number of times `method` has run.
    pub fn method_calls(&self) -> u64 {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builds the operation table for [`coordination_interface`].
    pub fn into_service_object(self: Arc<Self>) -> ServiceObject {
        ServiceObject::shared(self)
            .operation("method", |obj, args| {
                let (value, text) = obj.method(args.i64(0)?, args.bool(1)?);
                Ok(vec![json!(value), json!(text)])
            })
            .operation("rendezvous", |obj, _| {
                obj.rendezvous.arrive();
                Ok(vec![])
            })
            .build()
    }
}

/// Interface served by [`CoordinationObject`]:
///
/// - `method(value: Int, return_error: Bool) -> (Int, Str, Failure)`
/// - `rendezvous() -> (Failure)`
pub fn coordination_interface() -> InterfaceDef {
    InterfaceDef::new("Coordination")
        .operation(
            OperationSig::new("method")
                .param(ValueKind::Int)
                .param(ValueKind::Bool)
                .returns(ValueKind::Int)
                .returns(ValueKind::Str)
                .fails(),
        )
        .operation(OperationSig::new("rendezvous").fails())
}
