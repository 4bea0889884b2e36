//! Foreign runtime boundary
//!
//! Architecture:
//! - `backend.rs` - the object-safe surface of the foreign C API
//! - `cpython.rs` - embedded CPython backend (feature `python`)
//! - `mock.rs` - in-memory reference-counted backend for tests and benches
//!
//! A [`Runtime`] is a cheap clone (`Arc`-backed) bundling one backend with
//! the swappable failure observer. Handles carry a clone, so the backend can
//! never be torn down while a reference into it is still owned; the
//! lifecycle guarantee is structural, not checked.

mod backend;
#[cfg(feature = "python")]
mod cpython;
mod mock;

pub use backend::{RawObject, RuntimeBackend};
#[cfg(feature = "python")]
pub use cpython::CPython;
pub use mock::{MockRuntime, NativeFn};

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{default_observer, Error, FailureKind, FailureReport, Observer, Result};
use crate::object::Object;

struct Inner {
    backend: Box<dyn RuntimeBackend>,
    observer: Mutex<Observer>,
}

/// Handle to the embedded foreign runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<Inner>,
}

impl Runtime {
    /// Wrap a backend. The backend is expected to be fully initialized; the
    /// production backend initializes the interpreter in its constructor and
    /// treats failure there as fatal.
    pub fn new(backend: impl RuntimeBackend + 'static) -> Self {
        tracing::debug!(event = "runtime_attach", backend = backend.name());
        Self {
            inner: Arc::new(Inner {
                backend: Box::new(backend),
                observer: Mutex::new(default_observer()),
            }),
        }
    }

    /// Process-wide runtime over the embedded interpreter.
    ///
    /// Idempotent: the first call initializes the interpreter, later calls
    /// return the same runtime. Initialization failure is fatal (panics):
    /// it indicates a misconfigured host environment, not a transient
    /// condition. Not designed for concurrent first-time initialization.
    #[cfg(feature = "python")]
    pub fn global() -> &'static Runtime {
        use once_cell::sync::OnceCell;
        static GLOBAL: OnceCell<Runtime> = OnceCell::new();
        GLOBAL.get_or_init(|| Runtime::new(CPython::bootstrap()))
    }

    /// The backend this runtime drives.
    pub fn backend(&self) -> &dyn RuntimeBackend {
        self.inner.backend.as_ref()
    }

    // Observer --------------------------------------------------------------

    /// Replace the failure observer, returning the previous one.
    pub fn swap_observer(&self, observer: Observer) -> Observer {
        std::mem::replace(&mut *self.inner.observer.lock(), observer)
    }

    /// Install `observer` for the lifetime of the returned guard; the
    /// previous observer is restored on drop, on unwind included.
    pub fn scoped_observer(&self, observer: Observer) -> ObserverGuard {
        let previous = self.swap_observer(observer);
        ObserverGuard {
            runtime: self.clone(),
            previous: Some(previous),
        }
    }

    /// Funnel one failing foreign operation: fetch-and-clear the sticky
    /// foreign error, notify the observer exactly once, and hand back the
    /// error for the caller to return.
    pub(crate) fn report_failure(&self, kind: FailureKind, context: &str) -> Error {
        let report = FailureReport {
            kind,
            context: context.to_string(),
            diagnostic: self.inner.backend.take_error(),
        };
        // Clone the hook out of the slot so an observer may itself swap
        // observers without deadlocking.
        let observer = Arc::clone(&*self.inner.observer.lock());
        observer(&report);
        Error::from_report(&report)
    }

    /// Adopt a backend result: a non-null reference becomes an owning
    /// handle, NULL is reported as a failure of the given kind.
    pub(crate) fn own_or_report(
        &self,
        raw: RawObject,
        kind: FailureKind,
        context: &str,
    ) -> Result<Object> {
        if raw.is_null() {
            Err(self.report_failure(kind, context))
        } else {
            Ok(Object::from_owned(self.clone(), raw))
        }
    }
}

impl core::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Runtime")
            .field("backend", &self.inner.backend.name())
            .finish()
    }
}

/// Restores the previously installed observer when dropped.
#[must_use = "dropping the guard immediately restores the previous observer"]
pub struct ObserverGuard {
    runtime: Runtime,
    previous: Option<Observer>,
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.runtime.swap_observer(previous);
        }
    }
}
