//! Foreign object handle - RAII ownership of one foreign reference
//!
//! Every `Object` owns exactly one reference-count unit of a foreign value:
//! cloning increments and shares, moving transfers, dropping decrements.
//! Handles are non-null by construction; "no object" is expressed as
//! `Option<Object>` or `Result` at API boundaries, never as an empty handle.
//!
//! The handle carries a [`Runtime`] clone, so the decrement in `Drop` can
//! never run against a torn-down runtime.

use crate::args::Kwarg;
use crate::call::invoke;
use crate::convert::ToForeign;
use crate::error::{FailureKind, Result};
use crate::runtime::{RawObject, Runtime};

/// Owning handle to a foreign runtime object.
pub struct Object {
    runtime: Runtime,
    raw: RawObject,
}

impl Object {
    /// Adopt a reference the caller already owns. No increment happens; the
    /// handle will perform the matching decrement on drop.
    ///
    /// Panics on `NULL`; failures must be routed through
    /// `Runtime::own_or_report` before a handle is made.
    pub(crate) fn from_owned(runtime: Runtime, raw: RawObject) -> Self {
        assert!(!raw.is_null(), "handle constructed from a null reference");
        Self { runtime, raw }
    }

    /// Wrap a reference borrowed from the foreign runtime: increments once,
    /// producing an independently owning handle.
    pub fn from_borrowed(runtime: Runtime, raw: RawObject) -> Self {
        runtime.backend().incref(raw);
        Self::from_owned(runtime, raw)
    }

    /// The raw reference, still owned by this handle.
    #[inline]
    pub fn raw(&self) -> RawObject {
        self.raw
    }

    /// The runtime this object lives in.
    #[inline]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Hand the single owned reference to a consumer that steals references
    /// (list/tuple insertion). The handle is consumed without decrementing.
    pub fn release(self) -> RawObject {
        let raw = self.raw;
        std::mem::forget(self);
        raw
    }

    /// Look up an attribute, returning an owning handle.
    pub fn getattr(&self, name: &str) -> Result<Object> {
        let raw = self.runtime.backend().getattr(self.raw, name);
        self.runtime.own_or_report(raw, FailureKind::Call, name)
    }

    /// Invoke a method on this object. See [`crate::call::invoke`].
    pub fn invoke(
        &self,
        method: &str,
        args: &[&dyn ToForeign],
        kwargs: &[Kwarg<'_>],
    ) -> Result<Object> {
        invoke(self, method, args, kwargs)
    }

    // Read-back -------------------------------------------------------------

    /// Truthiness under the foreign runtime's rules.
    pub fn truthy(&self) -> bool {
        self.runtime.backend().is_truthy(self.raw)
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.runtime.backend().as_int(self.raw)
    }

    pub fn to_f64(&self) -> Option<f64> {
        self.runtime.backend().as_float(self.raw)
    }

    pub fn to_text(&self) -> Option<String> {
        self.runtime.backend().as_str(self.raw)
    }

    /// Sequence length, `None` for non-sequences.
    pub fn seq_len(&self) -> Option<usize> {
        self.runtime.backend().seq_len(self.raw)
    }

    /// Sequence element as an owning handle.
    pub fn item(&self, index: usize) -> Result<Object> {
        let raw = self.runtime.backend().seq_get(self.raw, index);
        self.runtime.own_or_report(raw, FailureKind::Call, "__getitem__")
    }
}

impl Clone for Object {
    fn clone(&self) -> Self {
        self.runtime.backend().incref(self.raw);
        Self {
            runtime: self.runtime.clone(),
            raw: self.raw,
        }
    }
}

impl Drop for Object {
    fn drop(&mut self) {
        self.runtime.backend().decref(self.raw);
    }
}

impl core::fmt::Debug for Object {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Object")
            .field("raw", &self.raw.bits())
            .field("refcount", &self.runtime.backend().refcount(self.raw))
            .finish()
    }
}
