//! Invocation protocol - one attribute lookup, one call
//!
//! Stateless per call, no retries. Attribute lookup and tuple construction
//! are sequenced before the call so a failure short-circuits with no partial
//! side effects in the foreign runtime. "Attribute missing", "callee
//! raised" and "callee returned nothing" all collapse into one call-failure
//! signal; the fetched diagnostic text carries the difference for humans.

use crate::args::{build_keyword, build_positional, Kwarg};
use crate::convert::ToForeign;
use crate::error::{FailureKind, Result};
use crate::object::Object;
use crate::runtime::RawObject;

/// Invoke `method` on `target` with positional and keyword argument packs.
///
/// An empty `kwargs` slice is the "no keyword arguments" case and behaves
/// identically to an explicitly empty keyword set. The result is returned as
/// an owning handle; every failure path fires the failure observer exactly
/// once and surfaces as `Err`.
pub fn invoke(
    target: &Object,
    method: &str,
    args: &[&dyn ToForeign],
    kwargs: &[Kwarg<'_>],
) -> Result<Object> {
    let rt = target.runtime();
    tracing::trace!(
        event = "invoke",
        method,
        args = args.len(),
        kwargs = kwargs.len(),
    );

    // Resolve before building: a missing attribute must not convert anything.
    let function = target.getattr(method)?;
    let positional = build_positional(rt, args)?;
    let keyword = build_keyword(rt, kwargs)?;

    let raw = rt.backend().call(
        function.raw(),
        positional.raw(),
        keyword.as_ref().map_or(RawObject::NULL, |dict| dict.raw()),
    );
    rt.own_or_report(raw, FailureKind::Call, method)
}
