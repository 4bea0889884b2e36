//! Call-frame builders - positional tuples and keyword dictionaries
//!
//! A call frame is transient: built immediately before one invocation and
//! dropped with it. Values stay typed until build time; the conversion
//! protocol erases them per entry, walking the packs strictly left-to-right.

use crate::convert::ToForeign;
use crate::error::{FailureKind, Result};
use crate::object::Object;
use crate::runtime::Runtime;

/// One keyword argument: a name bound to a not-yet-converted host value.
///
/// Constructed through [`kw`] or the [`kwargs!`](crate::kwargs) macro; a
/// name can never exist unbound.
#[derive(Clone, Copy)]
pub struct Kwarg<'a> {
    name: &'a str,
    value: &'a dyn ToForeign,
}

impl<'a> Kwarg<'a> {
    #[inline]
    pub fn key(&self) -> &'a str {
        self.name
    }

    #[inline]
    pub fn value(&self) -> &'a dyn ToForeign {
        self.value
    }
}

impl core::fmt::Debug for Kwarg<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Kwarg").field("name", &self.name).finish()
    }
}

/// Bind a keyword name to a value.
#[inline]
pub fn kw<'a>(name: &'a str, value: &'a dyn ToForeign) -> Kwarg<'a> {
    Kwarg { name, value }
}

/// The empty keyword set: calls with no keyword arguments are not errors.
pub const NO_KWARGS: &[Kwarg<'static>] = &[];

/// Build the positional tuple for one call: sized to the argument count,
/// element `i` converted and inserted at index `i`.
pub fn build_positional(rt: &Runtime, values: &[&dyn ToForeign]) -> Result<Object> {
    let tuple = rt.own_or_report(
        rt.backend().make_tuple(values.len()),
        FailureKind::Build,
        "positional tuple",
    )?;
    for (index, value) in values.iter().enumerate() {
        let converted = value.to_foreign(rt)?;
        // Tuple insertion steals the converted reference.
        if !rt.backend().tuple_set(tuple.raw(), index, converted.release()) {
            return Err(rt.report_failure(FailureKind::Build, "positional tuple"));
        }
    }
    Ok(tuple)
}

/// Build the keyword dictionary for one call.
///
/// Zero keywords yield `Ok(None)`, the explicit "no keyword arguments"
/// sentinel, distinct from a failed build. Otherwise entries are inserted in
/// declaration order; a duplicate key resolves last-write-wins under the
/// foreign dictionary's own semantics.
pub fn build_keyword(rt: &Runtime, kwargs: &[Kwarg<'_>]) -> Result<Option<Object>> {
    if kwargs.is_empty() {
        return Ok(None);
    }
    let dict = rt.own_or_report(
        rt.backend().make_dict(),
        FailureKind::Build,
        "keyword dictionary",
    )?;
    for kwarg in kwargs {
        let value = kwarg.value().to_foreign(rt)?;
        // The dictionary takes its own reference; `value` releases ours when
        // it drops at the end of this iteration.
        if !rt.backend().dict_set(dict.raw(), kwarg.key(), value.raw()) {
            return Err(rt.report_failure(FailureKind::Build, kwarg.key()));
        }
    }
    Ok(Some(dict))
}

/// Build a positional argument pack for [`invoke`](crate::call::invoke).
///
/// Expands to a `&[&dyn ToForeign]` borrowing its operands, so it is meant
/// to be written inline in the call expression.
#[macro_export]
macro_rules! args {
    () => {
        &[] as &[&dyn $crate::convert::ToForeign]
    };
    ($($value:expr),+ $(,)?) => {
        &[$(&$value as &dyn $crate::convert::ToForeign),+]
    };
}

/// Build a keyword argument pack: `kwargs!["label" => "sine", "lw" => 2]`.
///
/// Like [`args!`], the pack borrows its operands and is meant to be written
/// inline in the call expression.
#[macro_export]
macro_rules! kwargs {
    () => {
        &[] as &[$crate::args::Kwarg<'_>]
    };
    ($($name:expr => $value:expr),+ $(,)?) => {
        &[$($crate::args::kw($name, &$value)),+]
    };
}
