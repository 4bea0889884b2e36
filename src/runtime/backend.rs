//! Backend contract - the narrow surface of the foreign C API
//!
//! The binding core never touches the embedded interpreter directly; it goes
//! through this object-safe trait. Reference-ownership rules follow the
//! CPython C API exactly:
//! - constructors and `getattr`/`call`/`import`/`seq_get` return a **new**
//!   reference, or [`RawObject::NULL`] with the sticky error state set;
//! - `list_set` and `tuple_set` **steal** the value reference, on failure as
//!   well as on success;
//! - `dict_set` borrows the value (the dictionary adds its own reference).

/// Untyped reference to a foreign object.
///
/// For the embedded-interpreter backend this is the object pointer; for the
/// in-memory backend it is a registry id. Zero is the null value used to
/// signal "no result" across the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawObject(usize);

impl RawObject {
    /// The null reference: no object, a failure marker.
    pub const NULL: RawObject = RawObject(0);

    #[inline]
    pub const fn from_bits(bits: usize) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// The foreign runtime as seen by the binding core.
///
/// Implementations must keep the sticky error state coherent: any operation
/// that returns `NULL` (or `false`) must leave a pending error that
/// [`take_error`](RuntimeBackend::take_error) can fetch and clear.
pub trait RuntimeBackend: Send + Sync {
    /// Short backend identifier used in logs.
    fn name(&self) -> &'static str;

    // Reference counting ----------------------------------------------------

    /// Increment the reference count. Null-safe (no-op for `NULL`).
    fn incref(&self, obj: RawObject);

    /// Decrement the reference count, destroying the object when it reaches
    /// zero. Null-safe (no-op for `NULL`).
    fn decref(&self, obj: RawObject);

    /// Current reference count, for diagnostics and tests. Zero for `NULL`.
    fn refcount(&self, obj: RawObject) -> usize;

    // Value constructors (each returns a new reference or NULL) -------------

    fn none(&self) -> RawObject;
    fn make_bool(&self, value: bool) -> RawObject;
    fn make_int(&self, value: i64) -> RawObject;
    fn make_uint(&self, value: u64) -> RawObject;
    fn make_float(&self, value: f64) -> RawObject;
    fn make_str(&self, value: &str) -> RawObject;

    /// New list with `len` uninitialized slots.
    fn make_list(&self, len: usize) -> RawObject;

    /// Store `value` at `index`, stealing the reference. Returns false on
    /// failure (the stolen reference is released by the backend).
    fn list_set(&self, list: RawObject, index: usize, value: RawObject) -> bool;

    /// New tuple with `len` uninitialized slots.
    fn make_tuple(&self, len: usize) -> RawObject;

    /// Store `value` at `index`, stealing the reference. Returns false on
    /// failure (the stolen reference is released by the backend).
    fn tuple_set(&self, tuple: RawObject, index: usize, value: RawObject) -> bool;

    /// New empty dictionary.
    fn make_dict(&self) -> RawObject;

    /// Insert under a string key, borrowing `value`. Duplicate keys resolve
    /// last-write-wins. Returns false on failure.
    fn dict_set(&self, dict: RawObject, key: &str, value: RawObject) -> bool;

    // Attribute access and invocation ---------------------------------------

    /// Attribute lookup; new reference or NULL with an error pending.
    fn getattr(&self, obj: RawObject, name: &str) -> RawObject;

    /// Call `callable` with a positional tuple and an optional keyword
    /// dictionary (`NULL` means "no keyword arguments"). New reference or
    /// NULL with an error pending.
    fn call(&self, callable: RawObject, args: RawObject, kwargs: RawObject) -> RawObject;

    /// Import a module by dotted name; new reference or NULL.
    fn import(&self, module: &str) -> RawObject;

    // Read-back -------------------------------------------------------------

    fn is_truthy(&self, obj: RawObject) -> bool;
    fn as_int(&self, obj: RawObject) -> Option<i64>;
    fn as_float(&self, obj: RawObject) -> Option<f64>;
    fn as_str(&self, obj: RawObject) -> Option<String>;

    /// Length of a sequence, `None` for non-sequences.
    fn seq_len(&self, obj: RawObject) -> Option<usize>;

    /// Element of a sequence; new reference or NULL with an error pending.
    fn seq_get(&self, obj: RawObject, index: usize) -> RawObject;

    // Error state -----------------------------------------------------------

    /// Whether a foreign error is pending.
    fn error_pending(&self) -> bool;

    /// Fetch the pending error's text and clear the sticky state, so the
    /// flag is never left set when control returns to unrelated calls.
    fn take_error(&self) -> Option<String>;
}
