//! In-memory backend - a reference-counted object registry
//!
//! Design: a miniature dynamic object system driven through the same
//! [`RuntimeBackend`] surface as the embedded interpreter:
//! - objects live in a concurrent registry keyed by id, each slot carrying
//!   an explicit reference count;
//! - destruction releases child references (list/tuple elements, dict and
//!   attribute values);
//! - callables are host closures, so test suites can script module and
//!   method behavior without an interpreter present.
//!
//! The registry exposes per-object refcount and liveness queries, which is
//! what the handle/builder test suites assert their balance invariants
//! against.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::backend::{RawObject, RuntimeBackend};

/// Host closure backing a callable object.
///
/// Receives the backend, the positional arguments (borrowed references
/// unpacked from the call tuple) and the keyword dictionary (`NULL` when the
/// call carries no keyword arguments). Returns a new reference, or `NULL`
/// after raising through [`MockRuntime::raise`].
pub type NativeFn =
    Arc<dyn Fn(&MockRuntime, &[RawObject], RawObject) -> RawObject + Send + Sync>;

enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<RawObject>),
    Tuple(Vec<RawObject>),
    Dict(Vec<(String, RawObject)>),
    Instance {
        class: String,
        attrs: HashMap<String, RawObject>,
    },
    Native(NativeFn),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Instance { .. } => "object",
            Self::Native(_) => "builtin_function_or_method",
        }
    }

    /// Child references released when the owning object dies.
    fn children(&self) -> Vec<RawObject> {
        match self {
            Self::List(items) | Self::Tuple(items) => items.clone(),
            Self::Dict(entries) => entries.iter().map(|(_, v)| *v).collect(),
            Self::Instance { attrs, .. } => attrs.values().copied().collect(),
            _ => Vec::new(),
        }
    }
}

struct Slot {
    refs: usize,
    value: Value,
}

struct MockState {
    objects: DashMap<usize, Slot>,
    modules: Mutex<HashMap<String, RawObject>>,
    error: Mutex<Option<String>>,
    next_id: AtomicUsize,
    none: RawObject,
}

/// Reference-counted in-memory runtime. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MockRuntime {
    state: Arc<MockState>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    pub fn new() -> Self {
        // The `None` singleton occupies id 1 and keeps one registry-held
        // reference for the lifetime of the runtime.
        let objects = DashMap::new();
        objects.insert(
            1,
            Slot {
                refs: 1,
                value: Value::None,
            },
        );
        let state = Arc::new(MockState {
            objects,
            modules: Mutex::new(HashMap::new()),
            error: Mutex::new(None),
            next_id: AtomicUsize::new(2),
            none: RawObject::from_bits(1),
        });
        Self { state }
    }

    fn alloc(&self, value: Value) -> RawObject {
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        self.state.objects.insert(id, Slot { refs: 1, value });
        tracing::trace!(event = "mock_alloc", id, "object allocated");
        RawObject::from_bits(id)
    }

    /// Record a pending error, mirroring the interpreter's sticky flag.
    pub fn raise(&self, message: impl Into<String>) {
        *self.state.error.lock() = Some(message.into());
    }

    fn fail(&self, message: impl Into<String>) -> RawObject {
        self.raise(message);
        RawObject::NULL
    }

    // Scripting surface ----------------------------------------------------

    /// New plain object with an attribute table. Returns a new reference.
    pub fn instance(&self, class: &str) -> RawObject {
        self.alloc(Value::Instance {
            class: class.to_string(),
            attrs: HashMap::new(),
        })
    }

    /// New callable wrapping a host closure. Returns a new reference.
    pub fn native<F>(&self, f: F) -> RawObject
    where
        F: Fn(&MockRuntime, &[RawObject], RawObject) -> RawObject + Send + Sync + 'static,
    {
        self.alloc(Value::Native(Arc::new(f)))
    }

    /// Set an attribute, borrowing `value` (the instance adds its own
    /// reference). Panics when `obj` has no attribute table; the scripting
    /// surface is test setup, not a guarded API.
    pub fn set_attr(&self, obj: RawObject, name: &str, value: RawObject) {
        self.incref(value);
        let mut slot = self
            .state
            .objects
            .get_mut(&obj.bits())
            .expect("set_attr on a dead object");
        match &mut slot.value {
            Value::Instance { attrs, .. } => {
                if let Some(old) = attrs.insert(name.to_string(), value) {
                    drop(slot);
                    self.decref(old);
                }
            }
            other => panic!("set_attr on a {} value", other.type_name()),
        }
    }

    /// Borrowed attribute read for assertions; the owner keeps the value
    /// alive.
    pub fn get_attr(&self, obj: RawObject, name: &str) -> Option<RawObject> {
        let slot = self.state.objects.get(&obj.bits())?;
        match &slot.value {
            Value::Instance { attrs, .. } => attrs.get(name).copied(),
            _ => None,
        }
    }

    /// Register an importable module object, borrowing `module`.
    pub fn register_module(&self, name: &str, module: RawObject) {
        self.incref(module);
        if let Some(old) = self
            .state
            .modules
            .lock()
            .insert(name.to_string(), module)
        {
            self.decref(old);
        }
    }

    /// Dictionary entries in insertion order (values borrowed).
    pub fn dict_entries(&self, dict: RawObject) -> Vec<(String, RawObject)> {
        match self.state.objects.get(&dict.bits()) {
            Some(slot) => match &slot.value {
                Value::Dict(entries) => entries.clone(),
                _ => Vec::new(),
            },
            None => Vec::new(),
        }
    }

    /// Borrowed dictionary lookup by string key.
    pub fn dict_get(&self, dict: RawObject, key: &str) -> Option<RawObject> {
        self.dict_entries(dict)
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Number of live objects in the registry (the `None` singleton
    /// included). Scenario tests capture this as a baseline and assert it is
    /// restored once every derived handle is gone.
    pub fn live_objects(&self) -> usize {
        self.state.objects.len()
    }

    /// Whether the object behind `obj` is still alive.
    pub fn is_live(&self, obj: RawObject) -> bool {
        self.state.objects.contains_key(&obj.bits())
    }

    fn destroy(&self, id: usize) {
        let slot = match self.state.objects.remove(&id) {
            Some((_, slot)) => slot,
            None => return,
        };
        tracing::trace!(event = "mock_destroy", id, "object destroyed");
        for child in slot.value.children() {
            self.decref(child);
        }
    }
}

impl RuntimeBackend for MockRuntime {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn incref(&self, obj: RawObject) {
        if obj.is_null() {
            return;
        }
        match self.state.objects.get_mut(&obj.bits()) {
            Some(mut slot) => slot.refs += 1,
            None => debug_assert!(false, "incref of dead object {}", obj.bits()),
        }
    }

    fn decref(&self, obj: RawObject) {
        if obj.is_null() {
            return;
        }
        let dead = match self.state.objects.get_mut(&obj.bits()) {
            Some(mut slot) => {
                debug_assert!(slot.refs > 0, "refcount underflow");
                slot.refs -= 1;
                slot.refs == 0
            }
            None => {
                debug_assert!(false, "decref of dead object {}", obj.bits());
                false
            }
        };
        if dead {
            self.destroy(obj.bits());
        }
    }

    fn refcount(&self, obj: RawObject) -> usize {
        self.state
            .objects
            .get(&obj.bits())
            .map(|slot| slot.refs)
            .unwrap_or(0)
    }

    fn none(&self) -> RawObject {
        let none = self.state.none;
        self.incref(none);
        none
    }

    fn make_bool(&self, value: bool) -> RawObject {
        self.alloc(Value::Bool(value))
    }

    fn make_int(&self, value: i64) -> RawObject {
        self.alloc(Value::Int(value))
    }

    fn make_uint(&self, value: u64) -> RawObject {
        match i64::try_from(value) {
            Ok(v) => self.alloc(Value::Int(v)),
            Err(_) => self.fail(format!(
                "OverflowError: {} does not fit the backend integer range",
                value
            )),
        }
    }

    fn make_float(&self, value: f64) -> RawObject {
        self.alloc(Value::Float(value))
    }

    fn make_str(&self, value: &str) -> RawObject {
        self.alloc(Value::Str(value.to_string()))
    }

    fn make_list(&self, len: usize) -> RawObject {
        self.alloc(Value::List(vec![RawObject::NULL; len]))
    }

    fn list_set(&self, list: RawObject, index: usize, value: RawObject) -> bool {
        let ok = match self.state.objects.get_mut(&list.bits()) {
            Some(mut slot) => match &mut slot.value {
                Value::List(items) if index < items.len() => {
                    let old = std::mem::replace(&mut items[index], value);
                    drop(slot);
                    // A stolen reference replaces whatever was in the slot.
                    self.decref(old);
                    return true;
                }
                _ => false,
            },
            None => false,
        };
        if !ok {
            // The reference was stolen regardless; release it and report.
            self.decref(value);
            self.raise("SystemError: list assignment out of range");
        }
        ok
    }

    fn make_tuple(&self, len: usize) -> RawObject {
        self.alloc(Value::Tuple(vec![RawObject::NULL; len]))
    }

    fn tuple_set(&self, tuple: RawObject, index: usize, value: RawObject) -> bool {
        let ok = match self.state.objects.get_mut(&tuple.bits()) {
            Some(mut slot) => match &mut slot.value {
                Value::Tuple(items) if index < items.len() => {
                    let old = std::mem::replace(&mut items[index], value);
                    drop(slot);
                    self.decref(old);
                    return true;
                }
                _ => false,
            },
            None => false,
        };
        if !ok {
            self.decref(value);
            self.raise("SystemError: tuple assignment out of range");
        }
        ok
    }

    fn make_dict(&self) -> RawObject {
        self.alloc(Value::Dict(Vec::new()))
    }

    fn dict_set(&self, dict: RawObject, key: &str, value: RawObject) -> bool {
        // The dictionary holds its own reference; the caller keeps ownership
        // of the one it passed in.
        self.incref(value);
        let replaced = match self.state.objects.get_mut(&dict.bits()) {
            Some(mut slot) => match &mut slot.value {
                Value::Dict(entries) => {
                    match entries.iter_mut().find(|(k, _)| k == key) {
                        Some(entry) => Some(std::mem::replace(&mut entry.1, value)),
                        None => {
                            entries.push((key.to_string(), value));
                            None
                        }
                    }
                }
                _ => {
                    drop(slot);
                    self.decref(value);
                    self.raise("TypeError: dict_set on a non-dict value");
                    return false;
                }
            },
            None => {
                self.decref(value);
                self.raise("SystemError: dict_set on a dead object");
                return false;
            }
        };
        if let Some(old) = replaced {
            self.decref(old);
        }
        true
    }

    fn getattr(&self, obj: RawObject, name: &str) -> RawObject {
        let found = match self.state.objects.get(&obj.bits()) {
            Some(slot) => match &slot.value {
                Value::Instance { attrs, class } => match attrs.get(name) {
                    Some(value) => Ok(*value),
                    None => Err(format!(
                        "AttributeError: '{}' object has no attribute '{}'",
                        class, name
                    )),
                },
                other => Err(format!(
                    "AttributeError: '{}' object has no attribute '{}'",
                    other.type_name(),
                    name
                )),
            },
            None => Err("SystemError: attribute lookup on a dead object".to_string()),
        };
        match found {
            Ok(value) => {
                self.incref(value);
                value
            }
            Err(message) => self.fail(message),
        }
    }

    fn call(&self, callable: RawObject, args: RawObject, kwargs: RawObject) -> RawObject {
        let native = match self.state.objects.get(&callable.bits()) {
            Some(slot) => match &slot.value {
                Value::Native(f) => Arc::clone(f),
                other => {
                    let message =
                        format!("TypeError: '{}' object is not callable", other.type_name());
                    drop(slot);
                    return self.fail(message);
                }
            },
            None => return self.fail("SystemError: call through a dead object"),
        };
        // Borrow the positional references out of the tuple; the tuple keeps
        // them alive for the duration of the call.
        let positional: SmallVec<[RawObject; 4]> =
            match self.state.objects.get(&args.bits()) {
                Some(slot) => match &slot.value {
                    Value::Tuple(items) => items.iter().copied().collect(),
                    _ => return self.fail("TypeError: argument pack is not a tuple"),
                },
                None => return self.fail("SystemError: argument pack is dead"),
            };
        let result = native(self, &positional, kwargs);
        if result.is_null() && !self.error_pending() {
            self.raise("SystemError: call returned no result without an error set");
        }
        result
    }

    fn import(&self, module: &str) -> RawObject {
        match self.state.modules.lock().get(module) {
            Some(obj) => {
                let obj = *obj;
                self.incref(obj);
                obj
            }
            None => self.fail(format!("ModuleNotFoundError: no module named '{}'", module)),
        }
    }

    fn is_truthy(&self, obj: RawObject) -> bool {
        match self.state.objects.get(&obj.bits()) {
            Some(slot) => match &slot.value {
                Value::None => false,
                Value::Bool(b) => *b,
                Value::Int(v) => *v != 0,
                Value::Float(v) => *v != 0.0,
                Value::Str(s) => !s.is_empty(),
                Value::List(items) | Value::Tuple(items) => !items.is_empty(),
                Value::Dict(entries) => !entries.is_empty(),
                Value::Instance { .. } | Value::Native(_) => true,
            },
            None => false,
        }
    }

    fn as_int(&self, obj: RawObject) -> Option<i64> {
        match &self.state.objects.get(&obj.bits())?.value {
            Value::Int(v) => Some(*v),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    fn as_float(&self, obj: RawObject) -> Option<f64> {
        match &self.state.objects.get(&obj.bits())?.value {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    fn as_str(&self, obj: RawObject) -> Option<String> {
        match &self.state.objects.get(&obj.bits())?.value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn seq_len(&self, obj: RawObject) -> Option<usize> {
        match &self.state.objects.get(&obj.bits())?.value {
            Value::List(items) | Value::Tuple(items) => Some(items.len()),
            _ => None,
        }
    }

    fn seq_get(&self, obj: RawObject, index: usize) -> RawObject {
        let item = match self.state.objects.get(&obj.bits()) {
            Some(slot) => match &slot.value {
                Value::List(items) | Value::Tuple(items) => items.get(index).copied(),
                _ => None,
            },
            None => None,
        };
        match item {
            Some(value) => {
                self.incref(value);
                value
            }
            None => self.fail("IndexError: sequence index out of range"),
        }
    }

    fn error_pending(&self) -> bool {
        self.state.error.lock().is_some()
    }

    fn take_error(&self) -> Option<String> {
        self.state.error.lock().take()
    }
}
