//! Embedded CPython backend
//!
//! Raw `pyo3-ffi` calls, one-to-one with the interpreter C API. Reference
//! ownership follows the C API conventions the [`RuntimeBackend`] contract
//! is written against: constructors return new references, `PyList_SetItem`
//! and `PyTuple_SetItem` steal, `PyDict_SetItemString` borrows.
//!
//! The interpreter is process-wide shared mutable state; a single host
//! thread is assumed to drive it (no GIL juggling is performed here).

use std::ffi::CString;
use std::os::raw::c_char;

use pyo3_ffi::*;

use super::backend::{RawObject, RuntimeBackend};

#[inline]
fn ptr(obj: RawObject) -> *mut PyObject {
    obj.bits() as *mut PyObject
}

#[inline]
fn wrap(obj: *mut PyObject) -> RawObject {
    RawObject::from_bits(obj as usize)
}

/// Turn an identifier into a C string, raising a foreign `ValueError` on an
/// embedded NUL so the failure travels the normal error path.
fn identifier(name: &str) -> Option<CString> {
    match CString::new(name) {
        Ok(cstr) => Some(cstr),
        Err(_) => {
            unsafe {
                PyErr_SetString(
                    PyExc_ValueError,
                    b"identifier contains an embedded NUL byte\0".as_ptr() as *const c_char,
                );
            }
            None
        }
    }
}

/// Backend over the embedded CPython interpreter.
pub struct CPython {
    owns_interpreter: bool,
}

impl CPython {
    /// Initialize the interpreter if nobody has. Initialization failure is
    /// fatal: it indicates a missing or incompatible embedded runtime, not a
    /// transient condition.
    pub fn bootstrap() -> Self {
        unsafe {
            if Py_IsInitialized() != 0 {
                return Self {
                    owns_interpreter: false,
                };
            }
            // Skip signal-handler registration; the host owns its signals.
            Py_InitializeEx(0);
            if Py_IsInitialized() == 0 {
                panic!("could not initialize the embedded interpreter");
            }
        }
        tracing::info!(event = "interpreter_init", backend = "cpython");
        Self {
            owns_interpreter: true,
        }
    }
}

impl Drop for CPython {
    fn drop(&mut self) {
        if self.owns_interpreter {
            unsafe {
                if Py_IsInitialized() != 0 {
                    Py_FinalizeEx();
                }
            }
            tracing::info!(event = "interpreter_shutdown", backend = "cpython");
        }
    }
}

impl RuntimeBackend for CPython {
    fn name(&self) -> &'static str {
        "cpython"
    }

    fn incref(&self, obj: RawObject) {
        if !obj.is_null() {
            unsafe { Py_IncRef(ptr(obj)) };
        }
    }

    fn decref(&self, obj: RawObject) {
        if !obj.is_null() {
            unsafe { Py_DecRef(ptr(obj)) };
        }
    }

    fn refcount(&self, obj: RawObject) -> usize {
        if obj.is_null() {
            return 0;
        }
        unsafe { Py_REFCNT(ptr(obj)) as usize }
    }

    fn none(&self) -> RawObject {
        unsafe {
            let none = Py_None();
            Py_IncRef(none);
            wrap(none)
        }
    }

    fn make_bool(&self, value: bool) -> RawObject {
        unsafe { wrap(PyBool_FromLong(value as std::os::raw::c_long)) }
    }

    fn make_int(&self, value: i64) -> RawObject {
        unsafe { wrap(PyLong_FromLongLong(value)) }
    }

    fn make_uint(&self, value: u64) -> RawObject {
        unsafe { wrap(PyLong_FromUnsignedLongLong(value)) }
    }

    fn make_float(&self, value: f64) -> RawObject {
        unsafe { wrap(PyFloat_FromDouble(value)) }
    }

    fn make_str(&self, value: &str) -> RawObject {
        unsafe {
            wrap(PyUnicode_FromStringAndSize(
                value.as_ptr() as *const c_char,
                value.len() as Py_ssize_t,
            ))
        }
    }

    fn make_list(&self, len: usize) -> RawObject {
        unsafe { wrap(PyList_New(len as Py_ssize_t)) }
    }

    fn list_set(&self, list: RawObject, index: usize, value: RawObject) -> bool {
        unsafe { PyList_SetItem(ptr(list), index as Py_ssize_t, ptr(value)) == 0 }
    }

    fn make_tuple(&self, len: usize) -> RawObject {
        unsafe { wrap(PyTuple_New(len as Py_ssize_t)) }
    }

    fn tuple_set(&self, tuple: RawObject, index: usize, value: RawObject) -> bool {
        unsafe { PyTuple_SetItem(ptr(tuple), index as Py_ssize_t, ptr(value)) == 0 }
    }

    fn make_dict(&self) -> RawObject {
        unsafe { wrap(PyDict_New()) }
    }

    fn dict_set(&self, dict: RawObject, key: &str, value: RawObject) -> bool {
        let key = match identifier(key) {
            Some(key) => key,
            None => return false,
        };
        unsafe { PyDict_SetItemString(ptr(dict), key.as_ptr(), ptr(value)) == 0 }
    }

    fn getattr(&self, obj: RawObject, name: &str) -> RawObject {
        let name = match identifier(name) {
            Some(name) => name,
            None => return RawObject::NULL,
        };
        unsafe { wrap(PyObject_GetAttrString(ptr(obj), name.as_ptr())) }
    }

    fn call(&self, callable: RawObject, args: RawObject, kwargs: RawObject) -> RawObject {
        unsafe { wrap(PyObject_Call(ptr(callable), ptr(args), ptr(kwargs))) }
    }

    fn import(&self, module: &str) -> RawObject {
        let module = match identifier(module) {
            Some(module) => module,
            None => return RawObject::NULL,
        };
        unsafe { wrap(PyImport_ImportModule(module.as_ptr())) }
    }

    fn is_truthy(&self, obj: RawObject) -> bool {
        unsafe {
            match PyObject_IsTrue(ptr(obj)) {
                -1 => {
                    PyErr_Clear();
                    false
                }
                value => value != 0,
            }
        }
    }

    fn as_int(&self, obj: RawObject) -> Option<i64> {
        unsafe {
            if PyLong_Check(ptr(obj)) == 0 {
                return None;
            }
            let value = PyLong_AsLongLong(ptr(obj));
            if value == -1 && !PyErr_Occurred().is_null() {
                PyErr_Clear();
                return None;
            }
            Some(value)
        }
    }

    fn as_float(&self, obj: RawObject) -> Option<f64> {
        unsafe {
            if PyFloat_Check(ptr(obj)) == 0 && PyLong_Check(ptr(obj)) == 0 {
                return None;
            }
            let value = PyFloat_AsDouble(ptr(obj));
            if value == -1.0 && !PyErr_Occurred().is_null() {
                PyErr_Clear();
                return None;
            }
            Some(value)
        }
    }

    fn as_str(&self, obj: RawObject) -> Option<String> {
        unsafe {
            if PyUnicode_Check(ptr(obj)) == 0 {
                return None;
            }
            let mut len: Py_ssize_t = 0;
            let data = PyUnicode_AsUTF8AndSize(ptr(obj), &mut len);
            if data.is_null() {
                PyErr_Clear();
                return None;
            }
            let bytes = std::slice::from_raw_parts(data as *const u8, len as usize);
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    fn seq_len(&self, obj: RawObject) -> Option<usize> {
        unsafe {
            if PySequence_Check(ptr(obj)) == 0 {
                return None;
            }
            let len = PySequence_Size(ptr(obj));
            if len < 0 {
                PyErr_Clear();
                return None;
            }
            Some(len as usize)
        }
    }

    fn seq_get(&self, obj: RawObject, index: usize) -> RawObject {
        unsafe { wrap(PySequence_GetItem(ptr(obj), index as Py_ssize_t)) }
    }

    fn error_pending(&self) -> bool {
        unsafe { !PyErr_Occurred().is_null() }
    }

    fn take_error(&self) -> Option<String> {
        unsafe {
            if PyErr_Occurred().is_null() {
                return None;
            }
            let mut ptype: *mut PyObject = std::ptr::null_mut();
            let mut pvalue: *mut PyObject = std::ptr::null_mut();
            let mut ptraceback: *mut PyObject = std::ptr::null_mut();
            PyErr_Fetch(&mut ptype, &mut pvalue, &mut ptraceback);
            PyErr_NormalizeException(&mut ptype, &mut pvalue, &mut ptraceback);

            let text = describe(pvalue).or_else(|| describe(ptype));

            Py_DecRef(ptype);
            Py_DecRef(pvalue);
            Py_DecRef(ptraceback);
            text.or_else(|| Some("unknown foreign error".to_string()))
        }
    }
}

/// `str()` of an exception object, best effort.
unsafe fn describe(obj: *mut PyObject) -> Option<String> {
    if obj.is_null() {
        return None;
    }
    let repr = PyObject_Str(obj);
    if repr.is_null() {
        PyErr_Clear();
        return None;
    }
    let mut len: Py_ssize_t = 0;
    let data = PyUnicode_AsUTF8AndSize(repr, &mut len);
    let text = if data.is_null() {
        PyErr_Clear();
        None
    } else {
        let bytes = std::slice::from_raw_parts(data as *const u8, len as usize);
        Some(String::from_utf8_lossy(bytes).into_owned())
    };
    Py_DecRef(repr);
    text
}
