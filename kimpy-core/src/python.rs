// MIT License
// Copyright 2023--present kimpy developers

//! The `kimapi` Python extension module.
//!
//! Every function mirrors one [`KimApi`] method and returns what the native
//! call produced: a bare integer status, or a tuple whose last element is the
//! integer status. Statuses are never raised. Python exceptions are reserved
//! for failures the adapter detects itself before calling the library:
//!
//! | Failure | Exception |
//! |---|---|
//! | buffer element type is not exactly `int32` / `float64` | `TypeError` |
//! | buffer is read-only or not C-contiguous | `ValueError` |
//! | string argument contains a NUL byte | `ValueError` |
//! | handle is in use by `model_compute` on another thread | `RuntimeError` |
//!
//! `model_compute(kimmdl, release_GIL=True)` keeps the handle mutably
//! borrowed while the GIL is released, so any other call taking the same
//! handle fails with the `RuntimeError` above until the compute returns.
//!
//! **Buffers**
//!
//! `set_data_int` / `set_data_double` register the memory of any object
//! supporting the buffer protocol (a numpy array, an `array.array`, ...). The
//! handle keeps a reference to that object until it is re-registered or the
//! handle is freed, so the memory outlives its registration.
//!
//! `get_data_int` / `get_data_double` return a [`PyDataView`] over native
//! memory. It supports `len()`, indexing, `tolist()`, the buffer protocol and
//! the DLPack protocol, so `memoryview(view)`, `numpy.asarray(view)` and
//! `numpy.from_dlpack(view)` all give zero-copy writable access. Like the
//! view itself, that array is only valid until the library moves or frees the
//! buffer.

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr::{self, NonNull};

use pyo3::buffer::{Element as BufferElement, PyBuffer};
use pyo3::exceptions::{PyBufferError, PyIndexError, PyTypeError, PyValueError};
use pyo3::ffi;
use pyo3::prelude::*;
use pyo3::types::PyList;

use crate::api::KimApi;
use crate::handle::ModelHandle;
use crate::lock::ExecutionLock;
use crate::status::{KimpyError, Status};
use crate::tensor::{free_tensor, DataView, Element, ElementType};

#[cfg(not(test))]
const API: KimApi = KimApi::linked();
#[cfg(test)]
const API: KimApi = KimApi::new(crate::mock::FNS);

impl From<KimpyError> for PyErr {
    fn from(err: KimpyError) -> PyErr {
        match err {
            KimpyError::TypeMismatch { .. } => PyTypeError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

fn c_string(s: &str) -> PyResult<CString> {
    CString::new(s).map_err(|_| PyValueError::new_err("string contains an interior NUL byte"))
}

// ---------------------------------------------------------------------------
// GIL as an execution lock
// ---------------------------------------------------------------------------

struct GilRelease<'py>(Python<'py>);

impl ExecutionLock for GilRelease<'_> {
    fn unlocked<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.0.allow_threads(f)
    }
}

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

/// Opaque KIM API object.
#[pyclass(name = "ModelHandle", module = "kimpy.kimapi")]
pub struct PyModelHandle {
    handle: ModelHandle,
    // Objects whose memory is registered with the library, by argument name.
    registered: HashMap<String, PyObject>,
}

impl PyModelHandle {
    fn new(handle: ModelHandle) -> Self {
        Self {
            handle,
            registered: HashMap::new(),
        }
    }
}

#[pymethods]
impl PyModelHandle {
    fn is_null(&self) -> bool {
        self.handle.is_null()
    }

    fn __bool__(&self) -> bool {
        !self.handle.is_null()
    }

    fn __repr__(&self) -> String {
        format!("<kimapi.ModelHandle at {:p}>", self.handle.as_ptr())
    }
}

const DLTENSOR_VERSIONED: &CStr = c"dltensor_versioned";

unsafe extern "C" fn dlpack_capsule_destructor(capsule: *mut ffi::PyObject) {
    // A consumer that took the tensor renames the capsule and owns it.
    if unsafe { ffi::PyCapsule_IsValid(capsule, DLTENSOR_VERSIONED.as_ptr()) } != 1 {
        return;
    }
    let tensor = unsafe { ffi::PyCapsule_GetPointer(capsule, DLTENSOR_VERSIONED.as_ptr()) };
    unsafe { free_tensor(tensor.cast()) };
}

/// Zero-copy view of a native KIM buffer.
#[pyclass(name = "DataView", module = "kimpy.kimapi")]
pub struct PyDataView {
    ptr: *mut c_void,
    len: usize,
    kind: ElementType,
    // Buffer-protocol shape; lives as long as the view object.
    shape: [ffi::Py_ssize_t; 1],
    _owner: Py<PyModelHandle>,
}

// The pointer is only dereferenced with the GIL held; validity is tied to the
// native buffer, as documented for DataView.
unsafe impl Send for PyDataView {}

impl PyDataView {
    fn new<T: Element>(view: &DataView<'_, T>, owner: &Bound<'_, PyModelHandle>) -> Self {
        Self {
            ptr: view.as_ptr().cast(),
            len: view.len(),
            kind: T::TYPE,
            shape: [view.len() as ffi::Py_ssize_t],
            _owner: owner.clone().unbind(),
        }
    }

    fn slot(&self, index: isize) -> PyResult<usize> {
        let len = self.len as isize;
        let i = if index < 0 { index + len } else { index };
        if i < 0 || i >= len {
            return Err(PyIndexError::new_err("DataView index out of range"));
        }
        Ok(i as usize)
    }
}

#[pymethods]
impl PyDataView {
    fn __len__(&self) -> usize {
        self.len
    }

    fn __getitem__(&self, py: Python<'_>, index: isize) -> PyResult<PyObject> {
        let i = self.slot(index)?;
        Ok(match self.kind {
            ElementType::Int => unsafe { *self.ptr.cast::<c_int>().add(i) }.into_py(py),
            ElementType::Double => unsafe { *self.ptr.cast::<f64>().add(i) }.into_py(py),
        })
    }

    fn __setitem__(&self, index: isize, value: &Bound<'_, PyAny>) -> PyResult<()> {
        let i = self.slot(index)?;
        match self.kind {
            ElementType::Int => unsafe { *self.ptr.cast::<c_int>().add(i) = value.extract()? },
            ElementType::Double => unsafe { *self.ptr.cast::<f64>().add(i) = value.extract()? },
        }
        Ok(())
    }

    fn tolist<'py>(&self, py: Python<'py>) -> Bound<'py, PyList> {
        match self.kind {
            ElementType::Int => {
                let view = DataView::<c_int>::from_native(self.ptr, self.len);
                PyList::new_bound(py, unsafe { view.as_slice() })
            }
            ElementType::Double => {
                let view = DataView::<f64>::from_native(self.ptr, self.len);
                PyList::new_bound(py, unsafe { view.as_slice() })
            }
        }
    }

    #[pyo3(signature = (*, stream=None, max_version=None, dl_device=None, copy=None))]
    unsafe fn __getbuffer__(
        slf: Bound<'_, Self>,
        view: *mut ffi::Py_buffer,
        _flags: c_int,
    ) -> PyResult<()> {
        if view.is_null() {
            return Err(PyBufferError::new_err("Py_buffer is NULL"));
        }
        let (buf, len, itemsize, format, shape) = {
            let this = slf.borrow();
            let (itemsize, format) = match this.kind {
                ElementType::Int => (std::mem::size_of::<c_int>(), c"i"),
                ElementType::Double => (std::mem::size_of::<f64>(), c"d"),
            };
            // An empty view may have no native pointer; exporters must not
            // hand out NULL.
            let buf = if this.ptr.is_null() {
                NonNull::<f64>::dangling().as_ptr().cast::<c_void>()
            } else {
                this.ptr
            };
            (buf, this.len * itemsize, itemsize, format, this.shape.as_ptr().cast_mut())
        };
        unsafe {
            (*view).obj = slf.into_any().into_ptr();
            (*view).buf = buf;
            (*view).len = len as ffi::Py_ssize_t;
            (*view).readonly = 0;
            (*view).itemsize = itemsize as ffi::Py_ssize_t;
            (*view).format = format.as_ptr().cast_mut().cast::<c_char>();
            (*view).ndim = 1;
            (*view).shape = shape;
            // Compact 1-D: the stride is the item size.
            (*view).strides = ptr::addr_of_mut!((*view).itemsize);
            (*view).suboffsets = ptr::null_mut();
            (*view).internal = ptr::null_mut();
        }
        Ok(())
    }

    fn __dlpack__<'py>(
        &self,
        py: Python<'py>,
        stream: Option<PyObject>,
        max_version: Option<(u32, u32)>,
        dl_device: Option<(i32, i32)>,
        copy: Option<bool>,
    ) -> PyResult<Bound<'py, PyAny>> {
        if stream.is_some() {
            return Err(PyBufferError::new_err("DataView is a CPU buffer and takes no stream"));
        }
        if matches!(max_version, Some((major, _)) if major < 1) {
            return Err(PyBufferError::new_err(
                "DataView only exports versioned DLPack tensors (max_version >= 1.0)",
            ));
        }
        if matches!(dl_device, Some((device_type, _)) if device_type != 1) {
            return Err(PyBufferError::new_err("DataView lives on the CPU"));
        }
        if copy == Some(true) {
            return Err(PyBufferError::new_err("DataView cannot be exported as a copy"));
        }
        let tensor = match self.kind {
            ElementType::Int => DataView::<c_int>::from_native(self.ptr, self.len).to_dlpack(),
            ElementType::Double => DataView::<f64>::from_native(self.ptr, self.len).to_dlpack(),
        };
        let capsule = unsafe {
            ffi::PyCapsule_New(
                tensor.cast(),
                DLTENSOR_VERSIONED.as_ptr(),
                Some(dlpack_capsule_destructor),
            )
        };
        if capsule.is_null() {
            unsafe { free_tensor(tensor) };
        }
        unsafe { Bound::from_owned_ptr_or_err(py, capsule) }
    }

    fn __dlpack_device__(&self) -> (i32, i32) {
        // (kDLCPU, 0)
        (1, 0)
    }

    fn __repr__(&self) -> String {
        format!("<kimapi.DataView {} x {}>", self.kind, self.len)
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Return (version, status)
#[pyfunction]
fn get_version() -> (Option<String>, c_int) {
    let (version, status) = API.get_version();
    (version, status.code())
}

/// Return (pkim, status)
#[pyfunction]
fn file_init(simkimfile: &str, modelname: &str) -> PyResult<(PyModelHandle, c_int)> {
    let (handle, status) = API.file_init(&c_string(simkimfile)?, &c_string(modelname)?);
    Ok((PyModelHandle::new(handle), status.code()))
}

/// Return (pkim, status)
#[pyfunction]
fn model_info(modelname: &str) -> PyResult<(PyModelHandle, c_int)> {
    let (handle, status) = API.model_info(&c_string(modelname)?);
    Ok((PyModelHandle::new(handle), status.code()))
}

/// Return (pkim, status)
#[pyfunction]
fn string_init(siminputstring: &str, modelname: &str) -> PyResult<(PyModelHandle, c_int)> {
    let (handle, status) = API.string_init(&c_string(siminputstring)?, &c_string(modelname)?);
    Ok((PyModelHandle::new(handle), status.code()))
}

#[pyfunction]
fn allocate(kimmdl: PyRef<'_, PyModelHandle>, nparts: isize, nspecies: c_int) -> c_int {
    API.allocate(&kimmdl.handle, nparts, nspecies).code()
}

#[pyfunction]
fn free(mut kimmdl: PyRefMut<'_, PyModelHandle>) -> c_int {
    let status = API.free(&mut kimmdl.handle);
    if status.is_ok() {
        kimmdl.registered.clear();
    }
    status.code()
}

#[pyfunction]
fn print_kim(kimmdl: PyRef<'_, PyModelHandle>) -> c_int {
    API.print_kim(&kimmdl.handle).code()
}

#[pyfunction]
#[pyo3(signature = (kimmdl, release_GIL=false))]
#[allow(non_snake_case)]
fn model_compute(
    py: Python<'_>,
    mut kimmdl: PyRefMut<'_, PyModelHandle>,
    release_GIL: bool,
) -> c_int {
    API.model_compute_with(&mut kimmdl.handle, &mut GilRelease(py), release_GIL)
        .code()
}

#[pyfunction]
fn model_init(kimmdl: PyRef<'_, PyModelHandle>) -> c_int {
    API.model_init(&kimmdl.handle).code()
}

#[pyfunction]
fn model_destroy(kimmdl: PyRef<'_, PyModelHandle>) -> c_int {
    API.model_destroy(&kimmdl.handle).code()
}

#[pyfunction]
fn model_reinit(kimmdl: PyRef<'_, PyModelHandle>) -> c_int {
    API.model_reinit(&kimmdl.handle).code()
}

// ---------------------------------------------------------------------------
// Introspection
// ---------------------------------------------------------------------------

#[pyfunction]
fn get_model_kim_str_len(modelname: &str) -> PyResult<(c_int, c_int)> {
    let (len, status) = API.get_model_kim_str_len(&c_string(modelname)?);
    Ok((len, status.code()))
}

/// Return (modelKIMStr, status)
#[pyfunction]
fn get_model_kim_str(modelname: &str) -> PyResult<(Option<String>, c_int)> {
    let (kim_str, status) = API.get_model_kim_str(&c_string(modelname)?);
    Ok((kim_str, status.code()))
}

/// Return (numberSpecies, maxStrLen, status)
#[pyfunction]
fn get_num_model_species(kimmdl: PyRef<'_, PyModelHandle>) -> (c_int, c_int, c_int) {
    let (n, max_len, status) = API.get_num_model_species(&kimmdl.handle);
    (n, max_len, status.code())
}

/// Return (species, status)
#[pyfunction]
fn get_model_species(kimmdl: PyRef<'_, PyModelHandle>, index: c_int) -> (Option<String>, c_int) {
    let (species, status) = API.get_model_species(&kimmdl.handle, index);
    (species, status.code())
}

/// Return (code, status)
#[pyfunction]
fn get_species_code(kimmdl: PyRef<'_, PyModelHandle>, species: &str) -> PyResult<(c_int, c_int)> {
    let (code, status) = API.get_species_code(&kimmdl.handle, &c_string(species)?);
    Ok((code, status.code()))
}

#[pyfunction]
fn set_species_code(kimmdl: PyRef<'_, PyModelHandle>, species: &str, code: c_int) -> PyResult<c_int> {
    Ok(API
        .set_species_code(&kimmdl.handle, &c_string(species)?, code)
        .code())
}

/// Return (numberParameters, maxStrLen, status)
#[pyfunction]
fn get_num_params(kimmdl: PyRef<'_, PyModelHandle>) -> (c_int, c_int, c_int) {
    let (n, max_len, status) = API.get_num_params(&kimmdl.handle);
    (n, max_len, status.code())
}

/// Return (parameterString, status)
#[pyfunction]
fn get_parameter(kimmdl: PyRef<'_, PyModelHandle>, index: c_int) -> (Option<String>, c_int) {
    let (param, status) = API.get_parameter(&kimmdl.handle, index);
    (param, status.code())
}

/// Return (numberFreeParameters, maxStringLength, status)
#[pyfunction]
fn get_num_free_params(kimmdl: PyRef<'_, PyModelHandle>) -> (c_int, c_int, c_int) {
    let (n, max_len, status) = API.get_num_free_params(&kimmdl.handle);
    (n, max_len, status.code())
}

/// Return (freeParameterString, status)
#[pyfunction]
fn get_free_parameter(kimmdl: PyRef<'_, PyModelHandle>, index: c_int) -> (Option<String>, c_int) {
    let (param, status) = API.get_free_parameter(&kimmdl.handle, index);
    (param, status.code())
}

/// Return (NBC_String, status)
#[pyfunction]
#[pyo3(name = "get_NBC_method")]
fn get_nbc_method(kimmdl: PyRef<'_, PyModelHandle>) -> (Option<String>, c_int) {
    let (nbc, status) = API.get_nbc_method(&kimmdl.handle);
    (nbc, status.code())
}

#[pyfunction]
fn get_model_index_shift(kimmdl: PyRef<'_, PyModelHandle>) -> c_int {
    API.get_model_index_shift(&kimmdl.handle)
}

/// Return (is_half, status)
#[pyfunction]
fn is_half_neighbors(kimmdl: PyRef<'_, PyModelHandle>) -> (c_int, c_int) {
    let (is_half, status) = API.is_half_neighbors(&kimmdl.handle);
    (is_half, status.code())
}

// ---------------------------------------------------------------------------
// Data exchange
// ---------------------------------------------------------------------------

fn describe_object(data: &Bound<'_, PyAny>) -> String {
    if let Ok(dtype) = data.getattr("dtype") {
        return dtype.to_string();
    }
    data.get_type()
        .name()
        .map(|n| n.to_string())
        .unwrap_or_else(|_| "object".to_string())
}

fn set_data<T: Element + BufferElement>(
    kimmdl: &Bound<'_, PyModelHandle>,
    name: &str,
    data: &Bound<'_, PyAny>,
) -> PyResult<c_int> {
    // No conversion: anything but exactly T is refused here.
    let buffer = PyBuffer::<T>::get_bound(data).map_err(|_| KimpyError::TypeMismatch {
        expected: T::TYPE,
        found: describe_object(data),
    })?;
    if buffer.readonly() {
        return Err(KimpyError::ReadOnly.into());
    }
    if !buffer.is_c_contiguous() {
        return Err(KimpyError::NonContiguous.into());
    }
    let name_c = c_string(name)?;
    let mut kim = kimmdl.try_borrow_mut()?;
    let status =
        unsafe { API.set_data_raw(&kim.handle, &name_c, buffer.buf_ptr(), buffer.item_count()) };
    if status.is_ok() {
        kim.registered.insert(name.to_string(), data.clone().unbind());
    }
    Ok(status.code())
}

#[pyfunction]
fn set_data_int(
    kimmdl: &Bound<'_, PyModelHandle>,
    name: &str,
    data: &Bound<'_, PyAny>,
) -> PyResult<c_int> {
    set_data::<c_int>(kimmdl, name, data)
}

#[pyfunction]
fn set_data_double(
    kimmdl: &Bound<'_, PyModelHandle>,
    name: &str,
    data: &Bound<'_, PyAny>,
) -> PyResult<c_int> {
    set_data::<f64>(kimmdl, name, data)
}

/// Return (data, status)
#[pyfunction]
fn get_data_int(kimmdl: &Bound<'_, PyModelHandle>, name: &str) -> PyResult<(PyDataView, c_int)> {
    let name = c_string(name)?;
    let kim = kimmdl.try_borrow()?;
    let (view, status) = API.get_data_int(&kim.handle, &name);
    Ok((PyDataView::new(&view, kimmdl), status.code()))
}

/// Return (data, status)
#[pyfunction]
fn get_data_double(kimmdl: &Bound<'_, PyModelHandle>, name: &str) -> PyResult<(PyDataView, c_int)> {
    let name = c_string(name)?;
    let kim = kimmdl.try_borrow()?;
    let (view, status) = API.get_data_double(&kim.handle, &name);
    Ok((PyDataView::new(&view, kimmdl), status.code()))
}

// ---------------------------------------------------------------------------
// Compute control
// ---------------------------------------------------------------------------

#[pyfunction]
fn set_compute(kimmdl: PyRef<'_, PyModelHandle>, name: &str, flag: c_int) -> PyResult<c_int> {
    Ok(API.set_compute(&kimmdl.handle, &c_string(name)?, flag).code())
}

#[pyfunction]
fn get_compute(kimmdl: PyRef<'_, PyModelHandle>, name: &str) -> PyResult<(c_int, c_int)> {
    let (flag, status) = API.get_compute(&kimmdl.handle, &c_string(name)?);
    Ok((flag, status.code()))
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Return (status_msg, status)
#[pyfunction]
fn get_status_msg(status_code: c_int) -> (Option<String>, c_int) {
    let (msg, status) = API.get_status_msg(Status::from_raw(status_code));
    (msg, status.code())
}

#[pyfunction]
#[pyo3(signature = (line, file, usermsg, status_code))]
fn report_error_wrapper(line: c_int, file: &str, usermsg: &str, status_code: c_int) -> PyResult<c_int> {
    Ok(API
        .report_error(
            line,
            &c_string(file)?,
            &c_string(usermsg)?,
            Status::from_raw(status_code),
        )
        .code())
}

/// Report an error with the line and file of the Python caller.
#[pyfunction]
fn report_error(py: Python<'_>, usermsg: &str, status_code: c_int) -> PyResult<c_int> {
    // No Python frame is pushed for a native function, so frame 0 is the
    // caller's.
    let frame = py.import_bound("sys")?.call_method1("_getframe", (0,))?;
    let line: c_int = frame.getattr("f_lineno")?.extract()?;
    let file: String = frame.getattr("f_code")?.getattr("co_filename")?.extract()?;
    report_error_wrapper(line, &file, usermsg, status_code)
}

/// A python interface to KIM API
#[pymodule]
fn kimapi(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("STATUS_OK", Status::OK.code())?;
    m.add_class::<PyModelHandle>()?;
    m.add_class::<PyDataView>()?;

    m.add_function(wrap_pyfunction!(get_version, m)?)?;
    m.add_function(wrap_pyfunction!(file_init, m)?)?;
    m.add_function(wrap_pyfunction!(model_info, m)?)?;
    m.add_function(wrap_pyfunction!(string_init, m)?)?;
    m.add_function(wrap_pyfunction!(allocate, m)?)?;
    m.add_function(wrap_pyfunction!(free, m)?)?;
    m.add_function(wrap_pyfunction!(print_kim, m)?)?;
    m.add_function(wrap_pyfunction!(model_compute, m)?)?;
    m.add_function(wrap_pyfunction!(model_init, m)?)?;
    m.add_function(wrap_pyfunction!(model_destroy, m)?)?;
    m.add_function(wrap_pyfunction!(model_reinit, m)?)?;

    m.add_function(wrap_pyfunction!(get_model_kim_str_len, m)?)?;
    m.add_function(wrap_pyfunction!(get_model_kim_str, m)?)?;
    m.add_function(wrap_pyfunction!(get_num_model_species, m)?)?;
    m.add_function(wrap_pyfunction!(get_model_species, m)?)?;
    m.add_function(wrap_pyfunction!(get_species_code, m)?)?;
    m.add_function(wrap_pyfunction!(set_species_code, m)?)?;
    m.add_function(wrap_pyfunction!(get_num_params, m)?)?;
    m.add_function(wrap_pyfunction!(get_parameter, m)?)?;
    m.add_function(wrap_pyfunction!(get_num_free_params, m)?)?;
    m.add_function(wrap_pyfunction!(get_free_parameter, m)?)?;
    m.add_function(wrap_pyfunction!(get_nbc_method, m)?)?;
    m.add_function(wrap_pyfunction!(get_model_index_shift, m)?)?;
    m.add_function(wrap_pyfunction!(is_half_neighbors, m)?)?;

    m.add_function(wrap_pyfunction!(set_data_int, m)?)?;
    m.add_function(wrap_pyfunction!(set_data_double, m)?)?;
    m.add_function(wrap_pyfunction!(get_data_int, m)?)?;
    m.add_function(wrap_pyfunction!(get_data_double, m)?)?;
    m.add_function(wrap_pyfunction!(set_compute, m)?)?;
    m.add_function(wrap_pyfunction!(get_compute, m)?)?;

    m.add_function(wrap_pyfunction!(get_status_msg, m)?)?;
    m.add_function(wrap_pyfunction!(report_error_wrapper, m)?)?;
    m.add_function(wrap_pyfunction!(report_error, m)?)?;
    Ok(())
}
