// MIT License
// Copyright 2023--present kimpy developers

//! The adapter: one method per native KIM API entry point.
//!
//! [`KimApi`] wraps a [`KimApiFns`] table and applies the same conventions to
//! every call:
//!
//! 1. **Status last.** Whatever status the native call produced is returned
//!    unmodified, alone or as the last element of a tuple. A non-OK status is
//!    data, not an error.
//! 2. **No retries, no batching.** Each method is exactly one native call
//!    (plus the size lookup in [`get_data_int`](KimApi::get_data_int) /
//!    [`get_data_double`](KimApi::get_data_double)). Count and by-index
//!    queries stay separate methods.
//! 3. **Strings in, strings out.** Inputs are `&CStr`. Native out-strings are
//!    copied into `Option<String>`; `None` means the library left the out
//!    pointer unset.
//! 4. **Buffers are not copied.** Get paths return a [`DataView`] over native
//!    memory; set paths hand the caller's pointer straight to the library.
//!
//! ## Usage
//!
//! ```ignore
//! let api = KimApi::linked();
//! let (mut kim, status) = api.string_init(descriptor, c"ModelA");
//! assert!(status.is_ok());
//! api.allocate(&kim, 2, 1);
//! let mut coords = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0];
//! unsafe { api.set_data_double(&kim, c"coordinates", &mut coords) };
//! api.model_compute(&kim);
//! let (energy, _) = api.get_data_double(&kim, c"energy");
//! ```

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::panic::Location;
use std::ptr;

use dlpk::sys::DLManagedTensorVersioned;

use crate::handle::ModelHandle;
use crate::lock::ExecutionLock;
use crate::status::{KimpyError, Status};
use crate::sys::{GetByIndexFn, GetCountFn, KimApiFns};
use crate::tensor::{host_buffer, DataView, Element};

/// Copy a native string out, if the library set one.
///
/// # Safety
/// `s` must be NULL or point to a NUL-terminated string.
unsafe fn copy_out(s: *const c_char) -> Option<String> {
    if s.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(s) }.to_string_lossy().into_owned())
    }
}

/// Safe-ish adapter over a table of native KIM API entry points.
#[derive(Clone, Copy)]
pub struct KimApi {
    fns: KimApiFns,
}

impl KimApi {
    /// Adapt an arbitrary implementation of the entry-point contract.
    pub const fn new(fns: KimApiFns) -> Self {
        Self { fns }
    }

    /// Adapt the linked native library.
    #[cfg(feature = "link")]
    pub const fn linked() -> Self {
        Self::new(KimApiFns::LINKED)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// `(version, status)`
    pub fn get_version(&self) -> (Option<String>, Status) {
        let mut version: *const c_char = ptr::null();
        let status = unsafe { (self.fns.get_version)(&mut version) };
        (unsafe { copy_out(version) }, status.into())
    }

    /// Create a KIM object from a `.kim` descriptor file on disk.
    pub fn file_init(&self, simkimfile: &CStr, modelname: &CStr) -> (ModelHandle, Status) {
        let mut kim = ModelHandle::null();
        let status = unsafe {
            (self.fns.file_init)(kim.as_out_ptr(), simkimfile.as_ptr(), modelname.as_ptr())
        };
        tracing::debug!(model = ?modelname, status, "KIM_API_file_init");
        (kim, status.into())
    }

    /// Create a KIM object for inspecting a model only; it cannot compute.
    pub fn model_info(&self, modelname: &CStr) -> (ModelHandle, Status) {
        let mut kim = ModelHandle::null();
        let status = unsafe { (self.fns.model_info)(kim.as_out_ptr(), modelname.as_ptr()) };
        tracing::debug!(model = ?modelname, status, "KIM_API_model_info");
        (kim, status.into())
    }

    /// Create a KIM object from a descriptor held in memory.
    pub fn string_init(&self, siminputstring: &CStr, modelname: &CStr) -> (ModelHandle, Status) {
        let mut kim = ModelHandle::null();
        let status = unsafe {
            (self.fns.string_init)(kim.as_out_ptr(), siminputstring.as_ptr(), modelname.as_ptr())
        };
        tracing::debug!(model = ?modelname, status, "KIM_API_string_init");
        (kim, status.into())
    }

    /// Allocate the KIM-owned buffers for `nparts` particles and `nspecies`
    /// species.
    pub fn allocate(&self, kimmdl: &ModelHandle, nparts: isize, nspecies: c_int) -> Status {
        let mut status: c_int = Status::FAIL.code();
        unsafe { (self.fns.allocate)(kimmdl.as_ptr(), nparts, nspecies, &mut status) };
        status.into()
    }

    /// Release the KIM object. The library writes NULL back into `kimmdl`.
    pub fn free(&self, kimmdl: &mut ModelHandle) -> Status {
        let mut status: c_int = Status::FAIL.code();
        let before = kimmdl.as_ptr();
        unsafe { (self.fns.free)(kimmdl.as_out_ptr(), &mut status) };
        tracing::debug!(handle = ?before, status, "KIM_API_free");
        status.into()
    }

    /// Dump the KIM object through the library's own printer.
    pub fn print_kim(&self, kimmdl: &ModelHandle) -> Status {
        let mut status: c_int = Status::FAIL.code();
        unsafe { (self.fns.print)(kimmdl.as_ptr(), &mut status) };
        status.into()
    }

    /// Run the model's compute routine with the caller's lock held.
    pub fn model_compute(&self, kimmdl: &ModelHandle) -> Status {
        unsafe { (self.fns.model_compute)(kimmdl.as_ptr()) }.into()
    }

    /// Run the model's compute routine, releasing `lock` for the duration of
    /// the native call when `release_lock` is set.
    ///
    /// The result does not depend on `release_lock`; only what else can run
    /// in the meantime does.
    pub fn model_compute_with<L: ExecutionLock>(
        &self,
        kimmdl: &mut ModelHandle,
        lock: &mut L,
        release_lock: bool,
    ) -> Status {
        if !release_lock {
            return self.model_compute(kimmdl);
        }
        tracing::debug!(handle = ?kimmdl.as_ptr(), "model_compute with execution lock released");
        let kimmdl = &mut *kimmdl;
        lock.unlocked(move || self.model_compute(kimmdl))
    }

    pub fn model_init(&self, kimmdl: &ModelHandle) -> Status {
        unsafe { (self.fns.model_init)(kimmdl.as_ptr()) }.into()
    }

    pub fn model_reinit(&self, kimmdl: &ModelHandle) -> Status {
        unsafe { (self.fns.model_reinit)(kimmdl.as_ptr()) }.into()
    }

    /// Tear down the model's internal state. The KIM object itself stays
    /// allocated until [`free`](Self::free).
    pub fn model_destroy(&self, kimmdl: &ModelHandle) -> Status {
        unsafe { (self.fns.model_destroy)(kimmdl.as_ptr()) }.into()
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// `(length, status)` of the model's KIM descriptor.
    pub fn get_model_kim_str_len(&self, modelname: &CStr) -> (c_int, Status) {
        let mut len: c_int = 0;
        let status = unsafe { (self.fns.get_model_kim_str_len)(modelname.as_ptr(), &mut len) };
        (len, status.into())
    }

    /// `(descriptor, status)`; the descriptor is copied out of native memory.
    pub fn get_model_kim_str(&self, modelname: &CStr) -> (Option<String>, Status) {
        let mut kim_string: *const c_char = ptr::null();
        let status = unsafe { (self.fns.get_model_kim_str)(modelname.as_ptr(), &mut kim_string) };
        (unsafe { copy_out(kim_string) }, status.into())
    }

    fn get_count(&self, f: GetCountFn, kimmdl: &ModelHandle) -> (c_int, c_int, Status) {
        let mut count: c_int = 0;
        let mut max_len: c_int = 0;
        let status = unsafe { f(kimmdl.as_ptr(), &mut count, &mut max_len) };
        (count, max_len, status.into())
    }

    fn get_by_index(
        &self,
        f: GetByIndexFn,
        kimmdl: &ModelHandle,
        index: c_int,
    ) -> (Option<String>, Status) {
        let mut s: *const c_char = ptr::null();
        let status = unsafe { f(kimmdl.as_ptr(), index, &mut s) };
        (unsafe { copy_out(s) }, status.into())
    }

    /// `(number_of_species, max_string_length, status)`
    pub fn get_num_model_species(&self, kimmdl: &ModelHandle) -> (c_int, c_int, Status) {
        self.get_count(self.fns.get_num_model_species, kimmdl)
    }

    /// `(species, status)` for `index` in `0..number_of_species`.
    pub fn get_model_species(&self, kimmdl: &ModelHandle, index: c_int) -> (Option<String>, Status) {
        self.get_by_index(self.fns.get_model_species, kimmdl, index)
    }

    /// `(code, status)`
    pub fn get_species_code(&self, kimmdl: &ModelHandle, species: &CStr) -> (c_int, Status) {
        let mut status: c_int = Status::FAIL.code();
        let code =
            unsafe { (self.fns.get_species_code)(kimmdl.as_ptr(), species.as_ptr(), &mut status) };
        (code, status.into())
    }

    pub fn set_species_code(&self, kimmdl: &ModelHandle, species: &CStr, code: c_int) -> Status {
        let mut status: c_int = Status::FAIL.code();
        unsafe {
            (self.fns.set_species_code)(kimmdl.as_ptr(), species.as_ptr(), code, &mut status)
        };
        status.into()
    }

    /// `(number_of_parameters, max_string_length, status)`
    pub fn get_num_params(&self, kimmdl: &ModelHandle) -> (c_int, c_int, Status) {
        self.get_count(self.fns.get_num_params, kimmdl)
    }

    pub fn get_parameter(&self, kimmdl: &ModelHandle, index: c_int) -> (Option<String>, Status) {
        self.get_by_index(self.fns.get_parameter, kimmdl, index)
    }

    /// `(number_of_free_parameters, max_string_length, status)`
    pub fn get_num_free_params(&self, kimmdl: &ModelHandle) -> (c_int, c_int, Status) {
        self.get_count(self.fns.get_num_free_params, kimmdl)
    }

    pub fn get_free_parameter(
        &self,
        kimmdl: &ModelHandle,
        index: c_int,
    ) -> (Option<String>, Status) {
        self.get_by_index(self.fns.get_free_parameter, kimmdl, index)
    }

    /// `(nbc_method, status)`, e.g. `NEIGH_PURE_F`.
    pub fn get_nbc_method(&self, kimmdl: &ModelHandle) -> (Option<String>, Status) {
        let mut nbc: *const c_char = ptr::null();
        let status = unsafe { (self.fns.get_nbc_method)(kimmdl.as_ptr(), &mut nbc) };
        (unsafe { copy_out(nbc) }, status.into())
    }

    /// The offset the model adds to particle indices (0 or 1). The native
    /// entry point has no status.
    pub fn get_model_index_shift(&self, kimmdl: &ModelHandle) -> c_int {
        unsafe { (self.fns.get_model_index_shift)(kimmdl.as_ptr()) }
    }

    /// `(is_half, status)`
    pub fn is_half_neighbors(&self, kimmdl: &ModelHandle) -> (c_int, Status) {
        let mut status: c_int = Status::FAIL.code();
        let is_half = unsafe { (self.fns.is_half_neighbors)(kimmdl.as_ptr(), &mut status) };
        (is_half, status.into())
    }

    // -----------------------------------------------------------------------
    // Data exchange
    // -----------------------------------------------------------------------

    /// Register `len` elements at `data` under `name`.
    ///
    /// # Safety
    /// `data` must stay valid for as long as the library may use it.
    pub(crate) unsafe fn set_data_raw(
        &self,
        kimmdl: &ModelHandle,
        name: &CStr,
        data: *mut c_void,
        len: usize,
    ) -> Status {
        let size = isize::try_from(len).unwrap_or(isize::MAX);
        unsafe { (self.fns.set_data)(kimmdl.as_ptr(), name.as_ptr(), size, data) }.into()
    }

    /// Register a caller-owned integer buffer under `name`.
    ///
    /// # Safety
    /// The library keeps the pointer. `data` must outlive every later KIM
    /// call that may read or write it, and must not move in the meantime.
    pub unsafe fn set_data_int(
        &self,
        kimmdl: &ModelHandle,
        name: &CStr,
        data: &mut [c_int],
    ) -> Status {
        unsafe { self.set_data_raw(kimmdl, name, data.as_mut_ptr().cast(), data.len()) }
    }

    /// Register a caller-owned floating-point buffer under `name`.
    ///
    /// # Safety
    /// As [`set_data_int`](Self::set_data_int).
    pub unsafe fn set_data_double(
        &self,
        kimmdl: &ModelHandle,
        name: &CStr,
        data: &mut [f64],
    ) -> Status {
        unsafe { self.set_data_raw(kimmdl, name, data.as_mut_ptr().cast(), data.len()) }
    }

    unsafe fn set_data_tensor<T: Element>(
        &self,
        kimmdl: &ModelHandle,
        name: &CStr,
        tensor: *const DLManagedTensorVersioned,
    ) -> Result<Status, KimpyError> {
        let (data, len) = unsafe { host_buffer::<T>(tensor) }?;
        Ok(unsafe { self.set_data_raw(kimmdl, name, data.cast(), len) })
    }

    /// Register the data of an `int32` DLPack tensor under `name`.
    ///
    /// The tensor is checked before anything reaches the library: any other
    /// dtype is a [`KimpyError::TypeMismatch`].
    ///
    /// # Safety
    /// `tensor` must be NULL or valid, and its data must outlive its
    /// registration as in [`set_data_int`](Self::set_data_int).
    pub unsafe fn set_data_int_tensor(
        &self,
        kimmdl: &ModelHandle,
        name: &CStr,
        tensor: *const DLManagedTensorVersioned,
    ) -> Result<Status, KimpyError> {
        unsafe { self.set_data_tensor::<c_int>(kimmdl, name, tensor) }
    }

    /// Register the data of a `float64` DLPack tensor under `name`.
    ///
    /// # Safety
    /// As [`set_data_int_tensor`](Self::set_data_int_tensor).
    pub unsafe fn set_data_double_tensor(
        &self,
        kimmdl: &ModelHandle,
        name: &CStr,
        tensor: *const DLManagedTensorVersioned,
    ) -> Result<Status, KimpyError> {
        unsafe { self.set_data_tensor::<f64>(kimmdl, name, tensor) }
    }

    fn get_data<'h, T: Element>(
        &self,
        kimmdl: &'h ModelHandle,
        name: &CStr,
    ) -> (DataView<'h, T>, Status) {
        let mut status: c_int = Status::FAIL.code();
        let size = unsafe { (self.fns.get_size)(kimmdl.as_ptr(), name.as_ptr(), &mut status) };
        if !Status::from_raw(status).is_ok() {
            // Logged, not fatal: the data fetch below reports its own status.
            tracing::warn!(name = ?name, status, "KIM_API_get_size failed");
            self.report_error_here(c"KIM_API_get_size", status.into());
        }
        let data = unsafe { (self.fns.get_data)(kimmdl.as_ptr(), name.as_ptr(), &mut status) };
        let len = usize::try_from(size).unwrap_or(0);
        (DataView::from_native(data, len), status.into())
    }

    /// `(view, status)` over the native integer buffer `name`.
    ///
    /// The view length is the size the library reports right now. A failed
    /// size lookup is reported through `KIM_API_report_error` and the data is
    /// fetched anyway; the returned status is that of the data fetch.
    pub fn get_data_int<'h>(
        &self,
        kimmdl: &'h ModelHandle,
        name: &CStr,
    ) -> (DataView<'h, c_int>, Status) {
        self.get_data(kimmdl, name)
    }

    /// `(view, status)` over the native floating-point buffer `name`.
    pub fn get_data_double<'h>(
        &self,
        kimmdl: &'h ModelHandle,
        name: &CStr,
    ) -> (DataView<'h, f64>, Status) {
        self.get_data(kimmdl, name)
    }

    // -----------------------------------------------------------------------
    // Compute control
    // -----------------------------------------------------------------------

    /// Turn computation of the argument `name` on (1) or off (0).
    pub fn set_compute(&self, kimmdl: &ModelHandle, name: &CStr, flag: c_int) -> Status {
        let mut status: c_int = Status::FAIL.code();
        unsafe { (self.fns.set_compute)(kimmdl.as_ptr(), name.as_ptr(), flag, &mut status) };
        status.into()
    }

    /// `(flag, status)`
    pub fn get_compute(&self, kimmdl: &ModelHandle, name: &CStr) -> (c_int, Status) {
        let mut status: c_int = Status::FAIL.code();
        let flag = unsafe { (self.fns.get_compute)(kimmdl.as_ptr(), name.as_ptr(), &mut status) };
        (flag, status.into())
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    /// `(message, lookup_status)` for any status code.
    pub fn get_status_msg(&self, code: Status) -> (Option<String>, Status) {
        let mut msg: *const c_char = ptr::null();
        let status = unsafe { (self.fns.get_status_msg)(code.code(), &mut msg) };
        (unsafe { copy_out(msg) }, status.into())
    }

    /// Forward a report to the library's error log.
    pub fn report_error(&self, line: c_int, file: &CStr, usermsg: &CStr, status: Status) -> Status {
        unsafe {
            (self.fns.report_error)(line, file.as_ptr(), usermsg.as_ptr(), status.code())
        }
        .into()
    }

    /// [`report_error`](Self::report_error) with the line and file of the
    /// code calling this method.
    #[track_caller]
    pub fn report_error_here(&self, usermsg: &CStr, status: Status) -> Status {
        let caller = Location::caller();
        let line = c_int::try_from(caller.line()).unwrap_or(c_int::MAX);
        let file = CString::new(caller.file()).unwrap_or_default();
        self.report_error(line, &file, usermsg, status)
    }
}
