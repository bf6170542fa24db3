// MIT License
// Copyright 2023--present kimpy developers

//! The opaque native model handle.
//!
//! A [`ModelHandle`] is the `void*` KIM API object created by one of the init
//! entry points. The adapter never dereferences it and makes no assumption
//! about what it points to; it only hands the address back to the library.
//!
//! **Lifetime Contract**
//!
//! - Created by `file_init`, `string_init` or `model_info`. A failed init
//!   still yields a handle holding whatever the library wrote (usually NULL).
//! - `free` passes the address of the handle to `KIM_API_free`, which writes
//!   NULL through it. Later calls forward that NULL and the library reports
//!   the error itself.
//! - Buffer views borrow the handle, so the borrow checker refuses a `free`
//!   while a view of the same handle is alive.

use std::os::raw::c_void;

/// Opaque reference to a native KIM API object.
#[derive(Debug, PartialEq, Eq)]
pub struct ModelHandle {
    ptr: *mut c_void,
}

// ModelHandle stores a raw pointer it never dereferences. Concurrent use of one
// handle from several threads is the caller's obligation, as in the native API.
unsafe impl Send for ModelHandle {}

impl ModelHandle {
    /// Wrap a pointer produced by the native library.
    ///
    /// # Safety
    /// `ptr` must be NULL or a KIM API object obtained from the same library
    /// the handle will be passed to.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Self {
        Self { ptr }
    }

    /// A handle that refers to nothing.
    pub fn null() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
        }
    }

    /// The raw pointer, for forwarding to a native entry point.
    pub fn as_ptr(&self) -> *mut c_void {
        self.ptr
    }

    /// The address of the stored pointer, for out-parameter entry points such
    /// as `KIM_API_free`.
    pub(crate) fn as_out_ptr(&mut self) -> *mut *mut c_void {
        &mut self.ptr
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }
}
