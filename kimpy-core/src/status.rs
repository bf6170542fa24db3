// MIT License
// Copyright 2023--present kimpy developers

//! Status codes and adapter-local errors.
//!
//! Two kinds of failure exist in this crate and they never mix:
//!
//! 1. **[`Status`]** — the native KIM API integer code space. Every adapted
//!    call returns the code it received, alone or as the last element of a
//!    tuple. The adapter never turns a non-OK status into an `Err` or a panic;
//!    what to do with it is the caller's decision.
//!
//! 2. **[`KimpyError`]** — failures detected by the adapter itself *before* a
//!    native call is made, e.g. a floating-point tensor handed to the integer
//!    set-data path. These never carry a native code.
//!
//! Note that KIM API v1 uses `1` for success and `0` for a generic failure.
//! Negative values are specific error conditions; [`KimApi::get_status_msg`]
//! turns any of them into text.
//!
//! [`KimApi::get_status_msg`]: crate::api::KimApi::get_status_msg

use std::fmt;
use std::os::raw::c_int;

use crate::tensor::ElementType;

/// A native KIM API status code, passed through unmodified.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(c_int);

impl Status {
    /// `KIM_STATUS_OK`.
    pub const OK: Status = Status(1);
    /// `KIM_STATUS_FAIL`.
    pub const FAIL: Status = Status(0);
    /// `KIM_STATUS_NEIGH_ITER_PAST_END`.
    pub const NEIGH_ITER_PAST_END: Status = Status(2);
    /// `KIM_STATUS_NEIGH_ITER_INIT_OK`.
    pub const NEIGH_ITER_INIT_OK: Status = Status(3);

    /// Wrap a raw code returned by the native library.
    pub const fn from_raw(code: c_int) -> Self {
        Status(code)
    }

    /// The raw integer, as the native library reported it.
    pub const fn code(self) -> c_int {
        self.0
    }

    /// Whether this is exactly `KIM_STATUS_OK`.
    pub const fn is_ok(self) -> bool {
        self.0 == Self::OK.0
    }
}

impl From<c_int> for Status {
    fn from(code: c_int) -> Self {
        Status(code)
    }
}

impl From<Status> for c_int {
    fn from(status: Status) -> Self {
        status.0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KIM status {}", self.0)
    }
}

/// Errors raised by the adapter itself, never by the native library.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KimpyError {
    /// The caller's buffer does not hold the element type the entry point
    /// expects. No conversion is attempted.
    #[error("type mismatch: expected {expected} elements, got {found}")]
    TypeMismatch {
        expected: ElementType,
        found: String,
    },
    /// A NULL tensor pointer was supplied.
    #[error("tensor is NULL")]
    NullTensor,
    /// The tensor lives on a device the native library cannot address.
    #[error("tensor must be on the CPU, got device type {0}")]
    UnsupportedDevice(String),
    /// The tensor is not a compact row-major buffer.
    #[error("tensor must be contiguous and row-major")]
    NonContiguous,
    /// The library may write into registered buffers.
    #[error("buffer is read-only")]
    ReadOnly,
    /// The tensor's shape is missing or has a negative or overflowing
    /// dimension.
    #[error("tensor shape is missing or invalid")]
    MalformedShape,
}
