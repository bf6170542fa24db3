// MIT License
// Copyright 2023--present kimpy developers

//! Zero-copy views over native data buffers, and their DLPack exchange.
//!
//! A KIM API object owns named buffers (`coordinates`, `energy`, ...). This
//! module provides two ways of looking at that memory without copying it:
//!
//! - **[`DataView`]** — pointer + element count, borrowed from the
//!   [`ModelHandle`] it came from. The count is the native size at the moment
//!   of the query. The native library may reallocate or free the memory at any
//!   later KIM call, so element access is `unsafe`.
//! - **DLPack** — [`DataView::to_dlpack`] wraps the same pointer in a
//!   non-owning `DLManagedTensorVersioned`. The deleter frees only the tensor
//!   metadata, never the native data.
//!
//! For the set path, [`host_buffer`] goes the other way: it takes a caller
//! tensor, checks that it is a compact, writable CPU buffer of exactly the
//! expected element type, and yields the raw pointer and count to register.
//!
//! The native API has no type tag on its buffers. The element width is chosen
//! by the caller through the entry point it uses (`*_int` or `*_double`),
//! which maps to the [`Element`] impl for `c_int` or `f64`.

use std::fmt;
use std::marker::PhantomData;
use std::os::raw::{c_int, c_void};
use std::ptr;

use dlpk::sys::{
    DLDataType, DLDataTypeCode, DLDevice, DLDeviceType, DLManagedTensorVersioned, DLPackVersion,
    DLTensor, DLPACK_FLAG_BITMASK_READ_ONLY,
};

use crate::handle::ModelHandle;
use crate::status::KimpyError;

// ---------------------------------------------------------------------------
// Element types
// ---------------------------------------------------------------------------

/// The two element types a KIM buffer can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Native `int`.
    Int,
    /// Native `double`.
    Double,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Int => f.write_str("int"),
            ElementType::Double => f.write_str("double"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for std::os::raw::c_int {}
    impl Sealed for f64 {}
}

/// A native element type: `c_int` or `f64`.
pub trait Element: sealed::Sealed + Copy + 'static {
    const TYPE: ElementType;

    /// The matching DLPack data type.
    fn dtype() -> DLDataType;
}

impl Element for c_int {
    const TYPE: ElementType = ElementType::Int;

    fn dtype() -> DLDataType {
        DLDataType {
            code: DLDataTypeCode::kDLInt,
            bits: (std::mem::size_of::<c_int>() * 8) as u8,
            lanes: 1,
        }
    }
}

impl Element for f64 {
    const TYPE: ElementType = ElementType::Double;

    fn dtype() -> DLDataType {
        DLDataType {
            code: DLDataTypeCode::kDLFloat,
            bits: 64,
            lanes: 1,
        }
    }
}

fn describe_dtype(dtype: &DLDataType) -> String {
    let kind = match dtype.code {
        DLDataTypeCode::kDLInt => "int".to_string(),
        DLDataTypeCode::kDLUInt => "uint".to_string(),
        DLDataTypeCode::kDLFloat => "float".to_string(),
        ref other => format!("{other:?}"),
    };
    if dtype.lanes == 1 {
        format!("{kind}{}", dtype.bits)
    } else {
        format!("{kind}{}x{}", dtype.bits, dtype.lanes)
    }
}

// ---------------------------------------------------------------------------
// DataView
// ---------------------------------------------------------------------------

/// A non-owning view of a native KIM buffer.
///
/// The view is valid only while the native buffer it was taken from stays
/// where it is: any later KIM call on the same handle (`allocate`,
/// `set_data`, `free`, ...) may move or release the memory. The `'h` borrow
/// ties the view to its [`ModelHandle`] so at least `free` cannot happen first.
pub struct DataView<'h, T: Element> {
    ptr: *mut T,
    len: usize,
    _handle: PhantomData<&'h ModelHandle>,
}

impl<'h, T: Element> DataView<'h, T> {
    /// Build a view from a native pointer and a native size.
    ///
    /// A NULL pointer always gives an empty view, whatever the size.
    pub(crate) fn from_native(ptr: *mut c_void, len: usize) -> Self {
        let ptr = ptr.cast::<T>();
        Self {
            ptr,
            len: if ptr.is_null() { 0 } else { len },
            _handle: PhantomData,
        }
    }

    /// Number of elements, as reported by the native size query.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn element_type(&self) -> ElementType {
        T::TYPE
    }

    /// The native data pointer (NULL for an empty view over no buffer).
    pub fn as_ptr(&self) -> *mut T {
        self.ptr
    }

    /// Borrow the native memory as a slice.
    ///
    /// # Safety
    /// No KIM call that could reallocate or free this buffer may happen while
    /// the slice is alive, and nothing else may write to it concurrently.
    pub unsafe fn as_slice(&self) -> &[T] {
        if self.ptr.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    /// Borrow the native memory mutably. Writes go straight to the model.
    ///
    /// # Safety
    /// As [`as_slice`](Self::as_slice), and no other reference to the buffer
    /// may exist.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [T] {
        if self.ptr.is_null() {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }

    /// Wrap the view in a non-owning 1-D DLPack tensor.
    ///
    /// The caller owns the returned metadata and must release it with
    /// [`free_tensor`]. The data itself stays owned by the native library.
    pub fn to_dlpack(&self) -> *mut DLManagedTensorVersioned {
        export_1d(self.ptr, self.len)
    }
}

impl<T: Element> fmt::Debug for DataView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataView")
            .field("element_type", &T::TYPE)
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// DLPack export
// ---------------------------------------------------------------------------

/// A 1-D tensor and its shape/stride storage in one allocation.
#[repr(C)]
struct Exported1d {
    // First, so a pointer to the tensor is a pointer to the whole block.
    managed: DLManagedTensorVersioned,
    shape: i64,
    stride: i64,
}

unsafe extern "C" fn release_exported(tensor: *mut DLManagedTensorVersioned) {
    if !tensor.is_null() {
        drop(unsafe { Box::from_raw(tensor.cast::<Exported1d>()) });
    }
}

/// Describe `len` elements at `data` as a writable 1-D CPU tensor without
/// taking ownership of them.
fn export_1d<T: Element>(data: *mut T, len: usize) -> *mut DLManagedTensorVersioned {
    let mut block = Box::new(Exported1d {
        managed: DLManagedTensorVersioned {
            version: DLPackVersion { major: 1, minor: 0 },
            manager_ctx: ptr::null_mut(),
            deleter: Some(release_exported),
            flags: 0,
            dl_tensor: DLTensor {
                data: data.cast(),
                device: DLDevice {
                    device_type: DLDeviceType::kDLCPU,
                    device_id: 0,
                },
                ndim: 1,
                dtype: T::dtype(),
                shape: ptr::null_mut(),
                strides: ptr::null_mut(),
                byte_offset: 0,
            },
        },
        shape: len as i64,
        stride: 1,
    });
    block.managed.dl_tensor.shape = &mut block.shape;
    block.managed.dl_tensor.strides = &mut block.stride;
    Box::into_raw(block).cast()
}

/// Wrap a caller slice in a non-owning 1-D DLPack tensor.
///
/// # Safety
/// `data` must outlive the returned tensor. Release it with [`free_tensor`].
pub unsafe fn borrow_as_tensor<T: Element>(data: &mut [T]) -> *mut DLManagedTensorVersioned {
    export_1d(data.as_mut_ptr(), data.len())
}

/// Release a DLPack tensor through its own deleter. NULL is ignored.
///
/// # Safety
/// `tensor` must be NULL or a valid `DLManagedTensorVersioned` that has not
/// been released yet.
pub unsafe fn free_tensor(tensor: *mut DLManagedTensorVersioned) {
    let deleter = unsafe { tensor.as_ref() }.and_then(|t| t.deleter);
    if let Some(deleter) = deleter {
        unsafe { deleter(tensor) };
    }
}

// ---------------------------------------------------------------------------
// Validation for the set path
// ---------------------------------------------------------------------------

/// Check that `tensor` is a compact, writable CPU buffer of `T` and return
/// its data pointer and element count.
///
/// Any dtype other than `T`'s exact DLPack type is a
/// [`KimpyError::TypeMismatch`]; nothing is converted. The library writes into
/// some registered buffers, so read-only tensors are refused.
///
/// # Safety
/// `tensor` must be NULL or point to a valid `DLManagedTensorVersioned`.
pub unsafe fn host_buffer<T: Element>(
    tensor: *const DLManagedTensorVersioned,
) -> Result<(*mut T, usize), KimpyError> {
    let Some(managed) = (unsafe { tensor.as_ref() }) else {
        return Err(KimpyError::NullTensor);
    };
    let t = &managed.dl_tensor;
    if t.dtype != T::dtype() {
        return Err(KimpyError::TypeMismatch {
            expected: T::TYPE,
            found: describe_dtype(&t.dtype),
        });
    }
    if t.device.device_type != DLDeviceType::kDLCPU {
        return Err(KimpyError::UnsupportedDevice(format!(
            "{:?}",
            t.device.device_type
        )));
    }
    if managed.flags & DLPACK_FLAG_BITMASK_READ_ONLY != 0 {
        return Err(KimpyError::ReadOnly);
    }
    if t.ndim < 0 || (t.ndim > 0 && t.shape.is_null()) {
        return Err(KimpyError::MalformedShape);
    }
    let shape: &[i64] = if t.ndim == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(t.shape, t.ndim as usize) }
    };
    if !t.strides.is_null() {
        let strides = unsafe { std::slice::from_raw_parts(t.strides, shape.len()) };
        // Walk from the innermost dimension; size-1 dimensions may carry any
        // stride.
        let mut expected = 1i64;
        for (&dim, &stride) in shape.iter().zip(strides).rev() {
            if dim != 1 && stride != expected {
                return Err(KimpyError::NonContiguous);
            }
            expected = expected.saturating_mul(dim);
        }
    }
    let count = shape
        .iter()
        .try_fold(1usize, |acc, &d| usize::try_from(d).ok().and_then(|d| acc.checked_mul(d)))
        .ok_or(KimpyError::MalformedShape)?;
    if t.data.is_null() && count > 0 {
        return Err(KimpyError::NullTensor);
    }
    let data = t.data.cast::<u8>().wrapping_add(t.byte_offset as usize);
    Ok((data.cast::<T>(), count))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
