// MIT License
// Copyright 2023--present kimpy developers

//! Bindings for the KIM API v1 interatomic model interface.
//!
//! The crate is a thin adapter: each native entry point gets one method on
//! [`KimApi`] that marshals its arguments, makes exactly one native call and
//! hands back the outputs together with the native [`Status`]. Nothing is
//! interpreted on the caller's behalf.
//!
//! ## Modules
//!
//! - [`sys`] — The native contract as a table of `extern "C"` function
//!   pointers, and the linked library (feature `link`).
//! - [`status`] — [`Status`] passthrough codes and [`KimpyError`] for the few
//!   failures the adapter detects itself.
//! - [`handle`] — [`ModelHandle`], the opaque KIM object.
//! - [`tensor`] — [`DataView`] zero-copy buffer views and DLPack exchange.
//! - [`lock`] — [`ExecutionLock`], released around long computations.
//! - [`api`] — [`KimApi`], the adapter itself.
//! - `python` — The `kimapi` extension module (feature `python`).
//!
//! ## Features
//!
//! - `link` — link against `libkim-api-v1` (see `build.rs`) and enable
//!   [`KimApi::linked`].
//! - `python` — the pyo3 `kimapi` module. Outside of tests it needs `link`;
//!   unit tests run it against the in-memory library instead.
//! - `extension` — `python` + `link`, built as an importable extension
//!   module.

pub mod api;
pub mod handle;
pub mod lock;
pub mod status;
pub mod sys;
pub mod tensor;

#[cfg(all(feature = "python", any(feature = "link", test)))]
mod python;

#[cfg(test)]
mod mock;

pub use api::KimApi;
pub use handle::ModelHandle;
pub use lock::{ExecutionLock, NoExecutionLock};
pub use status::{KimpyError, Status};
pub use tensor::{DataView, Element, ElementType};
