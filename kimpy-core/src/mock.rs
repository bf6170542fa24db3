// MIT License
// Copyright 2023--present kimpy developers

//! An in-memory implementation of the KIM API entry points for tests.
//!
//! It knows one model, `ModelA`: a single-species (`Ar`) Lennard-Jones pair
//! potential with a full neighbor list. Objects are heap allocated and tracked
//! in a global live set, so stale or made-up handles are detected and answered
//! with `KIM_STATUS_API_OBJECT_INVALID` instead of being dereferenced.
//!
//! Reports sent to `KIM_API_report_error` and the number of `set_data` /
//! `get_data` calls are recorded per thread so tests can inspect them.
//!
//! Nothing in here may panic: a panic inside an `extern "C"` function aborts.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;

use parking_lot::Mutex;

use crate::sys::KimApiFns;

pub const STATUS_OK: c_int = 1;
pub const STATUS_FAIL: c_int = 0;
pub const STATUS_NEIGH_ITER_PAST_END: c_int = 2;
pub const STATUS_NEIGH_ITER_INIT_OK: c_int = 3;
pub const STATUS_NEIGH_INVALID_REQUEST: c_int = -11;
pub const STATUS_NEIGH_INVALID_MODE: c_int = -12;
pub const STATUS_API_OBJECT_INVALID: c_int = -51;
pub const STATUS_ARG_INVALID_SHAPE: c_int = -101;
pub const STATUS_ARG_INVALID_RANK: c_int = -102;
pub const STATUS_ARG_UNKNOWN: c_int = -501;

/// Every status code the mock documents a message for.
pub const DOCUMENTED_STATUS_CODES: &[c_int] = &[
    STATUS_OK,
    STATUS_FAIL,
    STATUS_NEIGH_ITER_PAST_END,
    STATUS_NEIGH_ITER_INIT_OK,
    STATUS_NEIGH_INVALID_REQUEST,
    STATUS_NEIGH_INVALID_MODE,
    STATUS_API_OBJECT_INVALID,
    STATUS_ARG_INVALID_SHAPE,
    STATUS_ARG_INVALID_RANK,
    STATUS_ARG_UNKNOWN,
];

fn status_message(code: c_int) -> Option<&'static CStr> {
    Some(match code {
        STATUS_OK => c"Successful completion",
        STATUS_FAIL => c"Unsuccessful completion",
        STATUS_NEIGH_ITER_PAST_END => c"Neighbor list iterator past end",
        STATUS_NEIGH_ITER_INIT_OK => c"Neighbor list iterator initialized",
        STATUS_NEIGH_INVALID_REQUEST => c"Invalid neighbor list request",
        STATUS_NEIGH_INVALID_MODE => c"Invalid neighbor list mode",
        STATUS_API_OBJECT_INVALID => c"KIM API object is invalid",
        STATUS_ARG_INVALID_SHAPE => c"Argument has invalid shape",
        STATUS_ARG_INVALID_RANK => c"Argument has invalid rank",
        STATUS_ARG_UNKNOWN => c"Argument name is not known",
        _ => return None,
    })
}

pub const VERSION: &str = "1.9.0+mock";
const VERSION_C: &CStr = c"1.9.0+mock";

/// A test descriptor that `ModelA` accepts.
pub const SIM_DESCRIPTOR: &CStr = c"TEST_NAME := mock_driver
Unit_length := A
Unit_energy := eV
SUPPORTED_ATOM/PARTICLES_TYPES:
Ar spec 1
CONVENTIONS:
ZeroBasedLists flag
NEIGH_PURE_F flag
MODEL_INPUT:
numberOfParticles integer none []
numberOfSpecies integer none []
particleSpecies integer none [numberOfParticles]
coordinates double length [numberOfParticles,3]
MODEL_OUTPUT:
cutoff double length []
energy double energy []
forces double force [numberOfParticles,3]
";

const MODEL_A_DESCRIPTOR: &CStr = c"MODEL_NAME := ModelA
Unit_length := A
Unit_energy := eV
SUPPORTED_ATOM/PARTICLES_TYPES:
Ar spec 1
CONVENTIONS:
ZeroBasedLists flag
NEIGH_PURE_F flag
MODEL_INPUT:
numberOfParticles integer none []
numberOfSpecies integer none []
particleSpecies integer none [numberOfParticles]
coordinates double length [numberOfParticles,3]
MODEL_OUTPUT:
cutoff double length []
energy double energy []
forces double force [numberOfParticles,3]
MODEL_PARAMETERS:
PARAM_FREE_cutoff double length []
PARAM_FREE_epsilon double energy []
PARAM_FREE_sigma double length []
PARAM_FIXED_cutsq double length^2 []
";

const FREE_PARAMS: [&CStr; 3] = [c"PARAM_FREE_cutoff", c"PARAM_FREE_epsilon", c"PARAM_FREE_sigma"];
const FIXED_PARAMS: [&CStr; 1] = [c"PARAM_FIXED_cutsq"];
const INT_ARGS: [&str; 3] = ["numberOfParticles", "numberOfSpecies", "particleSpecies"];
const DOUBLE_ARGS: [&str; 4] = ["coordinates", "cutoff", "energy", "forces"];
const COMPUTE_ARGS: [&str; 2] = ["energy", "forces"];

// ---------------------------------------------------------------------------
// Recorded side effects
// ---------------------------------------------------------------------------

/// One call to `KIM_API_report_error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub line: c_int,
    pub file: String,
    pub message: String,
    pub status: c_int,
}

thread_local! {
    static REPORTS: RefCell<Vec<Report>> = const { RefCell::new(Vec::new()) };
    static SET_DATA_CALLS: Cell<usize> = const { Cell::new(0) };
    static GET_DATA_CALLS: Cell<usize> = const { Cell::new(0) };
}

/// Drain the reports made on this thread.
pub fn take_reports() -> Vec<Report> {
    REPORTS.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

pub fn set_data_calls() -> usize {
    SET_DATA_CALLS.with(Cell::get)
}

pub fn get_data_calls() -> usize {
    GET_DATA_CALLS.with(Cell::get)
}

// ---------------------------------------------------------------------------
// KIM objects
// ---------------------------------------------------------------------------

static LIVE: Mutex<BTreeSet<usize>> = Mutex::new(BTreeSet::new());

enum Storage {
    Int(Vec<c_int>),
    Double(Vec<f64>),
}

struct Buffer {
    ptr: *mut c_void,
    size: isize,
    // Present when the object itself owns the memory.
    _storage: Option<Storage>,
}

impl Buffer {
    fn unset() -> Self {
        Self {
            ptr: ptr::null_mut(),
            size: 0,
            _storage: None,
        }
    }

    fn owned(mut storage: Storage) -> Self {
        let (ptr, size) = match &mut storage {
            Storage::Int(v) => (v.as_mut_ptr().cast(), v.len()),
            Storage::Double(v) => (v.as_mut_ptr().cast(), v.len()),
        };
        Self {
            ptr,
            size: size as isize,
            _storage: Some(storage),
        }
    }

    fn ints(&self) -> &[c_int] {
        if self.ptr.is_null() || self.size <= 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr.cast(), self.size as usize) }
    }

    fn doubles(&self) -> &[f64] {
        if self.ptr.is_null() || self.size <= 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr.cast(), self.size as usize) }
    }

    fn doubles_mut(&mut self) -> &mut [f64] {
        if self.ptr.is_null() || self.size <= 0 {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.ptr.cast(), self.size as usize) }
    }
}

struct MockKim {
    info_only: bool,
    initialized: bool,
    species: Vec<(CString, c_int)>,
    buffers: HashMap<String, Buffer>,
    compute: HashMap<&'static str, c_int>,
}

impl MockKim {
    fn new(info_only: bool) -> Self {
        let mut buffers: HashMap<String, Buffer> = INT_ARGS
            .iter()
            .chain(DOUBLE_ARGS.iter())
            .map(|name| (name.to_string(), Buffer::unset()))
            .collect();
        let cutoff = 2.5;
        for (name, value) in [
            ("cutoff", cutoff),
            ("PARAM_FREE_cutoff", cutoff),
            ("PARAM_FREE_epsilon", 1.0),
            ("PARAM_FREE_sigma", 0.9),
            ("PARAM_FIXED_cutsq", cutoff * cutoff),
        ] {
            buffers.insert(name.to_string(), Buffer::owned(Storage::Double(vec![value])));
        }
        Self {
            info_only,
            initialized: false,
            species: vec![(c"Ar".to_owned(), 1)],
            buffers,
            compute: COMPUTE_ARGS.iter().map(|&name| (name, 1)).collect(),
        }
    }

    fn param(&self, name: &str) -> f64 {
        self.buffers
            .get(name)
            .and_then(|b| b.doubles().first().copied())
            .unwrap_or(0.0)
    }

    fn compute(&mut self) -> c_int {
        if self.info_only {
            return STATUS_FAIL;
        }
        let n = match self
            .buffers
            .get("numberOfParticles")
            .and_then(|b| b.ints().first().copied())
        {
            Some(n) if n >= 0 => n as usize,
            _ => return STATUS_ARG_INVALID_SHAPE,
        };
        let coords = match self.buffers.get("coordinates") {
            Some(b) if b.doubles().len() >= 3 * n => b.doubles()[..3 * n].to_vec(),
            _ => return STATUS_ARG_INVALID_SHAPE,
        };
        let epsilon = self.param("PARAM_FREE_epsilon");
        let sigma = self.param("PARAM_FREE_sigma");
        let cutsq = self.param("PARAM_FIXED_cutsq");

        let mut energy = 0.0;
        let mut forces = vec![0.0; 3 * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d: Vec<f64> = (0..3).map(|k| coords[3 * j + k] - coords[3 * i + k]).collect();
                let rsq: f64 = d.iter().map(|x| x * x).sum();
                if rsq == 0.0 || rsq > cutsq {
                    continue;
                }
                let sr6 = (sigma * sigma / rsq).powi(3);
                energy += 4.0 * epsilon * (sr6 * sr6 - sr6);
                // -dE/dr / r
                let fscale = 24.0 * epsilon * (2.0 * sr6 * sr6 - sr6) / rsq;
                for k in 0..3 {
                    forces[3 * i + k] -= fscale * d[k];
                    forces[3 * j + k] += fscale * d[k];
                }
            }
        }

        if self.compute.get("energy") == Some(&1) {
            if let Some(out) = self.buffers.get_mut("energy").map(Buffer::doubles_mut) {
                if let Some(e) = out.first_mut() {
                    *e = energy;
                }
            }
        }
        if self.compute.get("forces") == Some(&1) {
            if let Some(out) = self.buffers.get_mut("forces").map(Buffer::doubles_mut) {
                let len = out.len().min(forces.len());
                out[..len].copy_from_slice(&forces[..len]);
            }
        }
        STATUS_OK
    }
}

fn create(kimmdl: *mut *mut c_void, info_only: bool) -> c_int {
    let raw = Box::into_raw(Box::new(MockKim::new(info_only)));
    LIVE.lock().insert(raw as usize);
    unsafe { *kimmdl = raw.cast() };
    STATUS_OK
}

fn with_kim<R>(kimmdl: *mut c_void, f: impl FnOnce(&mut MockKim) -> R) -> Result<R, c_int> {
    if kimmdl.is_null() || !LIVE.lock().contains(&(kimmdl as usize)) {
        return Err(STATUS_API_OBJECT_INVALID);
    }
    Ok(f(unsafe { &mut *kimmdl.cast::<MockKim>() }))
}

fn set_error(error: *mut c_int, status: c_int) {
    if !error.is_null() {
        unsafe { *error = status };
    }
}

fn read_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

fn known_model(modelname: *const c_char) -> bool {
    read_str(modelname) == Some("ModelA")
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

unsafe extern "C" fn get_version(version: *mut *const c_char) -> c_int {
    unsafe { *version = VERSION_C.as_ptr() };
    STATUS_OK
}

unsafe extern "C" fn string_init(
    kimmdl: *mut *mut c_void,
    siminputstring: *const c_char,
    modelname: *const c_char,
) -> c_int {
    unsafe { *kimmdl = ptr::null_mut() };
    match read_str(siminputstring) {
        Some(s) if !s.trim().is_empty() && known_model(modelname) => create(kimmdl, false),
        _ => STATUS_FAIL,
    }
}

unsafe extern "C" fn file_init(
    kimmdl: *mut *mut c_void,
    simkimfile: *const c_char,
    modelname: *const c_char,
) -> c_int {
    unsafe { *kimmdl = ptr::null_mut() };
    let Some(contents) = read_str(simkimfile).and_then(|p| std::fs::read_to_string(p).ok())
    else {
        return STATUS_FAIL;
    };
    let Ok(contents) = CString::new(contents) else {
        return STATUS_FAIL;
    };
    unsafe { string_init(kimmdl, contents.as_ptr(), modelname) }
}

unsafe extern "C" fn model_info(kimmdl: *mut *mut c_void, modelname: *const c_char) -> c_int {
    unsafe { *kimmdl = ptr::null_mut() };
    if known_model(modelname) {
        create(kimmdl, true)
    } else {
        STATUS_FAIL
    }
}

unsafe extern "C" fn allocate(kimmdl: *mut c_void, nparts: isize, nspecies: c_int, error: *mut c_int) {
    let status = with_kim(kimmdl, |k| {
        if nparts < 0 || nspecies < 0 {
            return STATUS_ARG_INVALID_SHAPE;
        }
        let n = nparts as usize;
        let fresh = [
            ("numberOfParticles", Storage::Int(vec![nparts as c_int])),
            ("numberOfSpecies", Storage::Int(vec![nspecies])),
            ("particleSpecies", Storage::Int(vec![1; n])),
            ("coordinates", Storage::Double(vec![0.0; 3 * n])),
            ("energy", Storage::Double(vec![0.0])),
            ("forces", Storage::Double(vec![0.0; 3 * n])),
        ];
        for (name, storage) in fresh {
            k.buffers.insert(name.to_string(), Buffer::owned(storage));
        }
        STATUS_OK
    });
    set_error(error, status.unwrap_or_else(|e| e));
}

unsafe extern "C" fn free(kimmdl: *mut *mut c_void, error: *mut c_int) {
    if kimmdl.is_null() {
        set_error(error, STATUS_FAIL);
        return;
    }
    let raw = unsafe { *kimmdl };
    if raw.is_null() || !LIVE.lock().remove(&(raw as usize)) {
        set_error(error, STATUS_API_OBJECT_INVALID);
        return;
    }
    drop(unsafe { Box::from_raw(raw.cast::<MockKim>()) });
    unsafe { *kimmdl = ptr::null_mut() };
    set_error(error, STATUS_OK);
}

unsafe extern "C" fn print(kimmdl: *mut c_void, error: *mut c_int) {
    let status = with_kim(kimmdl, |_| STATUS_OK);
    set_error(error, status.unwrap_or_else(|e| e));
}

unsafe extern "C" fn model_compute(kimmdl: *mut c_void) -> c_int {
    with_kim(kimmdl, MockKim::compute).unwrap_or_else(|e| e)
}

unsafe extern "C" fn model_init(kimmdl: *mut c_void) -> c_int {
    with_kim(kimmdl, |k| {
        k.initialized = true;
        STATUS_OK
    })
    .unwrap_or_else(|e| e)
}

unsafe extern "C" fn model_reinit(kimmdl: *mut c_void) -> c_int {
    with_kim(kimmdl, |k| if k.initialized { STATUS_OK } else { STATUS_FAIL }).unwrap_or_else(|e| e)
}

unsafe extern "C" fn model_destroy(kimmdl: *mut c_void) -> c_int {
    with_kim(kimmdl, |k| {
        k.initialized = false;
        STATUS_OK
    })
    .unwrap_or_else(|e| e)
}

unsafe extern "C" fn get_model_kim_str_len(modelname: *const c_char, len: *mut c_int) -> c_int {
    if !known_model(modelname) {
        return STATUS_FAIL;
    }
    unsafe { *len = MODEL_A_DESCRIPTOR.to_bytes().len() as c_int };
    STATUS_OK
}

unsafe extern "C" fn get_model_kim_str(modelname: *const c_char, kim_string: *mut *const c_char) -> c_int {
    if !known_model(modelname) {
        return STATUS_FAIL;
    }
    unsafe { *kim_string = MODEL_A_DESCRIPTOR.as_ptr() };
    STATUS_OK
}

fn write_count(count: *mut c_int, max_len: *mut c_int, names: &[&CStr]) {
    let longest = names.iter().map(|n| n.to_bytes().len()).max().unwrap_or(0);
    unsafe {
        *count = names.len() as c_int;
        *max_len = longest as c_int;
    }
}

fn write_by_index(index: c_int, names: &[&CStr], out: *mut *const c_char) -> c_int {
    match usize::try_from(index).ok().and_then(|i| names.get(i)) {
        Some(name) => {
            unsafe { *out = name.as_ptr() };
            STATUS_OK
        }
        None => STATUS_FAIL,
    }
}

unsafe extern "C" fn get_num_model_species(kimmdl: *mut c_void, count: *mut c_int, max_len: *mut c_int) -> c_int {
    with_kim(kimmdl, |k| {
        let names: Vec<&CStr> = k.species.iter().map(|(s, _)| s.as_c_str()).collect();
        write_count(count, max_len, &names);
        STATUS_OK
    })
    .unwrap_or_else(|e| e)
}

unsafe extern "C" fn get_model_species(kimmdl: *mut c_void, index: c_int, out: *mut *const c_char) -> c_int {
    with_kim(kimmdl, |k| {
        let names: Vec<&CStr> = k.species.iter().map(|(s, _)| s.as_c_str()).collect();
        write_by_index(index, &names, out)
    })
    .unwrap_or_else(|e| e)
}

unsafe extern "C" fn get_species_code(kimmdl: *mut c_void, species: *const c_char, error: *mut c_int) -> c_int {
    let wanted = read_str(species);
    let found = with_kim(kimmdl, |k| {
        k.species
            .iter()
            .find(|(s, _)| s.to_str().ok() == wanted)
            .map(|&(_, code)| code)
    });
    match found {
        Ok(Some(code)) => {
            set_error(error, STATUS_OK);
            code
        }
        Ok(None) => {
            set_error(error, STATUS_ARG_UNKNOWN);
            0
        }
        Err(e) => {
            set_error(error, e);
            0
        }
    }
}

unsafe extern "C" fn set_species_code(kimmdl: *mut c_void, species: *const c_char, code: c_int, error: *mut c_int) {
    let wanted = read_str(species);
    let status = with_kim(kimmdl, |k| {
        match k.species.iter_mut().find(|(s, _)| s.to_str().ok() == wanted) {
            Some(entry) => {
                entry.1 = code;
                STATUS_OK
            }
            None => STATUS_ARG_UNKNOWN,
        }
    });
    set_error(error, status.unwrap_or_else(|e| e));
}

fn all_params() -> Vec<&'static CStr> {
    FREE_PARAMS.iter().chain(FIXED_PARAMS.iter()).copied().collect()
}

unsafe extern "C" fn get_num_params(kimmdl: *mut c_void, count: *mut c_int, max_len: *mut c_int) -> c_int {
    with_kim(kimmdl, |_| {
        write_count(count, max_len, &all_params());
        STATUS_OK
    })
    .unwrap_or_else(|e| e)
}

unsafe extern "C" fn get_parameter(kimmdl: *mut c_void, index: c_int, out: *mut *const c_char) -> c_int {
    with_kim(kimmdl, |_| write_by_index(index, &all_params(), out)).unwrap_or_else(|e| e)
}

unsafe extern "C" fn get_num_free_params(kimmdl: *mut c_void, count: *mut c_int, max_len: *mut c_int) -> c_int {
    with_kim(kimmdl, |_| {
        write_count(count, max_len, &FREE_PARAMS);
        STATUS_OK
    })
    .unwrap_or_else(|e| e)
}

unsafe extern "C" fn get_free_parameter(kimmdl: *mut c_void, index: c_int, out: *mut *const c_char) -> c_int {
    with_kim(kimmdl, |_| write_by_index(index, &FREE_PARAMS, out)).unwrap_or_else(|e| e)
}

unsafe extern "C" fn get_nbc_method(kimmdl: *mut c_void, nbc: *mut *const c_char) -> c_int {
    with_kim(kimmdl, |_| {
        unsafe { *nbc = c"NEIGH_PURE_F".as_ptr() };
        STATUS_OK
    })
    .unwrap_or_else(|e| e)
}

unsafe extern "C" fn get_status_msg(code: c_int, msg: *mut *const c_char) -> c_int {
    match status_message(code) {
        Some(text) => {
            unsafe { *msg = text.as_ptr() };
            STATUS_OK
        }
        None => STATUS_FAIL,
    }
}

unsafe extern "C" fn report_error(line: c_int, file: *const c_char, usermsg: *const c_char, error: c_int) -> c_int {
    let report = Report {
        line,
        file: read_str(file).unwrap_or_default().to_string(),
        message: read_str(usermsg).unwrap_or_default().to_string(),
        status: error,
    };
    REPORTS.with(|r| r.borrow_mut().push(report));
    STATUS_OK
}

unsafe extern "C" fn get_model_index_shift(kimmdl: *mut c_void) -> c_int {
    // ZeroBasedLists
    with_kim(kimmdl, |_| 0).unwrap_or(0)
}

unsafe extern "C" fn is_half_neighbors(kimmdl: *mut c_void, error: *mut c_int) -> c_int {
    match with_kim(kimmdl, |_| 0) {
        Ok(half) => {
            set_error(error, STATUS_OK);
            half
        }
        Err(e) => {
            set_error(error, e);
            0
        }
    }
}

unsafe extern "C" fn set_data(kimmdl: *mut c_void, name: *const c_char, size: isize, data: *mut c_void) -> c_int {
    SET_DATA_CALLS.with(|c| c.set(c.get() + 1));
    let name = read_str(name);
    with_kim(kimmdl, |k| {
        if size < 0 {
            return STATUS_ARG_INVALID_SHAPE;
        }
        match name.and_then(|n| k.buffers.get_mut(n)) {
            Some(buffer) => {
                *buffer = Buffer {
                    ptr: data,
                    size,
                    _storage: None,
                };
                STATUS_OK
            }
            None => STATUS_ARG_UNKNOWN,
        }
    })
    .unwrap_or_else(|e| e)
}

unsafe extern "C" fn get_data(kimmdl: *mut c_void, name: *const c_char, error: *mut c_int) -> *mut c_void {
    GET_DATA_CALLS.with(|c| c.set(c.get() + 1));
    let name = read_str(name);
    let found = with_kim(kimmdl, |k| name.and_then(|n| k.buffers.get(n)).map(|b| b.ptr));
    match found {
        Ok(Some(p)) => {
            set_error(error, STATUS_OK);
            p
        }
        Ok(None) => {
            set_error(error, STATUS_ARG_UNKNOWN);
            ptr::null_mut()
        }
        Err(e) => {
            set_error(error, e);
            ptr::null_mut()
        }
    }
}

unsafe extern "C" fn get_size(kimmdl: *mut c_void, name: *const c_char, error: *mut c_int) -> isize {
    let name = read_str(name);
    let found = with_kim(kimmdl, |k| name.and_then(|n| k.buffers.get(n)).map(|b| b.size));
    match found {
        Ok(Some(size)) => {
            set_error(error, STATUS_OK);
            size
        }
        Ok(None) => {
            set_error(error, STATUS_ARG_UNKNOWN);
            -1
        }
        Err(e) => {
            set_error(error, e);
            -1
        }
    }
}

unsafe extern "C" fn set_compute(kimmdl: *mut c_void, name: *const c_char, flag: c_int, error: *mut c_int) {
    let name = read_str(name);
    let status = with_kim(kimmdl, |k| match name.and_then(|n| k.compute.get_mut(n)) {
        Some(slot) => {
            *slot = flag;
            STATUS_OK
        }
        None => STATUS_ARG_UNKNOWN,
    });
    set_error(error, status.unwrap_or_else(|e| e));
}

unsafe extern "C" fn get_compute(kimmdl: *mut c_void, name: *const c_char, error: *mut c_int) -> c_int {
    let name = read_str(name);
    let found = with_kim(kimmdl, |k| name.and_then(|n| k.compute.get(n)).copied());
    match found {
        Ok(Some(flag)) => {
            set_error(error, STATUS_OK);
            flag
        }
        Ok(None) => {
            set_error(error, STATUS_ARG_UNKNOWN);
            0
        }
        Err(e) => {
            set_error(error, e);
            0
        }
    }
}

/// The mock as an entry-point table.
pub const FNS: KimApiFns = KimApiFns {
    get_version,
    file_init,
    string_init,
    model_info,
    allocate,
    free,
    print,
    model_compute,
    model_init,
    model_reinit,
    model_destroy,
    get_model_kim_str_len,
    get_model_kim_str,
    get_num_model_species,
    get_model_species,
    get_species_code,
    set_species_code,
    get_num_params,
    get_parameter,
    get_num_free_params,
    get_free_parameter,
    get_nbc_method,
    get_status_msg,
    report_error,
    get_model_index_shift,
    is_half_neighbors,
    set_data,
    get_data,
    get_size,
    set_compute,
    get_compute,
};
