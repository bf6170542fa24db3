// MIT License
// Copyright 2023--present kimpy developers

//! The native KIM API v1 entry-point contract.
//!
//! [`KimApiFns`] holds one `extern "C"` function pointer per native entry
//! point, with the exact C signatures of `KIM_API_C.h`. The adapter in
//! [`crate::api`] only ever calls through this table, which lets the same
//! adapter drive the real shared library ([`KimApiFns::LINKED`], feature
//! `link`) or any other implementation of the contract.
//!
//! **Out-parameter conventions**
//!
//! - `*mut *mut c_void` arguments named `kimmdl` in the init functions receive
//!   the newly created handle. `KIM_API_free` takes the address of the handle
//!   and writes NULL through it.
//! - `*mut c_int` arguments named `error` receive a status for entry points
//!   whose return value is data rather than a status.
//! - `*mut *const c_char` out-strings point into native-owned memory.

use std::os::raw::{c_char, c_int, c_void};

/// `int KIM_API_get_version(const char** version)`
pub type GetVersionFn = unsafe extern "C" fn(version: *mut *const c_char) -> c_int;
/// `int KIM_API_file_init(void* kimmdl, const char* simkimfile, const char* modelname)`
pub type FileInitFn = unsafe extern "C" fn(
    kimmdl: *mut *mut c_void,
    simkimfile: *const c_char,
    modelname: *const c_char,
) -> c_int;
/// `int KIM_API_string_init(void* kimmdl, const char* siminputstring, const char* modelname)`
pub type StringInitFn = unsafe extern "C" fn(
    kimmdl: *mut *mut c_void,
    siminputstring: *const c_char,
    modelname: *const c_char,
) -> c_int;
/// `int KIM_API_model_info(void* kimmdl, const char* modelname)`
pub type ModelInfoFn =
    unsafe extern "C" fn(kimmdl: *mut *mut c_void, modelname: *const c_char) -> c_int;
/// `void KIM_API_allocate(void* kimmdl, intptr_t nparts, int nspecies, int* error)`
pub type AllocateFn = unsafe extern "C" fn(
    kimmdl: *mut c_void,
    nparts: isize,
    nspecies: c_int,
    error: *mut c_int,
);
/// `void KIM_API_free(void* kimmdl, int* error)`
pub type FreeFn = unsafe extern "C" fn(kimmdl: *mut *mut c_void, error: *mut c_int);
/// `void KIM_API_print(void* kimmdl, int* error)`
pub type PrintFn = unsafe extern "C" fn(kimmdl: *mut c_void, error: *mut c_int);
/// `int KIM_API_model_compute(void* kimmdl)` and the other single-handle
/// model lifecycle calls.
pub type ModelCallFn = unsafe extern "C" fn(kimmdl: *mut c_void) -> c_int;
/// `int KIM_API_get_model_kim_str_len(const char* modelname, int* len)`
pub type GetModelKimStrLenFn =
    unsafe extern "C" fn(modelname: *const c_char, kim_string_len: *mut c_int) -> c_int;
/// `int KIM_API_get_model_kim_str(const char* modelname, char** kimString)`
pub type GetModelKimStrFn =
    unsafe extern "C" fn(modelname: *const c_char, kim_string: *mut *const c_char) -> c_int;
/// Count query: `int f(void* kimmdl, int* count, int* maxStringLength)`
pub type GetCountFn = unsafe extern "C" fn(
    kimmdl: *mut c_void,
    count: *mut c_int,
    max_string_length: *mut c_int,
) -> c_int;
/// Index query: `int f(void* kimmdl, int index, const char** string)`
pub type GetByIndexFn =
    unsafe extern "C" fn(kimmdl: *mut c_void, index: c_int, string: *mut *const c_char) -> c_int;
/// `int KIM_API_get_species_code(void* kimmdl, const char* species, int* error)`
pub type GetSpeciesCodeFn =
    unsafe extern "C" fn(kimmdl: *mut c_void, species: *const c_char, error: *mut c_int) -> c_int;
/// `void KIM_API_set_species_code(void* kimmdl, const char* species, int code, int* error)`
pub type SetSpeciesCodeFn = unsafe extern "C" fn(
    kimmdl: *mut c_void,
    species: *const c_char,
    code: c_int,
    error: *mut c_int,
);
/// `int KIM_API_get_NBC_method(void* kimmdl, const char** NBC_String)`
pub type GetNbcMethodFn =
    unsafe extern "C" fn(kimmdl: *mut c_void, nbc_string: *mut *const c_char) -> c_int;
/// `int KIM_API_get_status_msg(int status_code, const char** status_msg)`
pub type GetStatusMsgFn =
    unsafe extern "C" fn(status_code: c_int, status_msg: *mut *const c_char) -> c_int;
/// `int KIM_API_report_error(int line, const char* file, const char* usermsg, int error)`
pub type ReportErrorFn = unsafe extern "C" fn(
    line: c_int,
    file: *const c_char,
    usermsg: *const c_char,
    error: c_int,
) -> c_int;
/// `int KIM_API_get_model_index_shift(void* kimmdl)`
pub type GetModelIndexShiftFn = unsafe extern "C" fn(kimmdl: *mut c_void) -> c_int;
/// `int KIM_API_is_half_neighbors(void* kimmdl, int* error)`
pub type IsHalfNeighborsFn = unsafe extern "C" fn(kimmdl: *mut c_void, error: *mut c_int) -> c_int;
/// `int KIM_API_set_data(void* kimmdl, const char* name, intptr_t size, void* data)`
pub type SetDataFn = unsafe extern "C" fn(
    kimmdl: *mut c_void,
    name: *const c_char,
    size: isize,
    data: *mut c_void,
) -> c_int;
/// `void* KIM_API_get_data(void* kimmdl, const char* name, int* error)`
pub type GetDataFn =
    unsafe extern "C" fn(kimmdl: *mut c_void, name: *const c_char, error: *mut c_int) -> *mut c_void;
/// `intptr_t KIM_API_get_size(void* kimmdl, const char* name, int* error)`
pub type GetSizeFn =
    unsafe extern "C" fn(kimmdl: *mut c_void, name: *const c_char, error: *mut c_int) -> isize;
/// `void KIM_API_set_compute(void* kimmdl, const char* name, int flag, int* error)`
pub type SetComputeFn = unsafe extern "C" fn(
    kimmdl: *mut c_void,
    name: *const c_char,
    flag: c_int,
    error: *mut c_int,
);
/// `int KIM_API_get_compute(void* kimmdl, const char* name, int* error)`
pub type GetComputeFn =
    unsafe extern "C" fn(kimmdl: *mut c_void, name: *const c_char, error: *mut c_int) -> c_int;

/// One function pointer per native KIM API entry point.
#[derive(Clone, Copy)]
pub struct KimApiFns {
    pub get_version: GetVersionFn,
    pub file_init: FileInitFn,
    pub string_init: StringInitFn,
    pub model_info: ModelInfoFn,
    pub allocate: AllocateFn,
    pub free: FreeFn,
    pub print: PrintFn,
    pub model_compute: ModelCallFn,
    pub model_init: ModelCallFn,
    pub model_reinit: ModelCallFn,
    pub model_destroy: ModelCallFn,
    pub get_model_kim_str_len: GetModelKimStrLenFn,
    pub get_model_kim_str: GetModelKimStrFn,
    pub get_num_model_species: GetCountFn,
    pub get_model_species: GetByIndexFn,
    pub get_species_code: GetSpeciesCodeFn,
    pub set_species_code: SetSpeciesCodeFn,
    pub get_num_params: GetCountFn,
    pub get_parameter: GetByIndexFn,
    pub get_num_free_params: GetCountFn,
    pub get_free_parameter: GetByIndexFn,
    pub get_nbc_method: GetNbcMethodFn,
    pub get_status_msg: GetStatusMsgFn,
    pub report_error: ReportErrorFn,
    pub get_model_index_shift: GetModelIndexShiftFn,
    pub is_half_neighbors: IsHalfNeighborsFn,
    pub set_data: SetDataFn,
    pub get_data: GetDataFn,
    pub get_size: GetSizeFn,
    pub set_compute: SetComputeFn,
    pub get_compute: GetComputeFn,
}

#[cfg(feature = "link")]
mod linked {
    use std::os::raw::{c_char, c_int, c_void};

    // Library name and search path come from build.rs.
    extern "C" {
        pub fn KIM_API_get_version(version: *mut *const c_char) -> c_int;
        pub fn KIM_API_file_init(
            kimmdl: *mut *mut c_void,
            simkimfile: *const c_char,
            modelname: *const c_char,
        ) -> c_int;
        pub fn KIM_API_string_init(
            kimmdl: *mut *mut c_void,
            siminputstring: *const c_char,
            modelname: *const c_char,
        ) -> c_int;
        pub fn KIM_API_model_info(kimmdl: *mut *mut c_void, modelname: *const c_char) -> c_int;
        pub fn KIM_API_allocate(
            kimmdl: *mut c_void,
            nparts: isize,
            nspecies: c_int,
            error: *mut c_int,
        );
        pub fn KIM_API_free(kimmdl: *mut *mut c_void, error: *mut c_int);
        pub fn KIM_API_print(kimmdl: *mut c_void, error: *mut c_int);
        pub fn KIM_API_model_compute(kimmdl: *mut c_void) -> c_int;
        pub fn KIM_API_model_init(kimmdl: *mut c_void) -> c_int;
        pub fn KIM_API_model_reinit(kimmdl: *mut c_void) -> c_int;
        pub fn KIM_API_model_destroy(kimmdl: *mut c_void) -> c_int;
        pub fn KIM_API_get_model_kim_str_len(
            modelname: *const c_char,
            kim_string_len: *mut c_int,
        ) -> c_int;
        pub fn KIM_API_get_model_kim_str(
            modelname: *const c_char,
            kim_string: *mut *const c_char,
        ) -> c_int;
        pub fn KIM_API_get_num_model_species(
            kimmdl: *mut c_void,
            number_species: *mut c_int,
            max_string_length: *mut c_int,
        ) -> c_int;
        pub fn KIM_API_get_model_species(
            kimmdl: *mut c_void,
            index: c_int,
            species_string: *mut *const c_char,
        ) -> c_int;
        pub fn KIM_API_get_species_code(
            kimmdl: *mut c_void,
            species: *const c_char,
            error: *mut c_int,
        ) -> c_int;
        pub fn KIM_API_set_species_code(
            kimmdl: *mut c_void,
            species: *const c_char,
            code: c_int,
            error: *mut c_int,
        );
        pub fn KIM_API_get_num_params(
            kimmdl: *mut c_void,
            number_parameters: *mut c_int,
            max_string_length: *mut c_int,
        ) -> c_int;
        pub fn KIM_API_get_parameter(
            kimmdl: *mut c_void,
            index: c_int,
            parameter_string: *mut *const c_char,
        ) -> c_int;
        pub fn KIM_API_get_num_free_params(
            kimmdl: *mut c_void,
            number_free_parameters: *mut c_int,
            max_string_length: *mut c_int,
        ) -> c_int;
        pub fn KIM_API_get_free_parameter(
            kimmdl: *mut c_void,
            index: c_int,
            free_parameter_string: *mut *const c_char,
        ) -> c_int;
        pub fn KIM_API_get_NBC_method(kimmdl: *mut c_void, nbc_string: *mut *const c_char)
            -> c_int;
        pub fn KIM_API_get_status_msg(status_code: c_int, status_msg: *mut *const c_char)
            -> c_int;
        pub fn KIM_API_report_error(
            line: c_int,
            file: *const c_char,
            usermsg: *const c_char,
            error: c_int,
        ) -> c_int;
        pub fn KIM_API_get_model_index_shift(kimmdl: *mut c_void) -> c_int;
        pub fn KIM_API_is_half_neighbors(kimmdl: *mut c_void, error: *mut c_int) -> c_int;
        pub fn KIM_API_set_data(
            kimmdl: *mut c_void,
            name: *const c_char,
            size: isize,
            data: *mut c_void,
        ) -> c_int;
        pub fn KIM_API_get_data(
            kimmdl: *mut c_void,
            name: *const c_char,
            error: *mut c_int,
        ) -> *mut c_void;
        pub fn KIM_API_get_size(kimmdl: *mut c_void, name: *const c_char, error: *mut c_int)
            -> isize;
        pub fn KIM_API_set_compute(
            kimmdl: *mut c_void,
            name: *const c_char,
            flag: c_int,
            error: *mut c_int,
        );
        pub fn KIM_API_get_compute(
            kimmdl: *mut c_void,
            name: *const c_char,
            error: *mut c_int,
        ) -> c_int;
    }
}

#[cfg(feature = "link")]
impl KimApiFns {
    /// The entry points of the linked native library.
    pub const LINKED: KimApiFns = KimApiFns {
        get_version: linked::KIM_API_get_version,
        file_init: linked::KIM_API_file_init,
        string_init: linked::KIM_API_string_init,
        model_info: linked::KIM_API_model_info,
        allocate: linked::KIM_API_allocate,
        free: linked::KIM_API_free,
        print: linked::KIM_API_print,
        model_compute: linked::KIM_API_model_compute,
        model_init: linked::KIM_API_model_init,
        model_reinit: linked::KIM_API_model_reinit,
        model_destroy: linked::KIM_API_model_destroy,
        get_model_kim_str_len: linked::KIM_API_get_model_kim_str_len,
        get_model_kim_str: linked::KIM_API_get_model_kim_str,
        get_num_model_species: linked::KIM_API_get_num_model_species,
        get_model_species: linked::KIM_API_get_model_species,
        get_species_code: linked::KIM_API_get_species_code,
        set_species_code: linked::KIM_API_set_species_code,
        get_num_params: linked::KIM_API_get_num_params,
        get_parameter: linked::KIM_API_get_parameter,
        get_num_free_params: linked::KIM_API_get_num_free_params,
        get_free_parameter: linked::KIM_API_get_free_parameter,
        get_nbc_method: linked::KIM_API_get_NBC_method,
        get_status_msg: linked::KIM_API_get_status_msg,
        report_error: linked::KIM_API_report_error,
        get_model_index_shift: linked::KIM_API_get_model_index_shift,
        is_half_neighbors: linked::KIM_API_is_half_neighbors,
        set_data: linked::KIM_API_set_data,
        get_data: linked::KIM_API_get_data,
        get_size: linked::KIM_API_get_size,
        set_compute: linked::KIM_API_set_compute,
        get_compute: linked::KIM_API_get_compute,
    };
}
