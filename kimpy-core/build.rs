use std::env;

/// Emit linker directives for the native KIM API library.
///
/// Build scripts don't get #[cfg(feature = ...)] — check the env var instead.
/// `KIM_API_LIB_DIR` adds a search path, `KIM_API_LIB_NAME` overrides the
/// library name (default `kim-api-v1`, i.e. `libkim-api-v1.so`).
fn main() {
    println!("cargo:rerun-if-env-changed=KIM_API_LIB_DIR");
    println!("cargo:rerun-if-env-changed=KIM_API_LIB_NAME");

    if env::var("CARGO_FEATURE_LINK").is_err() {
        return;
    }

    if let Ok(dir) = env::var("KIM_API_LIB_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
    }

    let name = env::var("KIM_API_LIB_NAME").unwrap_or_else(|_| "kim-api-v1".to_string());
    println!("cargo:rustc-link-lib=dylib={name}");
}
