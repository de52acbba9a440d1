//! Build environment for bootstrapping the compiler.
//!
//! Flag variables such as `CFLAGS` are meant for the code the freshly built
//! compiler will compile later, not for the compiler's own build.

use std::collections::BTreeMap;
use std::ffi::OsString;

/// Variables removed from the build environment unless configured otherwise.
pub const DEFAULT_FLAG_VARS: &[&str] = &["CFLAGS", "CXXFLAGS"];

/// Full environment mapping handed to a child process.
pub type EnvMap = BTreeMap<OsString, OsString>;

/// Copy `env` without the keys named in `flag_vars`.
pub fn sanitize_build_env<S: AsRef<str>>(env: &EnvMap, flag_vars: &[S]) -> EnvMap {
    env.iter()
        .filter(|(key, _)| {
            !flag_vars
                .iter()
                .any(|flag| key.as_os_str() == flag.as_ref())
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Snapshot the current process environment and sanitize it.
pub fn build_env_from_process<S: AsRef<str>>(flag_vars: &[S]) -> EnvMap {
    let env: EnvMap = std::env::vars_os().collect();
    sanitize_build_env(&env, flag_vars)
}
