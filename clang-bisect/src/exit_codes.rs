//! Stable exit codes for the `clang-bisect` CLI.

/// A culprit commit was found.
pub const OK: i32 = 0;
/// Configuration, build, git, or spawn failure.
pub const ERROR: i32 = 1;
/// The search ended without git naming a culprit.
pub const EXHAUSTED: i32 = 2;
/// A boundary commit's test outcome contradicted its label.
pub const INVALID_BOUNDARY: i32 = 3;
