//! Side-effecting operations: processes, git, the build, config, locking.

pub mod builder;
pub mod config;
pub mod git;
pub mod lock;
pub mod process;
