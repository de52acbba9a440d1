//! Bisect a compiler toolchain to the commit that introduced a regression.
//!
//! `git bisect` owns the search. This crate rebuilds the compiler at each
//! commit git checks out, runs a caller-supplied test command, and feeds the
//! result back until git announces the first bad commit.
//!
//! - **[`core`]**: Pure logic (environment sanitizing, output parsing, types).
//! - **[`io`]**: Processes, git, the two-step build, configuration, locking.
//!
//! [`session`] ties them together into the boundary validation and
//! build/test/label loop.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
