//! Deterministic, pure logic shared by the bisection session.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values and return deterministic outputs suitable for tests.

pub mod bisect_output;
pub mod env;
pub mod types;
