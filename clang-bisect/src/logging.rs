//! Tracing setup for the CLI.
//!
//! Diagnostics go to stderr alongside the echoed output of builds and tests.
//! stdout carries only the final report.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `clang_bisect=info,warn` if unset.
///
/// # Example
/// ```bash
/// RUST_LOG=clang_bisect=debug clang-bisect <good> <bad> -- ./repro.sh
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("clang_bisect=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
