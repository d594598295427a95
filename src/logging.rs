//! Diagnostic logging to stderr.
//!
//! User-facing progress is printed to stdout; `tracing` events are for
//! diagnostics and stay quiet unless `RUST_LOG` or `-v` asks for them.

use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "vibe=debug,warn"
    } else {
        "warn"
    }
}

/// Initialize human-readable logging on stderr.
///
/// `RUST_LOG` wins over `verbose`. Calling this more than once is a no-op.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .try_init()
        .ok();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "logging initialised");
}
