//! Tracing subscriber setup for the binary.
//!
//! The library only emits events; installing a subscriber is the caller's job.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "gar_quantfit=info,gar=info";

/// Install a stderr `fmt` subscriber filtered by `RUST_LOG` (default: info).
///
/// `verbose` raises the default to debug when `RUST_LOG` is unset. Calling this
/// twice is harmless; the second install is ignored.
pub fn init(verbose: bool) {
    let default = if verbose {
        "gar_quantfit=debug,gar=debug"
    } else {
        DEFAULT_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
