//! Logging initialization.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default directives used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info,raymarch=debug";

/// Initialize the logging system with tracing.
///
/// Filtering follows `RUST_LOG` when present, otherwise [`DEFAULT_FILTER`].
///
/// # Example
/// ```
/// raymarch_core::init_logging();
/// tracing::info!("Demo started");
/// ```
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}
