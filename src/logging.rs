//! Logging abstraction
//!
//! Provides the unified `log_*!` macros used throughout the server. They forward
//! to `tracing`, so any subscriber works; the binary installs a `fmt`
//! subscriber via [`init`].
//!
//! Verbosity is controlled with `RUST_LOG` (e.g. `RUST_LOG=rover_link=debug`).
//! Without it, `info` and above are shown.
//!
//! ```ignore
//! crate::log_info!("Session {} connected", id);
//! ```

use tracing_subscriber::EnvFilter;

#[doc(hidden)]
pub use tracing;

/// Default filter when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "info";

/// Install the global `fmt` subscriber
///
/// Safe to call more than once; later calls are ignored (useful in tests).
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Log informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::tracing::info!($($arg)*)
    };
}

/// Log warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::tracing::warn!($($arg)*)
    };
}

/// Log error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::tracing::error!($($arg)*)
    };
}

/// Log debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::tracing::debug!($($arg)*)
    };
}

/// Log trace message
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        $crate::logging::tracing::trace!($($arg)*)
    };
}
