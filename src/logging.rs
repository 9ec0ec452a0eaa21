//! Logging and tracing configuration
//!
//! Structured logging through `tracing`. All output goes to stderr: stdout carries
//! only the wire payload of the command being run.
//!
//! # Log Levels
//!
//! - `error` - Configuration problems that stop a command
//! - `warn`  - Skipped matches, oversized executables, failed collection items
//! - `info`  - Batch and collection summaries (default in release)
//! - `debug` - Collapsed failures at the operation boundary (default in debug builds)
//! - `trace` - Per-segment matching and frontier sizes
//!
//! # Environment Variable Control
//!
//! ```bash
//! RUST_LOG=debug ffx-imagefs is-file /etc/passwd
//! RUST_LOG=ffx_imagefs_lib::engine=trace ffx-imagefs expand '/var/log/**'
//! ```

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn default_filter() -> EnvFilter {
    if cfg!(debug_assertions) {
        EnvFilter::new("ffx_imagefs=debug,ffx_imagefs_lib=debug")
    } else {
        EnvFilter::new("ffx_imagefs=info,ffx_imagefs_lib=info")
    }
}

fn install(filter: EnvFilter) {
    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact(),
    );

    // Ignore the error if a subscriber is already set
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Initialize logging from `RUST_LOG`, falling back to the crate defaults.
/// Call once at startup.
pub fn init() {
    install(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter()));
}

/// Initialize logging at a fixed level for this crate; `RUST_LOG` still wins
pub fn init_with_level(level: Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        EnvFilter::new(format!("ffx_imagefs={level},ffx_imagefs_lib={level}"))
    });
    install(filter);
}

/// Verbose output with file:line and thread IDs, for debugging the engine itself
pub fn init_verbose() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace"));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .pretty(),
    );

    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, info};

    #[test]
    fn test_init_is_repeatable() {
        init();
        init_with_level(Level::WARN);
        info!("Test log message");
        debug!(key = "value", "Structured log");
    }
}
