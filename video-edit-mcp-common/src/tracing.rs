//! Tracing initialization.
//!
//! Logs are written to stderr so the stdio transport keeps stdout for MCP
//! frames. Filtering follows `RUST_LOG`, e.g.:
//!
//! - `RUST_LOG=debug`
//! - `RUST_LOG=warn,video_edit_mcp=debug`
//!
//! ```no_run
//! video_edit_mcp_common::tracing::init_tracing();
//! tracing::info!("Server starting");
//! ```

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
}

/// Install the global subscriber at `info` unless `RUST_LOG` says otherwise.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_tracing() {
    init_tracing_with_default(DEFAULT_FILTER);
}

/// Install the global subscriber with a custom default level.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_tracing_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Like [`init_tracing`], but returns `false` instead of panicking when a
/// subscriber is already installed (useful in tests).
pub fn try_init_tracing() -> bool {
    tracing_subscriber::registry()
        .with(filter(DEFAULT_FILTER))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_tracing_does_not_panic() {
        let _ = try_init_tracing();
        // A second attempt must report failure rather than panic.
        assert!(!try_init_tracing());
    }

    #[test]
    fn test_filter_accepts_module_directives() {
        let _ = EnvFilter::new("warn,video_edit_mcp=debug");
        let _ = filter("debug");
    }
}
