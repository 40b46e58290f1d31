//! Structured logging setup using `tracing-subscriber`.
//!
//! Diagnostics go to stderr so that per-object outcome lines on stdout can
//! be piped on their own.

use tracing_subscriber::EnvFilter;

/// Default filter for a verbosity level given by repeated `-v`.
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialise console logging on stderr.
///
/// `RUST_LOG` takes precedence; otherwise the level follows `verbosity`
/// (default: `warn`).
pub fn init_cli(verbosity: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
