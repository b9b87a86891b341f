//! Logging initialization.
//!
//! Structured logging via `tracing`, human-readable or JSON, written to
//! stderr. `CODEDUEL_LOG` (then `RUST_LOG`) overrides the verbosity flag
//! with a full filter directive, e.g. `codeduel_room=debug,info`.

use tracing_subscriber::EnvFilter;

use crate::cli::LogFormatArg;

/// Environment variable checked first for a filter directive.
pub const LOG_ENV: &str = "CODEDUEL_LOG";

/// Maps a verbosity level to a tracing directive string.
///
/// Room lifecycle events are logged at `info`, so the default shows them.
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the global tracing subscriber.
///
/// Uses `try_init()` so calling this more than once (e.g. in tests) is safe.
pub fn init_logging(format: LogFormatArg, verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(verbosity_to_directive(verbosity)));

    let show_target = verbosity >= 1;

    match format {
        LogFormatArg::Human => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
        LogFormatArg::Json => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
