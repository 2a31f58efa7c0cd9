//! Diagnostic logging to stderr. Command output never goes through here.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default level for a `-v` count: none is warn, then info, debug, trace.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Filter directives for our crate at `verbosity`; HTTP internals stay at warn.
fn default_directives(verbosity: u8) -> String {
    let level = level_for(verbosity);
    format!("warn,temple_admin={level}")
}

/// Install the global subscriber. `RUST_LOG`, when set, wins over `-v`.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 2),
        )
        .try_init();
}
