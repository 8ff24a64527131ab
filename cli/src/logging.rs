//! Diagnostic logging to stderr.
//!
//! Operator-facing progress goes through `output`; `tracing` events are for
//! diagnosing a run and stay hidden unless `--verbose` or `RUST_LOG` asks
//! for them.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "gamehost_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
