use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `verbose` selects `debug`, and the
/// default is `warn`. Output goes to stderr so JSON reports on stdout stay clean.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    // A second init (tests, repeated runs in one process) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}
