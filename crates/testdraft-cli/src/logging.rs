use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a stderr subscriber so stdout stays clean JSON.
///
/// Default level is `warn` (`debug` with `--verbose`); `RUST_LOG` overrides
/// both.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    // A second init (tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();
}
