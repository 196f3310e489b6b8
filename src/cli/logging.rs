//! Diagnostic logging setup

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,fieldlink=debug"
    } else {
        "warn"
    }
}

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `--verbose`. Safe to call more than
/// once; later calls are ignored.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
