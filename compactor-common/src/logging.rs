//! Tracing installer for hosts embedding this crate.
//!
//! A library has no business owning the process's log destination, so
//! unlike a CLI's own logging setup this only wires an env-filter-driven
//! subscriber to stderr; a host that wants file rotation installs its own
//! subscriber instead of calling this.

use anyhow::Result;
use tracing_subscriber::{fmt, util::SubscriberInitExt, EnvFilter};

/// Install a process-wide tracing subscriber.
///
/// Honors `RUST_LOG` when set; otherwise defaults to `info`, or `debug` when
/// `verbose` is true.
///
/// # Errors
/// Returns an error if a subscriber is already installed.
pub fn init_tracing(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        EnvFilter::try_new("debug")?
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish()
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing subscriber already installed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_does_not_panic() {
        // Tests may run concurrently and a subscriber can only be installed
        // once per process; a failure here is fine, a panic is not.
        let _ = init_tracing(false);
    }
}
