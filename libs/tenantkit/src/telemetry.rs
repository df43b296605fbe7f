//! Logging initialization.
//!
//! `RUST_LOG` always wins; the configured level is the default filter when
//! the variable is unset. Safe to call more than once (tests, embedded
//! hosts): a second call keeps the existing subscriber.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingOptions;

/// Initializes the global `tracing` subscriber.
pub fn init_logging(options: &LoggingOptions) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&options.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let already_set = if options.json {
        builder.json().try_init().is_err()
    } else {
        builder.try_init().is_err()
    };
    if already_set {
        tracing::debug!("a tracing subscriber is already installed; keeping it");
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_is_harmless() {
        let options = LoggingOptions::default();
        init_logging(&options);
        init_logging(&LoggingOptions {
            json: true,
            ..options
        });
    }
}
