//! Logging setup for apps and demos built on Tranquil.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "tranquil=info,tranquil_session=info";

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Falls back to [`DEFAULT_FILTER`]. Does nothing (apart from a `debug!`)
/// if a global subscriber is already installed, so tests and embedding
/// apps may call it freely.
pub fn init() {
    if let Err(e) = try_init() {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}

/// Like [`init`], but reports whether a subscriber was already installed.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        init();
        init();
        tracing::info!("logging after repeated init");
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
