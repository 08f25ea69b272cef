//! Tracing subscriber initialization.

use tracing_subscriber::EnvFilter;

/// Initialize structured logging. JSON output in production, human-readable
/// otherwise. `RUST_LOG` overrides the default filter.
pub fn init(environment: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let env = environment.to_lowercase();
    if env == "production" || env == "prod" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
