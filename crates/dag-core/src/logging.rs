//! Tracing subscriber setup for hosts that do not install their own.

use crate::config::LoggingConfig;
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

/// Builds the env filter: `RUST_LOG` when set and parseable, otherwise `warn` globally and
/// the configured level for this crate.
#[must_use]
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let fallback = || EnvFilter::new(format!("warn,dag_core={}", config.level));

    match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => {
            EnvFilter::try_new(directives).unwrap_or_else(|_| fallback())
        }
        _ => fallback(),
    }
}

/// Installs a global subscriber with a `pretty` or `json` formatter.
///
/// # Errors
///
/// Returns [`TryInitError`] if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    if config.format.as_str() == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer().json();
        registry.with(fmt_layer).try_init()
    } else {
        // DagConfig::validate only admits "json" and "pretty"
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).try_init()
    }
}
