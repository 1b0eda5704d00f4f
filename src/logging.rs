//! `tracing` subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Builds the filter: `RUST_LOG` wins, otherwise `default_level` for this
/// crate and `tower_http`, `warn` for everything else.
#[must_use]
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,gh_repo_dashboard={default_level},tower_http={default_level}"
        ))
    })
}

/// Installs the global subscriber. Call once, before serving.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init(default_level: &str, format: LogFormat) -> Result<(), tracing_subscriber::util::TryInitError> {
    let registry = tracing_subscriber::registry().with(env_filter(default_level));
    match format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_current_span(true)).try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_mentions_crate() {
        // RUST_LOG may be set in CI; only check the fallback shape.
        if std::env::var_os("RUST_LOG").is_none() {
            let filter = env_filter("debug").to_string();
            assert!(filter.contains("gh_repo_dashboard=debug"), "{filter}");
        }
    }

    #[test]
    fn init_twice_fails_cleanly() {
        let _ = init("info", LogFormat::Pretty);
        assert!(init("info", LogFormat::Json).is_err());
    }
}
