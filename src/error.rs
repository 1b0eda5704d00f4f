/// Failure talking to the provider's OAuth endpoints.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The token endpoint answered with an `error` field.
    ///
    /// Displays the provider's `error_description` (or a generic message) verbatim.
    #[error("{description}")]
    Provider { code: String, description: String },
    /// Transport failure, or a body that is not the expected JSON.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Startup configuration problems. The server refuses to start on any of these.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}
