use axum_extra::extract::cookie::Key;
use time::Duration;
use url::Url;

use crate::error::ConfigError;
use crate::oauth::OAuthConfig;

const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/callback";
const DEFAULT_AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const DEFAULT_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_SESSION_TTL_MINUTES: i64 = 24 * 60;
const MAX_SESSION_TTL_MINUTES: i64 = 10 * 365 * 24 * 60;

/// Paths served by the router that the callback route must not shadow.
const RESERVED_PATHS: [&str; 5] = ["/", "/login", "/logout", "/dashboard", "/api/repos"];

/// Web-layer settings shared by config and runtime state.
#[derive(Clone)]
pub(crate) struct AppSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl: Duration,
    pub(crate) secure_cookies: bool,
    pub(crate) login_path: String,
    pub(crate) login_redirect: String,
    pub(crate) logout_redirect: String,
}

impl AppSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "gh_dashboard_session".into(),
            session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            secure_cookies: false,
            login_path: "/login".into(),
            login_redirect: "/dashboard".into(),
            logout_redirect: "/".into(),
        }
    }
}

/// Dashboard server configuration.
///
/// Use [`from_env()`](DashboardConfig::from_env) at startup, or
/// [`new()`](DashboardConfig::new) with `with_*` methods for full control.
pub struct DashboardConfig {
    pub(super) oauth: OAuthConfig,
    pub(super) api_base: Url,
    pub(super) settings: AppSettings,
}

impl DashboardConfig {
    /// Create config from a validated OAuth configuration and the REST API base URL.
    #[must_use]
    pub fn new(oauth: OAuthConfig, api_base: Url) -> Self {
        Self {
            oauth,
            api_base,
            settings: AppSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `GITHUB_CLIENT_ID`: OAuth2 client ID
    /// - `GITHUB_CLIENT_SECRET`: OAuth2 client secret
    ///
    /// # Optional env vars
    /// - `GITHUB_REDIRECT_URI`: callback URI, its path is the callback route
    ///   (default `http://localhost:3000/callback`)
    /// - `GITHUB_AUTH_URL`, `GITHUB_TOKEN_URL`: override the OAuth endpoints
    /// - `GITHUB_API_URL`: override the REST API base (GitHub Enterprise)
    /// - `GITHUB_SCOPES`: comma-separated scopes (default `repo,user`)
    /// - `SESSION_SECRET`: cookie encryption key, at least 64 bytes
    /// - `SESSION_TTL_MINUTES`: session lifetime (default 1440)
    /// - `SECURE_COOKIES`: `"1"` or `"true"` to mark cookies `Secure`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if required vars are missing or a value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if required vars are missing or a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let client_id = get("GITHUB_CLIENT_ID").ok_or(ConfigError::Missing("GITHUB_CLIENT_ID"))?;
        let client_secret =
            get("GITHUB_CLIENT_SECRET").ok_or(ConfigError::Missing("GITHUB_CLIENT_SECRET"))?;

        let redirect_uri = parse_url(
            "GITHUB_REDIRECT_URI",
            get("GITHUB_REDIRECT_URI").as_deref().unwrap_or(DEFAULT_REDIRECT_URI),
        )?;
        if RESERVED_PATHS.contains(&redirect_uri.path()) {
            return Err(ConfigError::Invalid {
                var: "GITHUB_REDIRECT_URI",
                reason: format!("path {} is already served by the dashboard", redirect_uri.path()),
            });
        }
        let auth_url = parse_url(
            "GITHUB_AUTH_URL",
            get("GITHUB_AUTH_URL").as_deref().unwrap_or(DEFAULT_AUTH_URL),
        )?;
        let token_url = parse_url(
            "GITHUB_TOKEN_URL",
            get("GITHUB_TOKEN_URL").as_deref().unwrap_or(DEFAULT_TOKEN_URL),
        )?;
        let api_base = parse_url(
            "GITHUB_API_URL",
            get("GITHUB_API_URL").as_deref().unwrap_or(DEFAULT_API_URL),
        )?;

        let mut oauth = OAuthConfig::new(client_id, client_secret, redirect_uri, auth_url, token_url);
        if let Some(scopes) = get("GITHUB_SCOPES") {
            oauth = oauth.with_scopes(scopes.split(',').map(|s| s.trim().to_string()).collect());
        }
        oauth.validate()?;

        let mut config = Self::new(oauth, api_base);

        match get("SESSION_SECRET") {
            Some(secret) => {
                let key = Key::try_from(secret.as_bytes()).map_err(|_| ConfigError::Invalid {
                    var: "SESSION_SECRET",
                    reason: "must be at least 64 bytes".into(),
                })?;
                config = config.with_cookie_key(key);
            }
            None => {
                tracing::warn!("SESSION_SECRET not set, using an ephemeral cookie key");
            }
        }

        if let Some(minutes) = get("SESSION_TTL_MINUTES") {
            let minutes: i64 = minutes
                .trim()
                .parse()
                .ok()
                .filter(|m| (1..=MAX_SESSION_TTL_MINUTES).contains(m))
                .ok_or_else(|| ConfigError::Invalid {
                    var: "SESSION_TTL_MINUTES",
                    reason: format!(
                        "expected an integer from 1 to {MAX_SESSION_TTL_MINUTES}, got {minutes:?}"
                    ),
                })?;
            config = config.with_session_ttl(Duration::minutes(minutes));
        }

        let secure = matches!(get("SECURE_COOKIES").as_deref(), Some("1") | Some("true"));

        Ok(config.with_secure_cookies(secure))
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.settings.session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.login_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_logout_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.logout_redirect = path.into();
        self
    }

    #[must_use]
    pub fn oauth(&self) -> &OAuthConfig {
        &self.oauth
    }

    #[must_use]
    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Lifetime of a session, for sizing the session store.
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.settings.session_ttl
    }
}

fn parse_url(var: &'static str, value: &str) -> Result<Url, ConfigError> {
    value.parse::<Url>().map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}
