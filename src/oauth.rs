use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use url::Url;

use crate::error::{ConfigError, Error};

/// `OAuth2` client configuration, built once at startup.
///
/// Required fields are constructor parameters. The client secret is held as a
/// [`SecretString`] so it never shows up in `Debug` output.
///
/// ```rust,ignore
/// use gh_repo_dashboard::OAuthConfig;
///
/// let config = OAuthConfig::new(
///     "my-client-id",
///     "my-client-secret",
///     "http://localhost:3000/callback".parse()?,
///     "https://github.com/login/oauth/authorize".parse()?,
///     "https://github.com/login/oauth/access_token".parse()?,
/// )
/// .with_scopes(vec!["read:user".into()]);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: SecretString,
    pub(crate) redirect_uri: Url,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) scopes: Vec<String>,
}

impl OAuthConfig {
    /// Create a new `OAuth2` configuration requesting the `repo` and `user` scopes.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Url,
        auth_url: Url,
        token_url: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            redirect_uri,
            auth_url,
            token_url,
            scopes: vec!["repo".into(), "user".into()],
        }
    }

    /// Override the requested scopes (default: `["repo", "user"]`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Checks that no field is empty and that at least one scope is requested.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("client id"));
        }
        if self.client_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Missing("client secret"));
        }
        if self.scopes.is_empty() {
            return Err(ConfigError::Missing("scopes"));
        }
        if self.scopes.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                var: "scopes",
                reason: "scope names must not be empty".into(),
            });
        }
        Ok(())
    }

    /// `OAuth2` client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// `OAuth2` redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Authorization endpoint URL.
    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    /// Token exchange endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Requested `OAuth2` scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// Optional extras for [`OAuthClient::build_authorization_url`].
#[derive(Debug, Clone, Default)]
pub struct AuthorizationUrlOptions {
    /// CSRF state, appended unmodified.
    pub state: Option<String>,
    /// GitHub's `allow_signup` flag.
    pub allow_signup: Option<bool>,
}

impl AuthorizationUrlOptions {
    #[must_use]
    pub fn with_state(state: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            allow_signup: None,
        }
    }
}

/// Successful reply from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Error reply from the token endpoint (RFC 6749 §5.2).
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct OAuthErrorResponse {
    #[serde(deserialize_with = "non_empty_string")]
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_uri: Option<String>,
}

/// Either shape the token endpoint may answer with, whatever the HTTP status.
///
/// Discriminated by a non-empty `error` field; anything else must decode as a
/// [`TokenResponse`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TokenEndpointResponse {
    Error(OAuthErrorResponse),
    Success(TokenResponse),
}

const GENERIC_EXCHANGE_ERROR: &str = "Failed to get access token";

impl TokenEndpointResponse {
    /// Converts the reply into the token or a [`Error::Provider`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provider`] for the `Error` variant.
    pub fn into_result(self) -> Result<TokenResponse, Error> {
        match self {
            Self::Success(token) => Ok(token),
            Self::Error(err) => Err(Error::Provider {
                description: err
                    .error_description
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| GENERIC_EXCHANGE_ERROR.to_string()),
                code: err.error,
            }),
        }
    }
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.is_empty() {
        return Err(serde::de::Error::invalid_length(0, &"a non-empty error code"));
    }
    Ok(s)
}

/// `OAuth2` authorization code client.
///
/// Stateless apart from its configuration and a pooled HTTP client.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl OAuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse, timeouts or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Builds the provider's authorization URL for a browser redirect.
    ///
    /// Pure string construction, no validation beyond what [`Url`] already
    /// guarantees.
    #[must_use]
    pub fn build_authorization_url(&self, options: &AuthorizationUrlOptions) -> String {
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.auth_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", self.config.redirect_uri.as_str())
                .append_pair("response_type", "code")
                .append_pair("scope", &scope);

            if let Some(state) = &options.state {
                query.append_pair("state", state);
            }
            if let Some(allow_signup) = options.allow_signup {
                query.append_pair("allow_signup", if allow_signup { "true" } else { "false" });
            }
        }

        url.into()
    }

    /// Exchange an authorization code for the full token response.
    ///
    /// The body is decoded whatever the HTTP status, since some providers
    /// report errors with `200 OK`. Never retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure or an undecodable body, or
    /// [`Error::Provider`] if the token endpoint returns an `error` field.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let reply = response.json::<TokenEndpointResponse>().await?;
        tracing::debug!(status = status.as_u16(), "Token endpoint replied");

        reply.into_result()
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// See [`exchange_code`](Self::exchange_code).
    pub async fn exchange_code_for_token(&self, code: &str) -> Result<String, Error> {
        self.exchange_code(code).await.map(|t| t.access_token)
    }
}
