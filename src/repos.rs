use reqwest::header::{ACCEPT, USER_AGENT};
use url::Url;

use crate::session::AccessToken;

const GITHUB_JSON: &str = "application/vnd.github.v3+json";
const CLIENT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RepoError {
    #[error("GitHub API error: {0}")]
    Status(u16),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Lists the signed-in user's repositories from the GitHub REST API.
#[derive(Debug, Clone)]
pub struct RepositoryGateway {
    api_base: Url,
    http: reqwest::Client,
}

impl RepositoryGateway {
    #[must_use]
    pub fn new(api_base: Url) -> Self {
        Self {
            api_base,
            http: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    fn repos_url(&self) -> String {
        format!("{}/user/repos", self.api_base.as_str().trim_end_matches('/'))
    }

    /// Fetches `GET /user/repos` with the bearer token and returns the JSON
    /// array as the provider sent it.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Status`] on any non-2xx response, or
    /// [`RepoError::Http`] on network failure or a non-array body.
    pub async fn list_repositories(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<serde_json::Value>, RepoError> {
        let response = self
            .http
            .get(self.repos_url())
            .bearer_auth(token.as_str())
            .header(ACCEPT, GITHUB_JSON)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RepoError::Status(response.status().as_u16()));
        }

        response.json().await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn token() -> AccessToken {
        AccessToken::from("tok-xyz".to_string())
    }

    #[tokio::test]
    async fn lists_repositories_with_bearer_token() {
        let server = MockServer::start().await;
        let repos = json!([
            {"name": "alpha", "description": null, "html_url": "https://github.com/me/alpha"},
            {"name": "beta", "description": "b", "html_url": "https://github.com/me/beta"}
        ]);
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .and(header("authorization", "Bearer tok-xyz"))
            .and(header("accept", GITHUB_JSON))
            .respond_with(ResponseTemplate::new(200).set_body_json(repos.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = RepositoryGateway::new(server.uri().parse().unwrap());
        let listed = gateway.list_repositories(&token()).await.unwrap();

        assert_eq!(serde_json::Value::Array(listed), repos);
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})))
            .mount(&server)
            .await;

        let gateway = RepositoryGateway::new(server.uri().parse().unwrap());
        let err = gateway.list_repositories(&token()).await.unwrap_err();

        assert!(matches!(err, RepoError::Status(401)));
        assert_eq!(err.to_string(), "GitHub API error: 401");
    }

    #[test]
    fn repos_url_respects_base_path() {
        let gateway = RepositoryGateway::new("https://ghe.example.com/api/v3/".parse().unwrap());
        assert_eq!(gateway.repos_url(), "https://ghe.example.com/api/v3/user/repos");

        let gateway = RepositoryGateway::new("https://api.github.com".parse().unwrap());
        assert_eq!(gateway.repos_url(), "https://api.github.com/user/repos");
    }
}
