#![doc = include_str!("../README.md")]

pub mod csrf;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod oauth;
pub mod repos;
pub mod session;

// Re-exports for convenient access
pub use error::{ConfigError, Error};
pub use middleware::{DashboardConfig, router};
pub use oauth::{
    AuthorizationUrlOptions, OAuthClient, OAuthConfig, OAuthErrorResponse, TokenEndpointResponse,
    TokenResponse,
};
pub use repos::{RepoError, RepositoryGateway};
pub use session::{
    AccessToken, AuthError, AuthStage, MemorySessionStore, Session, SessionAuthFlow, SessionId,
    SessionStore,
};
