use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors raised by [`SessionAuthFlow`](super::SessionAuthFlow).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Callback arrived without a usable `code` or `state`.
    #[error("Invalid request parameters")]
    InvalidRequest,

    /// Callback `state` is absent from the session, different, or already used.
    #[error("Invalid state parameter")]
    CsrfMismatch,

    /// Provider rejected the code or the token call failed.
    #[error("Authentication failed: {0}")]
    Exchange(#[source] crate::error::Error),

    /// No access token in the session.
    #[error("Not authenticated")]
    AuthRequired,

    /// Session store operation failed.
    #[error("Session store error: {0}")]
    Store(String),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::CsrfMismatch => StatusCode::BAD_REQUEST,
            Self::AuthRequired => StatusCode::UNAUTHORIZED,
            Self::Exchange(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::InvalidRequest | Self::CsrfMismatch => {
                (status, self.to_string()).into_response()
            }
            Self::AuthRequired => {
                (status, Json(json!({ "error": self.to_string() }))).into_response()
            }
            // Provider detail is logged by the flow, not returned.
            Self::Exchange(_) => (status, "Authentication failed").into_response(),
            Self::Store(_) => {
                tracing::error!(error = %self, "Auth internal error");
                (status, "Internal error").into_response()
            }
        }
    }
}
