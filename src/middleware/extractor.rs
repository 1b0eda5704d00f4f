use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::Key;

use super::cookies;
use super::state::AppState;
use crate::session::{AccessToken, AuthError, SessionStore};

/// Signed-in session extracted from the session cookie.
///
/// Rejects with [`AuthError::AuthRequired`] (`401`) when the cookie is
/// missing or the session holds no access token. Page handlers that prefer a
/// redirect take `Result<Authenticated, AuthError>` instead.
#[derive(Debug, Clone)]
pub(super) struct Authenticated {
    pub(super) access_token: AccessToken,
}

impl<S: SessionStore> FromRequestParts<AppState<S>> for Authenticated {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar<Key> = PrivateCookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::AuthRequired)?;

        let session_id = cookies::get_session_id(&jar, &state.settings.session_cookie_name)
            .ok_or(AuthError::AuthRequired)?;

        let access_token = state.flow.require_authentication(&session_id).await?;

        Ok(Self { access_token })
    }
}
