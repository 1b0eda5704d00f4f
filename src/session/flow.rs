use super::error::AuthError;
use super::store::SessionStore;
use super::types::{AccessToken, Session, SessionId};
use crate::csrf;
use crate::oauth::{AuthorizationUrlOptions, OAuthClient};

/// Binds [`OAuthClient`] to per-browser sessions and enforces the CSRF state check.
///
/// Each session moves `Anonymous → Pending → Authenticated`:
///
/// - [`begin_login`](Self::begin_login) stores a fresh state and returns the
///   provider redirect URL.
/// - [`handle_callback`](Self::handle_callback) checks the returned state,
///   consumes it, and exchanges the code for a token.
/// - [`require_authentication`](Self::require_authentication) hands out the
///   stored token to protected handlers.
pub struct SessionAuthFlow<S> {
    client: OAuthClient,
    store: S,
}

impl<S: SessionStore> SessionAuthFlow<S> {
    #[must_use]
    pub fn new(client: OAuthClient, store: S) -> Self {
        Self { client, store }
    }

    #[must_use]
    pub fn client(&self) -> &OAuthClient {
        &self.client
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn load(&self, session_id: &SessionId) -> Result<Session, AuthError> {
        Ok(self
            .store
            .load(session_id)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?
            .unwrap_or_default())
    }

    async fn save(&self, session_id: &SessionId, session: Session) -> Result<(), AuthError> {
        self.store
            .save(session_id, session)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))
    }

    async fn swap(
        &self,
        session_id: &SessionId,
        current: &Session,
        new: Option<Session>,
    ) -> Result<bool, AuthError> {
        self.store
            .compare_and_swap(session_id, current, new)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))
    }

    /// Starts a login: stores a fresh state on the session and returns the
    /// authorization URL to redirect the browser to.
    ///
    /// A previous pending state or access token on the same session is
    /// discarded. Two tabs racing here leave only the latest state valid.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the session cannot be persisted.
    pub async fn begin_login(&self, session_id: &SessionId) -> Result<String, AuthError> {
        let mut session = self.load(session_id).await?;
        let state = csrf::generate_state();
        session.begin(state.clone());
        self.save(session_id, session).await?;

        tracing::debug!("Login started");
        Ok(self
            .client
            .build_authorization_url(&AuthorizationUrlOptions::with_state(state)))
    }

    /// Completes a login from the provider's redirect.
    ///
    /// The state is consumed atomically before the exchange, so a replayed
    /// callback or a failed exchange both leave the session unauthenticated.
    /// On success the signed-in session moves to a fresh id, which is
    /// returned; the old id no longer resolves.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidRequest`] if `code` or `state` is missing or empty.
    /// - [`AuthError::CsrfMismatch`] if `state` is not the session's pending
    ///   state, or the session was logged out or restarted during the exchange.
    /// - [`AuthError::Exchange`] if the token exchange fails.
    /// - [`AuthError::Store`] if the session cannot be read or written.
    pub async fn handle_callback(
        &self,
        session_id: &SessionId,
        code: Option<&str>,
        state: Option<&str>,
    ) -> Result<SessionId, AuthError> {
        let (Some(code), Some(received_state)) = (
            code.filter(|c| !c.is_empty()),
            state.filter(|s| !s.is_empty()),
        ) else {
            return Err(AuthError::InvalidRequest);
        };

        let pending = self.load(session_id).await?;
        if pending.pending_state() != Some(received_state) {
            tracing::warn!("OAuth state mismatch");
            return Err(AuthError::CsrfMismatch);
        }

        let mut consumed = pending.clone();
        consumed.consume_state();
        if !self.swap(session_id, &pending, Some(consumed.clone())).await? {
            tracing::warn!("OAuth state already consumed");
            return Err(AuthError::CsrfMismatch);
        }

        let token = self.client.exchange_code_for_token(code).await.map_err(|e| {
            tracing::error!(error = %e, "Token exchange failed");
            AuthError::Exchange(e)
        })?;

        // Abandon the login if the session changed while the exchange ran.
        if !self.swap(session_id, &consumed, None).await? {
            tracing::warn!("Session changed during token exchange");
            return Err(AuthError::CsrfMismatch);
        }

        let mut session = Session::default();
        session.authenticate(AccessToken::from(token));
        let new_id = SessionId::generate();
        self.save(&new_id, session).await?;

        tracing::info!("OAuth2 login successful");
        Ok(new_id)
    }

    /// Returns the session's access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthRequired`] unless the session completed a
    /// callback, or [`AuthError::Store`] if the lookup fails.
    pub async fn require_authentication(
        &self,
        session_id: &SessionId,
    ) -> Result<AccessToken, AuthError> {
        self.load(session_id)
            .await?
            .access_token()
            .cloned()
            .ok_or(AuthError::AuthRequired)
    }

    /// Forgets the session entirely.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the delete fails.
    pub async fn logout(&self, session_id: &SessionId) -> Result<(), AuthError> {
        self.store
            .delete(session_id)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        tracing::info!("Session logged out");
        Ok(())
    }
}
