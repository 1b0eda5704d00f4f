use derive_more::{Display, From, Into};

use crate::csrf;

/// Opaque session identifier carried in the browser's session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Into)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(csrf::generate_session_id())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Provider access token, used as a bearer credential.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, From, Into)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Where a session stands in the login flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthStage {
    /// No pending state and no token.
    #[default]
    Anonymous,
    /// A login was started; holds the one-time CSRF state.
    Pending { state: String },
    /// Callback completed; holds the access token.
    Authenticated { access_token: AccessToken },
}

/// Server-side session record.
///
/// Holds at most one pending state at a time; an access token replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    stage: AuthStage,
}

impl Session {
    #[must_use]
    pub fn stage(&self) -> &AuthStage {
        &self.stage
    }

    /// Pending CSRF state, present only between login and callback.
    #[must_use]
    pub fn pending_state(&self) -> Option<&str> {
        match &self.stage {
            AuthStage::Pending { state } => Some(state),
            _ => None,
        }
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&AccessToken> {
        match &self.stage {
            AuthStage::Authenticated { access_token } => Some(access_token),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Starts a login. Any previous state or token is dropped.
    pub(crate) fn begin(&mut self, state: String) {
        self.stage = AuthStage::Pending { state };
    }

    /// Drops the pending state (one-time use).
    pub(crate) fn consume_state(&mut self) {
        if matches!(self.stage, AuthStage::Pending { .. }) {
            self.stage = AuthStage::Anonymous;
        }
    }

    pub(crate) fn authenticate(&mut self, access_token: AccessToken) {
        self.stage = AuthStage::Authenticated { access_token };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_starts_anonymous() {
        let session = Session::default();
        assert_eq!(session.stage(), &AuthStage::Anonymous);
        assert!(session.pending_state().is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn begin_replaces_previous_state_and_token() {
        let mut session = Session::default();
        session.begin("s1".into());
        session.begin("s2".into());
        assert_eq!(session.pending_state(), Some("s2"));

        session.authenticate(AccessToken::from("tok".to_string()));
        assert!(session.pending_state().is_none());

        session.begin("s3".into());
        assert!(session.access_token().is_none());
        assert_eq!(session.pending_state(), Some("s3"));
    }

    #[test]
    fn consume_state_keeps_token() {
        let mut session = Session::default();
        session.authenticate(AccessToken::from("tok".to_string()));
        session.consume_state();
        assert!(session.is_authenticated());
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::from("gho_secret".to_string());
        assert!(!format!("{token:?}").contains("gho_secret"));
        assert_eq!(token.as_str(), "gho_secret");
    }

    #[test]
    fn session_id_from_string() {
        let id = SessionId::from("sess-abc".to_string());
        assert_eq!(id.to_string(), "sess-abc");
        assert_ne!(SessionId::generate(), SessionId::generate());
    }
}
