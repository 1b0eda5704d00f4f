use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::AppSettings;
use crate::repos::RepositoryGateway;
use crate::session::{SessionAuthFlow, SessionStore};

/// Shared state for route handlers.
pub(super) struct AppState<S> {
    pub(super) flow: Arc<SessionAuthFlow<S>>,
    pub(super) repos: Arc<RepositoryGateway>,
    pub(super) settings: AppSettings,
}

// Manual Clone: avoid derive adding an `S: Clone` bound.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            flow: self.flow.clone(),
            repos: self.repos.clone(),
            settings: self.settings.clone(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<S: SessionStore> FromRef<AppState<S>> for Key {
    fn from_ref(state: &AppState<S>) -> Self {
        state.settings.cookie_key.clone()
    }
}
