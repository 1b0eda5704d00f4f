use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{StatusCode, header::LOCATION};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use super::config::{AppSettings, DashboardConfig};
use super::cookies;
use super::extractor::Authenticated;
use super::state::AppState;
use crate::oauth::OAuthClient;
use crate::repos::RepositoryGateway;
use crate::session::{AuthError, SessionAuthFlow, SessionId, SessionStore};

const DASHBOARD_HTML: &str = include_str!("../../assets/dashboard.html");

/// Create the dashboard router: login flow, dashboard page and repositories API.
pub fn router<S: SessionStore>(config: DashboardConfig, session_store: S) -> Router {
    // The provider redirects to the configured URI, so serve the callback there.
    let callback_path = config.oauth.redirect_uri().path().to_string();
    let client = OAuthClient::new(config.oauth);
    let login_path = config.settings.login_path.clone();
    let state = AppState {
        flow: Arc::new(SessionAuthFlow::new(client, session_store)),
        repos: Arc::new(RepositoryGateway::new(config.api_base)),
        settings: config.settings,
    };

    Router::new()
        .route("/", get(index))
        .route(&login_path, get(login::<S>))
        .route(&callback_path, get(callback::<S>))
        .route("/logout", post(logout::<S>))
        .route("/dashboard", get(dashboard::<S>))
        .route("/api/repos", get(list_repos::<S>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
}

async fn index() -> &'static str {
    "Server is running!"
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<S: SessionStore>(
    State(state): State<AppState<S>>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Response), AuthError> {
    let session_id = cookies::get_session_id(&jar, &state.settings.session_cookie_name)
        .unwrap_or_else(SessionId::generate);

    let auth_url = state.flow.begin_login(&session_id).await?;

    let jar = jar.add(session_cookie(&state.settings, &session_id));
    Ok((jar, found(&auth_url)))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback<S: SessionStore>(
    State(state): State<AppState<S>>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(PrivateCookieJar, Response), AuthError> {
    if let Some(error) = &params.error {
        let desc = params.error_description.as_deref().unwrap_or("Unknown error");
        tracing::warn!(error = %error, description = %desc, "OAuth2 error from provider");
    }

    // No cookie means no pending state: an unknown id fails the state check.
    let session_id = cookies::get_session_id(&jar, &state.settings.session_cookie_name)
        .unwrap_or_else(SessionId::generate);

    let signed_in = state
        .flow
        .handle_callback(&session_id, params.code.as_deref(), params.state.as_deref())
        .await?;

    let jar = jar.add(session_cookie(&state.settings, &signed_in));
    Ok((jar, found(&state.settings.login_redirect)))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<S: SessionStore>(
    State(state): State<AppState<S>>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Response) {
    if let Some(session_id) = cookies::get_session_id(&jar, &state.settings.session_cookie_name) {
        if let Err(e) = state.flow.logout(&session_id).await {
            tracing::warn!(error = %e, "Session deletion failed during logout");
        }
    }

    let clear_cookie = cookies::clear_session_cookie(&state.settings.session_cookie_name);
    (jar.remove(clear_cookie), found(&state.settings.logout_redirect))
}

// ── Protected ──────────────────────────────────────────────────────

async fn dashboard<S: SessionStore>(
    State(state): State<AppState<S>>,
    auth: Result<Authenticated, AuthError>,
) -> Response {
    match auth {
        Ok(_) => Html(DASHBOARD_HTML).into_response(),
        Err(AuthError::AuthRequired) => found(&state.settings.login_path),
        Err(e) => e.into_response(),
    }
}

async fn list_repos<S: SessionStore>(
    State(state): State<AppState<S>>,
    auth: Authenticated,
) -> Response {
    match state.repos.list_repositories(&auth.access_token).await {
        Ok(repos) => Json(repos).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch repositories");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to fetch repositories",
                    "message": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// `302 Found` redirect.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

fn session_cookie(
    settings: &AppSettings,
    session_id: &SessionId,
) -> axum_extra::extract::cookie::Cookie<'static> {
    cookies::session_cookie(
        &settings.session_cookie_name,
        session_id,
        settings.session_ttl,
        settings.secure_cookies,
    )
}
