//! Axum surface for the dashboard.
//!
//! ```rust,ignore
//! use gh_repo_dashboard::middleware::{DashboardConfig, router};
//! use gh_repo_dashboard::session::MemorySessionStore;
//!
//! let config = DashboardConfig::from_env()?;
//! let store = MemorySessionStore::new(config.session_ttl());
//! let app = router(config, store);
//! ```
//!
//! | Route | Behavior |
//! |---|---|
//! | `GET /login` | redirect to the provider's consent screen |
//! | `GET` redirect URI path | verify state, exchange the code, rotate the session, redirect to `/dashboard` |
//! | `POST /logout` | drop the session |
//! | `GET /dashboard` | HTML page, or redirect to `/login` |
//! | `GET /api/repos` | the user's repositories as JSON, or `401` |

mod config;
mod cookies;
mod extractor;
mod routes;
mod state;

pub use config::DashboardConfig;
pub use routes::router;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
