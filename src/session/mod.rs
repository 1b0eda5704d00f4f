//! Per-browser session state and the authorization code login flow.

mod error;
mod flow;
mod store;
mod types;

pub use error::AuthError;
pub use flow::SessionAuthFlow;
pub use store::{MemorySessionStore, SessionStore, StoreError};
pub use types::{AccessToken, AuthStage, Session, SessionId};
