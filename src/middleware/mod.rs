//! Plug-and-play hosted-UI authentication for axum.
//!
//! The core crate is transport-free; this module is the host page layer the
//! protocol engine needs: it mounts login/callback/logout routes, performs
//! the actual browser redirects, and keeps the browsing session in a private
//! cookie pointing at a consumer-provided [`SessionStore`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use saleschat_auth::middleware::{HostedAuthConfig, InMemorySessionStore, auth_routes};
//!
//! let config = HostedAuthConfig::from_env(client)?;
//! let app = axum::Router::new()
//!     .merge(auth_routes(config, InMemorySessionStore::new()));
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod memory;
mod routes;
mod state;
mod traits;

pub use config::HostedAuthConfig;
pub use error::AuthError;
pub use extractor::{CurrentUser, resolve_session};
pub use memory::InMemorySessionStore;
pub use routes::auth_routes;
pub use traits::{BoxError, SessionStore};

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
