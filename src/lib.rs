#![doc = include_str!("../README.md")]

pub mod config;
pub mod dispatch;
pub mod error;
#[cfg(feature = "middleware")]
pub mod middleware;
pub mod oauth;
pub mod secrets;
pub mod session;
pub mod token;

// Re-exports for convenient access
pub use config::{ConfigProvider, IdpEndpoints};
pub use dispatch::{CallbackOutcome, handle_callback};
pub use error::Error;
pub use oauth::{AuthClient, AuthConfig, TokenResponse};
pub use secrets::{ClientCredentials, EnvSecretStore, SecretKey, SecretStore};
pub use session::SessionRecord;
pub use token::{IdentityClaims, TokenVerification, decode_claims_unverified};
