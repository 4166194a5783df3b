//! Client credential retrieval from a secret-management backend.
//!
//! The backend itself (AWS Secrets Manager in the original deployment) sits
//! behind the [`SecretStore`] trait so the host picks the transport; this
//! module owns the payload contract: a JSON object with a required
//! `client_id` and an optional `client_secret`.

use std::future::Future;

use serde::Deserialize;

use crate::error::Error;

/// Boxed error type for consumer-provided backends.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer-provided secret backend.
///
/// Implementations return the raw secret string for a backend-specific id.
/// Failures (not found, access denied, transport) surface as
/// [`Error::SecretUnavailable`] to callers of
/// [`ConfigProvider::credentials`](crate::config::ConfigProvider::credentials).
///
/// Implementations must enforce their own deadline on the backend call:
/// `fetch` is awaited during startup assembly without an outer timeout, so a
/// store that can hang indefinitely stalls startup indefinitely.
pub trait SecretStore: Send + Sync + 'static {
    /// Fetch the raw secret string stored under `secret_id`.
    fn fetch(
        &self,
        secret_id: &str,
    ) -> impl Future<Output = Result<String, BoxError>> + Send;
}

/// Named secret-key paths the component knows how to resolve.
///
/// An unrecognized name is an explicit [`Error::UnsupportedSecretKey`], never
/// a silent fall-through to some default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SecretKey {
    /// Application OAuth client secret.
    ClientSecret,
    /// B2C/SSO client registration (the one the assistant uses).
    B2cClientSecret,
}

impl SecretKey {
    /// Backend secret id for this key in the given environment.
    #[must_use]
    pub fn secret_id(&self, env: &str) -> String {
        match self {
            Self::ClientSecret => format!("{env}/app/sso-client"),
            Self::B2cClientSecret => format!("{env}/sso/id"),
        }
    }
}

impl std::fmt::Display for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ClientSecret => "CLIENT_SECRET",
            Self::B2cClientSecret => "B2C_CLIENT_SECRET",
        })
    }
}

impl std::str::FromStr for SecretKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLIENT_SECRET" => Ok(Self::ClientSecret),
            "B2C_CLIENT_SECRET" => Ok(Self::B2cClientSecret),
            other => Err(Error::UnsupportedSecretKey(other.to_string())),
        }
    }
}

/// OAuth client registration material.
///
/// Immutable after load. `Debug` redacts the secret; neither field is ever
/// written to logs by this crate.
#[derive(Clone, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Fetch and parse credentials from a backend.
///
/// # Errors
///
/// [`Error::SecretUnavailable`] if the backend call fails;
/// [`Error::SecretMalformed`] if the payload is not the expected JSON shape
/// or `client_id` is missing/empty.
pub(crate) async fn fetch_credentials<S: SecretStore>(
    store: &S,
    secret_id: &str,
) -> Result<ClientCredentials, Error> {
    let raw = store
        .fetch(secret_id)
        .await
        .map_err(|e| Error::SecretUnavailable(e.to_string()))?;

    let creds: ClientCredentials = serde_json::from_str(&raw)
        .map_err(|e| Error::SecretMalformed(e.to_string()))?;

    if creds.client_id.is_empty() {
        return Err(Error::SecretMalformed("client_id is empty".into()));
    }
    Ok(creds)
}

/// Secret backend that reads from process environment variables.
///
/// The secret id is upper-cased with separators replaced by `_`, e.g.
/// `dev/sso/id` → `DEV_SSO_ID`. Useful for local development; production
/// deployments implement [`SecretStore`] against a real backend.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn var_name(secret_id: &str) -> String {
        secret_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl SecretStore for EnvSecretStore {
    async fn fetch(&self, secret_id: &str) -> Result<String, BoxError> {
        let var = Self::var_name(secret_id);
        std::env::var(&var).map_err(|_| format!("secret variable {var} not set").into())
    }
}
