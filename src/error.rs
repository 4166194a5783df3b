/// Errors produced by the auth component.
///
/// Startup-fatal: [`SecretUnavailable`](Error::SecretUnavailable),
/// [`SecretMalformed`](Error::SecretMalformed),
/// [`UnsupportedSecretKey`](Error::UnsupportedSecretKey),
/// [`Config`](Error::Config) — the process cannot serve authenticated
/// traffic without resolved configuration.
///
/// Per-login-attempt, recoverable (session stays anonymous, the user retries
/// by clicking login again): [`TokenExchangeFailed`](Error::TokenExchangeFailed),
/// [`MissingIdToken`](Error::MissingIdToken),
/// [`ClaimDecodeFailed`](Error::ClaimDecodeFailed),
/// [`NetworkTimeout`](Error::NetworkTimeout). Nothing is retried
/// automatically: a consumed authorization code fails deterministically.
///
/// `Display` never includes secret material or raw response bodies; only the
/// error kind and HTTP status are safe to log.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The secret backend call failed (not found, access denied, transport).
    #[error("secret backend error: {0}")]
    SecretUnavailable(String),

    /// The secret payload was not the expected JSON shape.
    #[error("secret payload malformed: {0}")]
    SecretMalformed(String),

    /// An unrecognized secret-key name was requested.
    #[error("unsupported secret key: {0}")]
    UnsupportedSecretKey(String),

    /// Invalid startup configuration (bad environment tag, non-TLS endpoint).
    #[error("configuration error: {0}")]
    Config(String),

    /// The token endpoint answered with a non-2xx status. The provider error
    /// body is carried for programmatic inspection but intentionally kept out
    /// of `Display`.
    #[error("token exchange failed with HTTP status {status}")]
    TokenExchangeFailed { status: u16, body: String },

    /// The token endpoint answered 2xx but the response had no `id_token`.
    #[error("token response did not contain an id_token")]
    MissingIdToken,

    /// The ID token payload was not valid structured token data.
    #[error("could not decode identity claims: {0}")]
    ClaimDecodeFailed(String),

    /// A network call exceeded its deadline.
    #[error("network call timed out")]
    NetworkTimeout,

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Stable machine-readable label, safe for logs and redirect parameters.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SecretUnavailable(_) => "secret_unavailable",
            Self::SecretMalformed(_) => "secret_malformed",
            Self::UnsupportedSecretKey(_) => "unsupported_secret_key",
            Self::Config(_) => "config",
            Self::TokenExchangeFailed { .. } => "token_exchange_failed",
            Self::MissingIdToken => "missing_id_token",
            Self::ClaimDecodeFailed(_) => "claim_decode_failed",
            Self::NetworkTimeout => "network_timeout",
            Self::Http(_) => "http",
        }
    }

    /// Maps a reqwest error, surfacing timeouts as [`Error::NetworkTimeout`].
    pub(crate) fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::NetworkTimeout
        } else {
            Self::Http(e)
        }
    }
}
