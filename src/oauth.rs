//! The OAuth2 protocol engine: authorize-URL construction, code exchange and
//! logout-URL construction.
//!
//! [`AuthClient`] is a short-lived, stateless service object closed over
//! [`AuthConfig`]. URL builders are pure; the host's transport layer turns
//! them into actual browser redirects. The only network operation is
//! [`AuthClient::exchange_code`], and it is never retried: an authorization
//! code is single-use at the IdP, so a failed exchange fails again
//! deterministically and retry is left to the user clicking login.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::config::IdpEndpoints;
use crate::error::Error;
use crate::token::{self, IdentityClaims, TokenVerification};

/// Deadline for calls to the token endpoint (and the JWKS endpoint when
/// signature verification is enabled).
pub const NETWORK_TIMEOUT: Duration = Duration::from_secs(10);

/// Scopes requested on login.
pub const DEFAULT_SCOPES: &[&str] = &["openid", "email", "profile"];

/// Resolved, environment-bound auth configuration.
///
/// Immutable after assembly. `Debug` redacts the client secret.
#[derive(Clone)]
pub struct AuthConfig {
    client_id: String,
    client_secret: Option<String>,
    endpoints: IdpEndpoints,
    scopes: Vec<String>,
    verification: TokenVerification,
}

impl AuthConfig {
    /// Create a configuration from a client id and resolved endpoints.
    #[must_use]
    pub fn new(client_id: impl Into<String>, endpoints: IdpEndpoints) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            endpoints,
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect(),
            verification: TokenVerification::TrustTransport,
        }
    }

    /// Attach the client secret.
    ///
    /// The hosted-UI flow in the original deployment authenticates the
    /// client by redirect URI alone and never sends the secret with the
    /// exchange; it is held for deployments whose IdP app registration
    /// requires it.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Override the requested scopes (default `openid email profile`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Select how ID tokens are trusted (default: TLS transport trust).
    #[must_use]
    pub fn with_verification(mut self, verification: TokenVerification) -> Self {
        self.verification = verification;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn endpoints(&self) -> &IdpEndpoints {
        &self.endpoints
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    #[must_use]
    pub fn verification(&self) -> &TokenVerification {
        &self.verification
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("endpoints", &self.endpoints)
            .field("scopes", &self.scopes)
            .field("verification", &self.verification)
            .finish()
    }
}

/// Token endpoint response.
///
/// Only `id_token` is consumed. The raw response is never persisted and
/// `Debug` redacts token material.
#[derive(Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("id_token", &self.id_token.as_ref().map(|_| "[redacted]"))
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// OAuth2 authorization-code client for the hosted UI.
pub struct AuthClient {
    config: AuthConfig,
    http: reqwest::Client,
}

impl AuthClient {
    /// Create a new client.
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Build the authorize-endpoint URL the browser must navigate to.
    ///
    /// Pure function: `response_type=code`, `client_id`, `redirect_uri` and
    /// the configured scopes, nothing else.
    #[must_use]
    pub fn build_login_url(&self) -> Url {
        let mut url = self.config.endpoints.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.endpoints.redirect_uri.as_str())
            .append_pair("scope", &self.config.scopes.join(" "));
        url
    }

    /// Build the logout-endpoint URL the browser must navigate to.
    ///
    /// Pure function; clearing the session record is the caller's job.
    #[must_use]
    pub fn build_logout_url(&self) -> Url {
        let mut url = self.config.endpoints.logout_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair(
                "post_logout_redirect_uri",
                self.config.endpoints.redirect_uri.as_str(),
            );
        url
    }

    /// Exchange an authorization code for identity claims.
    ///
    /// One form-encoded POST to the token endpoint, one attempt, 10 s
    /// deadline. The code is single-use at the IdP; callers must not
    /// resubmit a value this method has already been given (see
    /// [`crate::dispatch::handle_callback`] for the guard).
    ///
    /// # Errors
    ///
    /// [`Error::TokenExchangeFailed`] on a non-2xx status,
    /// [`Error::MissingIdToken`] when a 2xx response has no `id_token`,
    /// [`Error::ClaimDecodeFailed`] when the payload is not valid token
    /// data, [`Error::NetworkTimeout`] when the deadline elapses.
    pub async fn exchange_code(&self, code: &str) -> Result<IdentityClaims, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.config.endpoints.redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(self.config.endpoints.token_url.clone())
            .timeout(NETWORK_TIMEOUT)
            .form(&params)
            .send()
            .await
            .map_err(Error::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "token exchange rejected by IdP");
            return Err(Error::TokenExchangeFailed {
                status: status.as_u16(),
                body,
            });
        }

        let tokens: TokenResponse = response.json().await.map_err(Error::from_transport)?;
        let id_token = tokens.id_token.as_deref().ok_or(Error::MissingIdToken)?;

        let claims = match &self.config.verification {
            TokenVerification::TrustTransport => token::decode_claims_unverified(id_token)?,
            TokenVerification::VerifyJwks { jwks_url, issuer } => {
                token::verify_claims_jwks(
                    &self.http,
                    jwks_url,
                    issuer.as_deref(),
                    &self.config.client_id,
                    id_token,
                    NETWORK_TIMEOUT,
                )
                .await?
            }
        };

        tracing::info!(subject = %claims.subject, "identity claims decoded");
        Ok(claims)
    }
}
