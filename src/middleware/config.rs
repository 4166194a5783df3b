use axum_extra::extract::cookie::Key;

use super::error::AuthError;
use crate::oauth::AuthClient;

/// Shared auth settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct AuthSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl_days: i64,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
    pub(crate) login_redirect: String,
    pub(crate) error_redirect: String,
}

impl AuthSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "__saleschat_session".into(),
            session_ttl_days: 1,
            secure_cookies: true,
            auth_path: "/auth".into(),
            login_redirect: "/".into(),
            error_redirect: "/".into(),
        }
    }
}

/// Hosted-UI authentication configuration for the axum layer.
///
/// The required field (`client`) is a constructor parameter; everything else
/// has defaults overridable with `with_*` methods.
pub struct HostedAuthConfig {
    pub(super) client: AuthClient,
    pub(super) settings: AuthSettings,
}

impl HostedAuthConfig {
    /// Create config with the required [`AuthClient`].
    #[must_use]
    pub fn new(client: AuthClient) -> Self {
        Self {
            client,
            settings: AuthSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `SALESCHAT_COOKIE_KEY`: cookie encryption key bytes (at least 64)
    /// - `SALESCHAT_INSECURE_COOKIES`: `"1"`/`"true"` drops the `Secure`
    ///   cookie attribute for plain-HTTP local development
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] when `SALESCHAT_COOKIE_KEY` is set but
    /// too short.
    pub fn from_env(client: AuthClient) -> Result<Self, AuthError> {
        let insecure = matches!(
            std::env::var("SALESCHAT_INSECURE_COOKIES").as_deref(),
            Ok("1") | Ok("true"),
        );

        let cookie_key = match std::env::var("SALESCHAT_COOKIE_KEY") {
            Ok(k) => Key::try_from(k.as_bytes()).map_err(|_| {
                AuthError::Config(
                    "SALESCHAT_COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?,
            Err(_) => Key::generate(),
        };

        Ok(Self::new(client)
            .with_cookie_key(cookie_key)
            .with_secure_cookies(!insecure))
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.settings.session_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.login_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_error_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.error_redirect = path.into();
        self
    }
}
