//! Environment resolution and startup assembly of [`AuthConfig`].
//!
//! Endpoint URLs are pure string templates over the deployment environment
//! tag (`dev`, `stage`, `prod`, ...) — no network call, no discovery
//! document. Client credentials come from a [`SecretStore`] backend and are
//! fetched once per process lifetime.

use tokio::sync::OnceCell;
use url::Url;

use crate::error::Error;
use crate::oauth::AuthConfig;
use crate::secrets::{ClientCredentials, SecretKey, SecretStore};

/// Environment variable naming the deployment environment.
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

/// Environment used when [`ENVIRONMENT_VAR`] is unset.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Hosted-UI domain template. `{env}` is the environment tag.
const HOSTED_UI_DOMAIN: &str = "salesfunnel-leadchat-{env}-userpool-domain.auth.eu-west-1.amazoncognito.com";

/// Application callback host template.
const CALLBACK_HOST: &str = "saleschat.salesfunnel-{env}.rio.cloud";

/// Environment-bound IdP endpoint set.
///
/// All URLs are TLS by construction. Overrides built with
/// [`IdpEndpoints::from_parts`] are checked; plain-HTTP is accepted only for
/// loopback hosts so test stubs can bind `http://127.0.0.1`.
#[derive(Debug, Clone)]
pub struct IdpEndpoints {
    pub authorize_url: Url,
    pub token_url: Url,
    pub logout_url: Url,
    pub redirect_uri: Url,
}

impl IdpEndpoints {
    /// Resolve the endpoint set for an environment tag.
    ///
    /// Pure templating. The tag must be lowercase alphanumeric/hyphen — it is
    /// interpolated into hostnames, so anything else is rejected up front.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty or malformed environment tag.
    pub fn resolve(env: &str) -> Result<Self, Error> {
        if env.is_empty()
            || !env
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(Error::Config(format!(
                "invalid environment tag {env:?}: expected lowercase alphanumeric/hyphen"
            )));
        }

        let domain = HOSTED_UI_DOMAIN.replace("{env}", env);
        let callback = CALLBACK_HOST.replace("{env}", env);

        let parse = |url: String| {
            // Tag is validated above; templated URLs always parse.
            url.parse::<Url>()
                .map_err(|e| Error::Config(format!("templated URL invalid: {e}")))
        };

        Ok(Self {
            authorize_url: parse(format!("https://{domain}/oauth2/authorize"))?,
            token_url: parse(format!("https://{domain}/oauth2/token"))?,
            logout_url: parse(format!("https://{domain}/logout"))?,
            redirect_uri: parse(format!("https://{callback}"))?,
        })
    }

    /// Build an endpoint set from explicit URLs, enforcing the TLS invariant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any non-loopback URL is not `https`.
    pub fn from_parts(
        authorize_url: Url,
        token_url: Url,
        logout_url: Url,
        redirect_uri: Url,
    ) -> Result<Self, Error> {
        for url in [&authorize_url, &token_url, &logout_url, &redirect_uri] {
            ensure_tls(url)?;
        }
        Ok(Self {
            authorize_url,
            token_url,
            logout_url,
            redirect_uri,
        })
    }
}

fn ensure_tls(url: &Url) -> Result<(), Error> {
    if url.scheme() == "https" {
        return Ok(());
    }
    let loopback = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));
    if url.scheme() == "http" && loopback {
        return Ok(());
    }
    Err(Error::Config(format!(
        "endpoint {} must use TLS",
        url.as_str()
    )))
}

/// Startup configuration assembly: environment tag, endpoint templating and
/// one-shot credential retrieval.
///
/// Credentials are cached in memory for the process lifetime; picking up a
/// rotated secret requires a restart.
pub struct ConfigProvider<S> {
    env: String,
    secret_key: SecretKey,
    store: S,
    credentials: OnceCell<ClientCredentials>,
}

impl<S: SecretStore> ConfigProvider<S> {
    /// Create a provider for an explicit environment tag.
    pub fn new(env: impl Into<String>, store: S, secret_key: SecretKey) -> Self {
        Self {
            env: env.into(),
            secret_key,
            store,
            credentials: OnceCell::new(),
        }
    }

    /// Create a provider from the `ENVIRONMENT` variable (default `dev`).
    pub fn from_env(store: S, secret_key: SecretKey) -> Self {
        let env = std::env::var(ENVIRONMENT_VAR)
            .unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string());
        Self::new(env, store, secret_key)
    }

    /// The resolved environment tag.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.env
    }

    /// Resolve the endpoint set for this provider's environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a malformed environment tag.
    pub fn endpoints(&self) -> Result<IdpEndpoints, Error> {
        IdpEndpoints::resolve(&self.env)
    }

    /// Fetch client credentials, hitting the backend at most once per
    /// provider (and thus once per process when the provider lives in app
    /// state).
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecretUnavailable`] if the backend call fails and
    /// [`Error::SecretMalformed`] if the payload cannot be parsed or lacks
    /// `client_id`.
    pub async fn credentials(&self) -> Result<&ClientCredentials, Error> {
        self.credentials
            .get_or_try_init(|| async {
                let secret_id = self.secret_key.secret_id(&self.env);
                tracing::debug!(secret_key = %self.secret_key, "fetching client credentials");
                crate::secrets::fetch_credentials(&self.store, &secret_id).await
            })
            .await
    }

    /// Assemble a ready-to-use [`AuthConfig`]: endpoints + credentials.
    ///
    /// # Errors
    ///
    /// Propagates endpoint and credential resolution failures.
    pub async fn auth_config(&self) -> Result<AuthConfig, Error> {
        let endpoints = self.endpoints()?;
        let creds = self.credentials().await?;
        let mut config = AuthConfig::new(creds.client_id.clone(), endpoints);
        if let Some(secret) = &creds.client_secret {
            config = config.with_client_secret(secret.clone());
        }
        Ok(config)
    }
}
