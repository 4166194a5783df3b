use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::Key;
use uuid::Uuid;

use super::error::AuthError;
use super::state::AuthState;
use super::traits::SessionStore;
use crate::token::IdentityClaims;

/// Authenticated user extracted from the session cookie.
///
/// Use as an axum extractor in route handlers. Returns `401 Unauthorized`
/// when no valid authenticated session exists.
///
/// # Example
///
/// ```rust,ignore
/// async fn chat(user: CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", user.identity.name.as_deref().unwrap_or("there"))
/// }
///
/// // Optional: accessible to both authenticated and anonymous users
/// async fn landing(user: Option<CurrentUser>) -> impl IntoResponse {
///     match user {
///         Some(u) => format!("Signed in as {}", u.identity.subject),
///         None => "Please sign in".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// Session id generated at first successful authentication.
    pub session_id: Uuid,
    /// Identity claims decoded at login.
    pub identity: IdentityClaims,
}

/// Resolve the current session from a cookie jar, for use in consumer
/// middleware and handlers that live outside the auth router.
///
/// # Errors
///
/// [`AuthError::Unauthenticated`] when no session cookie is present,
/// [`AuthError::SessionExpired`] when the stored session is gone or not
/// authenticated, [`AuthError::Store`] on backend failure.
pub async fn resolve_session<S: SessionStore>(
    store: &S,
    jar: &PrivateCookieJar,
    cookie_name: &str,
) -> Result<CurrentUser, AuthError> {
    let session_key = jar
        .get(cookie_name)
        .map(|c| c.value().to_string())
        .ok_or(AuthError::Unauthenticated)?;

    let record = store
        .load(&session_key)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?
        .ok_or(AuthError::SessionExpired)?;

    match (record.authenticated, record.session_id, record.identity) {
        (true, Some(session_id), Some(identity)) => Ok(CurrentUser {
            session_id,
            identity,
        }),
        _ => Err(AuthError::SessionExpired),
    }
}

impl<S: SessionStore> FromRequestParts<AuthState<S>> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState<S>,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar<Key> = PrivateCookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::Unauthenticated)?;

        resolve_session(
            state.store.as_ref(),
            &jar,
            &state.settings.session_cookie_name,
        )
        .await
    }
}
