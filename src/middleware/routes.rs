use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use super::config::HostedAuthConfig;
use super::cookies;
use super::state::AuthState;
use super::traits::SessionStore;
use crate::dispatch::{CallbackOutcome, handle_callback};
use crate::session::SessionRecord;

/// Create the hosted-UI authentication router.
pub fn auth_routes<S>(config: HostedAuthConfig, store: S) -> Router
where
    S: SessionStore,
{
    let auth_path = config.settings.auth_path.clone();

    let state = AuthState {
        client: Arc::new(config.client),
        store: Arc::new(store),
        settings: config.settings,
    };

    Router::new()
        .route(&format!("{auth_path}/login"), get(login::<S>))
        .route(&format!("{auth_path}/callback"), get(callback::<S>))
        .route(
            &format!("{auth_path}/logout"),
            get(logout::<S>).post(logout::<S>),
        )
        .with_state(state)
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<S: SessionStore>(State(state): State<AuthState<S>>) -> Redirect {
    // Pure URL construction; the redirect response is the navigation.
    Redirect::to(state.client.build_login_url().as_str())
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback<S: SessionStore>(
    State(state): State<AuthState<S>>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(PrivateCookieJar, Redirect), Response> {
    if let Some(error) = &params.error {
        let desc = params.error_description.as_deref().unwrap_or("unknown");
        tracing::warn!(error = %error, description = %desc, "IdP returned an error");
        return Err(login_error(&state.settings.error_redirect, error));
    }

    // Reconstruct the browsing-session record from the cookie, if any.
    let mut record = match jar.get(&state.settings.session_cookie_name) {
        Some(cookie) => state
            .store
            .load(cookie.value())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Session load failed");
                login_error(&state.settings.error_redirect, "session_failed")
            })?
            .unwrap_or_else(SessionRecord::anonymous),
        None => SessionRecord::anonymous(),
    };

    match handle_callback(&state.client, &mut record, params.code.as_deref()).await {
        CallbackOutcome::NoCode => {
            Err(login_error(&state.settings.error_redirect, "missing_code"))
        }
        // Redirecting strips the code from the visible URL, so a manual
        // refresh cannot resubmit it.
        CallbackOutcome::AlreadyAuthenticated | CallbackOutcome::CodeAlreadyHandled => {
            Ok((jar, Redirect::to(&state.settings.login_redirect)))
        }
        CallbackOutcome::Authenticated { session_id } => {
            let session_key = session_id.to_string();
            state
                .store
                .save(&session_key, record)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Session creation failed");
                    login_error(&state.settings.error_redirect, "session_failed")
                })?;

            let session_cookie = cookies::session_cookie(
                &state.settings.session_cookie_name,
                &session_key,
                state.settings.session_ttl_days,
                state.settings.secure_cookies,
            );

            tracing::info!(%session_id, "hosted-UI login successful");
            Ok((
                jar.add(session_cookie),
                Redirect::to(&state.settings.login_redirect),
            ))
        }
        CallbackOutcome::Failed(error) => {
            Err(login_error(&state.settings.error_redirect, error.kind()))
        }
    }
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<S: SessionStore>(
    State(state): State<AuthState<S>>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    if let Some(cookie) = jar.get(&state.settings.session_cookie_name) {
        if let Err(e) = state.store.delete(cookie.value()).await {
            tracing::warn!(error = %e, "Session deletion failed during logout");
        }
    }

    let clear_cookie = cookies::clear_session_cookie(&state.settings.session_cookie_name);
    // The IdP terminates its own session and sends the browser back to the
    // post-logout redirect URI.
    (
        jar.remove(clear_cookie),
        Redirect::to(state.client.build_logout_url().as_str()),
    )
}

// ── Helpers ────────────────────────────────────────────────────────

fn login_error(error_redirect: &str, kind: &str) -> Response {
    let encoded = urlencoding::encode(kind);
    Redirect::to(&format!("{error_redirect}?error={encoded}")).into_response()
}
