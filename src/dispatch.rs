//! Callback dispatch: exactly-once handling of the `?code=` query parameter.
//!
//! The dispatcher inspects the current request once per render cycle. A code
//! is submitted to the IdP at most once per browsing session: the session
//! record keeps digests of the handled codes, so a page refresh or a
//! losing duplicate tab never triggers a second exchange before the network
//! round-trip — and a second *concurrent* attempt that does reach the IdP
//! simply fails there without corrupting the winner's session.

use uuid::Uuid;

use crate::error::Error;
use crate::oauth::AuthClient;
use crate::session::SessionRecord;

/// What the dispatcher did with the current request.
#[derive(Debug)]
#[non_exhaustive]
pub enum CallbackOutcome {
    /// No `code` parameter present; render the login prompt.
    NoCode,
    /// The session is already authenticated; nothing was exchanged. A page
    /// refresh after login lands here.
    AlreadyAuthenticated,
    /// This exact code value was already handled in this session; nothing
    /// was exchanged.
    CodeAlreadyHandled,
    /// The exchange succeeded and the session record is now authenticated.
    Authenticated { session_id: Uuid },
    /// The exchange failed; the session record remains anonymous and the
    /// user may be re-prompted to log in.
    Failed(Error),
}

/// Run the callback protocol against the current request's `code` parameter.
///
/// Mutates `session` on success (and marks the code consumed in every path
/// that reaches the network). Never retries; see [`CallbackOutcome`] for the
/// possible results.
pub async fn handle_callback(
    client: &AuthClient,
    session: &mut SessionRecord,
    code: Option<&str>,
) -> CallbackOutcome {
    let Some(code) = code else {
        return CallbackOutcome::NoCode;
    };

    if session.is_authenticated() {
        return CallbackOutcome::AlreadyAuthenticated;
    }

    if session.has_consumed(code) {
        tracing::debug!("authorization code already handled in this session");
        return CallbackOutcome::CodeAlreadyHandled;
    }

    // Mark before the round-trip so a re-render racing this exchange cannot
    // submit the same code twice.
    session.mark_code_consumed(code);

    match client.exchange_code(code).await {
        Ok(identity) => {
            let session_id = session.authenticate(identity);
            tracing::info!(%session_id, "login completed");
            CallbackOutcome::Authenticated { session_id }
        }
        Err(error) => {
            tracing::warn!(kind = error.kind(), "login failed");
            CallbackOutcome::Failed(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::IdpEndpoints;
    use crate::oauth::AuthConfig;
    use crate::token::encode_unsigned_jwt;

    fn client_for(server: &MockServer) -> AuthClient {
        let endpoints = IdpEndpoints::from_parts(
            "https://idp.example.com/oauth2/authorize".parse().unwrap(),
            format!("{}/oauth2/token", server.uri()).parse().unwrap(),
            "https://idp.example.com/logout".parse().unwrap(),
            "https://app.example.com/callback".parse().unwrap(),
        )
        .unwrap();
        AuthClient::new(AuthConfig::new("client-1", endpoints))
    }

    async fn mount_single_use_code(server: &MockServer) {
        let id_token = encode_unsigned_jwt(&json!({
            "sub": "abc123",
            "email": "a@b.com",
            "name": "A B",
        }));
        // First presentation of the code succeeds, any replay is rejected
        // the way a real IdP rejects a consumed code.
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": id_token,
                "token_type": "Bearer",
                "expires_in": 3600,
            })))
            .up_to_n_times(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn no_code_renders_login_prompt() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let mut session = SessionRecord::anonymous();

        let outcome = handle_callback(&client, &mut session, None).await;
        assert!(matches!(outcome, CallbackOutcome::NoCode));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn successful_exchange_authenticates_session() {
        let server = MockServer::start().await;
        mount_single_use_code(&server).await;
        let client = client_for(&server);
        let mut session = SessionRecord::anonymous();

        let outcome = handle_callback(&client, &mut session, Some("good-code")).await;
        let CallbackOutcome::Authenticated { session_id } = outcome else {
            panic!("expected Authenticated, got {outcome:?}");
        };
        assert!(session.is_authenticated());
        assert_eq!(session.session_id, Some(session_id));
        assert_eq!(session.identity.as_ref().unwrap().subject, "abc123");
    }

    #[tokio::test]
    async fn refresh_after_login_does_not_reexchange() {
        let server = MockServer::start().await;
        mount_single_use_code(&server).await;
        let client = client_for(&server);
        let mut session = SessionRecord::anonymous();

        handle_callback(&client, &mut session, Some("good-code")).await;
        let first_id = session.session_id;

        // Same URL re-rendered: no second exchange, no new session id.
        let outcome = handle_callback(&client, &mut session, Some("good-code")).await;
        assert!(matches!(outcome, CallbackOutcome::AlreadyAuthenticated));
        assert_eq!(session.session_id, first_id);
        assert_eq!(
            server.received_requests().await.unwrap().len(),
            1,
            "exactly one token exchange"
        );
    }

    #[tokio::test]
    async fn failed_code_is_not_resubmitted_within_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        let client = client_for(&server);
        let mut session = SessionRecord::anonymous();

        let outcome = handle_callback(&client, &mut session, Some("stale-code")).await;
        assert!(matches!(
            outcome,
            CallbackOutcome::Failed(Error::TokenExchangeFailed { status: 400, .. })
        ));
        assert!(!session.is_authenticated());

        // The dead code is short-circuited before any network round-trip.
        let outcome = handle_callback(&client, &mut session, Some("stale-code")).await;
        assert!(matches!(outcome, CallbackOutcome::CodeAlreadyHandled));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn old_failed_code_stays_dead_after_a_newer_one() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .expect(2)
            .mount(&server)
            .await;
        let client = client_for(&server);
        let mut session = SessionRecord::anonymous();

        handle_callback(&client, &mut session, Some("stale-a")).await;
        handle_callback(&client, &mut session, Some("stale-b")).await;

        // Re-presenting the first code is short-circuited; the mock's
        // expect(2) verifies it never reaches the IdP a second time.
        let outcome = handle_callback(&client, &mut session, Some("stale-a")).await;
        assert!(matches!(outcome, CallbackOutcome::CodeAlreadyHandled));
    }

    #[tokio::test]
    async fn losing_duplicate_exchange_leaves_winner_untouched() {
        let server = MockServer::start().await;
        mount_single_use_code(&server).await;
        let client = client_for(&server);

        // Two tabs, two session records, same code. The winner exchanges
        // successfully; the loser hits the IdP's single-use rejection.
        let mut winner = SessionRecord::anonymous();
        let mut loser = SessionRecord::anonymous();

        let outcome = handle_callback(&client, &mut winner, Some("good-code")).await;
        assert!(matches!(outcome, CallbackOutcome::Authenticated { .. }));
        let winner_id = winner.session_id;

        let outcome = handle_callback(&client, &mut loser, Some("good-code")).await;
        assert!(matches!(
            outcome,
            CallbackOutcome::Failed(Error::TokenExchangeFailed { .. })
        ));
        assert!(!loser.is_authenticated());

        // Winner's session is unaffected by the loser's failure.
        assert!(winner.is_authenticated());
        assert_eq!(winner.session_id, winner_id);
    }
}
