//! Per-browsing-session state.
//!
//! The record is owned by the host page layer — this crate reads and writes
//! it, but the host decides where it lives (server-side cache, signed
//! cookie, ...). See [`crate::middleware::SessionStore`] for the persistence
//! seam.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::token::IdentityClaims;

/// Per-user-session record.
///
/// Created anonymous when a browsing session begins; becomes authenticated
/// only through a successful callback exchange. `session_id` is generated
/// exactly once, on first successful authentication, and is stable for the
/// lifetime of the browsing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub authenticated: bool,
    pub identity: Option<IdentityClaims>,
    pub session_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// SHA-256 hex digests of the authorization codes handled in this
    /// session, oldest first, capped at [`CONSUMED_CODE_CAPACITY`]. The raw
    /// code values are never stored.
    #[serde(default)]
    consumed_codes: Vec<String>,
}

/// How many consumed-code digests a record retains.
///
/// The guard is per code value: a code that failed must stay dead even
/// after later codes arrive in the same session. A handful of digests
/// covers any realistic login sequence without growing the record
/// unboundedly.
const CONSUMED_CODE_CAPACITY: usize = 16;

impl SessionRecord {
    /// A fresh, unauthenticated record.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            identity: None,
            session_id: None,
            created_at: OffsetDateTime::now_utc(),
            consumed_codes: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Transition to authenticated with the given identity.
    ///
    /// Generates `session_id` on the first successful authentication only;
    /// a later re-login within the same browsing session keeps the id, so a
    /// single login can never produce two session ids.
    pub fn authenticate(&mut self, identity: IdentityClaims) -> Uuid {
        let session_id = *self.session_id.get_or_insert_with(Uuid::new_v4);
        self.authenticated = true;
        self.identity = Some(identity);
        session_id
    }

    /// Reset to anonymous: clears the authenticated flag, identity, session
    /// id and consumed-code history. Used on logout and session expiry.
    pub fn reset(&mut self) {
        self.authenticated = false;
        self.identity = None;
        self.session_id = None;
        self.consumed_codes.clear();
    }

    /// Record that `code` has been submitted to the IdP in this session.
    ///
    /// When the history is full the oldest digest is evicted first.
    pub fn mark_code_consumed(&mut self, code: &str) {
        let digest = code_digest(code);
        if self.consumed_codes.contains(&digest) {
            return;
        }
        if self.consumed_codes.len() == CONSUMED_CODE_CAPACITY {
            self.consumed_codes.remove(0);
        }
        self.consumed_codes.push(digest);
    }

    /// Whether `code` has already been submitted in this session.
    #[must_use]
    pub fn has_consumed(&self, code: &str) -> bool {
        self.consumed_codes.contains(&code_digest(code))
    }
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self::anonymous()
    }
}

fn code_digest(code: &str) -> String {
    use std::fmt::Write;

    let hash = Sha256::digest(code.as_bytes());
    let mut out = String::with_capacity(hash.len() * 2);
    for byte in hash {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
