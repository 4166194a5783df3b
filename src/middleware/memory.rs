use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::traits::{BoxError, SessionStore};
use crate::session::SessionRecord;

/// Process-local [`SessionStore`] for development and tests.
///
/// Sessions vanish on restart; production deployments implement the trait
/// against a shared cache so duplicate instances see the same sessions.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    inner: Arc<Mutex<HashMap<String, SessionRecord>>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, BoxError> {
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned())
    }

    async fn save(&self, session_id: &str, record: SessionRecord) -> Result<(), BoxError> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.to_string(), record);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), BoxError> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_load_delete_roundtrip() {
        let store = InMemorySessionStore::new();
        let mut record = SessionRecord::anonymous();
        record.authenticate(crate::token::IdentityClaims {
            subject: "abc123".into(),
            email: None,
            name: None,
        });
        let id = record.session_id.unwrap().to_string();

        store.save(&id, record).await.unwrap();
        assert_eq!(store.len(), 1);

        let loaded = store.load(&id).await.unwrap().unwrap();
        assert!(loaded.is_authenticated());

        store.delete(&id).await.unwrap();
        assert!(store.load(&id).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn load_of_unknown_session_is_none() {
        let store = InMemorySessionStore::new();
        assert!(store.load("nope").await.unwrap().is_none());
    }
}
