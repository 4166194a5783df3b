use std::future::Future;

use crate::session::SessionRecord;

/// Boxed error type for consumer-provided stores.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer-provided session persistence.
///
/// The auth component is not the sole writer of session state: the host
/// chooses the medium (server-side cache, database, signed cookie) and this
/// trait is the seam. Records are keyed by the `session_id` generated at
/// first successful authentication.
///
/// # Example
///
/// ```rust,ignore
/// impl SessionStore for MyAppState {
///     async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, BoxError> {
///         self.cache.get(session_id).await
///     }
///
///     async fn save(&self, session_id: &str, record: SessionRecord) -> Result<(), BoxError> {
///         self.cache.put(session_id, record).await
///     }
///
///     async fn delete(&self, session_id: &str) -> Result<(), BoxError> {
///         self.cache.remove(session_id).await
///     }
/// }
/// ```
pub trait SessionStore: Send + Sync + 'static {
    /// Look up a session record by id.
    fn load(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Option<SessionRecord>, BoxError>> + Send;

    /// Persist a session record under the given id.
    fn save(
        &self,
        session_id: &str,
        record: SessionRecord,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Remove a session record (logout, expiry).
    fn delete(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}
