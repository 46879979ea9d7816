use crate::storage::{KeyValueStore, StorageResult};
use std::sync::Arc;
use tracing::{debug, warn};

pub const TOKEN_KEY: &str = "access_token";
pub const ADMIN_KEY: &str = "admin_status";

/// Session credentials kept in the local key-value store.
///
/// Cloning is cheap; clones share the same backing store.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn backing_store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    /// Current bearer token. Empty strings count as no token.
    pub fn token(&self) -> StorageResult<Option<String>> {
        Ok(self.store.get(TOKEN_KEY)?.filter(|t| !t.is_empty()))
    }

    /// Store the token exactly as issued by the backend
    pub fn set_token(&self, token: &str) -> StorageResult<()> {
        debug!(target: "session", "Storing session token ({} chars)", token.len());
        self.store.set(TOKEN_KEY, token)
    }

    pub fn is_authenticated(&self) -> StorageResult<bool> {
        Ok(self.token()?.is_some())
    }

    pub fn is_admin(&self) -> StorageResult<bool> {
        Ok(matches!(
            self.store.get(ADMIN_KEY)?.as_deref(),
            Some("1") | Some("true")
        ))
    }

    pub fn set_admin(&self, admin: bool) -> StorageResult<()> {
        self.store.set(ADMIN_KEY, if admin { "1" } else { "0" })
    }

    /// Store a new token with its role flag. When either write fails the
    /// session is cleared, so a token never sits next to another session's
    /// flag.
    pub fn set_credentials(&self, token: &str, admin: bool) -> StorageResult<()> {
        let written = self.set_token(token).and_then(|_| self.set_admin(admin));
        if let Err(e) = written {
            warn!(target: "session", "Could not store the new session, clearing it: {}", e);
            if let Err(clear_err) = self.clear() {
                warn!(target: "session", "Clearing the session failed too: {}", clear_err);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Drop token and role flag
    pub fn clear(&self) -> StorageResult<()> {
        debug!(target: "session", "Clearing session");
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(ADMIN_KEY)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageError};

    fn session() -> SessionStore {
        SessionStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn token_round_trips_verbatim() {
        let session = session();
        let token = "eyJhbGciOiJIUzI1NiJ9.payload.sig==";
        session.set_token(token).unwrap();
        assert_eq!(session.token().unwrap().as_deref(), Some(token));
        assert!(session.is_authenticated().unwrap());
    }

    #[test]
    fn empty_token_counts_as_absent() {
        let session = session();
        session.set_token("").unwrap();
        assert_eq!(session.token().unwrap(), None);
        assert!(!session.is_authenticated().unwrap());
    }

    #[test]
    fn clear_removes_token_and_admin_flag() {
        let session = session();
        session.set_token("abc").unwrap();
        session.set_admin(true).unwrap();
        assert!(session.is_admin().unwrap());

        session.clear().unwrap();
        assert_eq!(session.token().unwrap(), None);
        assert!(!session.is_admin().unwrap());
    }

    /// Memory store whose writes to one key fail
    struct FailingKey {
        inner: MemoryStore,
        key: &'static str,
    }

    impl KeyValueStore for FailingKey {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            if key == self.key {
                return Err(StorageError::Poisoned);
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            self.inner.remove(key)
        }

        fn keys(&self) -> StorageResult<Vec<String>> {
            self.inner.keys()
        }
    }

    #[test]
    fn failed_flag_write_drops_the_whole_session() {
        let inner = MemoryStore::new();
        inner.set(TOKEN_KEY, "admin-token").unwrap();
        inner.set(ADMIN_KEY, "1").unwrap();
        let session = SessionStore::new(Arc::new(FailingKey { inner, key: ADMIN_KEY }));

        assert!(session.set_credentials("user-token", false).is_err());
        assert_eq!(session.token().unwrap(), None);
        assert!(!session.is_admin().unwrap());
    }

    #[test]
    fn credentials_are_written_together() {
        let session = session();
        session.set_credentials("t1", true).unwrap();
        assert_eq!(session.token().unwrap().as_deref(), Some("t1"));
        assert!(session.is_admin().unwrap());
    }
}
