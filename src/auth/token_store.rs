//! In-memory credential storage.
//!
//! Maps opaque lookup keys to credentials. Process-wide state: initialized
//! empty at startup, discarded at shutdown.

use super::Credentials;
use dashmap::DashMap;
use tracing::debug;

/// Concurrency-safe mapping from lookup key to credentials.
///
/// Absence is signaled via `None`, never an error. Every write is an upsert;
/// key uniqueness is the caller's responsibility. The map is owned
/// exclusively by the store and is never iterated or snapshotted by callers.
///
/// Implementations must be safe under concurrent invocation from many
/// request-handling tasks, and a `get` racing a `set` on a different key
/// must not block on it. A `get` issued after a `set` on the same key
/// returns the written value.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Credentials>;
    fn set(&self, key: &str, credentials: Credentials);
}

/// Lock-free in-memory token store.
///
/// Backed by a sharded concurrent map, so operations on distinct keys do not
/// contend. No persistence; a future persistent implementation can slot in
/// behind the [`TokenStore`] trait without changing callers.
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: DashMap<String, Credentials>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
        }
    }

    /// Number of stored credentials (for monitoring; not part of the
    /// `TokenStore` capability set)
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn get(&self, key: &str) -> Option<Credentials> {
        let found = self.tokens.get(key).map(|entry| entry.value().clone());
        debug!(key = %key, hit = found.is_some(), "token store get");
        found
    }

    fn set(&self, key: &str, credentials: Credentials) {
        debug!(key = %key, "token store set");
        self.tokens.insert(key.to_string(), credentials);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn credentials(token: &str) -> Credentials {
        Credentials {
            access_token: token.to_string(),
            refresh_token: None,
            expires_at: None,
        }
    }

    #[test]
    fn test_set_then_get_returns_stored_value() {
        let store = InMemoryTokenStore::new();

        let creds = credentials("access_123");
        store.set("key-1", creds.clone());

        assert_eq!(store.get("key-1"), Some(creds));
    }

    #[test]
    fn test_get_unwritten_key_is_miss() {
        let store = InMemoryTokenStore::new();

        assert_eq!(store.get("never-written"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_is_upsert() {
        let store = InMemoryTokenStore::new();

        store.set("key-1", credentials("old"));
        store.set("key-1", credentials("new"));

        assert_eq!(store.get("key-1").unwrap().access_token, "new");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_distinct_keys_lose_nothing() {
        let store = Arc::new(InMemoryTokenStore::new());

        let mut handles = Vec::new();
        for i in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.set(&format!("key-{}", i), credentials(&format!("token-{}", i)));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 50);
        for i in 0..50 {
            let creds = store.get(&format!("key-{}", i)).unwrap();
            assert_eq!(creds.access_token, format!("token-{}", i));
        }
    }
}
