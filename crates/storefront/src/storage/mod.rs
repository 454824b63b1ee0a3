//! Client-persisted key-value storage.
//!
//! Everything the client remembers between page loads lives in exactly three
//! slots of a [`SessionStore`]: the user bearer token, the admin bearer token,
//! and the JSON-encoded local cart. Absence is a normal state, and storage
//! failures are never surfaced to callers (they are logged and read as
//! absence).
//!
//! # Implementations
//!
//! - [`tower_sessions::Session`] - one store per browser, keyed by the session cookie
//! - [`InMemoryStore`] - process-local store for tests and tools

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tower_sessions::Session;

/// Storage keys used by the client.
pub mod keys {
    /// Key for the user bearer token.
    pub const USER_TOKEN: &str = "token";

    /// Key for the admin bearer token.
    pub const ADMIN_TOKEN: &str = "adminToken";

    /// Key for the JSON list of local (anonymous) cart items.
    pub const CART_ITEMS: &str = "cartItems";
}

/// Persistent string key-value storage owned by one client.
pub trait SessionStore: Send + Sync {
    /// Read a value; `None` when absent.
    fn get(&self, key: &str) -> impl Future<Output = Option<String>> + Send;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: String) -> impl Future<Output = ()> + Send;

    /// Remove a value. Removing an absent key is a no-op.
    fn remove(&self, key: &str) -> impl Future<Output = ()> + Send;
}

impl SessionStore for Session {
    async fn get(&self, key: &str) -> Option<String> {
        match Session::get::<String>(self, key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read session value");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: String) {
        if let Err(e) = self.insert(key, value).await {
            tracing::warn!(key, error = %e, "Failed to write session value");
        }
    }

    async fn remove(&self, key: &str) {
        if let Err(e) = Session::remove::<String>(self, key).await {
            tracing::warn!(key, error = %e, "Failed to remove session value");
        }
    }
}

/// In-memory [`SessionStore`].
///
/// Clones share the same underlying map, so a test can hand one clone to the
/// code under test and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given entries.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: Arc::new(Mutex::new(values)),
        }
    }

    /// Read a value without going through the async trait.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Copy of every stored entry.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for InMemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.peek(key)
    }

    async fn set(&self, key: &str, value: String) {
        self.lock().insert(key.to_string(), value);
    }

    async fn remove(&self, key: &str) {
        self.lock().remove(key);
    }
}
