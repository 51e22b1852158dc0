// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Crash Behavior
//
// - All state is lost on restart
// - The first tick after a restart is a first observation, so notifications
//   are suppressed unless fire-on-first-observation is set

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::StateStore;

/// In-memory state store implementation
///
/// Clones share the same underlying map.
///
/// # Example
///
/// ```rust,no_run
/// use dns_tools_core::state::MemoryStateStore;
/// use dns_tools_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///
///     store.upsert("dns-tools-gip", "203.0.113.1".parse()?).await?;
///
///     let ip = store.get_previous("dns-tools-gip").await?;
///     assert_eq!(ip, Some("203.0.113.1".parse()?));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<HashMap<String, IpAddr>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one entry
    pub fn with_entry(key: impl Into<String>, ip: IpAddr) -> Self {
        let mut map = HashMap::new();
        map.insert(key.into(), ip);
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Get the number of keys in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_previous(&self, key: &str) -> Result<Option<IpAddr>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(key).copied())
    }

    async fn upsert(&self, key: &str, ip: IpAddr) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(key.to_string(), ip);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStateStore::new();
        assert!(store.is_empty().await);
        assert_eq!(store.get_previous("gip").await.unwrap(), None);

        let ip: IpAddr = "203.0.113.1".parse().unwrap();
        store.upsert("gip", ip).await.unwrap();
        assert_eq!(store.get_previous("gip").await.unwrap(), Some(ip));

        let ip2: IpAddr = "203.0.113.2".parse().unwrap();
        store.upsert("gip", ip2).await.unwrap();
        assert_eq!(store.get_previous("gip").await.unwrap(), Some(ip2));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let ip: IpAddr = "203.0.113.1".parse().unwrap();
        let store = MemoryStateStore::with_entry("gip", ip);
        let clone = store.clone();

        clone.upsert("other", ip).await.unwrap();
        assert_eq!(store.len().await, 2);
    }
}
