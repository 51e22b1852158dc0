// # State Store Trait
//
// Defines the interface for persisting the last observed global address.
//
// ## Purpose
//
// The poll loop compares the current address with the value stored here to
// decide whether a change happened. Only one value per key is retained; no
// history is kept.
//
// ## Implementations
//
// - Memory: `MemoryStateStore` (tests, ephemeral runs)
// - File: `FileStateStore` (JSON file with crash recovery)
// - Kubernetes ConfigMap: `dns-tools-state-kube` crate
//
// ## Usage
//
// ```rust,ignore
// use dns_tools_core::StateStore;
//
// let previous = store.get_previous("dns-tools-gip").await?;
// store.upsert("dns-tools-gip", "203.0.113.1".parse()?).await?;
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for state store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// ## Forbidden Capabilities
/// - ❌ Decide whether an address changed (owned by `PollEngine`)
/// - ❌ Perform DNS updates or notifications
/// - ❌ Spawn background tasks
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the persisted address for a key
    ///
    /// # Parameters
    ///
    /// - `key`: Logical state name
    ///
    /// # Returns
    ///
    /// - `Ok(Some(IpAddr))`: The stored address
    /// - `Ok(None)`: Nothing stored yet (first run)
    /// - `Err(Error)`: Storage error or unparsable stored value
    async fn get_previous(&self, key: &str) -> Result<Option<IpAddr>, crate::Error>;

    /// Create or replace the persisted address for a key
    ///
    /// # Parameters
    ///
    /// - `key`: Logical state name
    /// - `ip`: Address to store
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Successfully stored
    /// - `Err(Error)`: Storage error
    async fn upsert(&self, key: &str, ip: IpAddr) -> Result<(), crate::Error>;
}
