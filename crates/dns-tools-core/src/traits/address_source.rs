// # Address Source Trait
//
// Defines the interface for looking up the current global address.
//
// ## Implementations
//
// - HTTP lookup service: `dns-tools-ip-http` crate

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for current-address lookups
///
/// The poll loop calls [`AddressSource::current`] once per tick. A failure
/// is treated as transient: the tick ends without side effects and the
/// next tick tries again.
///
/// # Forbidden Capabilities
/// - ❌ Retry or sleep (the next tick is the retry)
/// - ❌ Cache answers across calls (every tick must see a fresh lookup)
/// - ❌ Spawn background tasks
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Look up the current global address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The current address
    /// - `Err(Error)`: If the lookup failed or returned something unparsable
    async fn current(&self) -> Result<IpAddr, crate::Error>;

    /// Short name for logs (e.g. the lookup endpoint)
    fn source_name(&self) -> &str;
}
