// # DNS Provider Trait
//
// Defines the interface the record reconciler uses to read and update a
// zone's records.
//
// ## Implementations
//
// - Cloudflare: `dns-tools-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use dns_tools_core::DnsProvider;
//
// let zone_id = provider.resolve_zone_id("example.com").await?;
// for record in provider.list_records(&zone_id).await? {
//     println!("{} {} {}", record.record_type, record.name, record.content);
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Record type managed by the reconciler
pub const A_RECORD: &str = "A";

/// One remote DNS record as observed at reconciliation time
///
/// Snapshots are fetched fresh for every pass and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider record id
    pub id: String,
    /// Record type (e.g. "A", "AAAA", "CNAME")
    #[serde(rename = "type")]
    pub record_type: String,
    /// Fully qualified record name
    pub name: String,
    /// Record content (an address string for A records)
    pub content: String,
    /// Provider proxy flag, preserved on update
    #[serde(default)]
    pub proxied: bool,
}

impl DnsRecord {
    /// Create a record snapshot
    pub fn new(
        id: impl Into<String>,
        record_type: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        proxied: bool,
    ) -> Self {
        Self {
            id: id.into(),
            record_type: record_type.into(),
            name: name.into(),
            content: content.into(),
            proxied,
        }
    }

    /// Whether this is an IPv4 address record
    pub fn is_a_record(&self) -> bool {
        self.record_type == A_RECORD
    }
}

/// Trait for DNS provider implementations
///
/// Providers are thin API clients: one call per method, no retries and no
/// caching. The reconciler decides what to update; the provider only does it.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Resolve the provider's zone id for a domain name
    ///
    /// # Parameters
    ///
    /// - `domain`: Zone apex (e.g. "example.com")
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The zone id
    /// - `Err(Error)`: If the zone does not exist or the request failed
    async fn resolve_zone_id(&self, domain: &str) -> Result<String, crate::Error>;

    /// List every record of a zone
    ///
    /// # Parameters
    ///
    /// - `zone_id`: Zone id from [`DnsProvider::resolve_zone_id`]
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<DnsRecord>)`: All records of the zone, any type
    /// - `Err(Error)`: If the listing failed
    async fn list_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Set the content of one record
    ///
    /// # Parameters
    ///
    /// - `zone_id`: Zone id
    /// - `record_id`: Record id from [`DnsRecord::id`]
    /// - `content`: New address
    /// - `proxied`: Proxy flag to keep on the record
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Record updated
    /// - `Err(Error)`: If the update failed
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        content: IpAddr,
        proxied: bool,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
