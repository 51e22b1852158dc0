// # Cloudflare DNS Provider
//
// Cloudflare API v4 implementation of the `DnsProvider` trait.
//
// ## Behavior
//
// - One HTTP request per trait call, except record listing which follows
//   pagination until the last page
// - No retries, no caching: the poll loop's next tick is the retry
// - HTTP timeout of 30 seconds on every request
// - Dry-run mode performs all reads but only logs the PATCH it would send
//
// ## Security Requirements
//
// - The API token never appears in logs or `Debug` output
// - An empty token is rejected at construction
//
// ## API Reference
//
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?page=..&per_page=..`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dns_tools_core::traits::{DnsProvider, DnsRecord};
use dns_tools_core::{Error, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::net::IpAddr;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per page when listing a zone
const PAGE_SIZE: u32 = 100;

/// Response envelope shared by every Cloudflare v4 endpoint
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    page: u32,
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
    name: String,
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record listing)
/// - Log the intended PATCH payload
/// - **NOT** modify any DNS record
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform reads but skip updates
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:Read and DNS:Edit permissions
    /// - `dry_run`: If true, perform reads but skip updates
    ///
    /// # Returns
    ///
    /// - `Ok(CloudflareProvider)`: Provider pointed at the public API
    /// - `Err(Error::Configuration)`: Empty token, or the HTTP client could
    ///   not be built
    pub fn new(api_token: impl Into<String>, dry_run: bool) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a provider in live mode
    pub fn new_live(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, false)
    }

    /// Create a provider in dry-run mode
    pub fn new_dry_run(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, true)
    }

    /// Point the provider at a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether updates are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Send a prepared request and unwrap the v4 envelope
    async fn send<T: DeserializeOwned>(
        &self,
        what: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<ApiResponse<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::lookup(what, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::lookup(what, describe_status(status, &body)));
        }

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::lookup(what, format!("Failed to parse response: {}", e)))?;

        if !envelope.success {
            return Err(Error::lookup(what, describe_api_errors(&envelope.errors)));
        }

        Ok(envelope)
    }
}

/// Map an HTTP status code to a readable failure message
fn describe_status(status: StatusCode, body: &str) -> String {
    match status.as_u16() {
        401 | 403 => format!(
            "Authentication failed: invalid API token or insufficient permissions ({})",
            status
        ),
        404 => format!("Resource not found ({})", status),
        409 => format!("Conflict: record is being updated elsewhere ({})", status),
        429 => format!("Rate limit exceeded ({})", status),
        500..=599 => format!("Cloudflare server error ({}): {}", status, body),
        _ => format!("Unexpected response ({}): {}", status, body),
    }
}

fn describe_api_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "API reported failure without details".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{} (code {})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Look up the zone id for a zone name
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn resolve_zone_id(&self, domain: &str) -> Result<String> {
        let what = format!("zone {}", domain);
        tracing::debug!("Looking up zone ID for domain: {}", domain);

        let request = self
            .client
            .get(format!("{}/zones", self.base_url))
            .query(&[("name", domain)]);
        let envelope: ApiResponse<Vec<Zone>> = self.send(&what, request).await?;

        let zone = envelope
            .result
            .unwrap_or_default()
            .into_iter()
            .find(|z| z.name.eq_ignore_ascii_case(domain))
            .ok_or_else(|| Error::lookup(&what, "zone not found"))?;

        tracing::debug!("Found zone ID: {}", zone.id);
        Ok(zone.id)
    }

    /// List every record of a zone, following pagination
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?page=1&per_page=100
    /// Authorization: Bearer <token>
    /// ```
    async fn list_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        let what = format!("records of zone {}", zone_id);
        let url = format!("{}/zones/{}/dns_records", self.base_url, zone_id);

        let mut records = Vec::new();
        let mut page = 1u32;
        loop {
            let request = self
                .client
                .get(&url)
                .query(&[("page", page), ("per_page", PAGE_SIZE)]);
            let envelope: ApiResponse<Vec<DnsRecord>> = self.send(&what, request).await?;

            let batch = envelope.result.unwrap_or_default();
            let fetched = batch.len();
            records.extend(batch);

            match envelope.result_info {
                Some(info) if info.page < info.total_pages && fetched > 0 => page = info.page + 1,
                _ => break,
            }
        }

        tracing::debug!("Listed {} record(s) in zone {}", records.len(), zone_id);
        Ok(records)
    }

    /// Set a record's content, sending its proxied flag back unchanged
    ///
    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// {
    ///   "content": "198.51.100.9",
    ///   "proxied": false
    /// }
    /// ```
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        content: IpAddr,
        proxied: bool,
    ) -> Result<()> {
        let url = format!("{}/zones/{}/dns_records/{}", self.base_url, zone_id, record_id);
        let payload = serde_json::json!({
            "content": content.to_string(),
            "proxied": proxied,
        });

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PATCH request to {} with payload: {}",
                url,
                payload
            );
            return Ok(());
        }

        let what = format!("record {}", record_id);
        let request = self.client.patch(&url).json(&payload);
        let _: ApiResponse<serde_json::Value> = self.send(&what, request).await?;

        tracing::debug!("DNS record {} updated to {}", record_id, content);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
