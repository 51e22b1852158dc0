// # HTTP Address Source
//
// Looks up the current global address from a plain-text "what is my IP"
// endpoint. The poll loop calls it once per tick; there is no caching and
// no background polling here.
//
// ## Response Handling
//
// - Non-2xx status: transient lookup failure
// - Body is trimmed of surrounding whitespace (including trailing CR/LF)
//   and parsed as an IPv4 or IPv6 address
// - With a version filter set, an address of the other family is rejected

use async_trait::async_trait;
use dns_tools_core::traits::AddressSource;
use dns_tools_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Default lookup endpoint
pub const DEFAULT_IP_ENDPOINT: &str = "https://ifconfig.io/ip";

/// Default HTTP timeout for a lookup (10 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Address family accepted from the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    /// IPv4 only
    #[default]
    V4,
    /// IPv6 only
    V6,
    /// Accept either family
    Both,
}

impl IpVersion {
    /// Whether `ip` belongs to this family
    pub fn accepts(self, ip: IpAddr) -> bool {
        match self {
            IpVersion::V4 => ip.to_canonical().is_ipv4(),
            IpVersion::V6 => ip.is_ipv6() && ip.to_canonical().is_ipv6(),
            IpVersion::Both => true,
        }
    }
}

/// HTTP-based address source
#[derive(Debug, Clone)]
pub struct HttpAddressSource {
    /// URL to fetch the address from
    url: String,

    /// Address family to accept
    version: IpVersion,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpAddressSource {
    /// Create a new HTTP address source
    ///
    /// # Parameters
    ///
    /// - `url`: URL returning the caller's address as plain text
    /// - `version`: Address family to accept
    ///
    /// # Returns
    ///
    /// - `Ok(HttpAddressSource)`: Ready to use
    /// - `Err(Error::Configuration)`: Empty URL, or the HTTP client could not
    ///   be built
    pub fn new(url: impl Into<String>, version: IpVersion) -> Result<Self> {
        Self::with_timeout(url, version, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a source with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, version: IpVersion, timeout: Duration) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(Error::config("Address lookup URL cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url,
            version,
            client,
        })
    }

    /// Source for the default endpoint, IPv4 only
    pub fn ifconfig_io() -> Result<Self> {
        Self::new(DEFAULT_IP_ENDPOINT, IpVersion::V4)
    }

    /// Lookup URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Accepted address family
    pub fn version(&self) -> IpVersion {
        self.version
    }
}

/// Parse an endpoint response body into an address of the wanted family
pub fn parse_body(body: &str, version: IpVersion) -> Result<IpAddr> {
    let text = body.trim();
    let ip: IpAddr = text
        .parse()
        .map_err(|_| Error::malformed(text, "address lookup response"))?;

    if !version.accepts(ip) {
        return Err(Error::malformed(
            text,
            format!("address lookup response (expected {:?})", version),
        ));
    }

    Ok(ip)
}

#[async_trait]
impl AddressSource for HttpAddressSource {
    async fn current(&self) -> Result<IpAddr> {
        let what = format!("current address from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::lookup(&what, format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::lookup(&what, format!("HTTP error: {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::lookup(&what, format!("Failed to read response: {}", e)))?;

        // An unparsable answer is as transient as a failed request: the
        // next tick asks again.
        let ip = parse_body(&body, self.version).map_err(|e| Error::lookup(&what, e))?;

        tracing::trace!("Current global address: {}", ip);
        Ok(ip)
    }

    fn source_name(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dns_tools_core::ErrorKind;

    #[test]
    fn test_parse_body_trims_line_endings() {
        let ip = parse_body("203.0.113.7\r\n", IpVersion::V4).unwrap();
        assert_eq!(ip, IpAddr::from([203, 0, 113, 7]));
    }

    #[test]
    fn test_parse_body_rejects_garbage() {
        let err = parse_body("<html>rate limited</html>", IpVersion::Both).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
    }

    #[test]
    fn test_version_filter() {
        assert!(parse_body("2001:db8::1\n", IpVersion::V4).is_err());
        assert!(parse_body("2001:db8::1\n", IpVersion::V6).is_ok());
        assert!(parse_body("203.0.113.7", IpVersion::V6).is_err());
        assert!(parse_body("::ffff:203.0.113.7", IpVersion::V4).is_ok());
        assert!(parse_body("203.0.113.7", IpVersion::Both).is_ok());
    }

    #[test]
    fn test_empty_url_rejected() {
        let err = HttpAddressSource::new("  ", IpVersion::V4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_default_endpoint() {
        let source = HttpAddressSource::ifconfig_io().unwrap();
        assert_eq!(source.url(), DEFAULT_IP_ENDPOINT);
        assert_eq!(source.source_name(), DEFAULT_IP_ENDPOINT);
        assert_eq!(source.version(), IpVersion::V4);
    }

    #[test]
    fn test_version_deserializes_lowercase() {
        let v: IpVersion = serde_json::from_str("\"both\"").unwrap();
        assert_eq!(v, IpVersion::Both);
    }
}
