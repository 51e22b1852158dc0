//! CloudEvents HTTP sink
//!
//! Delivers change events in CloudEvents 1.0 binary content mode: the
//! event attributes travel as `ce-*` headers and the body is the JSON
//! payload itself.
//!
//! ```http
//! POST <K_SINK>
//! ce-specversion: 1.0
//! ce-id: 1737028800000000000-0
//! ce-source: github.com/faruryo/dns-tools/cmd/postCloudEvent
//! ce-type: github.com/faruryo/dns-tools/cmd/ChangeGlobalIP
//! ce-time: 2025-01-16T12:00:00Z
//! content-type: application/json
//!
//! {"previousGlobalIPv4":"203.0.113.1","currentGlobalIPv4":"198.51.100.9"}
//! ```
//!
//! Any 2xx answer counts as accepted.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use dns_tools_core::traits::Notifier;
use dns_tools_core::{ChangeEvent, Error, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

const SINK: &str = "cloudevents";

/// CloudEvents spec version sent with every event
pub const SPEC_VERSION: &str = "1.0";

/// Source attribute of change events
pub const EVENT_SOURCE: &str = "github.com/faruryo/dns-tools/cmd/postCloudEvent";

/// Type attribute of change events
pub const EVENT_TYPE: &str = "github.com/faruryo/dns-tools/cmd/ChangeGlobalIP";

/// CloudEvents sink addressed by URL (usually `K_SINK`)
#[derive(Debug)]
pub struct CloudEventsSink {
    target: String,
    client: reqwest::Client,
    sequence: AtomicU64,
}

impl CloudEventsSink {
    /// Create a sink delivering to `target`
    ///
    /// # Returns
    ///
    /// - `Ok(CloudEventsSink)`: Ready to deliver
    /// - `Err(Error::Configuration)`: Empty target
    pub fn new(target: impl Into<String>) -> Result<Self> {
        let target = target.into();
        if target.trim().is_empty() {
            return Err(Error::config("K_SINK is not set"));
        }

        Ok(Self {
            target,
            client: crate::build_client(SINK)?,
            sequence: AtomicU64::new(0),
        })
    }

    /// Delivery target URL
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Unique event id: wall-clock nanoseconds plus a per-sink sequence
    fn next_id(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        format!("{}-{}", nanos, seq)
    }

    /// Send one event with the given attributes and JSON payload
    pub async fn post_event<T: Serialize + ?Sized>(
        &self,
        source: &str,
        event_type: &str,
        payload: &T,
        target: &str,
    ) -> Result<()> {
        let id = self.next_id();
        let time = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        let body = serde_json::to_vec(payload)
            .map_err(|e| Error::notification(SINK, format!("Failed to encode payload: {}", e)))?;

        tracing::debug!(
            ce.id = %id,
            ce.source = source,
            ce.event_type = event_type,
            "Sending CloudEvent to {}",
            target
        );

        let response = self
            .client
            .post(target)
            .header("ce-specversion", SPEC_VERSION)
            .header("ce-id", id.as_str())
            .header("ce-source", source)
            .header("ce-type", event_type)
            .header("ce-time", time.as_str())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::notification(SINK, format!("Failed to send: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::notification(
                SINK,
                format!("Event {} not accepted: {}", id, status),
            ));
        }

        tracing::info!("CloudEvent {} accepted ({})", id, status);
        Ok(())
    }
}

#[async_trait]
impl Notifier for CloudEventsSink {
    async fn notify(&self, event: &ChangeEvent) -> Result<()> {
        self.post_event(EVENT_SOURCE, EVENT_TYPE, event, &self.target)
            .await
    }

    fn sink_name(&self) -> &'static str {
        SINK
    }
}
