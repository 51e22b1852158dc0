// # dns-tools notification sinks
//
// Implementations of the `Notifier` trait:
//
// - [`SlackWebhook`]: plain-text message to a chat incoming webhook
// - [`CloudEventsSink`]: structured event to a CloudEvents HTTP sink
//   (binary content mode, CloudEvents 1.0)
//
// Both send one HTTP request per notification with a bounded timeout and
// never retry; a failed delivery is reported to the poll loop, which logs
// it and moves on.

pub mod cloudevents;
pub mod slack;

pub use cloudevents::{CloudEventsSink, EVENT_SOURCE, EVENT_TYPE};
pub use slack::SlackWebhook;

use std::time::Duration;

/// Default HTTP timeout for notification requests (10 seconds)
pub(crate) const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn build_client(sink: &str) -> dns_tools_core::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .build()
        .map_err(|e| dns_tools_core::Error::config(format!("Failed to build HTTP client for {}: {}", sink, e)))
}
