// # Notifier Trait
//
// Defines the interface for delivering change notifications.
//
// ## Implementations
//
// - Chat webhook: `dns_tools_notify::SlackWebhook`
// - CloudEvents over HTTP: `dns_tools_notify::CloudEventsSink`

use async_trait::async_trait;

use crate::event::ChangeEvent;

/// Trait for notification sinks
///
/// Each configured sink is called once per notified change. A failing sink
/// is logged by the engine and does not affect other sinks, persistence or
/// DNS reconciliation.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a change notification
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Accepted by the sink
    /// - `Err(Error)`: Delivery failed
    async fn notify(&self, event: &ChangeEvent) -> Result<(), crate::Error>;

    /// Sink name for logs (e.g. "slack", "cloudevents")
    fn sink_name(&self) -> &'static str;
}
