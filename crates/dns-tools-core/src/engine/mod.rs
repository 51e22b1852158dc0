//! Change detector and poll loop
//!
//! The PollEngine checks the global address on a fixed interval and, when
//! it changed, persists it, notifies the configured sinks and reconciles the
//! DNS zone.
//!
//! ## Architecture
//!
//! ```text
//!          tick (fixed interval, never overlapping)
//!                        │
//!     ┌──────────────────┴──────────────────┐
//!     ▼                                     ▼
//! ┌─────────────┐                   ┌───────────────┐
//! │ StateStore  │ previous          │ AddressSource │ current
//! └─────────────┘                   └───────────────┘
//!     └──────────────┐        ┌─────────────┘
//!                    ▼        ▼
//!                  plan_tick (pure)
//!                        │ effects
//!     ┌──────────────────┼───────────────────┐
//!     ▼                  ▼                   ▼
//! ┌─────────┐     ┌─────────────┐    ┌──────────────────┐
//! │ Persist │     │ Notify      │    │ RecordReconciler │
//! └─────────┘     └─────────────┘    └──────────────────┘
//! ```
//!
//! ## Failure policy
//!
//! - Current address lookup fails: log, no side effects, wait for next tick
//! - Previous address read fails: treated as "no previous address"
//! - Persist, notify and reconcile failures are logged independently and
//!   never stop the other effects or the loop

use std::future::Future;
use std::net::IpAddr;

use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::{ReconcileSettings, WatchSettings};
use crate::error::{Error, Result};
use crate::event::ChangeEvent;
use crate::reconciler::{ReconcileReport, RecordReconciler};
use crate::traits::{AddressSource, Notifier, StateStore};

/// Poll loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the next tick
    Idle,
    /// Applying the effects of a detected change
    Reconciling,
}

/// Side effect requested by [`plan_tick`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Store the address as the new previous value
    Persist(IpAddr),
    /// Send the change to every notification sink
    Notify(ChangeEvent),
    /// Align the DNS zone with the address
    Reconcile(IpAddr),
}

/// Decision for one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickPlan {
    /// State to enter
    pub next: LoopState,
    /// Effects to run, in order
    pub effects: Vec<Effect>,
}

/// Decide what a tick must do
///
/// An absent previous address never equals a concrete one. On the first
/// observation only the persist effect is planned unless
/// [`WatchSettings::fire_on_first_observation`] is set.
pub fn plan_tick(settings: &WatchSettings, previous: Option<IpAddr>, current: IpAddr) -> TickPlan {
    let previous = previous.map(|ip| ip.to_canonical());
    let current = current.to_canonical();

    if previous == Some(current) {
        return TickPlan {
            next: LoopState::Idle,
            effects: Vec::new(),
        };
    }

    let mut effects = vec![Effect::Persist(current)];
    if previous.is_some() || settings.fire_on_first_observation {
        effects.push(Effect::Notify(ChangeEvent::new(previous, current)));
        effects.push(Effect::Reconcile(current));
    }

    TickPlan {
        next: LoopState::Reconciling,
        effects,
    }
}

/// What happened during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The current address could not be looked up
    LookupFailed,
    /// The address did not change
    Unchanged { current: IpAddr },
    /// The address changed; `fired` tells whether notification and
    /// reconciliation ran
    Changed { event: ChangeEvent, fired: bool },
}

/// Report of one tick
#[derive(Debug)]
pub struct TickReport {
    /// What the tick decided
    pub outcome: TickOutcome,
    /// Whether the new address was persisted
    pub persisted: bool,
    /// Number of sinks that accepted the notification
    pub notified: usize,
    /// Reconciliation result, when a pass completed
    ///
    /// Per-record update failures stay in its `failures`.
    pub reconcile: Option<ReconcileReport>,
    /// Failures outside a completed reconciliation pass
    pub errors: Vec<Error>,
}

impl TickReport {
    fn new(outcome: TickOutcome) -> Self {
        Self {
            outcome,
            persisted: false,
            notified: 0,
            reconcile: None,
            errors: Vec::new(),
        }
    }
}

/// Poll-based change detector
///
/// Owns immutable settings and its collaborators; there is no shared
/// mutable state, and ticks run strictly one after another.
pub struct PollEngine {
    settings: WatchSettings,
    source: Box<dyn AddressSource>,
    store: Box<dyn StateStore>,
    notifiers: Vec<Box<dyn Notifier>>,
    dns: Option<(RecordReconciler, ReconcileSettings)>,
}

impl PollEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// - `Ok(PollEngine)`: Engine with no sinks and no DNS reconciliation
    /// - `Err(Error::Configuration)`: Invalid settings
    pub fn new(
        settings: WatchSettings,
        source: Box<dyn AddressSource>,
        store: Box<dyn StateStore>,
    ) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            settings,
            source,
            store,
            notifiers: Vec::new(),
            dns: None,
        })
    }

    /// Add a notification sink
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Enable DNS reconciliation
    pub fn with_reconciler(
        mut self,
        reconciler: RecordReconciler,
        settings: ReconcileSettings,
    ) -> Result<Self> {
        settings.validate()?;
        self.dns = Some((reconciler, settings));
        Ok(self)
    }

    /// Engine settings
    pub fn settings(&self) -> &WatchSettings {
        &self.settings
    }

    /// Run one tick to completion
    pub async fn tick(&self) -> TickReport {
        let key = self.settings.state_key.as_str();

        let previous = match self.store.get_previous(key).await {
            Ok(ip) => ip,
            Err(e) => {
                warn!("Failed to read previous global address, treating as absent: {}", e);
                None
            }
        };

        let current = match self.source.current().await {
            Ok(ip) => ip,
            Err(e) => {
                warn!(source = self.source.source_name(), "Failed to get current global address: {}", e);
                return TickReport::new(TickOutcome::LookupFailed);
            }
        };

        debug!(
            "previous IP: {}, current IP: {}",
            previous.map(|ip| ip.to_string()).unwrap_or_default(),
            current
        );

        let plan = plan_tick(&self.settings, previous, current);
        if plan.next == LoopState::Idle {
            return TickReport::new(TickOutcome::Unchanged { current });
        }

        let event = ChangeEvent::new(
            previous.map(|ip| ip.to_canonical()),
            current.to_canonical(),
        );
        let fired = plan.effects.iter().any(|e| matches!(e, Effect::Notify(_)));
        if fired {
            info!("Global address changed: {}", event.webhook_text().trim_end());
        } else {
            info!(
                "First observation of global address {}, notification suppressed",
                event.current()
            );
        }

        let mut report = TickReport::new(TickOutcome::Changed { event, fired });
        for effect in plan.effects {
            self.apply(effect, &mut report).await;
        }
        report
    }

    async fn apply(&self, effect: Effect, report: &mut TickReport) {
        match effect {
            Effect::Persist(ip) => {
                match self.store.upsert(&self.settings.state_key, ip).await {
                    Ok(()) => {
                        debug!(key = %self.settings.state_key, "Persisted global address {}", ip);
                        report.persisted = true;
                    }
                    Err(e) => {
                        error!("Failed to persist global address: {}", e);
                        report.errors.push(e);
                    }
                }
            }
            Effect::Notify(event) => {
                for notifier in &self.notifiers {
                    match notifier.notify(&event).await {
                        Ok(()) => {
                            debug!(sink = notifier.sink_name(), "Notification delivered");
                            report.notified += 1;
                        }
                        Err(e) => {
                            error!(sink = notifier.sink_name(), "Failed to notify: {}", e);
                            report.errors.push(e);
                        }
                    }
                }
            }
            Effect::Reconcile(ip) => {
                let Some((reconciler, settings)) = &self.dns else {
                    debug!("DNS reconciliation not configured");
                    return;
                };
                match reconciler
                    .reconcile_domain(ip, &settings.domain, &settings.filters)
                    .await
                {
                    Ok(pass) => {
                        for failure in &pass.failures {
                            warn!("{}", failure);
                        }
                        report.reconcile = Some(pass);
                    }
                    Err(e) => {
                        error!(domain = %settings.domain, "DNS reconciliation failed: {}", e);
                        report.errors.push(e);
                    }
                }
            }
        }
    }

    /// Run until the given receiver fires or its sender is dropped
    pub async fn run_with_shutdown(&self, shutdown_rx: oneshot::Receiver<()>) {
        self.run_until(async {
            let _ = shutdown_rx.await;
        })
        .await
    }

    /// Run ticks until `shutdown` completes
    ///
    /// A tick in progress always completes; shutdown is only observed while
    /// sleeping between ticks.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            interval = ?self.settings.interval,
            fire_on_first_observation = self.settings.fire_on_first_observation,
            sinks = self.notifiers.len(),
            dns = self.dns.is_some(),
            "Starting poll loop"
        );

        tokio::pin!(shutdown);

        loop {
            let report = self.tick().await;
            debug!(
                outcome = ?report.outcome,
                errors = report.errors.len(),
                failed_updates = report.reconcile.as_ref().map_or(0, |pass| pass.failures.len()),
                "Tick complete"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                _ = &mut shutdown => {
                    info!("Shutdown signal received, poll loop stopped");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([203, 0, 113, last])
    }

    #[test]
    fn test_same_address_stays_idle() {
        let plan = plan_tick(&WatchSettings::default(), Some(ip(1)), ip(1));
        assert_eq!(plan.next, LoopState::Idle);
        assert!(plan.effects.is_empty());
    }

    #[test]
    fn test_change_persists_notifies_and_reconciles_in_order() {
        let plan = plan_tick(&WatchSettings::default(), Some(ip(1)), ip(2));
        assert_eq!(plan.next, LoopState::Reconciling);
        assert_eq!(
            plan.effects,
            vec![
                Effect::Persist(ip(2)),
                Effect::Notify(ChangeEvent::new(Some(ip(1)), ip(2))),
                Effect::Reconcile(ip(2)),
            ]
        );
    }

    #[test]
    fn test_first_observation_only_persists_by_default() {
        let plan = plan_tick(&WatchSettings::default(), None, ip(1));
        assert_eq!(plan.next, LoopState::Reconciling);
        assert_eq!(plan.effects, vec![Effect::Persist(ip(1))]);
    }

    #[test]
    fn test_first_observation_fires_when_enabled() {
        let settings = WatchSettings::default().with_fire_on_first_observation(true);
        let plan = plan_tick(&settings, None, ip(1));
        assert_eq!(plan.effects.len(), 3);
        assert_eq!(plan.effects[1], Effect::Notify(ChangeEvent::new(None, ip(1))));
    }

    #[test]
    fn test_mapped_address_equals_plain_ipv4() {
        let mapped: IpAddr = "::ffff:203.0.113.1".parse().unwrap();
        let plan = plan_tick(&WatchSettings::default(), Some(mapped), ip(1));
        assert_eq!(plan.next, LoopState::Idle);
    }
}
