//! Record reconciler
//!
//! Aligns a zone's A records with a target address. Records are fetched
//! fresh from the provider on every pass and run through an ordered guard
//! pipeline; the first guard that fires decides the record's fate:
//!
//! ```text
//! type != A ──────────────► skip (NotARecord)
//! content unparsable ─────► abort pass (MalformedData)
//! content is loopback ────► skip (Loopback)
//! content == target ──────► skip (Unchanged)
//! name not included ──────► skip (NotIncluded)
//! name excluded ──────────► skip (Excluded)
//! otherwise ──────────────► update, keeping the proxied flag
//! ```
//!
//! A failed update is recorded in the [`ReconcileReport`] and the pass
//! moves on to the next record.

use std::fmt;
use std::net::IpAddr;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::filter::FilterSet;
use crate::traits::{DnsProvider, DnsRecord};

/// Why a record was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Not an A record
    NotARecord,
    /// Current content is a loopback address
    Loopback,
    /// Current content already equals the target
    Unchanged,
    /// Name does not match the include filters
    NotIncluded,
    /// Name matches the exclude filters
    Excluded,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = match self {
            SkipReason::NotARecord => "type",
            SkipReason::Loopback => "loopback",
            SkipReason::Unchanged => "unchanged",
            SkipReason::NotIncluded => "include-filter",
            SkipReason::Excluded => "exclude-filter",
        };
        f.write_str(rule)
    }
}

/// Outcome of the guard pipeline for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Leave the record alone
    Skip(SkipReason),
    /// Update the record; carries its current address
    Update { current: IpAddr },
}

/// Run the guard pipeline for a single record
///
/// Returns `Err(Error::MalformedData)` when an A record's content is not an
/// address; callers abort the pass in that case.
pub fn decide(record: &DnsRecord, target: IpAddr, filters: &FilterSet) -> Result<Decision> {
    if !record.is_a_record() {
        return Ok(Decision::Skip(SkipReason::NotARecord));
    }

    let current = parse_content(record)?;

    if current.is_loopback() {
        return Ok(Decision::Skip(SkipReason::Loopback));
    }
    if current == target.to_canonical() {
        return Ok(Decision::Skip(SkipReason::Unchanged));
    }
    if !filters.included(&record.name) {
        return Ok(Decision::Skip(SkipReason::NotIncluded));
    }
    if filters.excluded(&record.name) {
        return Ok(Decision::Skip(SkipReason::Excluded));
    }

    Ok(Decision::Update { current })
}

fn parse_content(record: &DnsRecord) -> Result<IpAddr> {
    record
        .content
        .trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_canonical())
        .map_err(|_| {
            Error::malformed(
                record.content.clone(),
                format!("content of A record {} ({})", record.name, record.id),
            )
        })
}

/// Result of one reconciliation pass
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Zone the pass ran against
    pub zone_id: String,
    /// Names of records that were updated
    pub updated: Vec<String>,
    /// Names of records that were skipped, with the rule that fired
    pub skipped: Vec<(String, SkipReason)>,
    /// Per-record update failures (`Error::RecordUpdate`)
    pub failures: Vec<Error>,
}

impl ReconcileReport {
    fn new(zone_id: &str) -> Self {
        Self {
            zone_id: zone_id.to_string(),
            ..Self::default()
        }
    }

    /// Whether every attempted update succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of update calls issued (successful or not)
    pub fn attempted(&self) -> usize {
        self.updated.len() + self.failures.len()
    }

    /// Skip reason recorded for a record name, if it was skipped
    pub fn skip_reason(&self, fqdn: &str) -> Option<SkipReason> {
        self.skipped
            .iter()
            .find(|(name, _)| name == fqdn)
            .map(|(_, reason)| *reason)
    }
}

/// Applies a target address to a zone through a [`DnsProvider`]
pub struct RecordReconciler {
    provider: Box<dyn DnsProvider>,
}

impl RecordReconciler {
    /// Create a reconciler for a provider
    pub fn new(provider: Box<dyn DnsProvider>) -> Self {
        Self { provider }
    }

    /// Resolve `domain` to a zone and reconcile it
    ///
    /// The zone id is looked up immediately before the pass so a moved or
    /// recreated zone is picked up on the next change.
    pub async fn reconcile_domain(
        &self,
        target: IpAddr,
        domain: &str,
        filters: &FilterSet,
    ) -> Result<ReconcileReport> {
        let zone_id = self
            .provider
            .resolve_zone_id(domain)
            .await
            .map_err(|e| transient(format!("zone {domain}"), e))?;

        debug!(domain, zone_id = %zone_id, "Resolved zone");
        self.reconcile(target, &zone_id, filters).await
    }

    /// Reconcile every A record of `zone_id` against `target`
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileReport)`: All records were visited; inspect
    ///   [`ReconcileReport::failures`] for individual update errors
    /// - `Err(Error::TransientLookup)`: Records could not be listed
    /// - `Err(Error::MalformedData)`: The target is not IPv4, or an A
    ///   record's content is not an address
    pub async fn reconcile(
        &self,
        target: IpAddr,
        zone_id: &str,
        filters: &FilterSet,
    ) -> Result<ReconcileReport> {
        let target = target.to_canonical();
        if !target.is_ipv4() {
            return Err(Error::malformed(
                target.to_string(),
                "target address for A records must be IPv4",
            ));
        }

        let records = self
            .provider
            .list_records(zone_id)
            .await
            .map_err(|e| transient(format!("records of zone {zone_id}"), e))?;

        debug!(
            zone_id,
            include = ?filters.include,
            exclude = ?filters.exclude,
            "Reconciling {} record(s) against {}",
            records.len(),
            target
        );

        let mut report = ReconcileReport::new(zone_id);

        for record in &records {
            debug!(
                record.id = %record.id,
                record.kind = %record.record_type,
                record.name = %record.name,
                record.content = %record.content,
                "Inspecting record"
            );

            let current = match decide(record, target, filters)? {
                Decision::Skip(reason) => {
                    debug!(record.name = %record.name, rule = %reason, "Skipping record");
                    report.skipped.push((record.name.clone(), reason));
                    continue;
                }
                Decision::Update { current } => current,
            };

            info!(
                record.name = %record.name,
                record.id = %record.id,
                proxied = record.proxied,
                "Updating {} => {}",
                current,
                target
            );

            match self
                .provider
                .update_record(zone_id, &record.id, target, record.proxied)
                .await
            {
                Ok(()) => report.updated.push(record.name.clone()),
                Err(e) => {
                    warn!(record.name = %record.name, record.id = %record.id, "Record update failed: {}", e);
                    report
                        .failures
                        .push(Error::record_update(&record.id, &record.name, target, e));
                }
            }
        }

        info!(
            zone_id,
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "Reconciliation pass complete"
        );

        Ok(report)
    }
}

/// Lookup failures keep their kind; anything else is reported as transient
fn transient(what: String, err: Error) -> Error {
    match err {
        Error::TransientLookup { .. } => err,
        other => Error::lookup(what, other),
    }
}
