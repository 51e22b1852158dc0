//! Test doubles and common utilities for contract tests
//!
//! Every double records its calls behind `Arc`s so a test can keep a
//! handle after the original has been boxed and moved into the engine
//! (see the `sharing_counters_with` constructors).

#![allow(dead_code)]

use dns_tools_core::ChangeEvent;
use dns_tools_core::error::{Error, Result};
use dns_tools_core::traits::{AddressSource, DnsProvider, DnsRecord, Notifier, StateStore};
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ZONE_ID: &str = "zone-1";
pub const DOMAIN: &str = "example.com";

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid test address")
}

/// An AddressSource that replays a script of answers, then repeats the last
pub struct ScriptedAddressSource {
    answers: Arc<Mutex<VecDeque<std::result::Result<IpAddr, String>>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedAddressSource {
    pub fn always(addr: IpAddr) -> Self {
        Self::script(vec![Ok(addr)])
    }

    pub fn failing() -> Self {
        Self::script(vec![Err("connection refused".to_string())])
    }

    pub fn script(answers: Vec<std::result::Result<IpAddr, String>>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.into())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            answers: Arc::clone(&other.answers),
            calls: Arc::clone(&other.calls),
        }
    }
}

#[async_trait::async_trait]
impl AddressSource for ScriptedAddressSource {
    async fn current(&self) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut answers = self.answers.lock().unwrap();
        let answer = if answers.len() > 1 {
            answers.pop_front()
        } else {
            answers.front().cloned()
        };

        match answer {
            Some(Ok(addr)) => Ok(addr),
            Some(Err(message)) => Err(Error::lookup("current address", message)),
            None => Err(Error::lookup("current address", "script exhausted")),
        }
    }

    fn source_name(&self) -> &str {
        "scripted"
    }
}

/// A StateStore that counts calls and can be told to fail
pub struct MockStateStore {
    state: Arc<Mutex<HashMap<String, IpAddr>>>,
    get_calls: Arc<AtomicUsize>,
    upsert_calls: Arc<AtomicUsize>,
    fail_reads: bool,
    fail_writes: bool,
}

impl MockStateStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            get_calls: Arc::new(AtomicUsize::new(0)),
            upsert_calls: Arc::new(AtomicUsize::new(0)),
            fail_reads: false,
            fail_writes: false,
        }
    }

    pub fn with_previous(key: &str, addr: IpAddr) -> Self {
        let store = Self::new();
        store.state.lock().unwrap().insert(key.to_string(), addr);
        store
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn upsert_call_count(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn get_call_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self, key: &str) -> Option<IpAddr> {
        self.state.lock().unwrap().get(key).copied()
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            state: Arc::clone(&other.state),
            get_calls: Arc::clone(&other.get_calls),
            upsert_calls: Arc::clone(&other.upsert_calls),
            fail_reads: other.fail_reads,
            fail_writes: other.fail_writes,
        }
    }
}

#[async_trait::async_trait]
impl StateStore for MockStateStore {
    async fn get_previous(&self, key: &str) -> Result<Option<IpAddr>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(Error::persistence(key, "apiserver unavailable"));
        }
        Ok(self.state.lock().unwrap().get(key).copied())
    }

    async fn upsert(&self, key: &str, addr: IpAddr) -> Result<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(Error::persistence(key, "forbidden"));
        }
        self.state.lock().unwrap().insert(key.to_string(), addr);
        Ok(())
    }
}

/// One update call observed by the mock provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCall {
    pub zone_id: String,
    pub record_id: String,
    pub content: IpAddr,
    pub proxied: bool,
}

/// A DnsProvider serving a fixed record list and recording updates
pub struct MockDnsProvider {
    records: Arc<Mutex<Vec<DnsRecord>>>,
    failing_ids: Arc<HashSet<String>>,
    updates: Arc<Mutex<Vec<UpdateCall>>>,
    list_calls: Arc<AtomicUsize>,
    resolve_calls: Arc<AtomicUsize>,
    fail_listing: bool,
}

impl MockDnsProvider {
    pub fn new(records: Vec<DnsRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            failing_ids: Arc::new(HashSet::new()),
            updates: Arc::new(Mutex::new(Vec::new())),
            list_calls: Arc::new(AtomicUsize::new(0)),
            resolve_calls: Arc::new(AtomicUsize::new(0)),
            fail_listing: false,
        }
    }

    /// Updates to these record ids fail
    pub fn failing_updates_for(mut self, ids: &[&str]) -> Self {
        self.failing_ids = Arc::new(ids.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// Every update call, including failed ones, in call order
    pub fn updates(&self) -> Vec<UpdateCall> {
        self.updates.lock().unwrap().clone()
    }

    pub fn update_call_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn resolve_call_count(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            failing_ids: Arc::clone(&other.failing_ids),
            updates: Arc::clone(&other.updates),
            list_calls: Arc::clone(&other.list_calls),
            resolve_calls: Arc::clone(&other.resolve_calls),
            fail_listing: other.fail_listing,
        }
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn resolve_zone_id(&self, domain: &str) -> Result<String> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if domain == DOMAIN {
            Ok(ZONE_ID.to_string())
        } else {
            Err(Error::lookup(format!("zone {domain}"), "zone not found"))
        }
    }

    async fn list_records(&self, _zone_id: &str) -> Result<Vec<DnsRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(Error::lookup("records", "HTTP 503"));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        content: IpAddr,
        proxied: bool,
    ) -> Result<()> {
        self.updates.lock().unwrap().push(UpdateCall {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
            content,
            proxied,
        });

        if self.failing_ids.contains(record_id) {
            return Err(Error::lookup("update", "HTTP 500"));
        }

        // Reflect the write so a follow-up pass sees the new content
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.id == record_id) {
            record.content = content.to_string();
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A Notifier that records every event it receives
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<ChangeEvent>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            events: Arc::clone(&other.events),
            fail: other.fail,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &ChangeEvent) -> Result<()> {
        self.events.lock().unwrap().push(*event);
        if self.fail {
            return Err(Error::notification("recording", "webhook returned 500"));
        }
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "recording"
    }
}

pub fn a_record(id: &str, name: &str, content: &str) -> DnsRecord {
    DnsRecord::new(id, "A", name, content, false)
}
