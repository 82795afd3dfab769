//! Test doubles shared by the contract tests.
//!
//! `FakeZone` is an in-memory provider that paginates, applies upserts and
//! reports change status on a script. Every call is counted.

#![allow(dead_code)]

use async_trait::async_trait;
use ddns_core::{
    cfg::{PropagationCfg, Target},
    detector::AddressSource,
    error::CycleError,
    metrics::Metrics,
    reconciler::Reconciler,
    records::Records,
};
use ddns_provider::{
    ChangeAction, ChangeBatch, ChangeInfo, ChangeStatus, DnsProvider, PageCursor, ProviderError,
    RecordPage, RecordSet, RecordType,
};
use std::{
    net::Ipv4Addr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

pub const ZONE: &str = "ZXXXXXXXXX";
pub const NAME: &str = "home.example.com";

pub fn target(ttl: i64) -> Target {
    Target {
        name: NAME.into(),
        zone_id: ZONE.into(),
        ttl,
    }
}

pub fn a_record(name: &str, ttl: i64, values: &[&str]) -> RecordSet {
    RecordSet {
        name: name.into(),
        rtype: RecordType::A,
        ttl: Some(ttl),
        values: values.iter().map(|v| v.to_string()).collect(),
    }
}

pub fn record(name: &str, rtype: &str, values: &[&str]) -> RecordSet {
    RecordSet {
        name: name.into(),
        rtype: RecordType::from(rtype),
        ttl: Some(300),
        values: values.iter().map(|v| v.to_string()).collect(),
    }
}

/// When `change_status` starts answering `INSYNC`.
#[derive(Clone, Copy, Debug)]
pub enum Propagates {
    /// On the n-th status poll (1-based).
    AfterPolls(usize),
    Never,
}

/// Misbehaving pagination, for exercising the reader's loop guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Paging {
    Normal,
    /// Every page is truncated and points at the same continuation.
    StuckCursor,
    /// Truncated, but no continuation at all.
    NoCursor,
}

pub struct FakeZone {
    records: Mutex<Vec<RecordSet>>,
    page_size: usize,
    paging: Paging,
    sync: Propagates,
    list_delay: Duration,

    list_error: Mutex<Option<ProviderError>>,
    /// Fail list calls from this 1-based call number on.
    fail_list_from: Mutex<Option<usize>>,
    submit_error: Mutex<Option<ProviderError>>,
    status_error: Mutex<Option<ProviderError>>,

    list_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
    cursors: Mutex<Vec<PageCursor>>,
    batches: Mutex<Vec<(String, ChangeBatch)>>,
}

impl FakeZone {
    pub fn new(records: Vec<RecordSet>) -> Self {
        Self {
            records: Mutex::new(records),
            page_size: 100,
            paging: Paging::Normal,
            sync: Propagates::AfterPolls(1),
            list_delay: Duration::ZERO,
            list_error: Mutex::new(None),
            fail_list_from: Mutex::new(None),
            submit_error: Mutex::new(None),
            status_error: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            cursors: Mutex::new(Vec::new()),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_page_size(mut self, n: usize) -> Self {
        self.page_size = n.max(1);
        self
    }

    pub fn with_paging(mut self, paging: Paging) -> Self {
        self.paging = paging;
        self
    }

    pub fn with_sync(mut self, sync: Propagates) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_list_delay(mut self, d: Duration) -> Self {
        self.list_delay = d;
        self
    }

    pub fn fail_list(&self, e: ProviderError) {
        *self.list_error.lock().unwrap() = Some(e);
    }

    pub fn fail_list_from_call(&self, n: usize) {
        *self.fail_list_from.lock().unwrap() = Some(n);
    }

    pub fn fail_submit(&self, e: ProviderError) {
        *self.submit_error.lock().unwrap() = Some(e);
    }

    pub fn fail_status(&self, e: ProviderError) {
        *self.status_error.lock().unwrap() = Some(e);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn cursors(&self) -> Vec<PageCursor> {
        self.cursors.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<(String, ChangeBatch)> {
        self.batches.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<RecordSet> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl DnsProvider for FakeZone {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn list_records(
        &self,
        _zone: &str,
        start: &PageCursor,
    ) -> Result<RecordPage, ProviderError> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.cursors.lock().unwrap().push(start.clone());
        if !self.list_delay.is_zero() {
            tokio::time::sleep(self.list_delay).await;
        }
        if let Some(e) = self.list_error.lock().unwrap().clone() {
            return Err(e);
        }
        if let Some(from) = *self.fail_list_from.lock().unwrap() {
            if call >= from {
                return Err(ProviderError::Transport("connection reset".into()));
            }
        }

        match self.paging {
            Paging::Normal => {}
            Paging::StuckCursor => {
                return Ok(RecordPage {
                    records: Vec::new(),
                    truncated: true,
                    next: PageCursor {
                        name: Some("stuck.example.com.".into()),
                        rtype: Some(RecordType::A),
                        identifier: None,
                    },
                });
            }
            Paging::NoCursor => {
                return Ok(RecordPage {
                    records: Vec::new(),
                    truncated: true,
                    next: PageCursor::default(),
                });
            }
        }

        let recs = self.records.lock().unwrap().clone();
        let from = match &start.name {
            None => 0,
            Some(n) => recs
                .iter()
                .position(|r| &r.name == n && Some(&r.rtype) == start.rtype.as_ref())
                .unwrap_or(recs.len()),
        };
        let to = (from + self.page_size).min(recs.len());
        let truncated = to < recs.len();
        let next = if truncated {
            PageCursor {
                name: Some(recs[to].name.clone()),
                rtype: Some(recs[to].rtype.clone()),
                identifier: None,
            }
        } else {
            PageCursor::default()
        };
        Ok(RecordPage {
            records: recs[from..to].to_vec(),
            truncated,
            next,
        })
    }

    async fn submit_change(
        &self,
        zone: &str,
        batch: &ChangeBatch,
    ) -> Result<ChangeInfo, ProviderError> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.batches
            .lock()
            .unwrap()
            .push((zone.to_owned(), batch.clone()));
        if let Some(e) = self.submit_error.lock().unwrap().clone() {
            return Err(e);
        }

        let mut recs = self.records.lock().unwrap();
        for change in &batch.changes {
            assert_eq!(change.action, ChangeAction::Upsert);
            let mut rs = change.record.clone();
            rs.name = format!("{}.", rs.name);
            match recs
                .iter_mut()
                .find(|r| r.name == rs.name && r.rtype == rs.rtype)
            {
                Some(existing) => *existing = rs,
                None => recs.push(rs),
            }
        }
        Ok(ChangeInfo {
            id: format!("/change/C{n:04}"),
            status: ChangeStatus::Pending,
        })
    }

    async fn change_status(&self, _change_id: &str) -> Result<ChangeStatus, ProviderError> {
        let n = self.status_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(e) = self.status_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(match self.sync {
            Propagates::AfterPolls(k) if n >= k => ChangeStatus::InSync,
            _ => ChangeStatus::Pending,
        })
    }
}

/// Address source returning whatever the test put in it.
pub struct FixedAddress {
    answer: Mutex<Result<Ipv4Addr, String>>,
    calls: AtomicUsize,
}

impl FixedAddress {
    pub fn new(ip: Ipv4Addr) -> Self {
        Self {
            answer: Mutex::new(Ok(ip)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            answer: Mutex::new(Err("connection refused".into())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, ip: Ipv4Addr) {
        *self.answer.lock().unwrap() = Ok(ip);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressSource for FixedAddress {
    async fn observe(&self) -> Result<Ipv4Addr, CycleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .lock()
            .unwrap()
            .clone()
            .map_err(CycleError::Network)
    }
}

pub struct Harness {
    pub zone: Arc<FakeZone>,
    pub address: Arc<FixedAddress>,
    pub metrics: Arc<Metrics>,
    pub reconciler: Arc<Reconciler>,
}

pub fn harness(zone: FakeZone, address: FixedAddress, ttl: i64) -> Harness {
    harness_with(zone, address, ttl, PropagationCfg::default())
}

pub fn harness_with(
    zone: FakeZone,
    address: FixedAddress,
    ttl: i64,
    propagation: PropagationCfg,
) -> Harness {
    let zone = Arc::new(zone);
    let address = Arc::new(address);
    let metrics = Arc::new(Metrics::default());
    let reconciler = Arc::new(Reconciler::new(
        target(ttl),
        address.clone(),
        Records::new(zone.clone(), metrics.clone()),
        propagation,
    ));
    Harness {
        zone,
        address,
        metrics,
        reconciler,
    }
}
