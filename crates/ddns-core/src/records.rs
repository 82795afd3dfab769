//! Record reader / writer over a [`DnsProvider`].

use crate::metrics::Metrics;
use chrono::{DateTime, Utc};
use ddns_provider::{
    Change, ChangeAction, ChangeBatch, ChangeStatus, DnsProvider, PageCursor, ProviderError,
    RecordSet, RecordType,
};
use std::{net::Ipv4Addr, sync::Arc};
use tracing::debug;

/// The address record as the provider currently serves it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentRecord {
    pub value: String,
    pub ttl: i64,
}

/// A submitted upsert that has not been confirmed yet.
#[derive(Clone, Debug)]
pub struct PendingChange {
    pub id: String,
    pub submitted_at: DateTime<Utc>,
    /// Status reported at submission time.
    pub status: ChangeStatus,
}

pub(crate) fn qualify(name: &str) -> String {
    if name.ends_with('.') {
        name.to_owned()
    } else {
        format!("{name}.")
    }
}

#[derive(Clone)]
pub struct Records {
    provider: Arc<dyn DnsProvider>,
    metrics: Arc<Metrics>,
}

impl Records {
    pub fn new(provider: Arc<dyn DnsProvider>, metrics: Arc<Metrics>) -> Self {
        Self { provider, metrics }
    }

    pub fn provider(&self) -> &dyn DnsProvider {
        self.provider.as_ref()
    }

    /// First `A` record named `name.` in `zone`, following pagination.
    ///
    /// `Ok(None)` when the zone holds no such record. Only the first value of
    /// a multi-value record is returned. Value-less matches (alias targets)
    /// are skipped.
    pub async fn read(
        &self,
        zone: &str,
        name: &str,
    ) -> Result<Option<CurrentRecord>, ProviderError> {
        let fqdn = qualify(name);
        let mut cursor = PageCursor::default();
        let mut pages = 0usize;

        loop {
            let page = self.provider.list_records(zone, &cursor).await?;
            pages += 1;

            let hit = page.records.iter().find(|rs| {
                rs.rtype == RecordType::A
                    && rs.name.eq_ignore_ascii_case(&fqdn)
                    && !rs.values.is_empty()
            });
            if let Some(rs) = hit {
                debug!("found {fqdn} after {pages} page(s)");
                return Ok(Some(CurrentRecord {
                    value: rs.values[0].clone(),
                    ttl: rs.ttl.unwrap_or_default(),
                }));
            }

            if !page.truncated {
                debug!("{fqdn} absent after {pages} page(s)");
                return Ok(None);
            }
            if page.next.is_start() || page.next == cursor {
                return Err(ProviderError::Malformed(
                    "truncated listing without a new continuation marker".into(),
                ));
            }
            cursor = page.next;
        }
    }

    /// Submit a single-change `UPSERT` batch for the `A` record `name`.
    ///
    /// Counts one update per successful submission.
    pub async fn upsert(
        &self,
        zone: &str,
        name: &str,
        value: Ipv4Addr,
        ttl: i64,
    ) -> Result<PendingChange, ProviderError> {
        let batch = ChangeBatch {
            comment: None,
            changes: vec![Change {
                action: ChangeAction::Upsert,
                record: RecordSet {
                    name: name.to_owned(),
                    rtype: RecordType::A,
                    ttl: Some(ttl),
                    values: vec![value.to_string()],
                },
            }],
        };
        let info = self.provider.submit_change(zone, &batch).await?;
        self.metrics.inc_updates();
        Ok(PendingChange {
            id: info.id,
            submitted_at: Utc::now(),
            status: info.status,
        })
    }
}
