use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// DNS record type as reported by a provider.
///
/// Only `A` is ever written; everything else shows up while listing a zone and
/// is carried verbatim so pagination cursors can be echoed back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordType {
    A,
    Other(String),
}

impl RecordType {
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Other(s) => s,
        }
    }
}

impl From<&str> for RecordType {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("A") {
            RecordType::A
        } else {
            RecordType::Other(s.to_owned())
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record set: a name/type pair with its TTL and values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordSet {
    /// Fully-qualified as the provider returns it (trailing dot) when listing;
    /// unqualified when submitted.
    pub name: String,
    pub rtype: RecordType,
    pub ttl: Option<i64>,
    pub values: Vec<String>,
}

/// Continuation markers for a truncated listing. All `None` means "from the
/// start of the zone".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageCursor {
    pub name: Option<String>,
    pub rtype: Option<RecordType>,
    pub identifier: Option<String>,
}

impl PageCursor {
    pub fn is_start(&self) -> bool {
        self.name.is_none() && self.rtype.is_none() && self.identifier.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordPage {
    pub records: Vec<RecordSet>,
    pub truncated: bool,
    /// Where the next page starts; only meaningful when `truncated`.
    pub next: PageCursor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeAction {
    /// Create the record set if absent, replace it if present.
    Upsert,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    pub action: ChangeAction,
    pub record: RecordSet,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub comment: Option<String>,
    pub changes: Vec<Change>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeStatus {
    Pending,
    /// Fully propagated to all authoritative servers.
    InSync,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeInfo {
    pub id: String,
    pub status: ChangeStatus,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("throttled: {0}")]
    Throttled(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("api error: {0}")]
    Api(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// The three provider operations the reconciler needs, and nothing else.
///
/// Implementations must not retry internally; the reconciliation interval is
/// the retry cadence.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// One page of record sets in `zone`, starting at `start`.
    async fn list_records(
        &self,
        zone: &str,
        start: &PageCursor,
    ) -> Result<RecordPage, ProviderError>;

    async fn submit_change(
        &self,
        zone: &str,
        batch: &ChangeBatch,
    ) -> Result<ChangeInfo, ProviderError>;

    async fn change_status(&self, change_id: &str) -> Result<ChangeStatus, ProviderError>;
}
