//! AWS Route 53 provider
//!
//! * Thin adapter from [`ddns_provider::DnsProvider`] onto `aws-sdk-route53`.  
//! * Credentials and region come from the default AWS provider chain
//!   (env, profile, IMDS, ...); region falls back to `us-east-1`.  
//! * Every API call is a single attempt bounded to 30 s; the schedule is
//!   the retry.  
//! * SDK errors are mapped to [`ddns_provider::ProviderError`] by kind.

use async_trait::async_trait;
use aws_config::{
    BehaviorVersion, ConfigLoader, meta::region::RegionProviderChain, retry::RetryConfig,
    timeout::TimeoutConfig,
};
use aws_sdk_route53::{
    Client,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    types::{
        Change as R53Change, ChangeAction as R53Action, ChangeBatch as R53Batch,
        ChangeStatus as R53Status, ResourceRecord, ResourceRecordSet, RrType,
    },
};
use ddns_provider::{
    ChangeAction, ChangeBatch, ChangeInfo, ChangeStatus, DnsProvider, PageCursor, ProviderError,
    RecordPage, RecordSet, RecordType,
};
use std::time::Duration;
use tracing::debug;

/// Upper bound on any single Route 53 API call.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/*──────── provider struct ────────*/

#[derive(Clone, Debug)]
pub struct R53Provider {
    client: Client,
}

impl R53Provider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolve credentials and region the way the AWS CLI does.
    pub async fn from_env() -> Self {
        let region = RegionProviderChain::default_provider().or_else("us-east-1");
        let conf = loader().region(region).load().await;
        Self::new(Client::new(&conf))
    }
}

/// SDK defaults with retries off and a per-call timeout.
fn loader() -> ConfigLoader {
    aws_config::defaults(BehaviorVersion::latest())
        .retry_config(RetryConfig::disabled())
        .timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(CALL_TIMEOUT)
                .build(),
        )
}

/*──────── type mapping ────────*/

fn to_rr_type(t: &RecordType) -> RrType {
    RrType::from(t.as_str())
}

fn from_rr_type(t: &RrType) -> RecordType {
    RecordType::from(t.as_str())
}

fn to_action(a: ChangeAction) -> R53Action {
    match a {
        ChangeAction::Upsert => R53Action::Upsert,
    }
}

fn from_status(s: &R53Status) -> ChangeStatus {
    match s {
        R53Status::Insync => ChangeStatus::InSync,
        _ => ChangeStatus::Pending,
    }
}

fn to_record_set(rs: &RecordSet) -> Result<ResourceRecordSet, ProviderError> {
    let mut b = ResourceRecordSet::builder()
        .name(&rs.name)
        .r#type(to_rr_type(&rs.rtype))
        .set_ttl(rs.ttl);
    for v in &rs.values {
        let rr = ResourceRecord::builder()
            .value(v)
            .build()
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        b = b.resource_records(rr);
    }
    b.build().map_err(|e| ProviderError::Malformed(e.to_string()))
}

fn to_batch(batch: &ChangeBatch) -> Result<R53Batch, ProviderError> {
    let mut changes = Vec::with_capacity(batch.changes.len());
    for c in &batch.changes {
        changes.push(
            R53Change::builder()
                .action(to_action(c.action))
                .resource_record_set(to_record_set(&c.record)?)
                .build()
                .map_err(|e| ProviderError::Malformed(e.to_string()))?,
        );
    }
    R53Batch::builder()
        .set_changes(Some(changes))
        .set_comment(batch.comment.clone())
        .build()
        .map_err(|e| ProviderError::Malformed(e.to_string()))
}

/*──────── error mapping ────────*/

fn classify_code(code: &str, msg: String) -> ProviderError {
    match code {
        "Throttling" | "ThrottlingException" | "PriorRequestNotComplete" => {
            ProviderError::Throttled(msg)
        }
        "AccessDenied"
        | "AccessDeniedException"
        | "InvalidClientTokenId"
        | "SignatureDoesNotMatch"
        | "ExpiredToken"
        | "UnrecognizedClientException" => ProviderError::Unauthorized(msg),
        _ => ProviderError::Api(msg),
    }
}

fn classify<E, R>(op: &'static str, err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let msg = format!("{op}: {}", DisplayErrorContext(&err));
    match &err {
        SdkError::ServiceError(ctx) => classify_code(ctx.err().code().unwrap_or_default(), msg),
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) | SdkError::ResponseError(_) => {
            ProviderError::Transport(msg)
        }
        _ => ProviderError::Api(msg),
    }
}

/*──────── DnsProvider impl ────────*/

#[async_trait]
impl DnsProvider for R53Provider {
    fn name(&self) -> &'static str {
        "Route53"
    }

    async fn list_records(
        &self,
        zone: &str,
        start: &PageCursor,
    ) -> Result<RecordPage, ProviderError> {
        let out = self
            .client
            .list_resource_record_sets()
            .hosted_zone_id(zone)
            .set_start_record_name(start.name.clone())
            .set_start_record_type(start.rtype.as_ref().map(to_rr_type))
            .set_start_record_identifier(start.identifier.clone())
            .send()
            .await
            .map_err(|e| classify("ListResourceRecordSets", e))?;

        let records = out
            .resource_record_sets()
            .iter()
            .map(|rs| RecordSet {
                name: rs.name().to_owned(),
                rtype: from_rr_type(rs.r#type()),
                ttl: rs.ttl(),
                values: rs
                    .resource_records()
                    .iter()
                    .map(|r| r.value().to_owned())
                    .collect(),
            })
            .collect::<Vec<_>>();
        debug!(
            "Route53 listed {} record sets in {zone} (truncated={})",
            records.len(),
            out.is_truncated()
        );

        Ok(RecordPage {
            records,
            truncated: out.is_truncated(),
            next: PageCursor {
                name: out.next_record_name().map(str::to_owned),
                rtype: out.next_record_type().map(from_rr_type),
                identifier: out.next_record_identifier().map(str::to_owned),
            },
        })
    }

    async fn submit_change(
        &self,
        zone: &str,
        batch: &ChangeBatch,
    ) -> Result<ChangeInfo, ProviderError> {
        let out = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(zone)
            .change_batch(to_batch(batch)?)
            .send()
            .await
            .map_err(|e| classify("ChangeResourceRecordSets", e))?;
        let info = out.change_info().ok_or_else(|| {
            ProviderError::Malformed("ChangeResourceRecordSets: missing ChangeInfo".into())
        })?;
        Ok(ChangeInfo {
            id: info.id().to_owned(),
            status: from_status(info.status()),
        })
    }

    async fn change_status(&self, change_id: &str) -> Result<ChangeStatus, ProviderError> {
        let out = self
            .client
            .get_change()
            .id(change_id)
            .send()
            .await
            .map_err(|e| classify("GetChange", e))?;
        let info = out
            .change_info()
            .ok_or_else(|| ProviderError::Malformed("GetChange: missing ChangeInfo".into()))?;
        Ok(from_status(info.status()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_provider::Change;

    #[test]
    fn error_codes_map_to_kinds() {
        assert!(matches!(
            classify_code("Throttling", "x".into()),
            ProviderError::Throttled(_)
        ));
        assert!(matches!(
            classify_code("AccessDenied", "x".into()),
            ProviderError::Unauthorized(_)
        ));
        assert!(matches!(
            classify_code("NoSuchHostedZone", "x".into()),
            ProviderError::Api(_)
        ));
        assert!(matches!(classify_code("", "x".into()), ProviderError::Api(_)));
    }

    #[test]
    fn upsert_batch_maps_to_sdk_types() {
        let record = RecordSet {
            name: "home.example.com".into(),
            rtype: RecordType::A,
            ttl: Some(300),
            values: vec!["5.6.7.8".into()],
        };
        let rs = to_record_set(&record).unwrap();
        assert_eq!(rs.name(), "home.example.com");
        assert_eq!(rs.r#type(), &RrType::A);
        assert_eq!(rs.ttl(), Some(300));
        assert_eq!(rs.resource_records()[0].value(), "5.6.7.8");

        let batch = ChangeBatch {
            comment: None,
            changes: vec![Change {
                action: ChangeAction::Upsert,
                record,
            }],
        };
        let b = to_batch(&batch).unwrap();
        assert_eq!(b.changes().len(), 1);
        assert_eq!(b.changes()[0].action(), &R53Action::Upsert);
    }

    #[test]
    fn insync_is_the_only_propagated_status() {
        assert_eq!(from_status(&R53Status::Insync), ChangeStatus::InSync);
        assert_eq!(from_status(&R53Status::Pending), ChangeStatus::Pending);
    }

    #[tokio::test]
    async fn sdk_calls_are_single_attempt_and_bounded() {
        let conf = loader()
            .region(aws_sdk_route53::config::Region::new("us-east-1"))
            .load()
            .await;
        assert_eq!(conf.retry_config().map(|r| r.max_attempts()), Some(1));
        assert_eq!(
            conf.timeout_config().and_then(|t| t.operation_timeout()),
            Some(CALL_TIMEOUT)
        );
    }

    /*──────── optional integration test (ignored) ────────*/
    #[tokio::test(flavor = "multi_thread")]
    #[ignore]
    async fn live_list() {
        let zone = std::env::var("HOSTED_ZONE_ID").expect("HOSTED_ZONE_ID not set");
        let p = R53Provider::from_env().await;
        let page = p.list_records(&zone, &PageCursor::default()).await.unwrap();
        assert!(!page.records.is_empty());
    }
}
