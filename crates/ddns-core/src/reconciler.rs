//! One reconciliation cycle:
//!
//! ```text
//! Observing ─► Reading ─┬─► NoOpDone
//!                       └─► Writing ─► Tracking ─► ConfirmReading ─► Done
//! ```
//!
//! Any stage may end in `Failed`. Nothing survives between cycles.

use crate::{
    cfg::{PropagationCfg, Target},
    detector::AddressSource,
    error::{CycleError, Stage},
    propagation::await_propagation,
    records::{CurrentRecord, PendingChange, Records},
    shutdown::Shutdown,
};
use std::{net::Ipv4Addr, sync::Arc, time::Duration};
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub enum Propagation {
    /// Reached `INSYNC`. `record` is what the confirm read saw, if it worked.
    Confirmed {
        waited: Duration,
        record: Option<CurrentRecord>,
    },
    /// Submitted but not confirmed (timeout or status poll failure).
    Unconfirmed { reason: String },
}

#[derive(Clone, Debug)]
pub enum CycleOutcome {
    Unchanged {
        address: Ipv4Addr,
        record: CurrentRecord,
    },
    Updated {
        address: Ipv4Addr,
        previous: Option<CurrentRecord>,
        change: PendingChange,
        propagation: Propagation,
    },
}

impl CycleOutcome {
    pub fn is_update(&self) -> bool {
        matches!(self, CycleOutcome::Updated { .. })
    }
}

/// Address and TTL both match; a TTL-only drift still needs an upsert.
fn in_sync(record: &CurrentRecord, address: Ipv4Addr, ttl: i64) -> bool {
    record.ttl == ttl
        && record
            .value
            .trim()
            .parse::<Ipv4Addr>()
            .is_ok_and(|v| v == address)
}

pub struct Reconciler {
    target: Target,
    observer: Arc<dyn AddressSource>,
    records: Records,
    propagation: PropagationCfg,
}

impl Reconciler {
    pub fn new(
        target: Target,
        observer: Arc<dyn AddressSource>,
        records: Records,
        propagation: PropagationCfg,
    ) -> Self {
        Self {
            target,
            observer,
            records,
            propagation,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub async fn reconcile(&self, shutdown: &Shutdown) -> Result<CycleOutcome, CycleError> {
        let Target { name, zone_id, ttl } = &self.target;

        /* observe */
        let address = shutdown
            .guard(Stage::Observing, self.observer.observe())
            .await?;

        /* read */
        let current = shutdown
            .guard(Stage::Reading, async {
                self.records
                    .read(zone_id, name)
                    .await
                    .map_err(|e| CycleError::provider(Stage::Reading, e))
            })
            .await?;

        if let Some(record) = &current {
            if in_sync(record, address, *ttl) {
                info!(
                    current_address = %address,
                    current_record_value = %record.value,
                    current_record_ttl = record.ttl,
                    "address has not changed"
                );
                return Ok(CycleOutcome::Unchanged {
                    address,
                    record: record.clone(),
                });
            }
        }

        /* write */
        let change = shutdown
            .guard(Stage::Writing, async {
                self.records
                    .upsert(zone_id, name, address, *ttl)
                    .await
                    .map_err(|e| CycleError::provider(Stage::Writing, e))
            })
            .await?;
        info!(
            current_address = %address,
            previous_record_value = current.as_ref().map(|r| r.value.as_str()).unwrap_or("<absent>"),
            change = %change.id,
            "change submitted"
        );

        /* track */
        let propagation = match await_propagation(
            self.records.provider(),
            &change,
            self.propagation,
            shutdown,
        )
        .await
        {
            Ok(waited) => {
                /* confirm (observability only) */
                let confirmed = shutdown
                    .guard(Stage::ConfirmReading, async {
                        self.records
                            .read(zone_id, name)
                            .await
                            .map_err(|e| CycleError::provider(Stage::ConfirmReading, e))
                    })
                    .await;
                let record = match confirmed {
                    Ok(record) => {
                        info!(
                            current_address = %address,
                            change = %change.id,
                            updated_record_value = record.as_ref().map(|r| r.value.as_str()).unwrap_or("<absent>"),
                            updated_record_ttl = record.as_ref().map(|r| r.ttl),
                            waited = ?waited,
                            "change propagated"
                        );
                        record
                    }
                    Err(e) if e.is_cancelled() => return Err(e),
                    Err(e) => {
                        warn!(change = %change.id, error = %e, "change propagated; confirm read failed");
                        None
                    }
                };
                Propagation::Confirmed { waited, record }
            }
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!(
                    current_address = %address,
                    change = %change.id,
                    error = %e,
                    "change submitted but not confirmed"
                );
                Propagation::Unconfirmed {
                    reason: e.to_string(),
                }
            }
        };

        Ok(CycleOutcome::Updated {
            address,
            previous: current,
            change,
            propagation,
        })
    }
}
