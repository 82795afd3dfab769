//! Scheduler: run one reconciliation cycle per interval until shutdown.
//!
//! The first cycle fires immediately. Cycles never overlap; the interval is
//! measured from the end of one cycle to the start of the next.

use crate::{
    error::CycleError, metrics::Metrics, reconciler::Reconciler, shutdown::Shutdown,
};
use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tokio::time::{Instant, sleep};
use tracing::{Instrument, error, info, info_span};

/*──────── entry point ────────*/
pub async fn run_scheduler(
    reconciler: Arc<Reconciler>,
    interval: Duration,
    metrics: Arc<Metrics>,
    shutdown: Shutdown,
) -> Result<()> {
    let target = reconciler.target();
    let span = info_span!("reconcile", dns_name = %target.name, zone_id = %target.zone_id);

    let mut wait = Duration::ZERO;
    loop {
        tokio::select! {
            biased;
            _ = shutdown.triggered() => {
                span.in_scope(|| info!("shutting down"));
                return Ok(());
            }
            _ = sleep(wait) => {}
        }

        let started = Instant::now();
        let res = reconciler
            .reconcile(&shutdown)
            .instrument(span.clone())
            .await;
        // failed cycles still cost time
        metrics.add_duration(started.elapsed());

        span.in_scope(|| report(&res));
        // `sleep` saturates, so absurd intervals never overflow the clock
        wait = interval;
    }
}

fn report<T>(res: &Result<T, CycleError>) {
    match res {
        Ok(_) => {}
        Err(e) if e.is_cancelled() => info!("cycle cancelled: {e}"),
        Err(e) => error!(error = %e, "update failed"),
    }
}
