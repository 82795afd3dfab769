//! Wait for a submitted change to reach `INSYNC`.

use crate::{
    cfg::PropagationCfg,
    error::{CycleError, Stage},
    records::PendingChange,
    shutdown::Shutdown,
};
use ddns_provider::{ChangeStatus, DnsProvider};
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};
use tracing::debug;

/// Poll `change` every `opts.poll_interval` until the provider reports it
/// propagated, `opts.max_wait` elapses, or shutdown is requested.
///
/// Returns how long the wait took. A timeout is [`CycleError::Timeout`],
/// shutdown is [`CycleError::Cancelled`]; the two are never conflated.
pub async fn await_propagation(
    provider: &dyn DnsProvider,
    change: &PendingChange,
    opts: PropagationCfg,
    shutdown: &Shutdown,
) -> Result<Duration, CycleError> {
    let started = Instant::now();

    let poll = async {
        let mut polls = 0u32;
        loop {
            polls += 1;
            match provider.change_status(&change.id).await {
                Ok(ChangeStatus::InSync) => return Ok(()),
                Ok(ChangeStatus::Pending) => {
                    debug!("change {} still PENDING (poll {polls})", change.id)
                }
                Err(e) => return Err(CycleError::provider(Stage::Tracking, e)),
            }
            sleep(opts.poll_interval).await;
        }
    };

    let bounded = async {
        match timeout(opts.max_wait, poll).await {
            Ok(res) => res,
            Err(_) => Err(CycleError::Timeout {
                change_id: change.id.clone(),
                waited: opts.max_wait,
            }),
        }
    };

    shutdown.guard(Stage::Tracking, bounded).await?;
    Ok(started.elapsed())
}
