//! ddns-core – keeps one Route 53 `A` record pointed at our public IPv4

pub mod cfg;
pub mod detector;
pub mod error;
pub mod http;
pub mod metrics;
pub mod propagation;
pub mod reconciler;
pub mod records;
pub mod scheduler;
pub mod shutdown;

use anyhow::{Context, Result};
use cfg::AppConfig;
use ddns_provider::DnsProvider;
use detector::HttpObserver;
use metrics::Metrics;
use reconciler::Reconciler;
use records::Records;
use shutdown::Shutdown;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{info, warn};

/// Resolve the provider, bind the HTTP port, then run until `shutdown`.
pub async fn bootstrap(cfg: AppConfig, shutdown: Shutdown) -> Result<()> {
    let provider = init_provider(&cfg).await?;
    let listener = TcpListener::bind(cfg.http.listen())
        .await
        .with_context(|| format!("binding {}", cfg.http.listen()))?;
    run(cfg, provider, listener, shutdown).await
}

/// Launches the HTTP server and the scheduler concurrently.
///
/// Returns once the scheduler has observed `shutdown` and the HTTP server has
/// drained (or `http.shutdown_grace` ran out), or as soon as the HTTP server
/// fails.
pub async fn run(
    cfg: AppConfig,
    provider: Arc<dyn DnsProvider>,
    listener: TcpListener,
    shutdown: Shutdown,
) -> Result<()> {
    info!(
        dns_name = %cfg.target.name,
        zone_id = %cfg.target.zone_id,
        dns_ttl = cfg.target.ttl,
        check_ip_url = %cfg.check.url,
        sleep_period = ?cfg.interval,
        provider = provider.name(),
        "starting update-route53..."
    );

    let metrics = Arc::new(Metrics::default());
    let observer = Arc::new(HttpObserver::new(cfg.check.url.clone(), cfg.check.timeout)?);
    let reconciler = Arc::new(Reconciler::new(
        cfg.target.clone(),
        observer,
        Records::new(provider, metrics.clone()),
        cfg.propagation,
    ));

    // the HTTP server stops on its own trigger, after the loop is done
    let (http_stop, http_shutdown) = shutdown::channel();
    let mut http_handle: JoinHandle<Result<()>> = tokio::spawn(http::run_http_server(
        listener,
        metrics.clone(),
        http_shutdown,
    ));

    let mut server_done = false;
    let res = tokio::select! {
        res = scheduler::run_scheduler(reconciler, cfg.interval, metrics, shutdown) => res,
        res = &mut http_handle => {
            server_done = true;
            match res {
                Ok(Ok(())) => Err(anyhow::anyhow!("server exited unexpectedly")),
                Ok(Err(e)) => Err(e.context("server failed")),
                Err(e) => Err(anyhow::Error::new(e).context("server task failed")),
            }
        }
    };

    http_stop.trigger();
    if !server_done {
        drain_server(http_handle, cfg.http.shutdown_grace).await;
    }
    res
}

/// Wait up to `grace` for a server task that was told to stop, then abort it.
///
/// `handle` must not have been polled to completion yet. A task that already
/// finished is still awaited so its error gets logged.
async fn drain_server(mut handle: JoinHandle<Result<()>>, grace: Duration) {
    match tokio::time::timeout(grace, &mut handle).await {
        Ok(Ok(Err(e))) => warn!("server shutdown error: {e:#}"),
        Ok(Err(e)) if e.is_panic() => warn!("server task panicked: {e}"),
        Ok(_) => {}
        Err(_) => {
            warn!("server did not stop within {grace:?}; aborting");
            handle.abort();
        }
    }
}

/// Run a provider constructor, giving up after `limit`.
#[cfg_attr(not(feature = "ddns-provider-route53"), allow(dead_code))]
async fn load_within<P, F>(limit: Duration, load: F) -> Result<P>
where
    F: Future<Output = P>,
{
    tokio::time::timeout(limit, load)
        .await
        .map_err(|_| anyhow::anyhow!("loading AWS configuration: timed out after {limit:?}"))
}

#[cfg(feature = "ddns-provider-route53")]
async fn init_provider(cfg: &AppConfig) -> Result<Arc<dyn DnsProvider>> {
    let provider = load_within(
        cfg.provider_load_timeout,
        ddns_provider_route53::R53Provider::from_env(),
    )
    .await?;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "ddns-provider-route53"))]
async fn init_provider(_cfg: &AppConfig) -> Result<Arc<dyn DnsProvider>> {
    anyhow::bail!("built without a DNS provider; enable the `ddns-provider-route53` feature")
}

pub use cfg::load_config;
