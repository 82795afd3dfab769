//! Health and metrics endpoints – axum 0.8

use crate::{metrics::Metrics, shutdown::Shutdown};
use axum::{
    Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

pub fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(prometheus))
        .with_state(metrics)
}

/// Serve until `shutdown` fires, then drain in-flight requests.
pub async fn run_http_server(
    listener: TcpListener,
    metrics: Arc<Metrics>,
    shutdown: Shutdown,
) -> anyhow::Result<()> {
    info!("health/metrics listening at http://{}", listener.local_addr()?);

    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(async move { shutdown.triggered().await })
        .await?;
    Ok(())
}

/*──────── handlers ────────*/
async fn healthz() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "200 OK")
}

async fn prometheus(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, PROMETHEUS_TEXT)], metrics.render())
}
