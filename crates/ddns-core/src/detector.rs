//! Public-IP observer
//!
//! * HTTP – GET a plain-text echo endpoint, body must be a bare IPv4 literal  
//! * No retries here; the next scheduled cycle is the retry

use crate::error::CycleError;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::{net::Ipv4Addr, time::Duration};
use tokio::time::timeout;
use tracing::debug;

/// Anything that can tell us our current external IPv4 address.
#[async_trait]
pub trait AddressSource: Send + Sync {
    async fn observe(&self) -> Result<Ipv4Addr, CycleError>;
}

/// Trim and validate a dotted-quad payload.
pub fn parse_ipv4(body: &str) -> Result<Ipv4Addr, CycleError> {
    let raw = body.trim();
    raw.parse::<Ipv4Addr>()
        .map_err(|_| CycleError::Parse(raw.to_owned()))
}

/*──────── HTTP observer ────────*/
pub struct HttpObserver {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl HttpObserver {
    pub fn new(url: Url, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("update-route53/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url,
            timeout,
        })
    }
}

#[async_trait]
impl AddressSource for HttpObserver {
    async fn observe(&self) -> Result<Ipv4Addr, CycleError> {
        let fut = async {
            self.client
                .get(self.url.clone())
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
        };
        let body = match timeout(self.timeout, fut).await {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => return Err(CycleError::Network(e.to_string())),
            Err(_) => {
                return Err(CycleError::Network(format!(
                    "{} did not answer within {:?}",
                    self.url, self.timeout
                )));
            }
        };
        let ip = parse_ipv4(&body)?;
        debug!("detect/http {} -> {ip}", self.url);
        Ok(ip)
    }
}
