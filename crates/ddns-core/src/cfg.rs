//! Parse `update-route53.toml` plus environment into `AppConfig`

use crate::error::ConfigError;
use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, File};
use reqwest::Url;
use serde::Deserialize;
use std::{
    env,
    net::{Ipv4Addr, SocketAddr},
    path::Path,
    time::Duration,
};
use validator::Validate;

pub const DEFAULT_CHECK_IP_URL: &str = "http://checkip.amazonaws.com/";

/// Environment names understood for compatibility with existing deployments.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("DNS_NAME", "dns.name"),
    ("HOSTED_ZONE_ID", "dns.zone_id"),
    ("DNS_TTL", "dns.ttl"),
    ("CHECK_IP", "check.url"),
    ("SLEEP_PERIOD", "scheduler.interval"),
];

const SECTIONS: &[&str] = &["dns", "check", "scheduler", "propagation", "http", "provider"];

/*──────── raw sections (as deserialized) ────────*/
#[derive(Debug, Deserialize, Validate)]
struct DnsSection {
    #[serde(default)]
    #[validate(length(min = 1, message = "missing DNS_NAME / dns.name"))]
    name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "missing HOSTED_ZONE_ID / dns.zone_id"))]
    zone_id: String,
    #[validate(range(min = 0, message = "TTL must be non-negative"))]
    ttl: i64,
}

#[derive(Debug, Deserialize)]
struct CheckSection {
    url: String,
    timeout: String,
}

#[derive(Debug, Deserialize)]
struct SchedulerSection {
    interval: String,
}

#[derive(Debug, Deserialize)]
struct PropagationSection {
    poll_interval: String,
    max_wait: String,
}

#[derive(Debug, Deserialize, Validate)]
struct HttpSection {
    #[validate(range(min = 1, message = "invalid port number"))]
    port: u16,
    shutdown_grace: String,
}

#[derive(Debug, Deserialize)]
struct ProviderSection {
    load_timeout: String,
}

#[derive(Debug, Deserialize)]
struct Root {
    dns: DnsSection,
    check: CheckSection,
    scheduler: SchedulerSection,
    propagation: PropagationSection,
    http: HttpSection,
    provider: ProviderSection,
}

/*──────── typed config ────────*/

/// The one record this process keeps in sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Unqualified hostname, no trailing dot.
    pub name: String,
    pub zone_id: String,
    pub ttl: i64,
}

#[derive(Debug, Clone)]
pub struct CheckCfg {
    pub url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationCfg {
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl Default for PropagationCfg {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpCfg {
    pub port: u16,
    pub shutdown_grace: Duration,
}

impl HttpCfg {
    pub fn listen(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub target: Target,
    pub check: CheckCfg,
    pub interval: Duration,
    pub propagation: PropagationCfg,
    pub http: HttpCfg,
    /// Bound on credential / region resolution at start-up.
    pub provider_load_timeout: Duration,
}

/// Parse a duration such as `5m`, `1h30m`, `1.5s` or `250ms`.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Err("empty duration".into());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut secs = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (num, tail) = rest.split_at(num_end);
        let value: f64 = num
            .parse()
            .map_err(|_| format!("invalid duration {raw:?}"))?;

        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_end);
        let scale = match unit {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "" => return Err(format!("missing unit in duration {raw:?}")),
            other => return Err(format!("unknown unit {other:?} in duration {raw:?}")),
        };
        secs += value * scale;
        rest = next;
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration {raw:?}: {e}"))
}

fn positive(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match parse_duration(raw) {
        Ok(d) if !d.is_zero() => Ok(d),
        Ok(_) => Err(ConfigError::Invalid {
            key,
            reason: "must be a positive duration".into(),
        }),
        Err(reason) => Err(ConfigError::Invalid { key, reason }),
    }
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        key: "check.url",
        reason: format!("{raw:?}: {e}"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Invalid {
            key: "check.url",
            reason: format!("unsupported scheme `{other}`"),
        }),
    }
}

fn with_defaults(
    b: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(b.set_default("dns.ttl", 300_i64)?
        .set_default("check.url", DEFAULT_CHECK_IP_URL)?
        .set_default("check.timeout", "10s")?
        .set_default("scheduler.interval", "5m")?
        .set_default("propagation.poll_interval", "10s")?
        .set_default("propagation.max_wait", "5m")?
        .set_default("http.port", 8080_i64)?
        .set_default("http.shutdown_grace", "5s")?
        .set_default("provider.load_timeout", "30s")?)
}

/// Inject environment variables into a `ConfigBuilder`.
///
/// * `DDNS_<SECTION>_<KEY>` → `<section>.<key>` (split at the first `_`
///   after the section, so `DDNS_DNS_ZONE_ID` → `dns.zone_id`)
/// * legacy names from [`LEGACY_ENV`] win over prefixed ones
/// * empty values count as unset
fn add_env<I>(
    mut b: ConfigBuilder<DefaultState>,
    vars: I,
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut prefixed = Vec::new();
    let mut legacy = Vec::new();

    for (k, v) in vars {
        if v.is_empty() {
            continue;
        }
        if let Some((_, path)) = LEGACY_ENV.iter().find(|(name, _)| *name == k) {
            legacy.push((path.to_string(), v));
            continue;
        }
        let Some(rest) = k.strip_prefix("DDNS_") else {
            continue;
        };
        let rest = rest.to_ascii_lowercase();
        if let Some((section, key)) = rest.split_once('_') {
            if SECTIONS.contains(&section) && !key.is_empty() {
                prefixed.push((format!("{section}.{key}"), v));
            }
        }
    }

    for (path, v) in prefixed.into_iter().chain(legacy) {
        b = b.set_override(path, v)?;
    }
    Ok(b)
}

/// Load configuration from an optional TOML file **and** the process
/// environment. `port` is the CLI override for `http.port`.
///
/// Priority (high → low):
/// 1. `port` argument
/// 2. Legacy env names (`DNS_NAME`, `HOSTED_ZONE_ID`, …)
/// 3. Prefixed env scalars (`DDNS_HTTP_PORT`, …)
/// 4. Values in the TOML file (if it exists)
/// 5. Built-in defaults
pub fn load_config(path: &str, port: Option<u16>) -> Result<AppConfig, ConfigError> {
    load_config_from(path, env::vars(), port)
}

/// [`load_config`] with an explicit environment.
pub fn load_config_from<I>(
    path: &str,
    vars: I,
    port: Option<u16>,
) -> Result<AppConfig, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    // 1) defaults, then the optional file
    let mut builder = with_defaults(Config::builder())?;
    if Path::new(path).exists() {
        builder = builder.add_source(File::with_name(path).required(true));
    } else {
        tracing::info!("config file `{path}` not found; environment-only mode");
    }

    // 2) env overrides, then the CLI
    builder = add_env(builder, vars)?;
    if let Some(p) = port {
        builder = builder.set_override("http.port", i64::from(p))?;
    }

    // 3) deserialize and validate
    let root: Root = builder.build()?.try_deserialize()?;
    root.dns.validate()?;
    root.http.validate()?;

    // 4) lift into typed AppConfig
    let name = root.dns.name.trim().trim_end_matches('.').to_owned();
    if name.is_empty() {
        return Err(ConfigError::Invalid {
            key: "dns.name",
            reason: format!("{:?} is not a hostname", root.dns.name),
        });
    }

    let zone_id = root.dns.zone_id.trim().to_owned();
    if zone_id.is_empty() {
        return Err(ConfigError::Invalid {
            key: "dns.zone_id",
            reason: format!("{:?} is not a hosted zone id", root.dns.zone_id),
        });
    }

    Ok(AppConfig {
        target: Target {
            name,
            zone_id,
            ttl: root.dns.ttl,
        },
        check: CheckCfg {
            url: parse_url(&root.check.url)?,
            timeout: positive("check.timeout", &root.check.timeout)?,
        },
        interval: positive("scheduler.interval", &root.scheduler.interval)?,
        propagation: PropagationCfg {
            poll_interval: positive("propagation.poll_interval", &root.propagation.poll_interval)?,
            max_wait: positive("propagation.max_wait", &root.propagation.max_wait)?,
        },
        http: HttpCfg {
            port: root.http.port,
            shutdown_grace: positive("http.shutdown_grace", &root.http.shutdown_grace)?,
        },
        provider_load_timeout: positive("provider.load_timeout", &root.provider.load_timeout)?,
    })
}
