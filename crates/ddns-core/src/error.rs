use ddns_provider::ProviderError;
use std::{fmt, time::Duration};
use thiserror::Error;

/// Configuration errors; all of them are fatal at start-up.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("validation failed: {0}")]
    Validate(#[from] validator::ValidationErrors),

    #[error("loading configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Where in a reconciliation cycle something happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Observing,
    Reading,
    Writing,
    Tracking,
    ConfirmReading,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Observing => "fetching current address",
            Stage::Reading => "getting current record",
            Stage::Writing => "changing record sets",
            Stage::Tracking => "waiting for change to propagate",
            Stage::ConfirmReading => "confirming updated record",
        })
    }
}

/// Errors raised inside a single reconciliation cycle. None of them escape the
/// scheduler.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("fetching current address: {0}")]
    Network(String),

    #[error("invalid IP address: {0:?}")]
    Parse(String),

    #[error("{stage}: {source}")]
    Provider {
        stage: Stage,
        #[source]
        source: ProviderError,
    },

    #[error("change {change_id} not INSYNC after {waited:?}")]
    Timeout { change_id: String, waited: Duration },

    #[error("shutting down while {stage}")]
    Cancelled { stage: Stage },
}

impl CycleError {
    pub fn provider(stage: Stage, source: ProviderError) -> Self {
        Self::Provider { stage, source }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
