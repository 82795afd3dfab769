//! Process-wide counters shared between the scheduler and `/metrics`.

use std::{
    fmt::Write,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

pub const DURATION_TOTAL: &str = "update_route53_duration_total";
pub const UPDATES_TOTAL: &str = "update_route53_updates_total";

/// Two monotonic counters; reset only by restarting the process.
#[derive(Debug, Default)]
pub struct Metrics {
    /// `f64` seconds stored as raw bits
    duration_bits: AtomicU64,
    updates: AtomicU64,
}

impl Metrics {
    pub fn add_duration(&self, d: Duration) {
        let secs = d.as_secs_f64();
        // the closure always returns Some, so this cannot fail
        let _ = self
            .duration_bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + secs).to_bits())
            });
    }

    pub fn inc_updates(&self) {
        self.updates.fetch_add(1, Ordering::AcqRel);
    }

    pub fn duration_seconds(&self) -> f64 {
        f64::from_bits(self.duration_bits.load(Ordering::Acquire))
    }

    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Acquire)
    }

    /// Prometheus text exposition format 0.0.4.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(320);
        let _ = writeln!(out, "# HELP {DURATION_TOTAL} Duration for updating Route53");
        let _ = writeln!(out, "# TYPE {DURATION_TOTAL} counter");
        let _ = writeln!(out, "{DURATION_TOTAL} {}", self.duration_seconds());
        let _ = writeln!(
            out,
            "# HELP {UPDATES_TOTAL} Total number of Route53 record updates performed"
        );
        let _ = writeln!(out, "# TYPE {UPDATES_TOTAL} counter");
        let _ = writeln!(out, "{UPDATES_TOTAL} {}", self.updates());
        out
    }
}
