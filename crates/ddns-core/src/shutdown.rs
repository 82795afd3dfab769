//! Shutdown signalling threaded through every suspension point.

use crate::error::{CycleError, Stage};
use std::future::Future;
use tokio::sync::watch;

/// Fires the paired [`Shutdown`] handles. Dropping it fires them too.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Cheap-to-clone observer side of a [`ShutdownTrigger`].
#[derive(Clone, Debug)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once shutdown has been requested.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        // Err means the trigger was dropped
        let _ = rx.wait_for(|fired| *fired).await;
    }

    /// Run `fut` unless shutdown is requested first (or already was).
    pub async fn guard<T, F>(&self, stage: Stage, fut: F) -> Result<T, CycleError>
    where
        F: Future<Output = Result<T, CycleError>>,
    {
        if self.is_triggered() {
            return Err(CycleError::Cancelled { stage });
        }
        tokio::select! {
            biased;
            _ = self.triggered() => Err(CycleError::Cancelled { stage }),
            res = fut => res,
        }
    }
}
