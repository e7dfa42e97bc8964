//! Self-rescheduling wake-ups for background polling.
//!
//! While push is enabled exactly one future wake is armed; while it is
//! disabled none is. Every wake cycle ends with [`WakeScheduler::check`],
//! whatever the cycle's outcome, so polling always makes forward progress.

pub mod cadence;
pub mod timer;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::store::Store;

pub use cadence::{next_wake, Clock, SystemClock};
pub use timer::{TokioAlarm, WakeTimer};

/// Events that drive the background process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The armed wake time was reached.
    Wake,
    /// Re-evaluate the push policy and re-arm (boot, explicit request).
    Check,
    Shutdown,
}

pub struct WakeScheduler {
    store: Arc<dyn Store + Send + Sync>,
    timer: Arc<dyn WakeTimer + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl WakeScheduler {
    pub fn new(
        store: Arc<dyn Store + Send + Sync>,
        timer: Arc<dyn WakeTimer + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            store,
            timer,
            clock,
        }
    }

    pub fn compute_next_wake(&self) -> DateTime<Utc> {
        self.clock.next_wake()
    }

    /// Arm or disarm according to the push preference.
    ///
    /// Returns the armed wake time, or `None` when push is disabled. An
    /// unreadable preference is treated as enabled so polling keeps going.
    pub fn check(&self) -> Result<Option<DateTime<Utc>>> {
        let enabled = self.store.push_enabled().unwrap_or_else(|e| {
            tracing::warn!("Could not read push preference, assuming enabled: {}", e);
            true
        });

        if enabled {
            self.arm().map(Some)
        } else {
            self.disarm()?;
            Ok(None)
        }
    }

    /// Persist the push preference and apply it immediately.
    pub fn set_enabled(&self, enabled: bool) -> Result<Option<DateTime<Utc>>> {
        self.store.set_push_enabled(enabled)?;
        tracing::info!(
            "Push notifications {}",
            if enabled { "enabled" } else { "disabled" }
        );
        self.check()
    }

    pub fn arm(&self) -> Result<DateTime<Utc>> {
        let at = self.compute_next_wake();
        self.timer.arm(at);
        self.store.set_next_wake_at(Some(at))?;
        tracing::debug!("Next wake at {}", at);
        Ok(at)
    }

    pub fn disarm(&self) -> Result<()> {
        self.timer.disarm();
        self.store.set_next_wake_at(None)
    }
}
