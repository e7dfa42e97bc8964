//! One background sync cycle: connectivity gate, poll each feed, notify.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::connectivity::Connectivity;
use crate::domain::Feed;
use crate::notify::Notifier;
use crate::poller::FeedPoller;
use crate::scheduler::WakeScheduler;

/// Outcome of a single cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub offline: bool,
    /// Feeds that produced a new newest item.
    pub updated: Vec<Feed>,
    pub alerts: usize,
}

pub struct PushCycle {
    connectivity: Arc<dyn Connectivity + Send + Sync>,
    poller: FeedPoller,
    notifier: Notifier,
}

impl PushCycle {
    pub fn new(
        connectivity: Arc<dyn Connectivity + Send + Sync>,
        poller: FeedPoller,
        notifier: Notifier,
    ) -> Self {
        Self {
            connectivity,
            poller,
            notifier,
        }
    }

    /// Poll both feeds in turn. Failures stay within the feed they hit.
    pub async fn run(&self) -> CycleReport {
        let mut report = CycleReport::default();

        if !self.connectivity.is_connected().await {
            tracing::info!("Offline, skipping poll cycle");
            report.offline = true;
            return report;
        }

        for feed in Feed::ALL {
            let Some(newest) = self.poller.poll(feed).await else {
                continue;
            };
            report.updated.push(feed);

            match self.notifier.maybe_notify(feed, &newest) {
                Ok(true) => report.alerts += 1,
                Ok(false) => {}
                Err(e) => tracing::error!("Notification for {} failed: {}", feed, e),
            }
        }

        tracing::info!(
            "Poll cycle complete: {} feeds updated, {} alerts",
            report.updated.len(),
            report.alerts
        );
        report
    }
}

/// Wake handling for the background process.
pub struct PushService {
    cycle: Arc<PushCycle>,
    scheduler: WakeScheduler,
}

impl PushService {
    pub fn new(cycle: Arc<PushCycle>, scheduler: WakeScheduler) -> Self {
        Self { cycle, scheduler }
    }

    /// Run a cycle, then re-arm whatever happened during it.
    ///
    /// The cycle runs on its own task so a panic inside it cannot skip the
    /// re-arm.
    pub async fn on_wake(&self) -> Option<DateTime<Utc>> {
        let cycle = self.cycle.clone();
        if let Err(e) = tokio::spawn(async move { cycle.run().await }).await {
            tracing::error!("Poll cycle aborted: {}", e);
        }
        self.on_check()
    }

    /// Apply the push policy: arm the next wake or disarm.
    pub fn on_check(&self) -> Option<DateTime<Utc>> {
        match self.scheduler.check() {
            Ok(next) => {
                match next {
                    Some(at) => tracing::info!("Next poll at {}", at),
                    None => tracing::info!("Push disabled, no poll scheduled"),
                }
                next
            }
            Err(e) => {
                tracing::error!("Failed to reschedule: {}", e);
                None
            }
        }
    }

    pub fn shutdown(&self) {
        if let Err(e) = self.scheduler.disarm() {
            tracing::warn!("Failed to clear wake state: {}", e);
        }
    }
}
