use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::Trigger;

/// Longest single sleep. The monotonic clock stops while the host is
/// suspended, so the wall clock is re-read at least this often.
const RECHECK_INTERVAL: Duration = Duration::from_secs(60);

/// How long to sleep before looking at the wall clock again, or `None` once
/// `at` has been reached.
fn next_sleep(at: DateTime<Utc>, now: DateTime<Utc>) -> Option<Duration> {
    match (at - now).to_std() {
        Ok(remaining) if !remaining.is_zero() => Some(remaining.min(RECHECK_INTERVAL)),
        _ => None,
    }
}

/// One-shot wake timer. Arming replaces any pending wake.
pub trait WakeTimer {
    fn arm(&self, at: DateTime<Utc>);
    fn disarm(&self);
}

/// Timer backed by a tokio task that sends [`Trigger::Wake`] when it fires.
pub struct TokioAlarm {
    tx: mpsc::UnboundedSender<Trigger>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl TokioAlarm {
    pub fn new(tx: mpsc::UnboundedSender<Trigger>) -> Self {
        Self {
            tx,
            pending: Mutex::new(None),
        }
    }

    fn replace(&self, next: Option<JoinHandle<()>>) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = next;
    }
}

impl WakeTimer for TokioAlarm {
    fn arm(&self, at: DateTime<Utc>) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!("Cannot arm wake timer: {}", e);
                return;
            }
        };

        let delay = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let tx = self.tx.clone();
        let task = handle.spawn(async move {
            while let Some(step) = next_sleep(at, Utc::now()) {
                tokio::time::sleep(step).await;
            }
            if tx.send(Trigger::Wake).is_err() {
                tracing::debug!("Wake fired after daemon shut down");
            }
        });

        self.replace(Some(task));
        tracing::debug!("Wake armed for {} (in {}s)", at, delay.as_secs());
    }

    fn disarm(&self) {
        self.replace(None);
        tracing::debug!("Wake disarmed");
    }
}

impl Drop for TokioAlarm {
    fn drop(&mut self) {
        self.replace(None);
    }
}
