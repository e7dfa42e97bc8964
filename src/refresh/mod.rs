//! Refresh coordination for a list surface.
//!
//! A [`RefreshCoordinator`] is created when a surface becomes active and
//! dropped when it is torn down. It allows at most one fetch in flight:
//! pulling down (newer items) and pulling up (older items) share the same
//! guard, and a request made while a fetch is running is dropped rather than
//! queued. Fetch results arrive later as [`Completion`] messages.

pub mod source;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{mpsc, Notify};

use crate::app::MurmurError;
use crate::connectivity::Connectivity;
use crate::domain::{Feed, ResultSet, ScrollSnapshot};
use crate::store::Store;

pub use source::ApiRefreshSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Fetch items newer than the newest one shown.
    Refresh,
    /// Fetch the page older than the oldest one shown.
    LoadMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A fetch is already in flight; the request was dropped.
    Busy,
    /// No network; the pull indicator was cleared.
    Offline,
}

/// Result of a fetch, delivered asynchronously.
#[derive(Debug)]
pub enum Completion {
    Success { mode: FetchMode, count: usize },
    Error(MurmurError),
}

pub type CompletionSender = mpsc::UnboundedSender<Completion>;

/// Collaborator that performs the actual fetch.
///
/// Implementations must return right away and send exactly one
/// [`Completion`] on `done` when the fetch finishes.
pub trait RefreshSource {
    fn start_fetch(&self, feed: Feed, mode: FetchMode, done: CompletionSender);
}

/// UI callbacks for a list surface.
pub trait SurfaceView {
    fn show_progress(&self);
    fn hide_progress(&self);
    /// Clear the pull-to-refresh indicator.
    fn refresh_complete(&self);
    fn show_items(&self, items: &ResultSet);
    fn show_error(&self, message: &str);
    /// The session expired; start the sign-in flow.
    fn reauthenticate(&self);
}

pub struct RefreshCoordinator {
    feed: Feed,
    busy: AtomicBool,
    data_loaded: AtomicBool,
    pending_restore: Mutex<Option<ScrollSnapshot>>,
    idle: Notify,
    completions: CompletionSender,
    connectivity: Arc<dyn Connectivity + Send + Sync>,
    store: Arc<dyn Store + Send + Sync>,
    source: Arc<dyn RefreshSource + Send + Sync>,
    view: Arc<dyn SurfaceView + Send + Sync>,
}

impl RefreshCoordinator {
    /// Create a coordinator and spawn the task that routes completions to it.
    ///
    /// The routing task holds only a weak reference and ends once the
    /// coordinator is dropped.
    pub fn spawn(
        feed: Feed,
        connectivity: Arc<dyn Connectivity + Send + Sync>,
        store: Arc<dyn Store + Send + Sync>,
        source: Arc<dyn RefreshSource + Send + Sync>,
        view: Arc<dyn SurfaceView + Send + Sync>,
    ) -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let coordinator = Arc::new(Self::with_sender(
            feed,
            tx,
            connectivity,
            store,
            source,
            view,
        ));

        let weak: Weak<Self> = Arc::downgrade(&coordinator);
        tokio::spawn(async move {
            while let Some(completion) = rx.recv().await {
                match weak.upgrade() {
                    Some(coordinator) => coordinator.on_completion(completion),
                    None => break,
                }
            }
        });

        coordinator
    }

    fn with_sender(
        feed: Feed,
        completions: CompletionSender,
        connectivity: Arc<dyn Connectivity + Send + Sync>,
        store: Arc<dyn Store + Send + Sync>,
        source: Arc<dyn RefreshSource + Send + Sync>,
        view: Arc<dyn SurfaceView + Send + Sync>,
    ) -> Self {
        Self {
            feed,
            busy: AtomicBool::new(false),
            data_loaded: AtomicBool::new(false),
            pending_restore: Mutex::new(None),
            idle: Notify::new(),
            completions,
            connectivity,
            store,
            source,
            view,
        }
    }

    pub fn feed(&self) -> Feed {
        self.feed
    }

    pub fn state(&self) -> RefreshState {
        if self.busy.load(Ordering::Acquire) {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    pub fn data_loaded(&self) -> bool {
        self.data_loaded.load(Ordering::Acquire)
    }

    /// Refresh from the top.
    pub async fn pull_down(&self) -> StartOutcome {
        self.start_refresh(FetchMode::Refresh).await
    }

    /// Load the next older page.
    pub async fn pull_up(&self) -> StartOutcome {
        self.start_refresh(FetchMode::LoadMore).await
    }

    pub async fn start_refresh(&self, mode: FetchMode) -> StartOutcome {
        if !self.connectivity.is_connected().await {
            tracing::debug!("{}: offline, refresh suppressed", self.feed);
            self.view.refresh_complete();
            return StartOutcome::Offline;
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("{}: refresh already in flight, {:?} dropped", self.feed, mode);
            return StartOutcome::Busy;
        }

        tracing::debug!("{}: starting {:?}", self.feed, mode);
        // The completion may be routed before start_fetch returns
        self.view.show_progress();
        self.source
            .start_fetch(self.feed, mode, self.completions.clone());
        StartOutcome::Started
    }

    /// Handle the end of a fetch. Always leaves the coordinator idle.
    pub fn on_completion(&self, completion: Completion) {
        self.data_loaded.store(true, Ordering::Release);

        match completion {
            Completion::Success { mode, count } => {
                tracing::debug!("{}: {:?} finished, {} new items", self.feed, mode, count);
                match self.store.query_items(self.feed) {
                    Ok(items) => self.view.show_items(&items),
                    Err(e) => {
                        tracing::error!("{}: reloading items failed: {}", self.feed, e);
                        self.view.show_error(&user_message(&e));
                    }
                }
            }
            Completion::Error(e) => {
                tracing::warn!("{}: refresh failed: {}", self.feed, e);
                self.view.show_error(&user_message(&e));
                if e.is_auth_expired() {
                    self.view.reauthenticate();
                }
            }
        }

        self.busy.store(false, Ordering::Release);
        self.view.hide_progress();
        self.view.refresh_complete();
        self.idle.notify_waiters();
    }

    /// Called when the backing data loader delivers a result set.
    ///
    /// Shows the items, then refreshes automatically once per activation if
    /// the preference asks for it or there is nothing to show.
    pub async fn on_load_finished(&self, items: ResultSet) -> Option<StartOutcome> {
        self.view.show_items(&items);
        self.check_refresh(items.is_empty()).await
    }

    /// Load stored items for this surface and apply the auto-refresh policy.
    pub async fn activate(&self) -> crate::app::Result<Option<StartOutcome>> {
        let items = self.store.query_items(self.feed)?;
        Ok(self.on_load_finished(items).await)
    }

    async fn check_refresh(&self, empty: bool) -> Option<StartOutcome> {
        let refresh_on_start = self.store.refresh_on_start().unwrap_or_else(|e| {
            tracing::warn!("Could not read refresh preference: {}", e);
            false
        });
        tracing::debug!(
            "{}: check_refresh data_loaded={} refresh_on_start={} empty={}",
            self.feed,
            self.data_loaded(),
            refresh_on_start,
            empty
        );

        if !self.data_loaded() && (refresh_on_start || empty) {
            Some(self.start_refresh(FetchMode::Refresh).await)
        } else {
            None
        }
    }

    /// Wait until no fetch is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if !self.busy.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }

    pub fn save_position(&self, snapshot: ScrollSnapshot) {
        *self.pending_restore.lock().unwrap_or_else(|e| e.into_inner()) = Some(snapshot);
    }

    /// Take the saved position, if any. Yields it once.
    pub fn take_pending_restore(&self) -> Option<ScrollSnapshot> {
        self.pending_restore
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// Tear down the surface's session state.
    pub fn deactivate(&self) {
        self.data_loaded.store(false, Ordering::Release);
        self.take_pending_restore();
    }
}

fn user_message(e: &MurmurError) -> String {
    match e {
        MurmurError::Storage(_) => "Could not load items".to_string(),
        other => other.to_string(),
    }
}
