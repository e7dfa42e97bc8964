use std::sync::Arc;

use crate::api::ApiClient;
use crate::app::{MurmurError, Result};
use crate::domain::{Feed, WatermarkKind};
use crate::refresh::{Completion, CompletionSender, FetchMode, RefreshSource};
use crate::store::Store;

/// Fetches through the API client and stores the results.
///
/// A refresh also moves the feed's poll watermark forward, so background
/// polling picks up from the newest item the user has already seen.
pub struct ApiRefreshSource {
    api: Arc<dyn ApiClient + Send + Sync>,
    store: Arc<dyn Store + Send + Sync>,
    page_size: usize,
}

impl ApiRefreshSource {
    pub fn new(
        api: Arc<dyn ApiClient + Send + Sync>,
        store: Arc<dyn Store + Send + Sync>,
        page_size: usize,
    ) -> Self {
        Self {
            api,
            store,
            page_size,
        }
    }

    async fn fetch(
        api: &Arc<dyn ApiClient + Send + Sync>,
        store: &Arc<dyn Store + Send + Sync>,
        feed: Feed,
        mode: FetchMode,
        page_size: usize,
    ) -> Result<usize> {
        let shown = store.query_items(feed)?;

        let items = match mode {
            FetchMode::Refresh => {
                let since_id = shown.newest().map(|i| i.id.as_str());
                api.fetch_newer(feed, since_id, page_size).await?
            }
            FetchMode::LoadMore => {
                let max_id = shown.oldest().map(|i| i.id.as_str());
                api.fetch_older(feed, max_id, page_size).await?
            }
        };

        let stored = store.store_items(feed, &items)?;
        if mode == FetchMode::Refresh {
            if let Some(newest) = items.first() {
                store.advance_watermark(feed, WatermarkKind::Poll, &newest.id)?;
            }
        }

        tracing::info!("{}: {:?} fetched {} items ({} new)", feed, mode, items.len(), stored);
        Ok(stored)
    }
}

impl RefreshSource for ApiRefreshSource {
    fn start_fetch(&self, feed: Feed, mode: FetchMode, done: CompletionSender) {
        let api = self.api.clone();
        let store = self.store.clone();
        let page_size = self.page_size;

        tokio::spawn(async move {
            let task =
                tokio::spawn(async move { Self::fetch(&api, &store, feed, mode, page_size).await });

            let completion = match task.await {
                Ok(Ok(count)) => Completion::Success { mode, count },
                Ok(Err(e)) => Completion::Error(e),
                Err(e) => Completion::Error(MurmurError::Other(format!("Fetch aborted: {}", e))),
            };

            if done.send(completion).is_err() {
                tracing::debug!("{}: surface closed before fetch completed", feed);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::testing::{items, ApiCall, Direction, FakeApi};
    use tokio::sync::mpsc;

    async fn run(
        api: &Arc<FakeApi>,
        store: &Arc<SqliteStore>,
        feed: Feed,
        mode: FetchMode,
    ) -> Completion {
        let source = ApiRefreshSource::new(api.clone(), store.clone(), 20);
        let (tx, mut rx) = mpsc::unbounded_channel();
        source.start_fetch(feed, mode, tx);
        rx.recv().await.unwrap()
    }

    #[tokio::test]
    async fn test_refresh_on_empty_store_fetches_latest_page() {
        let api = Arc::new(FakeApi::new());
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        api.push_newer(Feed::Timeline, Ok(items(Feed::Timeline, &["12", "11"])));

        let completion = run(&api, &store, Feed::Timeline, FetchMode::Refresh).await;

        assert!(matches!(
            completion,
            Completion::Success {
                mode: FetchMode::Refresh,
                count: 2
            }
        ));
        assert_eq!(
            api.calls(),
            vec![ApiCall {
                feed: Feed::Timeline,
                direction: Direction::Newer,
                cursor: None,
                page_size: 20,
            }]
        );
        // Seeds background polling
        assert_eq!(
            store.get_watermark(Feed::Timeline, WatermarkKind::Poll).unwrap(),
            Some("12".into())
        );
    }

    #[tokio::test]
    async fn test_refresh_uses_newest_stored_id() {
        let api = Arc::new(FakeApi::new());
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store
            .store_items(Feed::DirectMessages, &items(Feed::DirectMessages, &["30", "20"]))
            .unwrap();

        run(&api, &store, Feed::DirectMessages, FetchMode::Refresh).await;

        assert_eq!(api.calls()[0].cursor.as_deref(), Some("30"));
    }

    #[tokio::test]
    async fn test_load_more_uses_oldest_stored_id() {
        let api = Arc::new(FakeApi::new());
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store
            .store_items(Feed::Timeline, &items(Feed::Timeline, &["30", "20"]))
            .unwrap();
        store
            .set_watermark(Feed::Timeline, WatermarkKind::Poll, "30")
            .unwrap();
        api.push_older(Feed::Timeline, Ok(items(Feed::Timeline, &["19", "18"])));

        let completion = run(&api, &store, Feed::Timeline, FetchMode::LoadMore).await;

        assert!(matches!(completion, Completion::Success { count: 2, .. }));
        let call = &api.calls()[0];
        assert_eq!(call.direction, Direction::Older);
        assert_eq!(call.cursor.as_deref(), Some("20"));
        assert_eq!(store.query_items(Feed::Timeline).unwrap().len(), 4);
        // Older pages never touch the poll watermark
        assert_eq!(
            store.get_watermark(Feed::Timeline, WatermarkKind::Poll).unwrap(),
            Some("30".into())
        );
    }

    #[tokio::test]
    async fn test_api_error_becomes_error_completion() {
        let api = Arc::new(FakeApi::new());
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        api.push_newer(Feed::Timeline, Err(MurmurError::AuthExpired));

        let completion = run(&api, &store, Feed::Timeline, FetchMode::Refresh).await;

        assert!(matches!(completion, Completion::Error(MurmurError::AuthExpired)));
    }

    #[tokio::test]
    async fn test_panicking_fetch_still_completes() {
        let api = Arc::new(FakeApi::new());
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        api.panic_next_fetch();

        let completion = run(&api, &store, Feed::Timeline, FetchMode::Refresh).await;

        assert!(matches!(completion, Completion::Error(MurmurError::Other(_))));
    }
}
