//! Background feed poller.
//!
//! Fetches items newer than the stored polling watermark. A feed that has
//! never been seeded with a watermark is skipped, so a fresh install does not
//! produce a burst of alerts for old items.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::app::Result;
use crate::domain::{Feed, Item, WatermarkKind};
use crate::store::Store;

pub const DEFAULT_PAGE_SIZE: usize = 20;

pub struct FeedPoller {
    api: Arc<dyn ApiClient + Send + Sync>,
    store: Arc<dyn Store + Send + Sync>,
    page_size: usize,
}

impl FeedPoller {
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

    /// Poll one feed, logging and swallowing any failure.
    ///
    /// Returns the newest fetched item when there was something new.
    pub async fn poll(&self, feed: Feed) -> Option<Item> {
        match self.try_poll(feed).await {
            Ok(newest) => newest,
            Err(e) if e.is_retryable() => {
                tracing::warn!("Polling {} failed: {}", feed, e);
                None
            }
            Err(e) => {
                tracing::error!("Polling {} failed: {}", feed, e);
                None
            }
        }
    }

    /// Poll one feed, returning errors to the caller.
    pub async fn try_poll(&self, feed: Feed) -> Result<Option<Item>> {
        let Some(since_id) = self.store.get_watermark(feed, WatermarkKind::Poll)? else {
            tracing::debug!("No poll watermark for {}, skipping", feed);
            return Ok(None);
        };

        tracing::debug!("Polling {} since_id={}", feed, since_id);
        let items = self
            .api
            .fetch_newer(feed, Some(&since_id), self.page_size)
            .await?;

        let Some(newest) = items.iter().find(|i| i.is_newer_than(&since_id)).cloned() else {
            tracing::debug!("No new items for {}", feed);
            return Ok(None);
        };

        let stored = self.store.store_items(feed, &items)?;
        self.store
            .advance_watermark(feed, WatermarkKind::Poll, &newest.id)?;
        tracing::info!(
            "{}: {} new items ({} stored), newest id {}",
            feed,
            items.len(),
            stored,
            newest.id
        );

        Ok(Some(newest))
    }
}
