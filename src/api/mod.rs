pub mod http_client;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::{Feed, Item};

pub use http_client::HttpApiClient;

/// Remote feed API.
///
/// Both calls return items newest-first. Timeouts are the client's concern
/// and surface as ordinary transport errors.
#[async_trait]
pub trait ApiClient {
    /// Items strictly newer than `since_id`, or the latest page when `None`.
    async fn fetch_newer(
        &self,
        feed: Feed,
        since_id: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<Item>>;

    /// Items strictly older than `max_id`, or the latest page when `None`.
    async fn fetch_older(
        &self,
        feed: Feed,
        max_id: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<Item>>;
}
