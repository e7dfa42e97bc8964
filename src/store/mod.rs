pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{Feed, Item, ResultSet, WatermarkKind};

pub use sqlite::SqliteStore;

pub trait Store {
    // Watermark operations
    fn get_watermark(&self, feed: Feed, kind: WatermarkKind) -> Result<Option<String>>;
    fn set_watermark(&self, feed: Feed, kind: WatermarkKind, item_id: &str) -> Result<()>;

    // Preference operations
    fn push_enabled(&self) -> Result<bool>;
    fn set_push_enabled(&self, enabled: bool) -> Result<()>;
    fn refresh_on_start(&self) -> Result<bool>;
    fn set_refresh_on_start(&self, enabled: bool) -> Result<()>;
    fn next_wake_at(&self) -> Result<Option<DateTime<Utc>>>;
    fn set_next_wake_at(&self, at: Option<DateTime<Utc>>) -> Result<()>;

    // Item operations
    fn store_items(&self, feed: Feed, items: &[Item]) -> Result<usize>;
    fn query_items(&self, feed: Feed) -> Result<ResultSet>;

    /// Move a watermark forward to `item_id` if it is newer than the stored
    /// one. Returns whether anything was written.
    fn advance_watermark(&self, feed: Feed, kind: WatermarkKind, item_id: &str) -> Result<bool> {
        let newer = match self.get_watermark(feed, kind)? {
            Some(current) => crate::domain::compare_ids(item_id, &current).is_gt(),
            None => true,
        };
        if newer {
            self.set_watermark(feed, kind, item_id)?;
        }
        Ok(newer)
    }
}
