//! Notification dedup and dispatch.
//!
//! An alert is emitted at most once per newest item per feed: the id is
//! checked against the feed's notification watermark, which is written before
//! the alert goes out.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::app::Result;
use crate::domain::{Feed, Item, WatermarkKind};
use crate::store::Store;

/// A user-visible alert for the newest item of a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub feed: Feed,
    pub item: Item,
}

impl Alert {
    pub fn title(&self) -> String {
        match self.feed {
            Feed::Timeline => format!("New status from {}", self.item.display_author()),
            Feed::DirectMessages => format!("New message from {}", self.item.display_author()),
        }
    }
}

/// Presentation side that renders alerts.
pub trait AlertSink {
    fn deliver(&self, alert: Alert);
}

/// Writes alerts to the log.
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn deliver(&self, alert: Alert) {
        tracing::info!("{}: {}", alert.title(), alert.item.text);
    }
}

/// Forwards alerts to a channel, for a renderer running as its own task.
pub struct ChannelAlertSink {
    tx: mpsc::UnboundedSender<Alert>,
}

impl ChannelAlertSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Alert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AlertSink for ChannelAlertSink {
    fn deliver(&self, alert: Alert) {
        if let Err(e) = self.tx.send(alert) {
            tracing::warn!("Alert receiver dropped: {}", e.0.title());
        }
    }
}

pub struct Notifier {
    store: Arc<dyn Store + Send + Sync>,
    sink: Arc<dyn AlertSink + Send + Sync>,
}

impl Notifier {
    pub fn new(store: Arc<dyn Store + Send + Sync>, sink: Arc<dyn AlertSink + Send + Sync>) -> Self {
        Self { store, sink }
    }

    /// Emit an alert for `newest` unless one was already emitted for it.
    ///
    /// Returns whether an alert went out.
    pub fn maybe_notify(&self, feed: Feed, newest: &Item) -> Result<bool> {
        let last = self.store.get_watermark(feed, WatermarkKind::Notify)?;
        if last.as_deref() == Some(newest.id.as_str()) {
            tracing::debug!("{}: already notified for {}", feed, newest.id);
            return Ok(false);
        }

        self.store
            .set_watermark(feed, WatermarkKind::Notify, &newest.id)?;
        self.sink.deliver(Alert {
            feed,
            item: newest.clone(),
        });
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn notifier() -> (Notifier, Arc<SqliteStore>, mpsc::UnboundedReceiver<Alert>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let (sink, rx) = ChannelAlertSink::channel();
        (Notifier::new(store.clone(), Arc::new(sink)), store, rx)
    }

    #[test]
    fn test_first_item_is_notified() {
        let (notifier, store, mut rx) = notifier();
        let item = Item::new(Feed::Timeline, "105");

        assert!(notifier.maybe_notify(Feed::Timeline, &item).unwrap());

        let alert = rx.try_recv().unwrap();
        assert_eq!(alert.feed, Feed::Timeline);
        assert_eq!(alert.item.id, "105");
        assert_eq!(
            store.get_watermark(Feed::Timeline, WatermarkKind::Notify).unwrap(),
            Some("105".into())
        );
    }

    #[test]
    fn test_repeated_id_is_suppressed() {
        let (notifier, store, mut rx) = notifier();
        store
            .set_watermark(Feed::Timeline, WatermarkKind::Notify, "105")
            .unwrap();
        let item = Item::new(Feed::Timeline, "105");

        for _ in 0..5 {
            assert!(!notifier.maybe_notify(Feed::Timeline, &item).unwrap());
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_at_most_one_alert_per_id() {
        let (notifier, _store, mut rx) = notifier();
        let item = Item::new(Feed::DirectMessages, "7");

        let sent: usize = (0..10)
            .map(|_| notifier.maybe_notify(Feed::DirectMessages, &item).unwrap() as usize)
            .sum();

        assert_eq!(sent, 1);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_feeds_keep_separate_notify_watermarks() {
        let (notifier, store, mut rx) = notifier();

        notifier
            .maybe_notify(Feed::Timeline, &Item::new(Feed::Timeline, "50"))
            .unwrap();
        // Same id on the other feed is a different item
        assert!(notifier
            .maybe_notify(Feed::DirectMessages, &Item::new(Feed::DirectMessages, "50"))
            .unwrap());
        notifier
            .maybe_notify(Feed::DirectMessages, &Item::new(Feed::DirectMessages, "60"))
            .unwrap();

        assert_eq!(
            store.get_watermark(Feed::Timeline, WatermarkKind::Notify).unwrap(),
            Some("50".into())
        );
        assert_eq!(
            store
                .get_watermark(Feed::DirectMessages, WatermarkKind::Notify)
                .unwrap(),
            Some("60".into())
        );
        assert_eq!(
            store.get_watermark(Feed::Timeline, WatermarkKind::Poll).unwrap(),
            None
        );
        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn test_alert_title_names_author() {
        let mut item = Item::new(Feed::DirectMessages, "1");
        item.author = Some("dave".into());
        let alert = Alert {
            feed: Feed::DirectMessages,
            item,
        };
        assert_eq!(alert.title(), "New message from dave");
    }
}
