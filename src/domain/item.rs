use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Feed;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Server-assigned id, also the ordering key.
    pub id: String,
    pub feed: Feed,
    pub author: Option<String>,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
}

impl Item {
    pub fn new(feed: Feed, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            feed,
            author: None,
            text: String::new(),
            created_at: None,
            fetched_at: Utc::now(),
        }
    }

    pub fn is_newer_than(&self, id: &str) -> bool {
        compare_ids(&self.id, id) == Ordering::Greater
    }

    pub fn display_author(&self) -> &str {
        self.author.as_deref().unwrap_or("(unknown)")
    }
}

/// Order two server ids.
///
/// Numeric ids compare as integers; anything else falls back to length, then
/// byte order, which matches how fixed-alphabet ids grow on the server.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
    }
}

/// Read-only, newest-first sequence of stored items.
///
/// Iterating does not consume the set, so a view can walk it as many times
/// as it needs to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    items: Vec<Item>,
}

impl ResultSet {
    /// Build a result set, sorting newest first.
    pub fn new(mut items: Vec<Item>) -> Self {
        items.sort_by(|a, b| compare_ids(&b.id, &a.id));
        Self { items }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn newest(&self) -> Option<&Item> {
        self.items.first()
    }

    pub fn oldest(&self) -> Option<&Item> {
        self.items.last()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
