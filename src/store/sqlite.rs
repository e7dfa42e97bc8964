use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use rusqlite_migration::{Migrations, M};

use crate::app::{MurmurError, Result};
use crate::domain::{Feed, Item, ResultSet, WatermarkKind};
use crate::store::Store;

// Other processes (daemon, `show`) may hold the write lock briefly
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const UPSERT_WATERMARK: &str =
    "INSERT INTO watermarks (feed, kind, item_id, updated_at) VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(feed, kind) DO UPDATE SET item_id = excluded.item_id,
                                           updated_at = excluded.updated_at";

const KEY_PUSH_ENABLED: &str = "push_enabled";
const KEY_REFRESH_ON_START: &str = "refresh_on_start";
const KEY_NEXT_WAKE_AT: &str = "next_wake_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| MurmurError::Storage(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            MurmurError::Storage(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn get_pref(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_pref(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO preferences (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete_pref(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM preferences WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn get_bool_pref(&self, key: &str, default: bool) -> Result<bool> {
        Ok(self
            .get_pref(key)?
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(default))
    }

    fn set_bool_pref(&self, key: &str, value: bool) -> Result<()> {
        self.set_pref(key, if value { "1" } else { "0" })
    }
}

impl Store for SqliteStore {
    fn get_watermark(&self, feed: Feed, kind: WatermarkKind) -> Result<Option<String>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                "SELECT item_id FROM watermarks WHERE feed = ?1 AND kind = ?2",
                params![feed.as_str(), kind.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(result)
    }

    fn set_watermark(&self, feed: Feed, kind: WatermarkKind, item_id: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            UPSERT_WATERMARK,
            params![
                feed.as_str(),
                kind.as_str(),
                item_id,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Compare and write under one `BEGIN IMMEDIATE` so that writers in
    /// other processes cannot interleave between the read and the write.
    fn advance_watermark(&self, feed: Feed, kind: WatermarkKind, item_id: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<String> = tx
            .query_row(
                "SELECT item_id FROM watermarks WHERE feed = ?1 AND kind = ?2",
                params![feed.as_str(), kind.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let newer = match current {
            Some(current) => crate::domain::compare_ids(item_id, &current).is_gt(),
            None => true,
        };

        if newer {
            tx.execute(
                UPSERT_WATERMARK,
                params![
                    feed.as_str(),
                    kind.as_str(),
                    item_id,
                    Utc::now().to_rfc3339()
                ],
            )?;
        }
        tx.commit()?;
        Ok(newer)
    }

    fn push_enabled(&self) -> Result<bool> {
        self.get_bool_pref(KEY_PUSH_ENABLED, true)
    }

    fn set_push_enabled(&self, enabled: bool) -> Result<()> {
        self.set_bool_pref(KEY_PUSH_ENABLED, enabled)
    }

    fn refresh_on_start(&self) -> Result<bool> {
        self.get_bool_pref(KEY_REFRESH_ON_START, false)
    }

    fn set_refresh_on_start(&self, enabled: bool) -> Result<()> {
        self.set_bool_pref(KEY_REFRESH_ON_START, enabled)
    }

    fn next_wake_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .get_pref(KEY_NEXT_WAKE_AT)?
            .and_then(|s| Self::parse_datetime(&s)))
    }

    fn set_next_wake_at(&self, at: Option<DateTime<Utc>>) -> Result<()> {
        match at {
            Some(at) => self.set_pref(KEY_NEXT_WAKE_AT, &at.to_rfc3339()),
            None => self.delete_pref(KEY_NEXT_WAKE_AT),
        }
    }

    fn store_items(&self, feed: Feed, items: &[Item]) -> Result<usize> {
        let mut conn = self.lock()?;

        let tx = conn.transaction()?;
        let mut count = 0;

        for item in items {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO items (feed, id, author, text, created_at, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    feed.as_str(),
                    item.id,
                    item.author,
                    item.text,
                    item.created_at.map(|dt| dt.to_rfc3339()),
                    item.fetched_at.to_rfc3339()
                ],
            )?;
            count += inserted;
        }

        tx.commit()?;
        Ok(count)
    }

    fn query_items(&self, feed: Feed) -> Result<ResultSet> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, author, text, created_at, fetched_at FROM items WHERE feed = ?1",
        )?;

        let items = stmt
            .query_map(params![feed.as_str()], |row| {
                Ok(Item {
                    id: row.get(0)?,
                    feed,
                    author: row.get(1)?,
                    text: row.get(2)?,
                    created_at: row
                        .get::<_, Option<String>>(3)?
                        .and_then(|s| Self::parse_datetime(&s)),
                    fetched_at: row
                        .get::<_, String>(4)
                        .ok()
                        .and_then(|s| Self::parse_datetime(&s))
                        .unwrap_or_else(Utc::now),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ResultSet::new(items))
    }
}
