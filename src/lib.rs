//! # murmur
//!
//! Background synchronization and notifications for a social feed client.
//!
//! ## Architecture
//!
//! ```text
//! WakeScheduler → Connectivity → FeedPoller → Notifier → WakeScheduler (re-arm)
//! ```
//!
//! The poller runs on a timer for two feeds, the home timeline and direct
//! messages. Each feed keeps two independent watermarks: the newest item
//! polled and the newest item an alert was raised for. Independently, a
//! [`RefreshCoordinator`](refresh::RefreshCoordinator) drives pull-to-refresh
//! and load-more for a list surface with at most one fetch in flight.
//!
//! ## Quick Start
//!
//! ```bash
//! # Seed the timeline watermark (polling never backfills)
//! murmur watermark set timeline 100
//!
//! # Run the background poller
//! murmur daemon start
//!
//! # Open a feed
//! murmur show dm
//! ```

/// Application context and error handling.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration file loading.
pub mod config;

/// Core domain models.
///
/// - [`Feed`](domain::Feed): the two synced feeds
/// - [`Item`](domain::Item): a fetched status or message
/// - [`ResultSet`](domain::ResultSet): stored items, newest first
/// - [`WatermarkKind`](domain::WatermarkKind): poll vs. notify cursor
pub mod domain;

/// Remote API client.
pub mod api;

/// Network reachability checks.
pub mod connectivity;

/// Background daemon owning the wake timer.
pub mod daemon;

/// Alert dedup and dispatch.
pub mod notify;

/// Watermark-based feed polling.
pub mod poller;

/// The wake cycle tying polling, alerts and re-arming together.
pub mod push;

/// Single-flight refresh for list surfaces.
pub mod refresh;

/// Wake-time policy and timers.
pub mod scheduler;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
