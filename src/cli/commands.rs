use std::sync::Arc;

use crate::app::{AppContext, Result};
use crate::cli::view::ConsoleView;
use crate::daemon::{self, Daemon};
use crate::domain::{Feed, WatermarkKind};
use crate::notify::LogAlertSink;
use crate::refresh::{RefreshCoordinator, StartOutcome};
use crate::store::Store;

const SHOW_LIMIT: usize = 40;

pub async fn run_daemon(ctx: &AppContext) -> Result<()> {
    Daemon::new(ctx).run().await
}

pub fn stop_daemon() -> Result<()> {
    let pid = daemon::stop_daemon()?;
    println!("Stopped daemon (PID {})", pid);
    Ok(())
}

pub fn check() -> Result<()> {
    let pid = daemon::signal_check()?;
    println!("Asked daemon (PID {}) to re-check", pid);
    Ok(())
}

pub async fn poll_once(ctx: &AppContext) -> Result<()> {
    let report = ctx.push_cycle(Arc::new(LogAlertSink)).run().await;

    if report.offline {
        println!("Offline, nothing polled");
        return Ok(());
    }

    for feed in Feed::ALL {
        let watermark = ctx.store.get_watermark(feed, WatermarkKind::Poll)?;
        match (watermark, report.updated.contains(&feed)) {
            (None, _) => println!("{}: no watermark, skipped", feed.display_name()),
            (Some(id), true) => println!("{}: new items up to {}", feed.display_name(), id),
            (Some(_), false) => println!("{}: nothing new", feed.display_name()),
        }
    }
    println!("{} alerts", report.alerts);
    Ok(())
}

pub fn set_push(ctx: &AppContext, enabled: bool) -> Result<()> {
    ctx.store.set_push_enabled(enabled)?;
    println!(
        "Push notifications {}",
        if enabled { "enabled" } else { "disabled" }
    );

    // The daemon owns the timer; let it apply the change now
    if Daemon::running_pid().is_some() {
        daemon::signal_check()?;
    }
    Ok(())
}

pub fn set_refresh_on_start(ctx: &AppContext, enabled: bool) -> Result<()> {
    ctx.store.set_refresh_on_start(enabled)?;
    println!(
        "Refresh on start {}",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

pub fn show_watermarks(ctx: &AppContext) -> Result<()> {
    for feed in Feed::ALL {
        for kind in [WatermarkKind::Poll, WatermarkKind::Notify] {
            let value = ctx.store.get_watermark(feed, kind)?;
            println!(
                "{:<16} {:<7} {}",
                feed.display_name(),
                kind,
                value.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

pub fn set_watermark(ctx: &AppContext, feed: Feed, id: &str) -> Result<()> {
    ctx.store.set_watermark(feed, WatermarkKind::Poll, id)?;
    println!("{} will be polled from {}", feed.display_name(), id);
    Ok(())
}

pub fn status(ctx: &AppContext) -> Result<()> {
    println!("{}", daemon::daemon_status());
    println!(
        "Push notifications: {}",
        if ctx.store.push_enabled()? { "on" } else { "off" }
    );
    match ctx.store.next_wake_at()? {
        Some(at) => println!(
            "Next poll: {}",
            at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
        ),
        None => println!("Next poll: not scheduled"),
    }
    Ok(())
}

pub async fn show_feed(ctx: &AppContext, feed: Feed, more: bool) -> Result<()> {
    let coordinator = RefreshCoordinator::spawn(
        feed,
        ctx.connectivity.clone(),
        ctx.store(),
        Arc::new(ctx.refresh_source()),
        Arc::new(ConsoleView { limit: SHOW_LIMIT }),
    );

    match coordinator.activate().await? {
        Some(StartOutcome::Offline) => println!("Offline, showing stored items"),
        Some(_) => coordinator.wait_idle().await,
        None => {}
    }

    if more {
        match coordinator.pull_up().await {
            StartOutcome::Started => coordinator.wait_idle().await,
            StartOutcome::Offline => println!("Offline, cannot load more"),
            StartOutcome::Busy => {}
        }
    }

    coordinator.deactivate();
    Ok(())
}
