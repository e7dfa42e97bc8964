//! Background process that owns the wake timer.
//!
//! Wakes, external check requests (`SIGUSR1`) and shutdown signals are all
//! funneled into one trigger channel and handled in order.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::app::{AppContext, MurmurError, Result};
use crate::notify::LogAlertSink;
use crate::push::PushService;
use crate::scheduler::{SystemClock, TokioAlarm, Trigger, WakeScheduler};

pub struct Daemon {
    service: PushService,
    tx: mpsc::UnboundedSender<Trigger>,
    rx: mpsc::UnboundedReceiver<Trigger>,
}

impl Daemon {
    pub fn new(ctx: &AppContext) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let cycle = Arc::new(ctx.push_cycle(Arc::new(LogAlertSink)));
        let scheduler = WakeScheduler::new(
            ctx.store(),
            Arc::new(TokioAlarm::new(tx.clone())),
            Arc::new(SystemClock),
        );

        Self {
            service: PushService::new(cycle, scheduler),
            tx,
            rx,
        }
    }

    /// Sender for feeding triggers from outside the daemon loop.
    pub fn trigger_sender(&self) -> mpsc::UnboundedSender<Trigger> {
        self.tx.clone()
    }

    /// Get the PID file path
    pub fn pid_file_path() -> Option<PathBuf> {
        dirs::runtime_dir()
            .or_else(dirs::cache_dir)
            .map(|d| d.join("murmur").join("daemon.pid"))
    }

    /// PID of the running daemon, if there is one.
    pub fn running_pid() -> Option<u32> {
        let pid_path = Self::pid_file_path()?;
        let pid = fs::read_to_string(pid_path).ok()?.trim().parse::<u32>().ok()?;
        Self::process_exists(pid).then_some(pid)
    }

    #[cfg(unix)]
    fn process_exists(pid: u32) -> bool {
        use std::process::Command;
        Command::new("kill")
            .args(["-0", &pid.to_string()])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    fn process_exists(_pid: u32) -> bool {
        false
    }

    fn write_pid_file(&self) -> std::io::Result<()> {
        if let Some(pid_path) = Self::pid_file_path() {
            if let Some(parent) = pid_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(&pid_path)?;
            writeln!(file, "{}", std::process::id())?;
        }
        Ok(())
    }

    fn remove_pid_file(&self) {
        if let Some(pid_path) = Self::pid_file_path() {
            let _ = fs::remove_file(pid_path);
        }
    }

    /// Run until a shutdown signal arrives.
    pub async fn run(mut self) -> Result<()> {
        if let Some(pid) = Self::running_pid() {
            return Err(MurmurError::Other(format!(
                "Another daemon instance is already running (PID {})",
                pid
            )));
        }

        self.write_pid_file()
            .map_err(|e| MurmurError::Other(format!("Failed to write PID file: {}", e)))?;

        spawn_signal_listener(self.tx.clone());
        tracing::info!("murmur daemon started (PID {})", std::process::id());

        // Starting up counts as an external check
        self.service.on_check();

        self.event_loop().await;

        self.service.shutdown();
        self.remove_pid_file();
        tracing::info!("murmur daemon stopped");
        Ok(())
    }

    async fn event_loop(&mut self) {
        while let Some(trigger) = self.rx.recv().await {
            match trigger {
                Trigger::Wake => {
                    tracing::debug!("Wake");
                    self.service.on_wake().await;
                }
                Trigger::Check => {
                    tracing::debug!("External check");
                    self.service.on_check();
                }
                Trigger::Shutdown => break,
            }
        }
    }
}

#[cfg(unix)]
fn spawn_signal_listener(tx: mpsc::UnboundedSender<Trigger>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let (mut sigterm, mut sigint, mut sigusr1) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
            signal(SignalKind::user_defined1()),
        ) {
            (Ok(term), Ok(int), Ok(usr1)) => (term, int, usr1),
            _ => {
                tracing::error!("Failed to install signal handlers");
                let _ = tx.send(Trigger::Shutdown);
                return;
            }
        };

        loop {
            let trigger = tokio::select! {
                _ = sigterm.recv() => Trigger::Shutdown,
                _ = sigint.recv() => Trigger::Shutdown,
                _ = sigusr1.recv() => Trigger::Check,
            };
            if tx.send(trigger).is_err() || trigger == Trigger::Shutdown {
                break;
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_signal_listener(tx: mpsc::UnboundedSender<Trigger>) {
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = tx.send(Trigger::Shutdown);
    });
}

/// Ask the running daemon to re-evaluate the push policy.
pub fn signal_check() -> Result<u32> {
    let pid = Daemon::running_pid()
        .ok_or_else(|| MurmurError::Other("No daemon is running".to_string()))?;

    #[cfg(unix)]
    {
        use std::process::Command;
        let status = Command::new("kill")
            .args(["-USR1", &pid.to_string()])
            .status()?;
        if status.success() {
            Ok(pid)
        } else {
            Err(MurmurError::Other(format!(
                "Failed to signal daemon (PID {})",
                pid
            )))
        }
    }

    #[cfg(not(unix))]
    {
        Err(MurmurError::Other(format!(
            "Signaling the daemon (PID {}) is not supported on this platform",
            pid
        )))
    }
}

/// Stop the running daemon.
pub fn stop_daemon() -> Result<u32> {
    let pid = Daemon::running_pid()
        .ok_or_else(|| MurmurError::Other("No daemon is running".to_string()))?;

    #[cfg(unix)]
    {
        use std::process::Command;
        let status = Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .status()?;
        if status.success() {
            Ok(pid)
        } else {
            Err(MurmurError::Other(format!(
                "Failed to stop daemon (PID {})",
                pid
            )))
        }
    }

    #[cfg(not(unix))]
    {
        Err(MurmurError::Other(format!(
            "Stopping the daemon (PID {}) is not supported on this platform",
            pid
        )))
    }
}

pub fn daemon_status() -> String {
    match Daemon::running_pid() {
        Some(pid) => format!("Daemon is running (PID: {})", pid),
        None => "Daemon is not running".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::Store;

    fn context(dir: &tempfile::TempDir) -> AppContext {
        AppContext::new(Config::default(), Some(dir.path().join("murmur.db"))).unwrap()
    }

    #[tokio::test]
    async fn test_check_trigger_arms_wake() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        let mut daemon = Daemon::new(&ctx);
        let tx = daemon.trigger_sender();

        tx.send(Trigger::Check).unwrap();
        tx.send(Trigger::Shutdown).unwrap();
        daemon.event_loop().await;

        assert!(ctx.store.next_wake_at().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_check_trigger_with_push_disabled_clears_wake() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        let mut daemon = Daemon::new(&ctx);
        let tx = daemon.trigger_sender();

        tx.send(Trigger::Check).unwrap();
        tx.send(Trigger::Shutdown).unwrap();
        daemon.event_loop().await;
        assert!(ctx.store.next_wake_at().unwrap().is_some());

        ctx.store.set_push_enabled(false).unwrap();
        tx.send(Trigger::Check).unwrap();
        tx.send(Trigger::Shutdown).unwrap();
        daemon.event_loop().await;

        assert_eq!(ctx.store.next_wake_at().unwrap(), None);
    }

    #[test]
    fn test_pid_file_lives_under_murmur_dir() {
        if let Some(path) = Daemon::pid_file_path() {
            assert!(path.ends_with("murmur/daemon.pid"));
        }
    }
}
