pub mod commands;
pub mod view;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::Feed;

#[derive(Parser)]
#[command(name = "murmur")]
#[command(about = "Background sync and notifications for your social feeds", long_about = None)]
pub struct Cli {
    /// Database path (default: data dir/murmur/murmur.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file path (default: ~/.config/murmur/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Background daemon that polls feeds and raises alerts
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
    /// Ask the running daemon to re-check the push setting and re-arm
    Check,
    /// Run one poll cycle now
    Poll,
    /// Turn push notifications on or off
    Push { state: Toggle },
    /// Refresh lists automatically when they are opened
    RefreshOnStart { state: Toggle },
    /// Inspect or seed watermarks
    Watermark {
        #[command(subcommand)]
        action: WatermarkAction,
    },
    /// Show daemon state, push setting and next wake time
    Status,
    /// Open a feed, refreshing it if needed
    Show {
        /// Feed to show: timeline or dm
        feed: Feed,

        /// Also load the next older page
        #[arg(long)]
        more: bool,
    },
}

#[derive(Subcommand)]
pub enum DaemonAction {
    /// Run the daemon in the foreground
    Start {
        /// Log file path (default: stderr)
        #[arg(short, long)]
        log: Option<PathBuf>,
    },
    /// Stop the running daemon
    Stop,
    /// Check daemon status
    Status,
}

#[derive(Subcommand)]
pub enum WatermarkAction {
    /// Print all watermarks
    Show,
    /// Set a feed's poll watermark
    Set {
        feed: Feed,
        /// Item id to poll from
        id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_show_with_more() {
        let cli = Cli::try_parse_from(["murmur", "show", "dm", "--more"]).unwrap();
        match cli.command {
            Commands::Show { feed, more } => {
                assert_eq!(feed, Feed::DirectMessages);
                assert!(more);
            }
            _ => panic!("expected show"),
        }
    }

    #[test]
    fn test_parse_push_toggle() {
        let cli = Cli::try_parse_from(["murmur", "push", "off"]).unwrap();
        assert!(matches!(cli.command, Commands::Push { state: Toggle::Off }));
    }

    #[test]
    fn test_parse_watermark_set() {
        let cli =
            Cli::try_parse_from(["murmur", "--db", "/tmp/m.db", "watermark", "set", "timeline", "100"])
                .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/m.db")));
        match cli.command {
            Commands::Watermark {
                action: WatermarkAction::Set { feed, id },
            } => {
                assert_eq!(feed, Feed::Timeline);
                assert_eq!(id, "100");
            }
            _ => panic!("expected watermark set"),
        }
    }

    #[test]
    fn test_unknown_feed_is_rejected() {
        assert!(Cli::try_parse_from(["murmur", "show", "mentions"]).is_err());
    }
}
