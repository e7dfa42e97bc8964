use std::fs::OpenOptions;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use murmur::app::AppContext;
use murmur::cli::{commands, Cli, Commands, DaemonAction, WatermarkAction};
use murmur::config::Config;

fn init_tracing(log_file: Option<&std::path::Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("murmur=info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(filter)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Daemon {
            action: DaemonAction::Start { log },
        } => log.clone(),
        _ => None,
    };
    init_tracing(log_file.as_deref())?;

    // Commands that only talk to the daemon process
    match &cli.command {
        Commands::Daemon {
            action: DaemonAction::Stop,
        } => return Ok(commands::stop_daemon()?),
        Commands::Daemon {
            action: DaemonAction::Status,
        } => {
            println!("{}", murmur::daemon::daemon_status());
            return Ok(());
        }
        Commands::Check => return Ok(commands::check()?),
        _ => {}
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config, cli.db.clone())?;

    match cli.command {
        Commands::Daemon { .. } => commands::run_daemon(&ctx).await?,
        Commands::Poll => commands::poll_once(&ctx).await?,
        Commands::Push { state } => commands::set_push(&ctx, state.enabled())?,
        Commands::RefreshOnStart { state } => {
            commands::set_refresh_on_start(&ctx, state.enabled())?
        }
        Commands::Watermark { action } => match action {
            WatermarkAction::Show => commands::show_watermarks(&ctx)?,
            WatermarkAction::Set { feed, id } => commands::set_watermark(&ctx, feed, &id)?,
        },
        Commands::Status => commands::status(&ctx)?,
        Commands::Show { feed, more } => commands::show_feed(&ctx, feed, more).await?,
        Commands::Check => {}
    }

    Ok(())
}
