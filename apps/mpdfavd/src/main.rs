//! mpdfavd - keeps "Most Played" and "Best Rated" playlists in MPD.
//!
//! Listens to an MPD server, counts plays and accepts ratings sent on the
//! `ratings` channel, stores both as song stickers and regenerates the
//! matching stored playlists. Runs until interrupted.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mpdfav_core::Daemon;
use tokio::signal;

use crate::config::LoadedConfig;

/// mpdfavd - MPD play count and rating playlists daemon.
#[derive(Parser, Debug)]
#[command(name = "mpdfavd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML). Defaults to ~/.mpdfav.yaml.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "MPDFAV_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// MPD host (overrides config file and MPDFAV_MPD_HOST).
    #[arg(long)]
    host: Option<String>,

    /// MPD port (overrides config file and MPDFAV_MPD_PORT).
    #[arg(short = 'p', long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("mpdfavd v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match config::load(args.config.as_deref())
        .context("Failed to load configuration")?
    {
        LoadedConfig::Loaded(config) => config,
        LoadedConfig::GeneratedDefault(path) => {
            log::warn!(
                "Wrote default configuration to {}. Edit it and start mpdfavd again.",
                path.display()
            );
            return Ok(());
        }
    };

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.mpd.host = host;
    }
    if let Some(port) = args.port {
        config.mpd.port = port;
    }

    config.validate().context("Invalid configuration")?;

    log::info!(
        "Configuration: mpd={}, password={}, playcounts={}, ratings={}",
        config.mpd.address(),
        if config.mpd.credentials().is_some() { "set" } else { "none" },
        describe(&config.playcounts),
        describe(&config.ratings)
    );

    let daemon = Daemon::with_tcp(config);

    tokio::select! {
        result = daemon.run() => match result {
            Ok(never) => match never {},
            Err(e) => return Err(e).context("Daemon stopped"),
        },
        _ = shutdown_signal() => log::info!("Shutdown signal received"),
    }

    log::info!("Shutdown complete");
    Ok(())
}

fn describe(service: &mpdfav_core::PlaylistServiceConfig) -> String {
    if service.enabled {
        format!("{:?} (top {})", service.playlist, service.limit)
    } else {
        "off".to_string()
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
