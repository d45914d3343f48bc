//! Daemon loop and service wiring.
//!
//! This module is the composition root: the single place where the MPD
//! connection, the services and their playlist handlers are created and
//! wired together for one service group.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DaemonConfig, PlaylistServiceConfig};
use crate::error::{DaemonError, DaemonResult, ErrorCode};
use crate::events::SongStickerHandler;
use crate::mpd::{MpdConnection, MpdConnector, TcpConnector};
use crate::playlists::StickerPlaylist;
use crate::protocol_constants::{DAEMON_RESTART_DELAY_MS, PLAYCOUNT_STICKER, RATING_STICKER};
use crate::services::{PlayCountsService, RatingsService, ServiceGroup};

/// The mpdfav daemon: restarts the service group whenever it stops.
pub struct Daemon {
    config: DaemonConfig,
    connector: Arc<dyn MpdConnector>,
}

impl Daemon {
    pub fn new(config: DaemonConfig, connector: Arc<dyn MpdConnector>) -> Self {
        Self { config, connector }
    }

    /// Creates a daemon connecting over TCP.
    pub fn with_tcp(config: DaemonConfig) -> Self {
        Self::new(config, Arc::new(TcpConnector))
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// Runs service groups until one cannot be started.
    ///
    /// A group stopping because a service failed is not an error; the next
    /// group starts after a short pause. Only connection and configuration
    /// errors end the loop.
    pub async fn run(&self) -> DaemonResult<Infallible> {
        loop {
            start_all_services(&self.config, self.connector.as_ref()).await?;
            log::warn!(
                "[Daemon] Service group stopped, restarting in {}ms",
                DAEMON_RESTART_DELAY_MS
            );
            tokio::time::sleep(Duration::from_millis(DAEMON_RESTART_DELAY_MS)).await;
        }
    }
}

/// Runs one service group to completion.
///
/// Connects, starts every enabled service with its playlist handler, waits
/// until the group has stopped and closes the connection.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the connection
/// cannot be established.
pub async fn start_all_services(
    config: &DaemonConfig,
    connector: &dyn MpdConnector,
) -> DaemonResult<()> {
    config.validate()?;

    let mpd = connector.connect(&config.mpd).await.map_err(|e| {
        log::error!(
            "[Daemon] Cannot connect to MPD at {}: {} ({})",
            config.mpd.address(),
            e,
            e.code()
        );
        DaemonError::Connect(e)
    })?;
    log::info!("[Daemon] Connected to MPD at {}", config.mpd.address());

    let group = ServiceGroup::new(Arc::clone(&mpd));
    if config.playcounts.enabled {
        group.start_service(
            Arc::new(PlayCountsService),
            vec![playlist_handler(&mpd, PLAYCOUNT_STICKER, &config.playcounts)],
        );
    }
    if config.ratings.enabled {
        group.start_service(
            Arc::new(RatingsService),
            vec![playlist_handler(&mpd, RATING_STICKER, &config.ratings)],
        );
    }

    group.join().await;

    if let Err(e) = mpd.close().await {
        log::warn!("[Daemon] Failed to close MPD connection: {}", e);
    }
    Ok(())
}

fn playlist_handler(
    mpd: &Arc<dyn MpdConnection>,
    sticker: &str,
    config: &PlaylistServiceConfig,
) -> Arc<dyn SongStickerHandler> {
    Arc::new(StickerPlaylist::new(
        Arc::clone(mpd),
        sticker,
        config.playlist.clone(),
        config.limit,
    ))
}
