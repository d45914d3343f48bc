//! Trait abstractions for MPD operations.
//!
//! These traits enable dependency injection for testability and modularity.
//! Services and handlers depend on traits rather than on `MpdClient`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::protocol::MpdResult;
use super::types::{ChannelMessage, PlayerStatus, Song, StickerEntry, Subsystem};
use crate::config::MpdSettings;

/// Client-to-client messaging.
///
/// Used by the ratings service to receive submissions.
#[async_trait]
pub trait MpdMessaging: Send + Sync {
    /// Subscribes this client to a channel.
    async fn subscribe(&self, channel: &str) -> MpdResult<()>;

    /// Reads and removes all pending messages on subscribed channels.
    async fn read_messages(&self) -> MpdResult<Vec<ChannelMessage>>;
}

/// Player state queries.
#[async_trait]
pub trait MpdPlayback: Send + Sync {
    /// Queries the player status.
    async fn status(&self) -> MpdResult<PlayerStatus>;

    /// Queries the current song; `None` when nothing is queued or playing.
    async fn current_song(&self) -> MpdResult<Option<Song>>;
}

/// Song sticker storage.
#[async_trait]
pub trait MpdStickers: Send + Sync {
    /// Reads a song sticker; `None` when the sticker is not set.
    async fn sticker_get(&self, file: &str, name: &str) -> MpdResult<Option<String>>;

    /// Sets a song sticker.
    async fn sticker_set(&self, file: &str, name: &str, value: &str) -> MpdResult<()>;

    /// Lists every song in the database carrying the named sticker.
    async fn sticker_find(&self, name: &str) -> MpdResult<Vec<StickerEntry>>;
}

/// Stored playlist editing.
#[async_trait]
pub trait MpdPlaylists: Send + Sync {
    /// Removes every song from a stored playlist.
    ///
    /// Fails with an ACK "no such object" when the playlist does not exist.
    async fn playlist_clear(&self, playlist: &str) -> MpdResult<()>;

    /// Appends a song to a stored playlist, creating it if needed.
    async fn playlist_add(&self, playlist: &str, file: &str) -> MpdResult<()>;
}

/// Idle notifications and connection teardown.
#[async_trait]
pub trait MpdIdle: Send + Sync {
    /// Starts waiting for changes of the given subsystems.
    ///
    /// The returned subscription yields every changed subsystem until it is
    /// dropped or the underlying connection fails.
    async fn idle(&self, subsystems: &[Subsystem]) -> MpdResult<IdleSubscription>;

    /// Closes the connection. Further calls fail.
    async fn close(&self) -> MpdResult<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Combined Traits (for trait objects)
// ─────────────────────────────────────────────────────────────────────────────

/// Combined trait for everything a service group needs from its connection.
pub trait MpdConnection: MpdMessaging + MpdPlayback + MpdStickers + MpdPlaylists + MpdIdle {}

/// Blanket implementation for any type implementing all traits.
impl<T: MpdMessaging + MpdPlayback + MpdStickers + MpdPlaylists + MpdIdle> MpdConnection for T {}

/// Opens connections for the daemon loop.
#[async_trait]
pub trait MpdConnector: Send + Sync {
    /// Connects, authenticating when the settings carry a password.
    async fn connect(&self, settings: &MpdSettings) -> MpdResult<Arc<dyn MpdConnection>>;
}

/// Stream of changed subsystems from one idle wait loop.
///
/// Dropping the subscription stops the wait loop behind it.
#[derive(Debug)]
pub struct IdleSubscription {
    rx: mpsc::Receiver<Subsystem>,
}

impl IdleSubscription {
    /// Wraps the receiving end of a subsystem channel.
    pub fn new(rx: mpsc::Receiver<Subsystem>) -> Self {
        Self { rx }
    }

    /// Waits for the next changed subsystem.
    ///
    /// Returns `None` once the wait loop has stopped.
    pub async fn next(&mut self) -> Option<Subsystem> {
        self.rx.recv().await
    }
}
