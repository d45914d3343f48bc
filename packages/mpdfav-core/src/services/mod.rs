//! Listener services and their orchestration.
//!
//! A service is one long-lived dispatch loop reacting to MPD notifications
//! and publishing [`SongSticker`](crate::events::SongSticker) events. The
//! [`ServiceGroup`] runs several services on one shared connection and
//! stops all of them as soon as one exits.

pub mod idle_listener;
pub mod orchestrator;
pub mod playcounts;
pub mod ratings;

pub use orchestrator::ServiceGroup;
pub use playcounts::PlayCountsService;
pub use ratings::RatingsService;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::events::StickerOutputs;
use crate::gate::GateObserver;
use crate::mpd::{MpdConnection, MpdError};
use ratings::RatingError;

/// Errors that stop a service.
///
/// Any of these ends the service's dispatch loop; the orchestrator then
/// shuts down the rest of the group.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Subscribing to a client-to-client channel failed.
    #[error("Failed to subscribe to channel {channel:?}: {source}")]
    Subscribe {
        channel: String,
        #[source]
        source: MpdError,
    },

    /// Querying the player status failed.
    #[error("Failed to query status: {0}")]
    Status(#[source] MpdError),

    /// Querying the current song failed.
    #[error("Failed to query current song: {0}")]
    CurrentSong(#[source] MpdError),

    /// Reading pending channel messages failed.
    #[error("Failed to read messages: {0}")]
    ReadMessages(#[source] MpdError),

    /// Reading or writing a sticker failed.
    #[error("Sticker operation failed: {0}")]
    Sticker(#[source] MpdError),

    /// Starting the idle wait failed.
    #[error("Failed to start idle wait: {0}")]
    Idle(#[source] MpdError),

    /// The idle connection stopped delivering notifications.
    #[error("Idle connection closed")]
    IdleClosed,

    /// Submitting a rating failed.
    #[error(transparent)]
    Rating(#[from] RatingError),
}

/// Convenient Result alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// A long-lived listener service.
///
/// `run` returns only when the service stops: `Ok` when it observed the
/// shutdown gate, `Err` on a fatal failure. Either way the orchestrator
/// closes `outputs` and opens the gate afterwards.
#[async_trait]
pub trait MpdService: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Runs the service's dispatch loop.
    async fn run(
        &self,
        mpd: Arc<dyn MpdConnection>,
        outputs: &StickerOutputs,
        shutdown: GateObserver,
    ) -> ServiceResult<()>;
}
