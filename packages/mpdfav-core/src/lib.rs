//! mpdfav core - listener services for the Music Player Daemon.
//!
//! This crate keeps two stored playlists in an MPD server up to date: one
//! ranked by play count and one ranked by user ratings submitted over MPD's
//! client-to-client messaging. It is used by the `mpdfavd` daemon binary.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`mpd`]: MPD protocol client and the trait seams services depend on
//! - [`services`]: Ratings and play-count listener services and their orchestration
//! - [`events`]: Sticker events and per-handler delivery channels
//! - [`gate`]: One-shot broadcast shutdown gate shared by a service group
//! - [`playlists`]: Handlers regenerating stored playlists from stickers
//! - [`daemon`]: The restart loop and service wiring
//! - [`config`]: Daemon configuration types
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`MpdConnection`](mpd::MpdConnection): Everything a service group needs from MPD
//! - [`MpdConnector`](mpd::MpdConnector): Opening connections
//! - [`MpdService`](services::MpdService): A long-lived listener service
//! - [`SongStickerHandler`](events::SongStickerHandler): Consumer of sticker events

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod daemon;
pub mod error;
pub mod events;
pub mod gate;
pub mod mpd;
pub mod playlists;
pub mod protocol_constants;
pub mod services;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export commonly used types at the crate root
pub use config::{DaemonConfig, MpdSettings, PlaylistServiceConfig};
pub use daemon::{start_all_services, Daemon};
pub use error::{DaemonError, DaemonResult, ErrorCode};
pub use events::{SongSticker, SongStickerHandler, StickerOutputs};
pub use gate::{Gate, GateObserver};
pub use mpd::{MpdClient, MpdConnection, MpdConnector, MpdError, TcpConnector};
pub use playlists::StickerPlaylist;
pub use services::{MpdService, PlayCountsService, RatingsService, ServiceError, ServiceGroup};
