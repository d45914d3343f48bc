//! MPD protocol client.
//!
//! # Module Structure
//!
//! - `types` - Domain types for status, songs, messages and stickers
//! - `traits` - Trait abstractions for testability
//! - `protocol` - Command encoding and response line parsing
//! - `connection` - A single socket: greeting, authentication, request/response
//! - `client` - `MpdClient` concrete trait implementation

pub mod client;
pub mod connection;
pub mod protocol;
pub mod traits;
pub mod types;

// Re-export error types
pub use protocol::{Ack, MpdError, MpdResult};

// Re-export trait abstractions
pub use traits::{
    IdleSubscription, MpdConnection, MpdConnector, MpdIdle, MpdMessaging, MpdPlayback,
    MpdPlaylists, MpdStickers,
};

// Re-export domain types
pub use types::{ChannelMessage, PlaybackState, PlayerStatus, Song, StickerEntry, Subsystem};

// Re-export concrete implementation
pub use client::{MpdClient, TcpConnector};
