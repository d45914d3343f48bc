//! Sticker-change events and their delivery.
//!
//! This module provides:
//! - [`SongSticker`], the domain event emitted by services
//! - [`SongStickerHandler`], the trait downstream consumers implement
//! - [`StickerOutputs`], the per-handler delivery channels of one service

mod handler;
mod outputs;

pub use handler::SongStickerHandler;
pub use outputs::{StickerOutputs, StickerReceiver};

/// One committed change of a song's named sticker.
///
/// Emitted by a service after the sticker write succeeded and delivered to
/// every handler wired to that service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongSticker {
    /// File path of the song, as used by MPD.
    pub song_file: String,
    /// Sticker name (`rating`, `playcount`).
    pub sticker_name: String,
    /// New sticker value.
    pub value: String,
}

impl SongSticker {
    pub fn new(
        song_file: impl Into<String>,
        sticker_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            song_file: song_file.into(),
            sticker_name: sticker_name.into(),
            value: value.into(),
        }
    }
}
