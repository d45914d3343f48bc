//! Stored playlists generated from song stickers.
//!
//! A [`StickerPlaylist`] rebuilds one stored playlist whenever its sticker
//! changes on any song: the songs with the highest sticker values, best
//! first.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;

use crate::events::{SongSticker, SongStickerHandler};
use crate::mpd::{MpdConnection, MpdResult, StickerEntry};

/// Handler maintaining a "top N by sticker" stored playlist.
pub struct StickerPlaylist {
    mpd: Arc<dyn MpdConnection>,
    sticker: String,
    playlist: String,
    limit: usize,
}

impl StickerPlaylist {
    pub fn new(
        mpd: Arc<dyn MpdConnection>,
        sticker: impl Into<String>,
        playlist: impl Into<String>,
        limit: usize,
    ) -> Self {
        Self {
            mpd,
            sticker: sticker.into(),
            playlist: playlist.into(),
            limit,
        }
    }

    /// Replaces the playlist with the current ranking.
    pub async fn regenerate(&self) -> MpdResult<usize> {
        let entries = self.mpd.sticker_find(&self.sticker).await?;
        let files = rank_entries(entries, self.limit);

        match self.mpd.playlist_clear(&self.playlist).await {
            Ok(()) => {}
            Err(e) if e.is_no_exist() => {
                log::debug!("[Playlists] Creating playlist {:?}", self.playlist);
            }
            Err(e) => return Err(e),
        }
        for file in &files {
            self.mpd.playlist_add(&self.playlist, file).await?;
        }
        Ok(files.len())
    }
}

#[async_trait]
impl SongStickerHandler for StickerPlaylist {
    fn name(&self) -> &str {
        &self.playlist
    }

    async fn handle(&self, event: SongSticker) {
        if event.sticker_name != self.sticker {
            return;
        }
        match self.regenerate().await {
            Ok(count) => log::info!(
                "[Playlists] Regenerated {:?} with {} songs",
                self.playlist,
                count
            ),
            Err(e) => log::warn!(
                "[Playlists] Failed to regenerate {:?}: {}",
                self.playlist,
                e
            ),
        }
    }
}

/// Orders sticker entries by numeric value, highest first, and keeps `limit` files.
///
/// Ties are broken by file path. Zero, negative and unparsable values are
/// left out.
pub fn rank_entries(entries: Vec<StickerEntry>, limit: usize) -> Vec<String> {
    let mut ranked: Vec<(f64, String)> = entries
        .into_iter()
        .filter_map(|entry| {
            let value = entry.value.trim().parse::<f64>().ok()?;
            (value.is_finite() && value > 0.0).then_some((value, entry.file))
        })
        .collect();

    ranked.sort_by(|(a_value, a_file), (b_value, b_file)| {
        b_value
            .partial_cmp(a_value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a_file.cmp(b_file))
    });
    ranked.truncate(limit);
    ranked.into_iter().map(|(_, file)| file).collect()
}
