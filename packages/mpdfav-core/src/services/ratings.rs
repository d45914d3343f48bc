//! Ratings service.
//!
//! Clients rate the current song by sending a message on the `ratings`
//! channel. The service stores the rating as a song sticker and publishes a
//! `rating` event for the playlist handlers.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::idle_listener::{IdleEvent, IdleListener};
use super::{MpdService, ServiceError, ServiceResult};
use crate::events::{SongSticker, StickerOutputs};
use crate::gate::GateObserver;
use crate::mpd::{
    ChannelMessage, MpdConnection, MpdError, MpdStickers, PlayerStatus, Song, Subsystem,
};
use crate::protocol_constants::{ANONYMOUS_SUBMITTER, RATINGS_CHANNEL, RATING_STICKER};

/// Errors from rating submission.
#[derive(Debug, Error)]
pub enum RatingError {
    /// The token could not be mapped to a rating.
    ///
    /// Never produced by [`parse_rating`], which maps unknown tokens to 0.
    /// Callers still handle it as a non-fatal outcome.
    #[error("Invalid rating code: {0:?}")]
    InvalidRatingCode(String),

    /// Writing the rating sticker failed.
    #[error("Failed to store rating: {0}")]
    Sticker(#[source] MpdError),
}

/// Convenient Result alias for rating operations.
pub type RatingResult<T> = Result<T, RatingError>;

/// A song rating from 0 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: Rating = Rating(0);
    pub const MAX: Rating = Rating(5);

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps a rating token to a rating.
///
/// `"0"` to `"5"` map to themselves, `"like"` to 5 and `"dislike"` to 0.
/// Anything else, including the empty string, maps to 0.
pub fn parse_rating(token: &str) -> Rating {
    match token {
        "1" => Rating(1),
        "2" => Rating(2),
        "3" => Rating(3),
        "4" => Rating(4),
        "5" | "like" => Rating::MAX,
        _ => Rating::MIN,
    }
}

/// Stores the rating for `token` on `song`.
///
/// Issues exactly one sticker write and returns the stored rating.
pub async fn rate_song<M>(mpd: &M, song: &Song, token: &str) -> RatingResult<Rating>
where
    M: MpdStickers + ?Sized,
{
    let rating = parse_rating(token);
    mpd.sticker_set(&song.file, RATING_STICKER, &rating.to_string())
        .await
        .map_err(RatingError::Sticker)?;
    Ok(rating)
}

/// Submitters that rated the current song.
#[derive(Debug, Default)]
pub struct RatingRecord {
    submitters: HashSet<String>,
}

impl RatingRecord {
    pub fn record(&mut self, submitter: &str) {
        self.submitters.insert(submitter.to_string());
    }

    /// Returns true if `submitter` already rated the current song.
    ///
    /// Not consulted when accepting ratings: repeated ratings of one song
    /// are all applied.
    pub fn has_rated(&self, submitter: &str) -> bool {
        self.submitters.contains(submitter)
    }

    pub fn clear(&mut self) {
        self.submitters.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.submitters.is_empty()
    }
}

/// State of the ratings dispatch loop.
#[derive(Debug)]
pub struct RatingsDispatcher {
    current_song_id: Option<String>,
    record: RatingRecord,
}

impl RatingsDispatcher {
    /// Creates a dispatcher for the song playing in `status`.
    pub fn new(status: &PlayerStatus) -> Self {
        Self {
            current_song_id: status.song_id().map(str::to_string),
            record: RatingRecord::default(),
        }
    }

    pub fn current_song_id(&self) -> Option<&str> {
        self.current_song_id.as_deref()
    }

    pub fn record(&self) -> &RatingRecord {
        &self.record
    }

    /// Handles one channel message.
    ///
    /// Fails only when querying the current song or storing the rating fails.
    pub async fn on_message(
        &mut self,
        mpd: &dyn MpdConnection,
        message: ChannelMessage,
        outputs: &StickerOutputs,
    ) -> ServiceResult<()> {
        if message.channel != RATINGS_CHANNEL {
            log::debug!("[Ratings] Ignoring message on channel {:?}", message.channel);
            return Ok(());
        }

        // Dropped rather than written to an empty file name, which MPD
        // rejects and which would stop the whole group.
        let Some(song) = mpd.current_song().await.map_err(ServiceError::CurrentSong)? else {
            log::warn!(
                "[Ratings] Dropping rating {:?}: nothing is playing",
                message.message
            );
            return Ok(());
        };

        match rate_song(mpd, &song, &message.message).await {
            Ok(rating) => {
                self.record.record(ANONYMOUS_SUBMITTER);
                log::info!("[Ratings] Rated {} with {}", song.display_title(), rating);
                outputs.publish(SongSticker::new(
                    song.file,
                    RATING_STICKER,
                    rating.to_string(),
                ));
                Ok(())
            }
            Err(RatingError::InvalidRatingCode(code)) => {
                log::warn!("[Ratings] Invalid rating code {:?}", code);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Handles one status snapshot: a new song id resets the record.
    pub fn on_status(&mut self, status: &PlayerStatus) {
        let song_id = status.song_id();
        if song_id != self.current_song_id.as_deref() {
            log::debug!(
                "[Ratings] Song changed {:?} -> {:?}",
                self.current_song_id,
                song_id
            );
            self.record.clear();
            self.current_song_id = song_id.map(str::to_string);
        }
    }
}

/// Listens on the `ratings` channel and applies submitted ratings.
#[derive(Debug, Default)]
pub struct RatingsService;

#[async_trait]
impl MpdService for RatingsService {
    fn name(&self) -> &'static str {
        "ratings"
    }

    async fn run(
        &self,
        mpd: Arc<dyn MpdConnection>,
        outputs: &StickerOutputs,
        shutdown: GateObserver,
    ) -> ServiceResult<()> {
        mpd.subscribe(RATINGS_CHANNEL)
            .await
            .map_err(|source| ServiceError::Subscribe {
                channel: RATINGS_CHANNEL.to_string(),
                source,
            })?;
        let status = mpd.status().await.map_err(ServiceError::Status)?;
        let mut dispatcher = RatingsDispatcher::new(&status);

        let mut listener = IdleListener::spawn(
            Arc::clone(&mpd),
            &[Subsystem::Message, Subsystem::Player],
            shutdown.clone(),
        )
        .await?;

        log::info!(
            "[Ratings] Listening on channel {:?} (current song id {:?})",
            RATINGS_CHANNEL,
            dispatcher.current_song_id()
        );

        let result = loop {
            tokio::select! {
                biased;

                _ = shutdown.opened() => break Ok(()),

                event = listener.next() => match event {
                    Ok(IdleEvent::Message(message)) => {
                        if let Err(e) =
                            dispatcher.on_message(mpd.as_ref(), message, outputs).await
                        {
                            break Err(e);
                        }
                    }
                    Ok(IdleEvent::Status(status)) => dispatcher.on_status(&status),
                    Err(_) if shutdown.is_open() => break Ok(()),
                    Err(e) => break Err(e),
                },
            }
        };

        listener.stop().await;
        result
    }
}
