//! Play-count service.
//!
//! Follows the player and credits a song one play when it was listened to
//! for long enough before the song changed or playback stopped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::idle_listener::{IdleEvent, IdleListener};
use super::{MpdService, ServiceError, ServiceResult};
use crate::events::{SongSticker, StickerOutputs};
use crate::gate::GateObserver;
use crate::mpd::{MpdConnection, PlaybackState, PlayerStatus, Song, Subsystem};
use crate::protocol_constants::{PLAYCOUNT_MAX_REQUIRED_SECS, PLAYCOUNT_STICKER};

/// The song currently followed by the tracker.
#[derive(Debug)]
struct TrackedSong {
    id: String,
    file: String,
    duration: Option<Duration>,
    played: Duration,
    playing_since: Option<Instant>,
}

impl TrackedSong {
    /// Play time needed to count as played: half the song, capped at 4 minutes.
    fn required(&self) -> Duration {
        let cap = Duration::from_secs(PLAYCOUNT_MAX_REQUIRED_SECS);
        match self.duration {
            Some(duration) => (duration / 2).min(cap),
            None => cap,
        }
    }

    fn qualifies(&self) -> bool {
        self.played >= self.required()
    }

    fn pause(&mut self, now: Instant) {
        if let Some(since) = self.playing_since.take() {
            self.played += now.saturating_duration_since(since);
        }
    }
}

/// Accumulates wall-clock play time of the current song.
#[derive(Debug, Default)]
pub struct PlaybackTracker {
    current: Option<TrackedSong>,
}

impl PlaybackTracker {
    /// Returns true if `status` shows a song the tracker does not follow yet.
    ///
    /// The caller then passes the current song to [`update`](Self::update).
    pub fn needs_song(&self, status: &PlayerStatus) -> bool {
        match active_song_id(status) {
            Some(id) => self.current_id() != Some(id),
            None => false,
        }
    }

    /// Id of the followed song.
    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|track| track.id.as_str())
    }

    /// Applies a status snapshot taken at `now`.
    ///
    /// Returns the file of the previous song when it ended and was played
    /// long enough to be credited. `song` is only used to start following
    /// a new song.
    pub fn update(
        &mut self,
        status: &PlayerStatus,
        song: Option<&Song>,
        now: Instant,
    ) -> Option<String> {
        let song_id = active_song_id(status);

        if let Some(track) = &mut self.current {
            track.pause(now);
        }

        let ended = self
            .current
            .as_ref()
            .is_some_and(|track| Some(track.id.as_str()) != song_id);
        let credited = if ended {
            self.current
                .take()
                .filter(TrackedSong::qualifies)
                .map(|track| track.file)
        } else {
            None
        };

        if self.current.is_none() {
            if let (Some(id), Some(song)) = (song_id, song) {
                log::debug!("[PlayCounts] Following {} ({})", song.file, id);
                self.current = Some(TrackedSong {
                    id: id.to_string(),
                    file: song.file.clone(),
                    duration: status
                        .duration()
                        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                        .filter(|d| !d.is_zero()),
                    played: Duration::ZERO,
                    playing_since: None,
                });
            }
        }

        if status.state() == PlaybackState::Play {
            if let Some(track) = &mut self.current {
                track.playing_since = Some(now);
            }
        }

        credited
    }
}

/// Song id of `status`, or `None` when playback is stopped.
fn active_song_id(status: &PlayerStatus) -> Option<&str> {
    match status.state() {
        PlaybackState::Stop => None,
        _ => status.song_id(),
    }
}

/// Counts plays in the `playcount` sticker.
#[derive(Debug, Default)]
pub struct PlayCountsService;

impl PlayCountsService {
    async fn observe(
        mpd: &dyn MpdConnection,
        tracker: &mut PlaybackTracker,
        status: &PlayerStatus,
        outputs: &StickerOutputs,
    ) -> ServiceResult<()> {
        let song = if tracker.needs_song(status) {
            mpd.current_song().await.map_err(ServiceError::CurrentSong)?
        } else {
            None
        };

        if let Some(file) = tracker.update(status, song.as_ref(), Instant::now()) {
            Self::credit(mpd, &file, outputs).await?;
        }
        Ok(())
    }

    async fn credit(
        mpd: &dyn MpdConnection,
        file: &str,
        outputs: &StickerOutputs,
    ) -> ServiceResult<()> {
        let current = mpd
            .sticker_get(file, PLAYCOUNT_STICKER)
            .await
            .map_err(ServiceError::Sticker)?;
        let count = match current.as_deref().map(str::trim) {
            Some(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
                log::warn!("[PlayCounts] Resetting unreadable play count {:?} of {}", raw, file);
                0
            }),
            None => 0,
        };
        let next = (count + 1).to_string();

        mpd.sticker_set(file, PLAYCOUNT_STICKER, &next)
            .await
            .map_err(ServiceError::Sticker)?;
        log::info!("[PlayCounts] {} played {} times", file, next);
        outputs.publish(SongSticker::new(file, PLAYCOUNT_STICKER, next));
        Ok(())
    }
}

#[async_trait]
impl MpdService for PlayCountsService {
    fn name(&self) -> &'static str {
        "playcounts"
    }

    async fn run(
        &self,
        mpd: Arc<dyn MpdConnection>,
        outputs: &StickerOutputs,
        shutdown: GateObserver,
    ) -> ServiceResult<()> {
        let mut tracker = PlaybackTracker::default();
        let status = mpd.status().await.map_err(ServiceError::Status)?;
        Self::observe(mpd.as_ref(), &mut tracker, &status, outputs).await?;

        let mut listener =
            IdleListener::spawn(Arc::clone(&mpd), &[Subsystem::Player], shutdown.clone()).await?;
        log::info!("[PlayCounts] Following player (song id {:?})", tracker.current_id());

        let result = loop {
            tokio::select! {
                biased;

                _ = shutdown.opened() => break Ok(()),

                event = listener.next() => match event {
                    Ok(IdleEvent::Status(status)) => {
                        if let Err(e) =
                            Self::observe(mpd.as_ref(), &mut tracker, &status, outputs).await
                        {
                            break Err(e);
                        }
                    }
                    Ok(IdleEvent::Message(_)) => {}
                    Err(_) if shutdown.is_open() => break Ok(()),
                    Err(e) => break Err(e),
                },
            }
        };

        listener.stop().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::Gate;
    use crate::services::ServiceGroup;
    use crate::test_fixtures::{next_event, MockMpd, RecordingHandler, TEST_TIMEOUT};
    use tokio::time::{advance, timeout};

    fn status(state: &str, id: &str, duration: &str) -> PlayerStatus {
        [("state", state), ("songid", id), ("duration", duration)]
            .into_iter()
            .collect()
    }

    fn stopped() -> PlayerStatus {
        [("state", "stop")].into_iter().collect()
    }

    fn song(id: &str, file: &str) -> Song {
        Song::new(file).with_tag("Id", id)
    }

    #[test]
    fn song_played_past_half_is_credited_on_change() {
        let t0 = Instant::now();
        let mut tracker = PlaybackTracker::default();

        assert!(tracker.needs_song(&status("play", "1", "200")));
        assert_eq!(
            tracker.update(&status("play", "1", "200"), Some(&song("1", "a.mp3")), t0),
            None
        );
        assert!(!tracker.needs_song(&status("play", "1", "200")));

        let credited = tracker.update(
            &status("play", "2", "200"),
            Some(&song("2", "b.mp3")),
            t0 + Duration::from_secs(100),
        );
        assert_eq!(credited.as_deref(), Some("a.mp3"));
        assert_eq!(tracker.current_id(), Some("2"));
    }

    #[test]
    fn skipped_song_is_not_credited() {
        let t0 = Instant::now();
        let mut tracker = PlaybackTracker::default();

        tracker.update(&status("play", "1", "200"), Some(&song("1", "a.mp3")), t0);
        let credited = tracker.update(
            &status("play", "2", "200"),
            Some(&song("2", "b.mp3")),
            t0 + Duration::from_secs(99),
        );
        assert_eq!(credited, None);
    }

    #[test]
    fn long_songs_need_at_most_four_minutes() {
        let t0 = Instant::now();
        let mut tracker = PlaybackTracker::default();

        tracker.update(&status("play", "1", "3600"), Some(&song("1", "long.flac")), t0);
        let credited = tracker.update(&stopped(), None, t0 + Duration::from_secs(240));
        assert_eq!(credited.as_deref(), Some("long.flac"));
        assert_eq!(tracker.current_id(), None);
    }

    #[test]
    fn paused_time_does_not_count() {
        let t0 = Instant::now();
        let mut tracker = PlaybackTracker::default();
        let s = song("1", "a.mp3");

        tracker.update(&status("play", "1", "100"), Some(&s), t0);
        tracker.update(&status("pause", "1", "100"), None, t0 + Duration::from_secs(30));
        tracker.update(&status("play", "1", "100"), None, t0 + Duration::from_secs(500));
        let credited = tracker.update(&stopped(), None, t0 + Duration::from_secs(519));
        assert_eq!(credited, None);

        let mut tracker = PlaybackTracker::default();
        tracker.update(&status("play", "1", "100"), Some(&s), t0);
        tracker.update(&status("pause", "1", "100"), None, t0 + Duration::from_secs(30));
        tracker.update(&status("play", "1", "100"), None, t0 + Duration::from_secs(500));
        let credited = tracker.update(&stopped(), None, t0 + Duration::from_secs(520));
        assert_eq!(credited.as_deref(), Some("a.mp3"));
    }

    #[test]
    fn unknown_duration_uses_cap() {
        let t0 = Instant::now();
        let mut tracker = PlaybackTracker::default();
        let no_duration: PlayerStatus = [("state", "play"), ("songid", "9")].into_iter().collect();

        tracker.update(&no_duration, Some(&song("9", "stream")), t0);
        assert_eq!(tracker.update(&stopped(), None, t0 + Duration::from_secs(239)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn credited_song_increments_sticker_and_publishes() {
        let mpd = MockMpd::new();
        mpd.set_status(status("play", "1", "300"));
        mpd.set_current_song(Some(song("1", "a.mp3")));
        mpd.set_sticker("a.mp3", "playcount", "7");

        let group = ServiceGroup::new(mpd.clone());
        let (handler, mut rx) = RecordingHandler::new("most played");
        group.start_service(Arc::new(PlayCountsService), vec![handler]);
        mpd.wait_for_idle().await;

        advance(Duration::from_secs(151)).await;
        mpd.set_status(status("play", "2", "300"));
        mpd.set_current_song(Some(song("2", "b.mp3")));
        mpd.notify(Subsystem::Player).await;

        assert_eq!(next_event(&mut rx).await, SongSticker::new("a.mp3", "playcount", "8"));
        assert_eq!(mpd.sticker("a.mp3", "playcount").as_deref(), Some("8"));

        advance(Duration::from_secs(150)).await;
        mpd.set_status(stopped());
        mpd.notify(Subsystem::Player).await;

        assert_eq!(next_event(&mut rx).await, SongSticker::new("b.mp3", "playcount", "1"));

        group.gate().open();
        timeout(TEST_TIMEOUT, group.join()).await.unwrap();
    }

    #[tokio::test]
    async fn sticker_failure_is_fatal() {
        let mpd = MockMpd::new();
        mpd.set_status(status("play", "1", "0.001"));
        mpd.set_current_song(Some(song("1", "a.mp3")));
        mpd.fail_on("sticker_get");
        let (outputs, _receivers) = StickerOutputs::channels(0);
        let gate = Gate::new();

        let run = PlayCountsService.run(mpd.clone(), &outputs, gate.observe());
        let drive = async {
            mpd.wait_for_idle().await;
            tokio::time::sleep(Duration::from_millis(5)).await;
            mpd.set_status(stopped());
            mpd.notify(Subsystem::Player).await;
        };

        let (result, ()) = timeout(TEST_TIMEOUT, async { tokio::join!(run, drive) })
            .await
            .unwrap();
        assert!(matches!(result, Err(ServiceError::Sticker(_))));
        assert!(!mpd.idle_active());
    }
}
