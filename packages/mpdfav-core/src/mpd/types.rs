//! Domain types for MPD responses.

use std::collections::HashMap;
use std::fmt;

/// An MPD idle subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subsystem {
    /// The song database changed.
    Database,
    /// A database update started or finished.
    Update,
    /// A stored playlist was modified.
    StoredPlaylist,
    /// The queue was modified.
    Playlist,
    /// Playback started, stopped, seeked or the song changed.
    Player,
    /// Volume changed.
    Mixer,
    /// An output was enabled or disabled.
    Output,
    /// Playback options (repeat, random, ...) changed.
    Options,
    /// A sticker was modified.
    Sticker,
    /// A client subscribed to or unsubscribed from a channel.
    Subscription,
    /// A message arrived on a subscribed channel.
    Message,
    /// Any subsystem this crate does not know about.
    Other(String),
}

impl Subsystem {
    /// Returns the protocol name of the subsystem.
    pub fn as_str(&self) -> &str {
        match self {
            Subsystem::Database => "database",
            Subsystem::Update => "update",
            Subsystem::StoredPlaylist => "stored_playlist",
            Subsystem::Playlist => "playlist",
            Subsystem::Player => "player",
            Subsystem::Mixer => "mixer",
            Subsystem::Output => "output",
            Subsystem::Options => "options",
            Subsystem::Sticker => "sticker",
            Subsystem::Subscription => "subscription",
            Subsystem::Message => "message",
            Subsystem::Other(name) => name,
        }
    }

    /// Maps a protocol name to a subsystem. Never fails.
    pub fn from_name(name: &str) -> Self {
        match name {
            "database" => Subsystem::Database,
            "update" => Subsystem::Update,
            "stored_playlist" => Subsystem::StoredPlaylist,
            "playlist" => Subsystem::Playlist,
            "player" => Subsystem::Player,
            "mixer" => Subsystem::Mixer,
            "output" => Subsystem::Output,
            "options" => Subsystem::Options,
            "sticker" => Subsystem::Sticker,
            "subscription" => Subsystem::Subscription,
            "message" => Subsystem::Message,
            other => Subsystem::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message received on a client-to-client channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    /// Channel the message was sent on.
    pub channel: String,
    /// Message body.
    pub message: String,
}

impl ChannelMessage {
    pub fn new(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Builds messages from `readmessages` pairs.
    ///
    /// Each `channel:` line starts a new message; the following `message:`
    /// line completes it. Unpaired lines are skipped.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Vec<Self> {
        let mut messages = Vec::new();
        let mut channel: Option<String> = None;
        for (key, value) in pairs {
            match key.as_str() {
                "channel" => channel = Some(value),
                "message" => {
                    if let Some(channel) = channel.take() {
                        messages.push(Self::new(channel, value));
                    }
                }
                _ => {}
            }
        }
        messages
    }
}

/// Snapshot of the `status` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerStatus {
    fields: HashMap<String, String>,
}

/// Playback state reported in `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Play,
    Pause,
    Stop,
}

impl PlayerStatus {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self {
            fields: pairs.into_iter().collect(),
        }
    }

    /// Returns a raw status field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Id of the current song in the queue, if any.
    pub fn song_id(&self) -> Option<&str> {
        self.get("songid")
    }

    pub fn state(&self) -> PlaybackState {
        match self.get("state") {
            Some("play") => PlaybackState::Play,
            Some("pause") => PlaybackState::Pause,
            _ => PlaybackState::Stop,
        }
    }

    /// Elapsed time of the current song in seconds.
    pub fn elapsed(&self) -> Option<f64> {
        self.get("elapsed")
            .and_then(|v| v.parse().ok())
            .or_else(|| self.legacy_time().map(|(elapsed, _)| elapsed))
    }

    /// Duration of the current song in seconds.
    pub fn duration(&self) -> Option<f64> {
        self.get("duration")
            .and_then(|v| v.parse().ok())
            .or_else(|| self.legacy_time().map(|(_, total)| total))
    }

    /// Parses the deprecated `time: <elapsed>:<total>` field.
    fn legacy_time(&self) -> Option<(f64, f64)> {
        let (elapsed, total) = self.get("time")?.split_once(':')?;
        Some((elapsed.parse().ok()?, total.parse().ok()?))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PlayerStatus {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The song returned by `currentsong`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    /// Path of the song relative to the music directory.
    pub file: String,
    tags: HashMap<String, String>,
}

impl Song {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            tags: HashMap::new(),
        }
    }

    /// Adds a tag, used when building songs by hand.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Builds a song from `currentsong` pairs; `None` when nothing is playing.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Option<Self> {
        let mut file = None;
        let mut tags = HashMap::new();
        for (key, value) in pairs {
            if key == "file" {
                file = Some(value);
            } else {
                tags.insert(key, value);
            }
        }
        file.map(|file| Self { file, tags })
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Queue id of the song.
    pub fn id(&self) -> Option<&str> {
        self.tag("Id")
    }

    /// Title tag, falling back to the file path.
    pub fn display_title(&self) -> &str {
        self.tag("Title").unwrap_or(&self.file)
    }
}

/// One result line pair of `sticker find`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickerEntry {
    pub file: String,
    pub value: String,
}

impl StickerEntry {
    pub fn new(file: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            value: value.into(),
        }
    }
}
