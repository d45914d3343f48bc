//! Fixed protocol constants that should NOT be changed.
//!
//! Sticker and channel names are shared with MPD clients that submit ratings
//! or read the generated playlists, so renaming them breaks compatibility.

// ─────────────────────────────────────────────────────────────────────────────
// MPD Protocol
// ─────────────────────────────────────────────────────────────────────────────

/// Default MPD TCP port.
pub const MPD_DEFAULT_PORT: u16 = 6600;

/// Prefix of the greeting line sent by MPD on connect.
pub const MPD_GREETING_PREFIX: &str = "OK MPD ";

/// Terminator line of a successful response.
pub const MPD_RESPONSE_OK: &str = "OK";

/// Prefix of an error response line.
pub const MPD_RESPONSE_ACK: &str = "ACK ";

/// ACK error code for "no such object" (missing sticker, playlist, ...).
pub const MPD_ACK_NO_EXIST: u32 = 50;

/// Timeout for establishing the TCP connection to MPD (seconds).
///
/// Only the connect is bounded; commands and idle waits are not.
pub const MPD_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Sticker object type used for all song stickers.
pub const STICKER_SONG_TYPE: &str = "song";

// ─────────────────────────────────────────────────────────────────────────────
// Ratings
// ─────────────────────────────────────────────────────────────────────────────

/// Client-to-client channel on which ratings are submitted.
pub const RATINGS_CHANNEL: &str = "ratings";

/// Sticker holding a song's rating (`"0"`..`"5"`).
pub const RATING_STICKER: &str = "rating";

/// Submitter id recorded for every rating.
///
/// MPD messages do not carry the sender's identity, so all ratings are
/// attributed to the same anonymous submitter.
pub const ANONYMOUS_SUBMITTER: &str = "0";

// ─────────────────────────────────────────────────────────────────────────────
// Play Counts
// ─────────────────────────────────────────────────────────────────────────────

/// Sticker holding a song's play count.
pub const PLAYCOUNT_STICKER: &str = "playcount";

/// Play time after which a song always counts as played (seconds).
pub const PLAYCOUNT_MAX_REQUIRED_SECS: u64 = 240;

// ─────────────────────────────────────────────────────────────────────────────
// Channels
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity of the channel carrying changed subsystems from an idle connection.
pub const IDLE_SUBSYSTEM_CAPACITY: usize = 16;

/// Capacity of the internal message/status channels fed by the idle listener.
pub const IDLE_EVENT_CAPACITY: usize = 64;

// ─────────────────────────────────────────────────────────────────────────────
// Daemon
// ─────────────────────────────────────────────────────────────────────────────

/// Pause between a service group stopping and the next connect attempt (milliseconds).
pub const DAEMON_RESTART_DELAY_MS: u64 = 1000;
