//! Shared test doubles for services, handlers and the daemon loop.
//!
//! These are used by multiple test modules to avoid duplication.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};

use crate::config::MpdSettings;
use crate::events::{SongSticker, SongStickerHandler};
use crate::mpd::{
    ChannelMessage, IdleSubscription, MpdConnection, MpdConnector, MpdError, MpdIdle,
    MpdMessaging, MpdPlayback, MpdPlaylists, MpdResult, MpdStickers, PlayerStatus, Song,
    StickerEntry, Subsystem,
};

/// Upper bound for any single wait in async tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Default)]
struct MockState {
    status: PlayerStatus,
    current_song: Option<Song>,
    stickers: HashMap<(String, String), String>,
    pending_messages: VecDeque<ChannelMessage>,
    subscribed: Vec<String>,
    playlists: HashMap<String, Vec<String>>,
    failing: HashSet<&'static str>,
    calls: Vec<String>,
    closed: bool,
}

/// Scriptable in-memory MPD connection.
#[derive(Default)]
pub struct MockMpd {
    state: Mutex<MockState>,
    idle_tx: Mutex<Option<mpsc::Sender<Subsystem>>>,
    idle_ready: Notify,
}

impl MockMpd {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sets the status and current song as if `file` were playing with queue id `id`.
    pub fn play(&self, id: &str, file: &str) {
        let mut state = self.state.lock();
        state.status = [("state", "play"), ("songid", id)].into_iter().collect();
        state.current_song = Some(Song::new(file).with_tag("Id", id).with_tag("Title", file));
    }

    pub fn set_status(&self, status: PlayerStatus) {
        self.state.lock().status = status;
    }

    pub fn set_current_song(&self, song: Option<Song>) {
        self.state.lock().current_song = song;
    }

    pub fn set_sticker(&self, file: &str, name: &str, value: &str) {
        self.state
            .lock()
            .stickers
            .insert((file.to_string(), name.to_string()), value.to_string());
    }

    pub fn sticker(&self, file: &str, name: &str) -> Option<String> {
        self.state
            .lock()
            .stickers
            .get(&(file.to_string(), name.to_string()))
            .cloned()
    }

    pub fn playlist(&self, name: &str) -> Option<Vec<String>> {
        self.state.lock().playlists.get(name).cloned()
    }

    pub fn subscribed(&self) -> Vec<String> {
        self.state.lock().subscribed.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Makes every later call of `op` fail.
    pub fn fail_on(&self, op: &'static str) {
        self.state.lock().failing.insert(op);
    }

    /// Waits until a service has started its idle wait.
    pub async fn wait_for_idle(&self) {
        loop {
            let notified = self.idle_ready.notified();
            if self.idle_tx.lock().is_some() {
                return;
            }
            tokio::time::timeout(TEST_TIMEOUT, notified)
                .await
                .expect("service never started idling");
        }
    }

    /// Reports a changed subsystem on the idle subscription.
    pub async fn notify(&self, subsystem: Subsystem) {
        let tx = self.idle_tx.lock().clone().expect("no idle subscription");
        tx.send(subsystem).await.expect("idle subscription dropped");
    }

    /// Queues a channel message and reports the `message` subsystem.
    pub async fn send_message(&self, channel: &str, message: &str) {
        self.state
            .lock()
            .pending_messages
            .push_back(ChannelMessage::new(channel, message));
        self.notify(Subsystem::Message).await;
    }

    /// Ends the idle subscription as if the idle connection had dropped.
    pub fn drop_idle(&self) {
        self.idle_tx.lock().take();
    }

    /// Returns true while a service holds the idle subscription.
    pub fn idle_active(&self) -> bool {
        self.idle_tx
            .lock()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    fn call(&self, op: &'static str, detail: String) -> MpdResult<()> {
        let mut state = self.state.lock();
        state.calls.push(if detail.is_empty() {
            op.to_string()
        } else {
            format!("{} {}", op, detail)
        });
        if state.failing.contains(op) {
            return Err(MpdError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl MpdMessaging for MockMpd {
    async fn subscribe(&self, channel: &str) -> MpdResult<()> {
        self.call("subscribe", channel.to_string())?;
        self.state.lock().subscribed.push(channel.to_string());
        Ok(())
    }

    async fn read_messages(&self) -> MpdResult<Vec<ChannelMessage>> {
        self.call("read_messages", String::new())?;
        Ok(self.state.lock().pending_messages.drain(..).collect())
    }
}

#[async_trait]
impl MpdPlayback for MockMpd {
    async fn status(&self) -> MpdResult<PlayerStatus> {
        self.call("status", String::new())?;
        Ok(self.state.lock().status.clone())
    }

    async fn current_song(&self) -> MpdResult<Option<Song>> {
        self.call("current_song", String::new())?;
        Ok(self.state.lock().current_song.clone())
    }
}

#[async_trait]
impl MpdStickers for MockMpd {
    async fn sticker_get(&self, file: &str, name: &str) -> MpdResult<Option<String>> {
        self.call("sticker_get", format!("{} {}", file, name))?;
        Ok(self.sticker(file, name))
    }

    async fn sticker_set(&self, file: &str, name: &str, value: &str) -> MpdResult<()> {
        self.call("sticker_set", format!("{} {} {}", file, name, value))?;
        self.set_sticker(file, name, value);
        Ok(())
    }

    async fn sticker_find(&self, name: &str) -> MpdResult<Vec<StickerEntry>> {
        self.call("sticker_find", name.to_string())?;
        let mut entries: Vec<_> = self
            .state
            .lock()
            .stickers
            .iter()
            .filter(|((_, sticker), _)| sticker == name)
            .map(|((file, _), value)| StickerEntry::new(file.clone(), value.clone()))
            .collect();
        entries.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(entries)
    }
}

#[async_trait]
impl MpdPlaylists for MockMpd {
    async fn playlist_clear(&self, playlist: &str) -> MpdResult<()> {
        self.call("playlist_clear", playlist.to_string())?;
        match self.state.lock().playlists.get_mut(playlist) {
            Some(files) => {
                files.clear();
                Ok(())
            }
            None => Err(MpdError::Ack(crate::mpd::Ack {
                code: crate::protocol_constants::MPD_ACK_NO_EXIST,
                list_index: 0,
                command: "playlistclear".to_string(),
                message: "No such playlist".to_string(),
            })),
        }
    }

    async fn playlist_add(&self, playlist: &str, file: &str) -> MpdResult<()> {
        self.call("playlist_add", format!("{} {}", playlist, file))?;
        self.state
            .lock()
            .playlists
            .entry(playlist.to_string())
            .or_default()
            .push(file.to_string());
        Ok(())
    }
}

#[async_trait]
impl MpdIdle for MockMpd {
    async fn idle(&self, subsystems: &[Subsystem]) -> MpdResult<IdleSubscription> {
        let names: Vec<_> = subsystems.iter().map(Subsystem::as_str).collect();
        self.call("idle", names.join(" "))?;

        let (tx, rx) = mpsc::channel(16);
        *self.idle_tx.lock() = Some(tx);
        self.idle_ready.notify_waiters();
        Ok(IdleSubscription::new(rx))
    }

    async fn close(&self) -> MpdResult<()> {
        self.call("close", String::new())?;
        self.state.lock().closed = true;
        Ok(())
    }
}

/// Connector handing out one prepared connection, or failing.
pub struct MockConnector {
    connection: Option<Arc<MockMpd>>,
    pub connects: Mutex<usize>,
}

impl MockConnector {
    pub fn with(connection: Arc<MockMpd>) -> Self {
        Self {
            connection: Some(connection),
            connects: Mutex::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            connection: None,
            connects: Mutex::new(0),
        }
    }
}

#[async_trait]
impl MpdConnector for MockConnector {
    async fn connect(&self, settings: &MpdSettings) -> MpdResult<Arc<dyn MpdConnection>> {
        *self.connects.lock() += 1;
        match &self.connection {
            Some(mpd) => Ok(Arc::clone(mpd) as Arc<dyn MpdConnection>),
            None => Err(MpdError::ConnectTimeout(settings.address())),
        }
    }
}

/// Handler forwarding every event it receives to a test channel.
pub struct RecordingHandler {
    name: String,
    tx: mpsc::UnboundedSender<SongSticker>,
}

impl RecordingHandler {
    pub fn new(name: &str) -> (Arc<dyn SongStickerHandler>, mpsc::UnboundedReceiver<SongSticker>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler = Arc::new(Self {
            name: name.to_string(),
            tx,
        });
        (handler, rx)
    }
}

#[async_trait]
impl SongStickerHandler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: SongSticker) {
        let _ = self.tx.send(event);
    }
}

/// Receives the next event or panics after [`TEST_TIMEOUT`].
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<SongSticker>) -> SongSticker {
    tokio::time::timeout(TEST_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("handler channel closed")
}
