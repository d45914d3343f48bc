//! `MpdClient`: the concrete implementation of the MPD traits.
//!
//! Commands are serialised over one command connection. Each idle
//! subscription gets its own connection so a blocking `idle` never stalls
//! the commands issued by other services sharing the client.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};

use super::connection::{Connection, Pairs};
use super::protocol::{split_sticker, Command, MpdResult};
use super::traits::{
    IdleSubscription, MpdConnection, MpdConnector, MpdIdle, MpdMessaging, MpdPlayback,
    MpdPlaylists, MpdStickers,
};
use super::types::{ChannelMessage, PlayerStatus, Song, StickerEntry, Subsystem};
use crate::config::MpdSettings;
use crate::protocol_constants::{IDLE_SUBSYSTEM_CAPACITY, STICKER_SONG_TYPE};

/// Async MPD client shared by every service of a group.
pub struct MpdClient {
    addr: String,
    password: Option<String>,
    commands: Mutex<Connection<TcpStream>>,
    /// Channels subscribed on the command connection, replayed on idle connections.
    channels: Mutex<Vec<String>>,
}

impl MpdClient {
    /// Connects to the server described by `settings`.
    pub async fn connect(settings: &MpdSettings) -> MpdResult<Self> {
        let addr = settings.address();
        let password = settings.credentials().map(str::to_string);
        let commands = Connection::open(&addr, password.as_deref()).await?;
        log::info!(
            "[Mpd] Connected to {}{}",
            addr,
            if password.is_some() { " (authenticated)" } else { "" }
        );

        Ok(Self {
            addr,
            password,
            commands: Mutex::new(commands),
            channels: Mutex::new(Vec::new()),
        })
    }

    async fn run(&self, cmd: Command) -> MpdResult<Pairs> {
        self.commands.lock().await.command(&cmd).await
    }

    fn sticker(action: &str) -> Command {
        Command::new("sticker").word(action).word(STICKER_SONG_TYPE)
    }
}

#[async_trait]
impl MpdMessaging for MpdClient {
    async fn subscribe(&self, channel: &str) -> MpdResult<()> {
        self.run(Command::new("subscribe").arg(channel)).await?;
        self.channels.lock().await.push(channel.to_string());
        Ok(())
    }

    async fn read_messages(&self) -> MpdResult<Vec<ChannelMessage>> {
        let pairs = self.run(Command::new("readmessages")).await?;
        Ok(ChannelMessage::from_pairs(pairs))
    }
}

#[async_trait]
impl MpdPlayback for MpdClient {
    async fn status(&self) -> MpdResult<PlayerStatus> {
        let pairs = self.run(Command::new("status")).await?;
        Ok(PlayerStatus::from_pairs(pairs))
    }

    async fn current_song(&self) -> MpdResult<Option<Song>> {
        let pairs = self.run(Command::new("currentsong")).await?;
        Ok(Song::from_pairs(pairs))
    }
}

#[async_trait]
impl MpdStickers for MpdClient {
    async fn sticker_get(&self, file: &str, name: &str) -> MpdResult<Option<String>> {
        let cmd = Self::sticker("get").arg(file).arg(name);
        match self.run(cmd).await {
            Ok(pairs) => Ok(pairs
                .into_iter()
                .find(|(key, _)| key == "sticker")
                .and_then(|(_, raw)| split_sticker(&raw).map(|(_, value)| value.to_string()))),
            Err(e) if e.is_no_exist() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn sticker_set(&self, file: &str, name: &str, value: &str) -> MpdResult<()> {
        self.run(Self::sticker("set").arg(file).arg(name).arg(value))
            .await
            .map(|_| ())
    }

    async fn sticker_find(&self, name: &str) -> MpdResult<Vec<StickerEntry>> {
        let pairs = self.run(Self::sticker("find").arg("").arg(name)).await?;

        let mut entries = Vec::new();
        let mut file: Option<String> = None;
        for (key, value) in pairs {
            match key.as_str() {
                "file" => file = Some(value),
                "sticker" => {
                    if let (Some(file), Some((_, value))) = (file.take(), split_sticker(&value)) {
                        entries.push(StickerEntry::new(file, value));
                    }
                }
                _ => {}
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl MpdPlaylists for MpdClient {
    async fn playlist_clear(&self, playlist: &str) -> MpdResult<()> {
        self.run(Command::new("playlistclear").arg(playlist))
            .await
            .map(|_| ())
    }

    async fn playlist_add(&self, playlist: &str, file: &str) -> MpdResult<()> {
        self.run(Command::new("playlistadd").arg(playlist).arg(file))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl MpdIdle for MpdClient {
    async fn idle(&self, subsystems: &[Subsystem]) -> MpdResult<IdleSubscription> {
        let mut conn = Connection::open(&self.addr, self.password.as_deref()).await?;

        let drains_messages = subsystems.contains(&Subsystem::Message);
        let channels = idle_channels(subsystems, &self.channels.lock().await);
        for channel in &channels {
            conn.command(&Command::new("subscribe").arg(channel))
                .await?;
        }

        let idle_cmd = subsystems
            .iter()
            .fold(Command::new("idle"), |cmd, s| cmd.word(s.as_str()));

        let (tx, rx) = mpsc::channel(IDLE_SUBSYSTEM_CAPACITY);
        tokio::spawn(async move {
            loop {
                let result = tokio::select! {
                    _ = tx.closed() => {
                        log::debug!("[Mpd] Idle subscription dropped, closing idle connection");
                        return;
                    }
                    result = conn.command(&idle_cmd) => result,
                };

                let changed = match result {
                    Ok(pairs) => pairs,
                    Err(e) => {
                        log::error!("[Mpd] Idle wait failed: {}", e);
                        return;
                    }
                };

                for (key, value) in changed {
                    if key != "changed" {
                        continue;
                    }
                    let subsystem = Subsystem::from_name(&value);
                    // Messages are read on the command connection; discard
                    // this connection's copy so its queue does not fill up.
                    if drains_messages && subsystem == Subsystem::Message {
                        if let Err(e) = conn.command(&Command::new("readmessages")).await {
                            log::error!("[Mpd] Failed to drain idle connection messages: {}", e);
                            return;
                        }
                    }
                    if tx.send(subsystem).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(IdleSubscription::new(rx))
    }

    async fn close(&self) -> MpdResult<()> {
        self.commands
            .lock()
            .await
            .send(&Command::new("close"))
            .await
    }
}

/// Channels an idle connection waiting on `subsystems` has to join.
///
/// MPD only reports `message` to clients subscribed to a channel. A
/// connection not waiting on `message` never drains its queue, so it joins
/// nothing.
fn idle_channels(subsystems: &[Subsystem], subscribed: &[String]) -> Vec<String> {
    if subsystems.contains(&Subsystem::Message) {
        subscribed.to_vec()
    } else {
        Vec::new()
    }
}

/// Connector dialling real MPD servers over TCP.
pub struct TcpConnector;

#[async_trait]
impl MpdConnector for TcpConnector {
    async fn connect(&self, settings: &MpdSettings) -> MpdResult<Arc<dyn MpdConnection>> {
        let client = MpdClient::connect(settings).await?;
        Ok(Arc::new(client))
    }
}
