//! Background idle listener shared by the listener services.
//!
//! Waits for idle notifications on a dedicated subscription and turns each
//! one into the data a dispatch loop needs: pending channel messages for
//! `message`, a fresh status snapshot for `player`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{ServiceError, ServiceResult};
use crate::gate::GateObserver;
use crate::mpd::{ChannelMessage, IdleSubscription, MpdConnection, PlayerStatus, Subsystem};
use crate::protocol_constants::IDLE_EVENT_CAPACITY;

/// One item produced by the listener.
#[derive(Debug, Clone, PartialEq)]
pub enum IdleEvent {
    Message(ChannelMessage),
    Status(PlayerStatus),
}

/// Handle to a running idle listener task.
///
/// The task stops when the gate opens, when this handle is dropped or
/// stopped, or when a query fails. Its idle subscription is released with it.
pub struct IdleListener {
    messages: mpsc::Receiver<ChannelMessage>,
    statuses: mpsc::Receiver<PlayerStatus>,
    task: Option<JoinHandle<ServiceResult<()>>>,
}

impl IdleListener {
    /// Starts the idle wait and spawns the listener task.
    pub async fn spawn(
        mpd: Arc<dyn MpdConnection>,
        subsystems: &[Subsystem],
        shutdown: GateObserver,
    ) -> ServiceResult<Self> {
        let idle = mpd.idle(subsystems).await.map_err(ServiceError::Idle)?;

        let (message_tx, messages) = mpsc::channel(IDLE_EVENT_CAPACITY);
        let (status_tx, statuses) = mpsc::channel(IDLE_EVENT_CAPACITY);
        let task = tokio::spawn(listen(mpd, idle, message_tx, status_tx, shutdown));

        Ok(Self {
            messages,
            statuses,
            task: Some(task),
        })
    }

    /// Waits for the next message or status snapshot.
    ///
    /// Once the listener task has stopped, returns the error that stopped it,
    /// or [`ServiceError::IdleClosed`] if it stopped without one. Must not be
    /// called again after returning an error.
    pub async fn next(&mut self) -> ServiceResult<IdleEvent> {
        tokio::select! {
            Some(message) = self.messages.recv() => Ok(IdleEvent::Message(message)),
            Some(status) = self.statuses.recv() => Ok(IdleEvent::Status(status)),
            else => Err(self.failure().await),
        }
    }

    /// Stops the listener and waits for its task to exit.
    pub async fn stop(mut self) {
        self.messages.close();
        self.statuses.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::warn!("[IdleListener] Task ended abnormally: {}", e);
            }
        }
    }

    async fn failure(&mut self) -> ServiceError {
        let Some(task) = self.task.take() else {
            return ServiceError::IdleClosed;
        };
        match task.await {
            Ok(Err(e)) => e,
            Ok(Ok(())) => ServiceError::IdleClosed,
            Err(e) => {
                log::error!("[IdleListener] Task ended abnormally: {}", e);
                ServiceError::IdleClosed
            }
        }
    }
}

async fn listen(
    mpd: Arc<dyn MpdConnection>,
    mut idle: IdleSubscription,
    message_tx: mpsc::Sender<ChannelMessage>,
    status_tx: mpsc::Sender<PlayerStatus>,
    shutdown: GateObserver,
) -> ServiceResult<()> {
    loop {
        let subsystem = tokio::select! {
            _ = shutdown.opened() => {
                log::debug!("[IdleListener] Gate opened, stopping");
                return Ok(());
            }
            _ = status_tx.closed() => {
                log::debug!("[IdleListener] Receivers dropped, stopping");
                return Ok(());
            }
            next = idle.next() => next.ok_or(ServiceError::IdleClosed)?,
        };

        match subsystem {
            Subsystem::Message => {
                let messages = mpd.read_messages().await.map_err(ServiceError::ReadMessages)?;
                for message in messages {
                    if message_tx.send(message).await.is_err() {
                        return Ok(());
                    }
                }
            }
            Subsystem::Player => {
                let status = mpd.status().await.map_err(ServiceError::Status)?;
                if status_tx.send(status).await.is_err() {
                    return Ok(());
                }
            }
            other => log::trace!("[IdleListener] Ignoring {} change", other),
        }
    }
}
