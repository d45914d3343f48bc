//! Per-handler delivery channels of one service.

use tokio::sync::mpsc;

use super::SongSticker;

/// Receiving end drained by one handler task.
pub type StickerReceiver = mpsc::UnboundedReceiver<SongSticker>;

/// Sending ends of every delivery channel of one service.
///
/// Services only ever borrow this; the orchestrator owns it and closes all
/// channels at once when the service exits.
///
/// Queues are unbounded: a slow handler lags behind but never blocks the
/// service, and no event is dropped while its handler is alive.
#[derive(Debug, Default)]
pub struct StickerOutputs {
    senders: Vec<mpsc::UnboundedSender<SongSticker>>,
}

impl StickerOutputs {
    /// Creates `count` channels, returning the outputs and one receiver per channel.
    pub fn channels(count: usize) -> (Self, Vec<StickerReceiver>) {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..count).map(|_| mpsc::unbounded_channel()).unzip();
        (Self { senders }, receivers)
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Hands one copy of `event` to every channel.
    ///
    /// Each send is independent and returns immediately; delivery to the
    /// handlers happens later and in no particular order across handlers.
    /// Returns the number of channels that accepted the event.
    pub fn publish(&self, event: SongSticker) -> usize {
        tracing::debug!(?event, channels = self.senders.len(), "sticker_published");

        let mut delivered = 0;
        for tx in &self.senders {
            match tx.send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => log::trace!("[StickerOutputs] Handler gone, dropping {:?}", e.0),
            }
        }
        delivered
    }

    /// Closes every channel. Handlers drain what is buffered, then stop.
    pub fn close(self) {
        drop(self);
    }
}
