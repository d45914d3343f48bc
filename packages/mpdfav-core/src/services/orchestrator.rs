//! Service group orchestration.
//!
//! Responsibilities:
//! - Creating one delivery channel and one draining task per handler
//! - Running each service with its outputs and a gate observer
//! - Closing a service's channels and opening the gate when it exits
//! - Joining every task of the group

use std::sync::Arc;

use tokio_util::task::TaskTracker;

use super::MpdService;
use crate::error::ErrorCode;
use crate::events::{SongStickerHandler, StickerOutputs, StickerReceiver};
use crate::gate::Gate;
use crate::mpd::MpdConnection;

/// Services and handler tasks sharing one connection and one gate.
///
/// A group lives for exactly one daemon-loop iteration: once any service
/// exits, the gate opens, every other service unwinds, and [`join`] returns.
///
/// [`join`]: ServiceGroup::join
pub struct ServiceGroup {
    mpd: Arc<dyn MpdConnection>,
    gate: Gate,
    tasks: TaskTracker,
}

impl ServiceGroup {
    /// Creates an empty group with a closed gate.
    pub fn new(mpd: Arc<dyn MpdConnection>) -> Self {
        Self {
            mpd,
            gate: Gate::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// The group's shutdown gate.
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Starts a service and one draining task per handler.
    ///
    /// Handler tasks stop when their channel closes, which happens when the
    /// service exits; buffered events are still handled first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_service(
        &self,
        service: Arc<dyn MpdService>,
        handlers: Vec<Arc<dyn SongStickerHandler>>,
    ) {
        let service_name = service.name();
        let (outputs, receivers) = StickerOutputs::channels(handlers.len());

        for (handler, rx) in handlers.into_iter().zip(receivers) {
            self.tasks.spawn(drain(service_name, handler, rx));
        }

        let mpd = Arc::clone(&self.mpd);
        let shutdown = self.gate.observe();
        let exit = ServiceExit {
            service: service_name,
            outputs,
            gate: self.gate.clone(),
        };

        self.tasks.spawn(async move {
            match service.run(mpd, &exit.outputs, shutdown).await {
                Ok(()) => log::info!("[ServiceGroup] {} stopped", service_name),
                Err(e) => log::error!(
                    "[ServiceGroup] {} failed: {} ({})",
                    service_name,
                    e,
                    e.code()
                ),
            }
            // `exit` drops here: channels close, then the gate opens.
        });

        log::info!("[ServiceGroup] Started {} service", service_name);
    }

    /// Waits until every service and handler task of the group has exited.
    pub async fn join(self) {
        self.tasks.close();
        self.tasks.wait().await;
        log::debug!("[ServiceGroup] All tasks joined");
    }
}

/// Applies every event of one channel to one handler until the channel closes.
async fn drain(
    service: &'static str,
    handler: Arc<dyn SongStickerHandler>,
    mut rx: StickerReceiver,
) {
    while let Some(event) = rx.recv().await {
        handler.handle(event).await;
    }
    log::debug!(
        "[ServiceGroup] {} handler {} finished",
        service,
        handler.name()
    );
}

/// Exit path of one service task.
///
/// Runs on drop so that a panicking service still closes its channels and
/// stops its siblings.
struct ServiceExit {
    service: &'static str,
    outputs: StickerOutputs,
    gate: Gate,
}

impl Drop for ServiceExit {
    fn drop(&mut self) {
        std::mem::take(&mut self.outputs).close();
        if self.gate.open() {
            log::info!(
                "[ServiceGroup] {} exited, shutting down remaining services",
                self.service
            );
        }
    }
}
