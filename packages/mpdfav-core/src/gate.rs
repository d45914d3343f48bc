//! One-shot broadcast shutdown gate.
//!
//! A [`Gate`] starts closed and opens exactly once. Every [`GateObserver`]
//! handed out before or after the transition sees it, so one service exiting
//! can stop all of its siblings.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Shared shutdown gate for one service group.
///
/// Cloning yields another handle to the same gate.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    token: CancellationToken,
    opened: Arc<AtomicBool>,
}

impl Gate {
    /// Creates a closed gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the gate.
    ///
    /// Safe to call from any number of tasks concurrently. Returns `true`
    /// only for the single call that performed the transition.
    pub fn open(&self) -> bool {
        if self.opened.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        true
    }

    /// Returns true once the gate has been opened.
    pub fn is_open(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns a new observer of this gate.
    pub fn observe(&self) -> GateObserver {
        GateObserver {
            token: self.token.clone(),
        }
    }
}

/// Read-only view of a [`Gate`] handed to services.
#[derive(Debug, Clone)]
pub struct GateObserver {
    token: CancellationToken,
}

impl GateObserver {
    /// Resolves once the gate is open; immediately if it already is.
    pub async fn opened(&self) {
        self.token.cancelled().await;
    }

    pub fn is_open(&self) -> bool {
        self.token.is_cancelled()
    }
}
