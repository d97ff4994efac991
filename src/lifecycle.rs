//! Worker lifecycle states and the keep-alive handle for extendable events.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::task::TaskTracker;

use crate::error::Result;

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    /// Loaded, install not started.
    #[default]
    Parsed,
    /// Precaching the static generation.
    Installing,
    /// Installed and waiting for older versions to release their pages.
    Installed,
    /// Evicting stale generations and claiming pages.
    Activating,
    /// Active and intercepting fetches.
    Activated,
    /// Install failed; the previous version stays in charge.
    Redundant,
}

impl WorkerState {
    /// Returns true if fetches should be routed through the worker.
    #[must_use]
    pub const fn can_intercept_fetch(self) -> bool {
        matches!(self, Self::Activated)
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parsed => write!(f, "parsed"),
            Self::Installing => write!(f, "installing"),
            Self::Installed => write!(f, "installed"),
            Self::Activating => write!(f, "activating"),
            Self::Activated => write!(f, "activated"),
            Self::Redundant => write!(f, "redundant"),
        }
    }
}

/// Keep-alive handle for one event.
///
/// Work registered with [`wait_until`](Self::wait_until) runs in the
/// background; the host must await [`settled`](Self::settled) before it
/// tears the worker down, or that work may be lost mid-flight.
#[derive(Debug, Clone, Default)]
pub struct ExtendableEvent {
    tracker: TaskTracker,
    failures: Arc<Mutex<Vec<String>>>,
}

impl ExtendableEvent {
    /// Creates an event with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extends the event's lifetime until `work` completes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn wait_until<F>(&self, work: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let failures = Arc::clone(&self.failures);
        self.tracker.spawn(async move {
            if let Err(e) = work.await {
                log::warn!("Background work failed: {e}");
                failures
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(e.to_string());
            }
        });
    }

    /// Number of registered tasks still running.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Waits for all registered work and returns the errors it produced.
    pub async fn settled(&self) -> Vec<String> {
        self.tracker.close();
        self.tracker.wait().await;
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
