//! Read-only projection of bootstrap progress.
//!
//! The orchestrator owns the writes; the presentation layer holds a cloned
//! [`BootstrapStatus`] and polls `busy()` / `phase()` to drive loading
//! indicators. Nothing rendering-related lives in the orchestrator itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BootstrapPhase {
    #[default]
    Idle,
    FetchingInfo,
    Finalizing,
    EstablishingAuthContext,
    CheckingSnapshot,
    Restoring,
}

#[derive(Default)]
struct StatusInner {
    busy: AtomicBool,
    phase: RwLock<BootstrapPhase>,
}

#[derive(Clone, Default)]
pub struct BootstrapStatus {
    inner: Arc<StatusInner>,
}

impl BootstrapStatus {
    pub fn busy(&self) -> bool {
        self.inner.busy.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> BootstrapPhase {
        match self.inner.phase.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub(crate) fn set_phase(&self, phase: BootstrapPhase) {
        tracing::debug!(?phase, "bootstrap phase");
        match self.inner.phase.write() {
            Ok(mut guard) => *guard = phase,
            Err(poisoned) => *poisoned.into_inner() = phase,
        }
    }

    /// Mark an attempt as in flight. The returned guard clears the busy
    /// flag and resets the phase to `Idle` when dropped, on every exit
    /// path.
    pub(crate) fn begin(&self) -> AttemptGuard {
        self.inner.busy.store(true, Ordering::SeqCst);
        AttemptGuard {
            status: self.clone(),
        }
    }
}

pub(crate) struct AttemptGuard {
    status: BootstrapStatus,
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        self.status.set_phase(BootstrapPhase::Idle);
        self.status.inner.busy.store(false, Ordering::SeqCst);
    }
}
