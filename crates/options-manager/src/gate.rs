//! Single-permit readiness gate and the observable cycle phase.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CyclePhase {
    #[default]
    Idle,
    Evaluating,
    NoPositions,
    HasPositions,
    ActionPlanned,
    AwaitingConfirmation,
}

#[derive(Debug)]
struct GateState {
    ready: AtomicBool,
    phase: RwLock<CyclePhase>,
}

/// At most one cycle runs at a time. Triggers that find the gate busy are
/// dropped, not queued.
#[derive(Debug, Clone)]
pub struct CycleGate {
    state: Arc<GateState>,
}

impl Default for CycleGate {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleGate {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(GateState {
                ready: AtomicBool::new(true),
                phase: RwLock::new(CyclePhase::Idle),
            }),
        }
    }

    /// Takes the permit if no cycle holds it. The cycle enters `Evaluating`.
    #[must_use]
    pub fn try_acquire(&self) -> Option<CyclePermit> {
        self.state
            .ready
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        *self.state.phase.write() = CyclePhase::Evaluating;
        Some(CyclePermit {
            state: Arc::clone(&self.state),
        })
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.ready.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn phase(&self) -> CyclePhase {
        *self.state.phase.read()
    }
}

/// Held for the whole cycle. Dropping it (on success, error or unwind)
/// returns the phase to `Idle` and restores readiness.
#[derive(Debug)]
pub struct CyclePermit {
    state: Arc<GateState>,
}

impl CyclePermit {
    pub fn advance(&self, phase: CyclePhase) {
        tracing::trace!(?phase, "Cycle phase");
        *self.state.phase.write() = phase;
    }
}

impl Drop for CyclePermit {
    fn drop(&mut self) {
        *self.state.phase.write() = CyclePhase::Idle;
        self.state.ready.store(true, Ordering::Release);
    }
}
