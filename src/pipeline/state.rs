//! Pipeline state machine and the shared state cell.
//!
//! [`PipelineState`] drives the orchestrator's state machine.  The button
//! listener reads it through [`SharedState`] to drop presses while a run is
//! in flight; the orchestrator is the only writer.
//!
//! [`SharedState`] is an `Arc<StateCell>` holding the state in an atomic, so
//! the read on the button thread never contends with the pipeline.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// States of the capture → generate → print pipeline.
///
/// The state machine transitions are:
///
/// ```text
/// Ready ──press──▶ Capturing ──image──▶ Generating ──poem──▶ Printing ──▶ Ready
///                      │                    │                    │
///                      └────────failure─────┴────────────────────┴──▶ Error ──▶ Ready
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PipelineState {
    /// Waiting for a button press.  LED on.
    #[default]
    Ready = 0,

    /// The camera is taking a picture.
    Capturing = 1,

    /// The picture is with the generation service.
    Generating = 2,

    /// The poem is being written to the printer.
    Printing = 3,

    /// A stage failed; the run is being wound down.
    Error = 4,
}

impl PipelineState {
    /// Returns `true` while a stage is running.
    ///
    /// ```
    /// use poetry_printer::pipeline::PipelineState;
    ///
    /// assert!(!PipelineState::Ready.is_busy());
    /// assert!(PipelineState::Capturing.is_busy());
    /// assert!(PipelineState::Generating.is_busy());
    /// assert!(PipelineState::Printing.is_busy());
    /// assert!(!PipelineState::Error.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            PipelineState::Capturing | PipelineState::Generating | PipelineState::Printing
        )
    }

    /// A short label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Ready => "ready",
            PipelineState::Capturing => "capturing",
            PipelineState::Generating => "generating",
            PipelineState::Printing => "printing",
            PipelineState::Error => "error",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => PipelineState::Capturing,
            2 => PipelineState::Generating,
            3 => PipelineState::Printing,
            4 => PipelineState::Error,
            _ => PipelineState::Ready,
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// StateCell / SharedState
// ---------------------------------------------------------------------------

/// Atomic holder for the one process-wide [`PipelineState`].
#[derive(Debug, Default)]
pub struct StateCell {
    raw: AtomicU8,
}

impl StateCell {
    pub fn new(state: PipelineState) -> Self {
        Self {
            raw: AtomicU8::new(state as u8),
        }
    }

    pub fn get(&self) -> PipelineState {
        PipelineState::from_u8(self.raw.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.get() == PipelineState::Ready
    }

    /// Only the orchestrator calls this.
    pub(crate) fn set(&self, state: PipelineState) {
        self.raw.store(state as u8, Ordering::Release);
    }
}

/// Thread-safe handle to the pipeline state.  Cheap to clone.
pub type SharedState = Arc<StateCell>;

/// Construct a new [`SharedState`] starting in [`PipelineState::Ready`].
pub fn new_shared_state() -> SharedState {
    Arc::new(StateCell::new(PipelineState::Ready))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
