//! Pipeline orchestrator module for the poetry printer.
//!
//! This module wires camera → generator → printer for each button press and
//! owns the one process-wide [`PipelineState`].
//!
//! # Architecture
//!
//! ```text
//! ButtonListener thread ──ButtonEvent (mpsc)──▶ PipelineOrchestrator::run()
//!        ▲                                              │
//!        │ is_ready()                                   ├─ Camera::capture        Capturing
//!        │                                              ├─ PoemGenerator::generate Generating
//! SharedState (Arc<StateCell>) ◀──── set ───────────────├─ Printer::print          Printing
//!                                                       ├─ StatusIndicator::set_state
//!                                                       └─ RunLog::append
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use poetry_printer::led::LogIndicator;
//! use poetry_printer::pipeline::{new_shared_state, PipelineOrchestrator};
//! use poetry_printer::printer::ConsolePrinter;
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = new_shared_state();
//!
//!     // (camera and generator constructed from config)
//!     # use poetry_printer::camera::Camera;
//!     # use poetry_printer::poem::PoemGenerator;
//!     # fn make_camera() -> Arc<dyn Camera> { unimplemented!() }
//!     # fn make_generator() -> Arc<dyn PoemGenerator> { unimplemented!() }
//!
//!     let (press_tx, press_rx) = mpsc::channel(1);
//!     let orchestrator = PipelineOrchestrator::new(
//!         state.clone(),
//!         make_camera(),
//!         make_generator(),
//!         Arc::new(ConsolePrinter::new()),
//!         Arc::new(LogIndicator),
//!     );
//!
//!     tokio::spawn(async move { orchestrator.run(press_rx).await });
//!
//!     // press_tx and state are passed to ButtonListener::start(...)
//!     # drop(press_tx);
//! }
//! ```

pub mod runlog;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runlog::{Outcome, RunLog, RunRecord};
pub use runner::{PipelineError, PipelineOrchestrator, Stage};
pub use state::{new_shared_state, PipelineState, SharedState, StateCell};
