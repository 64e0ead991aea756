//! Push-button input: raw pin samples in, clean [`ButtonEvent`]s out.
//!
//! # Design
//!
//! Sampling runs on a **dedicated OS thread** ([`ButtonListener`]) so the
//! tokio workers never sit in a polling loop.  Each sample goes through the
//! pure [`Debouncer`]; recognised presses are handed to the orchestrator over
//! a `tokio::sync::mpsc` channel.  Presses that arrive while the pipeline is
//! not ready are dropped here, never queued.
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use tokio::sync::mpsc;
//! use poetry_printer::button::{ButtonListener, Debouncer};
//! use poetry_printer::gpio::SysfsPin;
//! use poetry_printer::pipeline::new_shared_state;
//!
//! let (tx, mut rx) = mpsc::channel(4);
//! let pin = SysfsPin::input("/sys/class/gpio".as_ref(), 23).unwrap();
//! let debouncer = Debouncer::new(Duration::from_millis(50), Duration::from_secs(1));
//! let _listener = ButtonListener::start(
//!     Box::new(pin),
//!     true,
//!     debouncer,
//!     Duration::from_millis(10),
//!     new_shared_state(),
//!     tx,
//! )
//! .unwrap();
//!
//! // In your async loop:
//! // while let Some(press) = rx.recv().await { ... }
//! ```

pub mod debounce;
pub mod listener;
pub mod stdin;

pub use debounce::Debouncer;
pub use listener::ButtonListener;
pub use stdin::StdinTrigger;

use std::time::Instant;

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::gpio::GpioError;
use crate::pipeline::SharedState;

// ---------------------------------------------------------------------------
// ButtonEvent
// ---------------------------------------------------------------------------

/// One recognised physical press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonEvent {
    /// Monotonic press counter, starting at 1.
    pub seq: u64,
    /// When the press was recognised.
    pub at: Instant,
    /// Wall-clock time of the press, for logs.
    pub pressed_at: DateTime<Local>,
}

impl ButtonEvent {
    /// A press recognised right now.
    pub fn now(seq: u64) -> Self {
        Self::at(seq, Instant::now())
    }

    pub fn at(seq: u64, at: Instant) -> Self {
        Self {
            seq,
            at,
            pressed_at: Local::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// InputError
// ---------------------------------------------------------------------------

/// Faults on the input side of the appliance.
#[derive(Debug, Error)]
pub enum InputError {
    /// Sampling the button pin failed.
    #[error("button input failed: {0}")]
    Gpio(#[from] GpioError),

    /// The sampling thread could not be started.
    #[error("cannot start button thread: {0}")]
    Spawn(#[source] std::io::Error),
}

// ---------------------------------------------------------------------------
// Hand-off
// ---------------------------------------------------------------------------

/// Pass `event` to the orchestrator if the pipeline is ready.
///
/// Never blocks.  Returns `false` once the receiving side is gone, which
/// tells the producer to stop.
pub(crate) fn forward_press(
    state: &SharedState,
    tx: &mpsc::Sender<ButtonEvent>,
    event: ButtonEvent,
) -> bool {
    if !state.is_ready() {
        log::info!(
            "button: press #{} ignored, pipeline is {}",
            event.seq,
            state.get()
        );
        return true;
    }

    match tx.try_send(event) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(event)) => {
            log::info!("button: press #{} ignored, a run is starting", event.seq);
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}
