//! Thermal receipt output.
//!
//! This module provides:
//! * [`escpos`] — command bytes and text encoding for ESC/POS printers.
//! * [`ReceiptFormatter`] / [`PrintJob`] — wrapping and receipt layout.
//! * [`Printer`] — async trait implemented by all output backends.
//! * [`SerialPrinter`] — writes jobs to the printer's serial device.
//! * [`ConsolePrinter`] — shows jobs on stdout for dry runs.
//!
//! A printer reports failure and nothing more.  It never retries on its own
//! and never decides what the pipeline does next.

pub mod console;
pub mod escpos;
pub mod format;
pub mod serial;

pub use console::ConsolePrinter;
pub use format::{wrap_line, wrap_text, PrintJob, ReceiptFormatter};
pub use serial::SerialPrinter;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// PrintError
// ---------------------------------------------------------------------------

/// Why a job did not reach the paper.
#[derive(Debug, Error)]
pub enum PrintError {
    /// The printer device could not be opened.
    #[error("cannot open printer {}: {source}", device.display())]
    Open {
        device: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the job failed part way.
    #[error("write to printer {} failed: {source}", device.display())]
    Write {
        device: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An earlier job is still stuck on the device.
    #[error("printer {} is still busy with an earlier job", device.display())]
    Busy { device: PathBuf },

    /// The write did not complete in time.
    #[error("printer did not accept the job within {0:?}")]
    Timeout(Duration),

    /// Setting up the serial line failed.
    #[error("cannot configure printer port: {0}")]
    Configure(String),

    /// The blocking writer task died.
    #[error("printer task failed: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// Printer trait
// ---------------------------------------------------------------------------

/// Sends one laid-out job to the output device.
#[async_trait]
pub trait Printer: Send + Sync {
    async fn print(&self, job: &PrintJob) -> Result<(), PrintError>;
}

// Compile-time assertion: Box<dyn Printer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Printer>) {}
};
