//! [`SerialPrinter`] — writes ESC/POS jobs to a serial device file.
//!
//! The device is opened per job, so a printer that was unplugged and plugged
//! back in works again on the next press.  File I/O on a tty can stall when
//! flow control holds the line, so the write runs in `spawn_blocking` under
//! a timeout.  A writer that outlives its timeout keeps the device marked
//! busy, and jobs are refused until it returns.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::PrinterConfig;

use super::{PrintError, PrintJob, Printer};

/// Printer attached to a serial port such as `/dev/serial0`.
#[derive(Debug, Clone)]
pub struct SerialPrinter {
    device: PathBuf,
    timeout: Duration,
    /// Set while a blocking writer owns the device.
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the writer returns, even by panicking.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SerialPrinter {
    pub fn new(device: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            device: device.into(),
            timeout,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_config(config: &PrinterConfig) -> Self {
        Self::new(config.device.clone(), config.write_timeout())
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    /// Put the port into raw mode at `baud` using `stty`.
    ///
    /// Called once at startup.  Fails when the device is missing or `stty`
    /// rejects the speed.
    pub async fn configure_baud(&self, baud: u32) -> Result<(), PrintError> {
        let output = tokio::process::Command::new("stty")
            .arg("-F")
            .arg(&self.device)
            .arg(baud.to_string())
            .args(["raw", "-echo"])
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| PrintError::Timeout(self.timeout))?
            .map_err(|e| PrintError::Configure(format!("cannot run stty: {e}")))?;

        if !output.status.success() {
            return Err(PrintError::Configure(format!(
                "stty exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        log::info!("printer: {} set to {baud} baud", self.device.display());
        Ok(())
    }
}

fn write_job(device: &Path, bytes: &[u8]) -> Result<(), PrintError> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .open(device)
        .map_err(|source| PrintError::Open {
            device: device.to_path_buf(),
            source,
        })?;

    file.write_all(bytes)
        .and_then(|()| file.flush())
        .map_err(|source| PrintError::Write {
            device: device.to_path_buf(),
            source,
        })
}

#[async_trait]
impl Printer for SerialPrinter {
    async fn print(&self, job: &PrintJob) -> Result<(), PrintError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PrintError::Busy {
                device: self.device.clone(),
            });
        }
        let guard = InFlight(Arc::clone(&self.in_flight));

        let bytes = job.to_bytes();
        let len = bytes.len();
        let device = self.device.clone();

        let task = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            write_job(&device, &bytes)
        });
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => {
                result?;
                log::debug!("printer: wrote {len} bytes to {}", self.device.display());
                Ok(())
            }
            Ok(Err(e)) => Err(PrintError::Internal(e.to_string())),
            Err(_) => Err(PrintError::Timeout(self.timeout)),
        }
    }
}
