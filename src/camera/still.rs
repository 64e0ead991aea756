//! [`StillCamera`] — one JPEG per call from `rpicam-still`.
//!
//! The tool is asked to write the JPEG to stdout (`-o -`), so the image never
//! has to round-trip through a temporary file.  The child is killed if the
//! capture outlives its timeout.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{save_picture, Camera, CaptureError, CapturedImage};
use crate::config::CameraConfig;

/// Camera backed by an external still-capture program.
#[derive(Debug, Clone)]
pub struct StillCamera {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    save_dir: Option<PathBuf>,
}

impl StillCamera {
    /// Build the `rpicam-still` invocation from config.
    pub fn from_config(config: &CameraConfig) -> Self {
        let args = vec![
            "-n".to_string(),
            "-t".into(),
            config.warmup_ms.to_string(),
            "--width".into(),
            config.width.to_string(),
            "--height".into(),
            config.height.to_string(),
            "-e".into(),
            "jpg".into(),
            "-o".into(),
            "-".into(),
        ];

        Self {
            program: config.command.clone(),
            args,
            timeout: config.timeout(),
            save_dir: config.resolved_save_dir(),
        }
    }

    /// Run an arbitrary program that writes an image to stdout.
    pub fn with_command(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
            save_dir: None,
        }
    }

    /// Keep a copy of every picture in `dir`.
    pub fn save_to(mut self, dir: Option<PathBuf>) -> Self {
        self.save_dir = dir;
        self
    }

    async fn run(&self) -> Result<Vec<u8>, CaptureError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| CaptureError::Timeout(self.timeout))?
            .map_err(|source| CaptureError::Spawn {
                command: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CaptureError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(CaptureError::Empty);
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl Camera for StillCamera {
    async fn capture(&self) -> Result<CapturedImage, CaptureError> {
        log::debug!("camera: running {} {}", self.program, self.args.join(" "));

        let mut image = CapturedImage::jpeg(self.run().await?);
        log::info!("camera: captured {} bytes", image.bytes.len());

        // Keeping a copy is best-effort; the run goes on without it.
        if let Some(dir) = &self.save_dir {
            let target = dir.clone();
            let bytes = image.bytes.clone();
            let at = image.captured_at;
            let saved =
                tokio::task::spawn_blocking(move || save_picture(&target, &bytes, &at)).await;
            match saved {
                Ok(Ok(path)) => {
                    log::info!("camera: saved {}", path.display());
                    image.saved_to = Some(path);
                }
                Ok(Err(e)) => {
                    log::warn!("camera: could not save picture in {}: {e}", dir.display())
                }
                Err(e) => log::warn!("camera: picture save task failed: {e}"),
            }
        }

        Ok(image)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
