//! Still-image capture.
//!
//! [`Camera`] is the interface the pipeline uses: one call, one picture or
//! one [`CaptureError`].  [`StillCamera`] is the production implementation;
//! it drives the Raspberry Pi still-capture tool as a child process with a
//! hard timeout.

pub mod still;
pub mod store;

pub use still::StillCamera;
pub use store::{picture_name, save_picture};

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use thiserror::Error;

// ---------------------------------------------------------------------------
// CapturedImage
// ---------------------------------------------------------------------------

/// An encoded picture owned by the current pipeline run.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime_type: &'static str,
    /// When the picture was taken.
    pub captured_at: DateTime<Local>,
    /// Where a copy was saved, if saving is enabled and succeeded.
    pub saved_to: Option<PathBuf>,
}

impl CapturedImage {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: "image/jpeg",
            captured_at: Local::now(),
            saved_to: None,
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Why a capture produced no picture.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The capture program could not be started.
    #[error("cannot run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The capture did not finish in time.
    #[error("camera did not deliver a picture within {0:?}")]
    Timeout(Duration),

    /// The capture program exited unsuccessfully.
    #[error("capture failed ({status}): {stderr}")]
    Failed { status: String, stderr: String },

    /// The capture program succeeded but produced no data.
    #[error("camera returned an empty image")]
    Empty,
}

// ---------------------------------------------------------------------------
// Camera trait
// ---------------------------------------------------------------------------

/// Takes one picture per call.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn capture(&self) -> Result<CapturedImage, CaptureError>;
}

// Compile-time assertion: Box<dyn Camera> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Camera>) {}
};
