//! Core `PoemGenerator` trait and the error type shared by all generators.

use async_trait::async_trait;
use thiserror::Error;

use crate::camera::CapturedImage;
use crate::poem::Poem;

// ---------------------------------------------------------------------------
// GenerationError
// ---------------------------------------------------------------------------

/// Errors that can occur while turning a picture into a poem.
///
/// [`is_transient`](Self::is_transient) splits them into failures worth
/// another attempt and failures that will not change on retry.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The request did not complete within the per-attempt timeout.
    #[error("generation request timed out")]
    Timeout,

    /// Connecting to or talking to the service failed.
    #[error("connection to generation service failed: {0}")]
    Connection(String),

    /// The service reported an overload or internal error.
    #[error("generation service error {status}: {message}")]
    Server { status: u16, message: String },

    /// The service refused the request (bad key, bad payload, …).
    #[error("generation request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response body was not the JSON we expected.
    #[error("malformed generation response: {0}")]
    Malformed(String),

    /// The service withheld output because of its safety filters.
    #[error("generation blocked: {0}")]
    Blocked(String),

    /// The response carried no usable poem text.
    #[error("generation service returned no poem")]
    EmptyPoem,

    /// Every attempt failed transiently.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<GenerationError>,
    },
}

impl GenerationError {
    /// `true` for failures expected to clear up on a retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::Timeout
                | GenerationError::Connection(_)
                | GenerationError::Server { .. }
        )
    }

    /// Classify an HTTP error status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            408 | 429 | 500..=599 => GenerationError::Server { status, message },
            _ => GenerationError::Rejected { status, message },
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenerationError::Timeout
        } else if e.is_decode() {
            GenerationError::Malformed(e.to_string())
        } else {
            GenerationError::Connection(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// PoemGenerator trait
// ---------------------------------------------------------------------------

/// Async trait for picture-to-poem generation.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn PoemGenerator>`.  The image is borrowed so a wrapper can retry
/// with the same bytes.
#[async_trait]
pub trait PoemGenerator: Send + Sync {
    async fn generate(&self, image: &CapturedImage) -> Result<Poem, GenerationError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
