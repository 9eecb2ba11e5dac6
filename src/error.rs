//! Classified stage failures for the briefing pipeline.
//!
//! Each pipeline stage maps its fallible operations onto one of these
//! variants so callers can distinguish a missing board entry from a
//! download error, an extraction failure, or a deadline overrun. `anyhow`
//! stays at the CLI boundary; within the library these typed errors flow
//! through `?` and convert into `anyhow::Error` when they reach `pipeline`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// A failure attributed to a specific pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An expected entry (list row, detail link, attachment) was absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// A network fetch or streamed download failed.
    #[error("download failed: {0}")]
    Download(String),

    /// The downloaded attachment was not present on disk as expected.
    #[error("file missing: {0}")]
    FileMissing(PathBuf),

    /// Text extraction from the downloaded document failed.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Building or swapping in the index failed.
    #[error("index build failed: {0}")]
    IndexBuild(String),

    /// The generation capability failed or returned an unexpected shape.
    #[error("generation failed: {0}")]
    Generation(String),

    /// Posting the notification webhook failed.
    #[error("notification failed: {0}")]
    Notification(String),

    /// A network call exceeded its configured deadline.
    #[error("timed out after {0:?}: {1}")]
    Timeout(Duration, String),
}

impl PipelineError {
    /// Classify a `reqwest` error: deadline overruns become [`Timeout`],
    /// everything else is wrapped by the caller-supplied variant
    /// constructor so the failure is attributed to the right stage.
    ///
    /// [`Timeout`]: PipelineError::Timeout
    pub fn from_reqwest(
        err: reqwest::Error,
        timeout: Duration,
        stage: fn(String) -> PipelineError,
    ) -> PipelineError {
        if err.is_timeout() {
            PipelineError::Timeout(timeout, err.to_string())
        } else {
            stage(err.to_string())
        }
    }
}
