//! Error types for the docprep library.
//!
//! Only failures that abort a whole flow run are modelled as errors:
//!
//! * [`DocPrepError`] — **Fatal**: the run cannot proceed at all (config file
//!   missing, corrupt PDF, object listing failed, a single-object convenience
//!   transfer failed). Returned as `Err(DocPrepError)` from the flow entry
//!   points in [`crate::flows`].
//!
//! Per-object failures inside a batch transfer are **not** errors. They are
//! recorded as [`crate::transfer::TransferFailure`] entries in the batch
//! outcome and as warn-level log lines; the batch and the flow continue.
//! Callers that care about partial loss branch on the outcome records instead
//! of catching anything.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docprep library.
///
/// Batch-level partial failures live in
/// [`crate::transfer::BatchOutcome::failed`] rather than here.
#[derive(Debug, Error)]
pub enum DocPrepError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// The configuration file does not exist at the given path.
    #[error("Config file not found: '{path}'\nCheck the path or unset CONFIG_PATH to run with defaults.")]
    ConfigNotFound { path: PathBuf },

    /// The configuration file exists but could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON.
    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The configuration file has no section for the requested flow.
    #[error("Config file '{path}' has no \"flow\" entry for '{flow}'")]
    UnknownFlow { flow: String, path: PathBuf },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The document bytes could not be opened as a PDF at all.
    #[error("PDF '{key}' is corrupt or not a PDF: {detail}")]
    CorruptPdf { key: String, detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page} of '{key}': {detail}")]
    RasterisationFailed {
        key: String,
        page: usize,
        detail: String,
    },

    /// A rendered page could not be serialised to JPEG.
    #[error("JPEG encoding failed for '{key}': {detail}")]
    EncodeFailed { key: String, detail: String },

    // ── Object store errors ───────────────────────────────────────────────
    /// Listing the bucket contents failed; no batch can be formed.
    #[error("Failed to list objects in bucket '{bucket}': {reason}")]
    ListFailed { bucket: String, reason: String },

    /// A single-object download failed.
    ///
    /// Only the convenience single-object path promotes fetch errors to this
    /// variant; inside a batch the same failure becomes a
    /// [`crate::transfer::TransferFailure`] record.
    #[error("Failed to download '{key}' from bucket '{bucket}': {reason}")]
    DownloadFailed {
        bucket: String,
        key: String,
        reason: String,
    },

    /// A single-object upload failed. Same promotion rule as
    /// [`DocPrepError::DownloadFailed`].
    #[error("Failed to upload '{key}' to bucket '{bucket}': {reason}")]
    UploadFailed {
        bucket: String,
        key: String,
        reason: String,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (blocking-task join failure and the like).
    #[error("Internal error: {0}")]
    Internal(String),
}
