//! # docprep
//!
//! Turn raw PDFs and annotation exports stored in S3-compatible buckets into
//! labeled training-image crops.
//!
//! ## Why this crate?
//!
//! Document-understanding models train on page images and on labeled crops
//! of those pages (text lines for OCR, tables for TableFormer, figures for
//! captioning). Producing that data means a lot of unglamorous plumbing:
//! pull documents out of object storage, rasterise them at a controlled DPI,
//! cut out the regions a labeling tool marked, and file every crop into the
//! bucket its model consumes. This crate is that plumbing, as a library with
//! a thin CLI on top.
//!
//! ## Pipeline Overview
//!
//! ```text
//! extract_pdfs_to_images            extract_layout_to_images
//!  │                                 │
//!  ├─ 1. List+download *.pdf         ├─ 1. List+download *.json exports
//!  ├─ 2. Render pages via pdfium     ├─ 2. Resolve + download images
//!  │      (CPU-bound, spawn_blocking)├─ 3. Crop annotated regions
//!  ├─ 3. JPEG-encode each page       ├─ 4. Route crops by label
//!  └─ 4. Upload {uuid}.jpg files     └─ 5. Upload per category bucket
//! ```
//!
//! Transfers fan out over a bounded worker pool; a single failed object is
//! logged and recorded on the [`FlowReport`] rather than aborting the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docprep::{extract_pdfs_to_images, FlowConfig, ObjectStore, S3ObjectStore, StoreConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Endpoint and credentials from MINIO_HOST / MINIO_ROOT_USER / …
//!     let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(StoreConfig::from_env()));
//!     let config = FlowConfig::builder()
//!         .source_folder("raw")
//!         .target_folder("utils")
//!         .dpi(300)
//!         .build()?;
//!     let report = extract_pdfs_to_images(&store, &config).await?;
//!     println!(
//!         "{} page image(s) uploaded, {} failure(s)",
//!         report.objects_uploaded,
//!         report.failure_count()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## The Two Flows
//!
//! | Flow name | Reads | Produces |
//! |-----------|-------|----------|
//! | `extract_pdfs_to_images`   | `.pdf` objects | one JPEG per page, uploaded to the target bucket |
//! | `extract_layout_to_images` | `.json` annotation exports + the images they reference | labeled crops routed to the OCR / TableFormer / ImageCaption buckets |
//!
//! Flow names double as section keys in the JSON config file (see
//! [`FlowConfig::from_file`]) and as log scopes.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docprep` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! docprep = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod flows;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod transfer;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FlowConfig, FlowConfigBuilder};
pub use error::DocPrepError;
pub use flows::{
    extract_layout_to_images, extract_pdfs_to_images, EXTRACT_LAYOUT_TO_IMAGES,
    EXTRACT_PDFS_TO_IMAGES,
};
pub use output::FlowReport;
pub use progress::{NoopTransferProgress, ProgressHandle, TransferDirection, TransferProgress};
pub use store::{ObjectStore, S3ObjectStore, StoreConfig, StoreError};
pub use transfer::{
    download_batch, download_object, upload_batch, upload_object, BatchOutcome, FileToUpload,
    ObjectSelector, RawDocument, TransferFailure,
};
