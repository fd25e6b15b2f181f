//! Pipeline stages for turning stored documents into labeled image files.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch rendering backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! PDF flow:     render ──▶ encode
//!               (pdfium)   (JPEG)
//!
//! Layout flow:  annotations ──▶ crop ──▶ route ──▶ encode
//!               (export JSON)   (pixels) (labels)  (JPEG)
//! ```
//!
//! 1. [`render`]      — rasterise a PDF's pages to RGB images; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 2. [`annotations`] — deserialise annotation exports and resolve their
//!    image references to object keys
//! 3. [`crop`]        — convert percentage geometry to pixel regions and cut
//!    them out of the source image
//! 4. [`route`]       — assign each crop's labels to the OCR / TableFormer /
//!    ImageCaption categories
//! 5. [`encode`]      — JPEG-encode images and generate their object names

pub mod annotations;
pub mod crop;
pub mod encode;
pub mod render;
pub mod route;
