//! Configuration types for the extraction flows.
//!
//! All flow behaviour is controlled through [`FlowConfig`], built via its
//! [`FlowConfigBuilder`] or loaded from a JSON config file with
//! [`FlowConfig::from_file`]. Keeping every knob in one struct makes it trivial
//! to share configs across tasks, log them, and diff two runs to understand why
//! their outputs differ.
//!
//! # Design choice: builder over constructor
//! A twelve-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.
//!
//! # Config file
//! The on-disk format groups settings per flow, so one file can drive every
//! flow in a deployment:
//!
//! ```json
//! {
//!   "flow": {
//!     "extract_pdfs_to_images": { "source_folder": "raw", "dpi": 300 },
//!     "extract_layout_to_images": {
//!       "filtered_ocr_labels": ["text", "title"],
//!       "filtered_tableformer_labels": ["table"]
//!     }
//!   }
//! }
//! ```
//!
//! Keys not listed in [`FlowConfig`] are ignored; a missing file or a missing
//! flow section is a fatal error.

use crate::error::DocPrepError;
use crate::progress::ProgressHandle;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Configuration for one extraction flow run.
///
/// Built via [`FlowConfig::builder()`], [`FlowConfig::default()`], or
/// [`FlowConfig::from_file()`].
///
/// # Example
/// ```rust
/// use docprep::FlowConfig;
///
/// let config = FlowConfig::builder()
///     .dpi(200)
///     .concurrency(8)
///     .filtered_ocr_labels(["text", "title"])
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct FlowConfig {
    /// Bucket the flow reads its inputs from. Default: "raw".
    pub source_folder: String,

    /// Bucket rendered page images are uploaded to. Default: "utils".
    pub target_folder: String,

    /// Bucket for crops routed to the OCR category. Default: "utils".
    pub target_ocr_folder: String,

    /// Bucket for crops routed to the TableFormer category. Default: "utils".
    pub target_tableformer_folder: String,

    /// Bucket for crops routed to the ImageCaption category. Default: "utils".
    pub target_imagecaption_folder: String,

    /// Labels routed to the OCR category. Default: empty.
    ///
    /// Routing checks each label in a crop's label set against the three lists
    /// in order (OCR, then TableFormer, then ImageCaption); the first list
    /// containing the label wins for that label.
    pub filtered_ocr_labels: Vec<String>,

    /// Labels routed to the TableFormer category. Default: empty.
    pub filtered_tableformer_labels: Vec<String>,

    /// Labels routed to the ImageCaption category. Default: empty.
    pub filtered_imagecaption_labels: Vec<String>,

    /// Rendering DPI used when rasterising each PDF page. Default: 300.
    ///
    /// 300 DPI is the archival-scan standard: small glyphs stay legible in the
    /// crops that later feed model training. Lowering it shrinks memory and
    /// upload volume roughly quadratically; raise it only for documents with
    /// sub-6pt print.
    pub dpi: u32,

    /// Maximum number of pages rendered per document. Default: unlimited.
    ///
    /// Useful to smoke-test a flow against the first pages of very large scans
    /// without paying for a full render. The cap applies per document, not per
    /// batch.
    pub max_pages: Option<usize>,

    /// Number of concurrent object transfers per batch call. Default: 5.
    ///
    /// Transfers are network-bound, not CPU-bound; five in flight keeps a
    /// single-node object store busy without tripping its connection limits.
    pub concurrency: usize,

    /// Optional per-object progress callback, invoked by the transfer layer.
    pub progress: Option<ProgressHandle>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            source_folder: "raw".to_string(),
            target_folder: "utils".to_string(),
            target_ocr_folder: "utils".to_string(),
            target_tableformer_folder: "utils".to_string(),
            target_imagecaption_folder: "utils".to_string(),
            filtered_ocr_labels: Vec::new(),
            filtered_tableformer_labels: Vec::new(),
            filtered_imagecaption_labels: Vec::new(),
            dpi: 300,
            max_pages: None,
            concurrency: 5,
            progress: None,
        }
    }
}

impl fmt::Debug for FlowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowConfig")
            .field("source_folder", &self.source_folder)
            .field("target_folder", &self.target_folder)
            .field("target_ocr_folder", &self.target_ocr_folder)
            .field("target_tableformer_folder", &self.target_tableformer_folder)
            .field(
                "target_imagecaption_folder",
                &self.target_imagecaption_folder,
            )
            .field("filtered_ocr_labels", &self.filtered_ocr_labels)
            .field(
                "filtered_tableformer_labels",
                &self.filtered_tableformer_labels,
            )
            .field(
                "filtered_imagecaption_labels",
                &self.filtered_imagecaption_labels,
            )
            .field("dpi", &self.dpi)
            .field("max_pages", &self.max_pages)
            .field("concurrency", &self.concurrency)
            .field("progress", &self.progress.as_ref().map(|_| "<dyn TransferProgress>"))
            .finish()
    }
}

impl FlowConfig {
    /// Create a new builder for `FlowConfig`.
    pub fn builder() -> FlowConfigBuilder {
        FlowConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load the section for `flow` from the JSON config file at `path`,
    /// applying it over the defaults.
    ///
    /// Fatal errors: the file is absent, unreadable, or not valid JSON, or it
    /// has no `"flow"` section named `flow`.
    pub fn from_file(path: &Path, flow: &str) -> Result<FlowConfig, DocPrepError> {
        if !path.exists() {
            return Err(DocPrepError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|source| DocPrepError::ConfigUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile =
            serde_json::from_str(&raw).map_err(|source| DocPrepError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        let section = file
            .flow
            .get(flow)
            .ok_or_else(|| DocPrepError::UnknownFlow {
                flow: flow.to_string(),
                path: path.to_path_buf(),
            })?;
        section.apply(Self::default())
    }
}

/// Builder for [`FlowConfig`].
#[derive(Debug)]
pub struct FlowConfigBuilder {
    config: FlowConfig,
}

impl FlowConfigBuilder {
    pub fn source_folder(mut self, bucket: impl Into<String>) -> Self {
        self.config.source_folder = bucket.into();
        self
    }

    pub fn target_folder(mut self, bucket: impl Into<String>) -> Self {
        self.config.target_folder = bucket.into();
        self
    }

    pub fn target_ocr_folder(mut self, bucket: impl Into<String>) -> Self {
        self.config.target_ocr_folder = bucket.into();
        self
    }

    pub fn target_tableformer_folder(mut self, bucket: impl Into<String>) -> Self {
        self.config.target_tableformer_folder = bucket.into();
        self
    }

    pub fn target_imagecaption_folder(mut self, bucket: impl Into<String>) -> Self {
        self.config.target_imagecaption_folder = bucket.into();
        self
    }

    pub fn filtered_ocr_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.filtered_ocr_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn filtered_tableformer_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.filtered_tableformer_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn filtered_imagecaption_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.filtered_imagecaption_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_pages(mut self, pages: usize) -> Self {
        self.config.max_pages = Some(pages);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn progress(mut self, callback: ProgressHandle) -> Self {
        self.config.progress = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<FlowConfig, DocPrepError> {
        let c = &self.config;
        if c.dpi == 0 {
            return Err(DocPrepError::InvalidConfig("DPI must be ≥ 1".into()));
        }
        if c.concurrency == 0 {
            return Err(DocPrepError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        for (name, value) in [
            ("source_folder", &c.source_folder),
            ("target_folder", &c.target_folder),
            ("target_ocr_folder", &c.target_ocr_folder),
            ("target_tableformer_folder", &c.target_tableformer_folder),
            ("target_imagecaption_folder", &c.target_imagecaption_folder),
        ] {
            if value.is_empty() {
                return Err(DocPrepError::InvalidConfig(format!(
                    "{name} must not be empty"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Config file model ────────────────────────────────────────────────────

/// On-disk shape: `{ "flow": { "<flow-name>": { … } } }`. Top-level keys other
/// than `"flow"` are ignored.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    flow: HashMap<String, FlowSection>,
}

/// One flow's section. Every key is optional; absent keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
struct FlowSection {
    source_folder: Option<String>,
    target_folder: Option<String>,
    target_ocr_folder: Option<String>,
    target_tableformer_folder: Option<String>,
    target_imagecaption_folder: Option<String>,
    filtered_ocr_labels: Option<Vec<String>>,
    filtered_tableformer_labels: Option<Vec<String>>,
    filtered_imagecaption_labels: Option<Vec<String>>,
    dpi: Option<u32>,
    max_pages: Option<usize>,
    concurrency: Option<usize>,
}

impl FlowSection {
    /// Apply this section over `base`, then re-run builder validation.
    fn apply(&self, base: FlowConfig) -> Result<FlowConfig, DocPrepError> {
        let mut config = base;
        if let Some(v) = &self.source_folder {
            config.source_folder = v.clone();
        }
        if let Some(v) = &self.target_folder {
            config.target_folder = v.clone();
        }
        if let Some(v) = &self.target_ocr_folder {
            config.target_ocr_folder = v.clone();
        }
        if let Some(v) = &self.target_tableformer_folder {
            config.target_tableformer_folder = v.clone();
        }
        if let Some(v) = &self.target_imagecaption_folder {
            config.target_imagecaption_folder = v.clone();
        }
        if let Some(v) = &self.filtered_ocr_labels {
            config.filtered_ocr_labels = v.clone();
        }
        if let Some(v) = &self.filtered_tableformer_labels {
            config.filtered_tableformer_labels = v.clone();
        }
        if let Some(v) = &self.filtered_imagecaption_labels {
            config.filtered_imagecaption_labels = v.clone();
        }
        if let Some(v) = self.dpi {
            config.dpi = v;
        }
        if let Some(v) = self.max_pages {
            config.max_pages = Some(v);
        }
        if let Some(v) = self.concurrency {
            config.concurrency = v;
        }
        FlowConfigBuilder { config }.build()
    }
}
