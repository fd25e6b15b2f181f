//! Parallel transfer layer: batch downloads and uploads against the object
//! store.
//!
//! Every batch call fans its objects out across a bounded worker pool
//! (`buffer_unordered`, width [`crate::config::FlowConfig::concurrency`]) and
//! blocks on the full fan-in barrier before returning; results arrive in
//! completion order, not submission order. There is no per-task timeout at
//! this layer — a hung transfer blocks its batch.
//!
//! ## Failure contract
//!
//! Batch calls never fail because one object failed: each per-object error is
//! logged at warn level and recorded in [`BatchOutcome::failed`], and the rest
//! of the batch proceeds. Only the inability to form the batch at all (the
//! bucket listing failing) is fatal. The single-object convenience functions
//! invert this: their one failure is promoted to a fatal
//! [`DocPrepError`]. Both behaviours are part of the contract; callers pick
//! the path with the semantics they need.

use crate::config::FlowConfig;
use crate::error::DocPrepError;
use crate::progress::TransferDirection;
use crate::store::ObjectStore;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One fetched object: its store key plus the full content.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub key: String,
    pub bytes: Vec<u8>,
}

/// One object queued for upload.
#[derive(Debug, Clone)]
pub struct FileToUpload {
    pub object_name: String,
    pub data: Vec<u8>,
    pub content_type: String,
}

/// A per-object failure inside a batch call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFailure {
    pub key: String,
    pub reason: String,
}

/// Result of a batch transfer: what made it, and what did not.
///
/// `succeeded` holds payloads in completion order. `failed` holds one record
/// per object that errored; an empty `failed` means the batch was lossless.
#[derive(Debug, Clone)]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<TransferFailure>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    /// True when every object in the batch transferred.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Which objects a batch download should fetch.
#[derive(Debug, Clone)]
pub enum ObjectSelector {
    /// Every object in the bucket.
    All,
    /// Exactly these keys; the bucket is not listed.
    Keys(Vec<String>),
    /// Objects whose key ends with any of these suffixes, compared
    /// case-insensitively (e.g. `[".pdf"]`).
    Extensions(Vec<String>),
}

/// Download a batch of objects from `bucket`.
///
/// The bucket is listed (recursively) unless the selector names explicit
/// keys. A listing failure is fatal; per-object fetch failures are recorded
/// in the outcome and the batch continues.
pub async fn download_batch(
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
    selector: ObjectSelector,
    config: &FlowConfig,
) -> Result<BatchOutcome<RawDocument>, DocPrepError> {
    let keys = match selector {
        ObjectSelector::Keys(keys) => keys,
        ObjectSelector::All => list_bucket(store, bucket).await?,
        ObjectSelector::Extensions(extensions) => {
            filter_keys(list_bucket(store, bucket).await?, &extensions)
        }
    };
    let total = keys.len();
    debug!("Resolved {} objects to download from '{}'", total, bucket);

    if let Some(ref cb) = config.progress {
        cb.on_batch_start(TransferDirection::Download, total);
    }

    let results: Vec<Result<RawDocument, TransferFailure>> =
        stream::iter(keys.into_iter().map(|key| {
            let store = Arc::clone(store);
            let bucket = bucket.to_string();
            let progress = config.progress.clone();
            async move {
                match store.get(&bucket, &key).await {
                    Ok(bytes) => {
                        debug!("Downloaded '{}' ({} bytes)", key, bytes.len());
                        if let Some(ref cb) = progress {
                            cb.on_object_complete(TransferDirection::Download, &key);
                        }
                        Ok(RawDocument { key, bytes })
                    }
                    Err(e) => {
                        warn!("Failed to download '{}' from '{}': {}", key, bucket, e);
                        if let Some(ref cb) = progress {
                            cb.on_object_error(TransferDirection::Download, &key, &e.to_string());
                        }
                        Err(TransferFailure {
                            key,
                            reason: e.to_string(),
                        })
                    }
                }
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    let outcome = collect_outcome(results);
    if let Some(ref cb) = config.progress {
        cb.on_batch_complete(
            TransferDirection::Download,
            outcome.succeeded.len(),
            outcome.failed.len(),
        );
    }
    info!(
        "Download complete: {}/{} successful from '{}'",
        outcome.succeeded.len(),
        total,
        bucket
    );
    Ok(outcome)
}

/// Upload a batch of objects to `bucket`.
///
/// Per-object failures are recorded in the outcome and the batch continues;
/// `succeeded` holds the object names that made it.
pub async fn upload_batch(
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
    files: Vec<FileToUpload>,
    config: &FlowConfig,
) -> BatchOutcome<String> {
    let total = files.len();
    debug!("Uploading {} objects to '{}'", total, bucket);

    if let Some(ref cb) = config.progress {
        cb.on_batch_start(TransferDirection::Upload, total);
    }

    let results: Vec<Result<String, TransferFailure>> =
        stream::iter(files.into_iter().map(|file| {
            let store = Arc::clone(store);
            let bucket = bucket.to_string();
            let progress = config.progress.clone();
            async move {
                let FileToUpload {
                    object_name,
                    data,
                    content_type,
                } = file;
                match store.put(&bucket, &object_name, data, &content_type).await {
                    Ok(()) => {
                        debug!("Uploaded '{}' to '{}'", object_name, bucket);
                        if let Some(ref cb) = progress {
                            cb.on_object_complete(TransferDirection::Upload, &object_name);
                        }
                        Ok(object_name)
                    }
                    Err(e) => {
                        warn!("Failed to upload '{}' to '{}': {}", object_name, bucket, e);
                        if let Some(ref cb) = progress {
                            cb.on_object_error(
                                TransferDirection::Upload,
                                &object_name,
                                &e.to_string(),
                            );
                        }
                        Err(TransferFailure {
                            key: object_name,
                            reason: e.to_string(),
                        })
                    }
                }
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    let outcome = collect_outcome(results);
    if let Some(ref cb) = config.progress {
        cb.on_batch_complete(
            TransferDirection::Upload,
            outcome.succeeded.len(),
            outcome.failed.len(),
        );
    }
    info!(
        "Upload complete: {}/{} successful to '{}'",
        outcome.succeeded.len(),
        total,
        bucket
    );
    outcome
}

/// Fetch a single object. Unlike the batch path, a failure here is fatal.
pub async fn download_object(
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
    key: &str,
) -> Result<RawDocument, DocPrepError> {
    match store.get(bucket, key).await {
        Ok(bytes) => Ok(RawDocument {
            key: key.to_string(),
            bytes,
        }),
        Err(e) => Err(DocPrepError::DownloadFailed {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Upload a single object. Unlike the batch path, a failure here is fatal.
pub async fn upload_object(
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
    file: FileToUpload,
) -> Result<String, DocPrepError> {
    let FileToUpload {
        object_name,
        data,
        content_type,
    } = file;
    match store.put(bucket, &object_name, data, &content_type).await {
        Ok(()) => Ok(object_name),
        Err(e) => Err(DocPrepError::UploadFailed {
            bucket: bucket.to_string(),
            key: object_name,
            reason: e.to_string(),
        }),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn list_bucket(
    store: &Arc<dyn ObjectStore>,
    bucket: &str,
) -> Result<Vec<String>, DocPrepError> {
    store
        .list(bucket, true)
        .await
        .map_err(|e| DocPrepError::ListFailed {
            bucket: bucket.to_string(),
            reason: e.to_string(),
        })
}

/// Keep only keys ending with one of `extensions` (case-insensitive).
/// An empty extension list keeps everything.
fn filter_keys(keys: Vec<String>, extensions: &[String]) -> Vec<String> {
    if extensions.is_empty() {
        return keys;
    }
    keys.into_iter()
        .filter(|key| {
            let lower = key.to_lowercase();
            extensions
                .iter()
                .any(|ext| lower.ends_with(&ext.to_lowercase()))
        })
        .collect()
}

fn collect_outcome<T>(results: Vec<Result<T, TransferFailure>>) -> BatchOutcome<T> {
    let mut outcome = BatchOutcome::default();
    for result in results {
        match result {
            Ok(item) => outcome.succeeded.push(item),
            Err(failure) => outcome.failed.push(failure),
        }
    }
    outcome
}
