//! Flow output types.
//!
//! A flow run always produces a [`FlowReport`], even when some objects in
//! the batch failed: per-object failures are recorded here instead of
//! aborting the run. Callers that need hard guarantees can inspect
//! [`FlowReport::is_clean`] after the fact.

use crate::transfer::TransferFailure;
use serde::{Deserialize, Serialize};

/// Summary of one flow run.
///
/// Counters cover the whole batch; the `failed_*` lists carry one record per
/// object that was skipped after a download or upload error. Durations are
/// wall-clock milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowReport {
    /// Flow name this report belongs to.
    pub flow: String,
    /// Objects selected from the source bucket.
    pub objects_listed: usize,
    /// Objects whose bytes actually arrived.
    pub objects_downloaded: usize,
    /// Output files produced by the processing stage (page images or crops).
    pub outputs_produced: usize,
    /// Output files that landed in their target bucket.
    pub objects_uploaded: usize,
    /// Inputs dropped by the processing stage (unparseable exports, skipped
    /// annotation results, crops no routing list claimed).
    pub skipped: usize,
    /// Per-object download failures, in completion order.
    pub failed_downloads: Vec<TransferFailure>,
    /// Per-object upload failures, in completion order.
    pub failed_uploads: Vec<TransferFailure>,
    /// End-to-end wall time for the run.
    pub total_duration_ms: u64,
    /// Time spent fetching source objects.
    pub download_duration_ms: u64,
    /// Time spent pushing outputs to their target buckets.
    pub upload_duration_ms: u64,
}

impl FlowReport {
    pub fn new(flow: impl Into<String>) -> Self {
        Self {
            flow: flow.into(),
            ..Self::default()
        }
    }

    /// True when every selected object made it all the way through.
    pub fn is_clean(&self) -> bool {
        self.failed_downloads.is_empty() && self.failed_uploads.is_empty()
    }

    /// Total number of per-object failures across both directions.
    pub fn failure_count(&self) -> usize {
        self.failed_downloads.len() + self.failed_uploads.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_report_is_clean() {
        let report = FlowReport::new("extract_pdfs_to_images");
        assert_eq!(report.flow, "extract_pdfs_to_images");
        assert!(report.is_clean());
        assert_eq!(report.failure_count(), 0);
    }

    #[test]
    fn recorded_failures_flip_is_clean() {
        let mut report = FlowReport::new("extract_layout_to_images");
        report.failed_downloads.push(TransferFailure {
            key: "batch/0007.pdf".to_string(),
            reason: "connection reset".to_string(),
        });
        assert!(!report.is_clean());
        assert_eq!(report.failure_count(), 1);
    }

    #[test]
    fn report_serialises_with_failure_records() {
        let mut report = FlowReport::new("extract_pdfs_to_images");
        report.objects_listed = 3;
        report.failed_uploads.push(TransferFailure {
            key: "a1.jpg".to_string(),
            reason: "slow down".to_string(),
        });

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"flow\":\"extract_pdfs_to_images\""));
        assert!(json.contains("\"objects_listed\":3"));
        assert!(json.contains("\"failed_uploads\":[{\"key\":\"a1.jpg\""));

        let back: FlowReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.failed_uploads.len(), 1);
        assert!(!back.is_clean());
    }
}
