//! Serde model for exported annotation documents.
//!
//! The cropper consumes annotation exports that were written to the object
//! store earlier (one JSON document per annotated task, no live API call):
//!
//! ```json
//! {
//!   "task": { "data": { "image": "s3://utils/scans/page-3.jpg" } },
//!   "result": [
//!     {
//!       "type": "rectanglelabels",
//!       "value": {
//!         "rectanglelabels": ["table"],
//!         "x": 10.0, "y": 10.0, "width": 20.0, "height": 20.0
//!       }
//!     }
//!   ]
//! }
//! ```
//!
//! Geometry is percentages (0–100) of the source image's dimensions. Every
//! field tolerates absence: deserialisation never rejects a document for
//! missing geometry or labels — those records are filtered later by the
//! cropper, which logs what it skips. Exports carry plenty of keys this
//! pipeline never reads (`original_width`, `image_rotation`, ids); serde
//! ignores them.

use serde::Deserialize;

/// Result type string for bounding-box annotations. Results of any other
/// type are skipped by the cropper.
pub const RECTANGLE_LABELS: &str = "rectanglelabels";

/// One exported annotation document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotationExport {
    #[serde(default)]
    pub task: AnnotatedTask,
    #[serde(default)]
    pub result: Vec<AnnotationResult>,
}

/// The task the annotation was made against.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotatedTask {
    #[serde(default)]
    pub data: TaskData,
}

/// Task payload; only the image reference matters here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskData {
    #[serde(default)]
    pub image: Option<String>,
}

/// One labelled region (or other result kind) inside an export.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotationResult {
    #[serde(rename = "type", default)]
    pub result_type: String,
    #[serde(default)]
    pub value: ResultValue,
}

/// Geometry and label set of a result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultValue {
    #[serde(default)]
    pub rectanglelabels: Vec<String>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

impl AnnotationExport {
    /// Parse one export document from raw JSON bytes.
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// The export's image reference, if it has a non-empty one.
    pub fn image_ref(&self) -> Option<&str> {
        self.task.data.image.as_deref().filter(|s| !s.is_empty())
    }
}

impl ResultValue {
    /// All four geometry fields as `(x, y, width, height)` percentages, or
    /// `None` when any of them is absent.
    pub fn geometry(&self) -> Option<(f64, f64, f64, f64)> {
        Some((self.x?, self.y?, self.width?, self.height?))
    }
}

/// Derive the object-store key for an exported image reference.
///
/// `s3://bucket/key` references drop the scheme and bucket name; anything
/// else drops a leading slash. Query strings and fragments are stripped
/// first. Returns `None` when nothing usable remains.
pub fn object_key_from_image_ref(image_ref: &str) -> Option<String> {
    let trimmed = image_ref.split(['?', '#']).next().unwrap_or(image_ref);
    let key = if let Some(rest) = trimmed.strip_prefix("s3://") {
        rest.split_once('/').map(|(_bucket, key)| key)?
    } else {
        trimmed.trim_start_matches('/')
    };
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_export() {
        let json = r#"{
            "task": { "data": { "image": "s3://utils/scans/page-3.jpg" } },
            "result": [
                {
                    "id": "r1",
                    "type": "rectanglelabels",
                    "original_width": 1000,
                    "original_height": 800,
                    "image_rotation": 0,
                    "value": {
                        "rectanglelabels": ["table"],
                        "x": 10.0, "y": 10.0, "width": 20.0, "height": 20.0
                    }
                }
            ]
        }"#;
        let export = AnnotationExport::from_json(json.as_bytes()).unwrap();
        assert_eq!(export.image_ref(), Some("s3://utils/scans/page-3.jpg"));
        assert_eq!(export.result.len(), 1);

        let result = &export.result[0];
        assert_eq!(result.result_type, RECTANGLE_LABELS);
        assert_eq!(result.value.rectanglelabels, vec!["table"]);
        assert_eq!(result.value.geometry(), Some((10.0, 10.0, 20.0, 20.0)));
    }

    #[test]
    fn missing_fields_do_not_reject_the_document() {
        let export = AnnotationExport::from_json(br#"{ "result": [ { "type": "choices" } ] }"#)
            .unwrap();
        assert_eq!(export.image_ref(), None);
        assert_eq!(export.result[0].value.geometry(), None);
        assert!(export.result[0].value.rectanglelabels.is_empty());
    }

    #[test]
    fn empty_image_ref_counts_as_absent() {
        let export = AnnotationExport::from_json(br#"{ "task": { "data": { "image": "" } } }"#)
            .unwrap();
        assert_eq!(export.image_ref(), None);
    }

    #[test]
    fn partial_geometry_is_incomplete() {
        let json = r#"{
            "result": [ {
                "type": "rectanglelabels",
                "value": { "rectanglelabels": ["text"], "x": 5.0, "y": 5.0, "width": 10.0 }
            } ]
        }"#;
        let export = AnnotationExport::from_json(json.as_bytes()).unwrap();
        assert_eq!(export.result[0].value.geometry(), None);
    }

    #[test]
    fn image_ref_resolution() {
        assert_eq!(
            object_key_from_image_ref("s3://utils/scans/page-3.jpg").as_deref(),
            Some("scans/page-3.jpg")
        );
        assert_eq!(
            object_key_from_image_ref("/scans/page-3.jpg").as_deref(),
            Some("scans/page-3.jpg")
        );
        assert_eq!(
            object_key_from_image_ref("page.jpg?version=2#frag").as_deref(),
            Some("page.jpg")
        );
        // A bucket with no key inside it resolves to nothing.
        assert_eq!(object_key_from_image_ref("s3://utils"), None);
        assert_eq!(object_key_from_image_ref(""), None);
        assert_eq!(object_key_from_image_ref("/"), None);
    }
}
