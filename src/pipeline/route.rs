//! Label routing: classify each crop's labels into output categories.
//!
//! Three category lists come from configuration. Every label in a crop's
//! label set is routed independently: the first list containing it (checked
//! in OCR, TableFormer, ImageCaption order) wins for that label, so one crop
//! can fan out into several categories at once. Labels matching no list are
//! dropped with a warning.

use crate::config::FlowConfig;
use crate::pipeline::crop::Crop;
use crate::pipeline::encode::{self, JPEG_CONTENT_TYPE};
use crate::transfer::FileToUpload;
use std::fmt;
use tracing::{debug, warn};

/// Output category a routed label lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteCategory {
    Ocr,
    TableFormer,
    ImageCaption,
}

impl RouteCategory {
    /// The bucket configured as this category's upload destination.
    pub fn target_folder<'a>(&self, config: &'a FlowConfig) -> &'a str {
        match self {
            RouteCategory::Ocr => &config.target_ocr_folder,
            RouteCategory::TableFormer => &config.target_tableformer_folder,
            RouteCategory::ImageCaption => &config.target_imagecaption_folder,
        }
    }
}

impl fmt::Display for RouteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteCategory::Ocr => write!(f, "OCR"),
            RouteCategory::TableFormer => write!(f, "TableFormer"),
            RouteCategory::ImageCaption => write!(f, "ImageCaption"),
        }
    }
}

/// A crop's encoded bytes destined for one category's bucket.
#[derive(Debug, Clone)]
pub struct RoutedFile {
    pub category: RouteCategory,
    pub file: FileToUpload,
}

/// Routes labels into categories by first match across the configured lists.
///
/// Routing is a pure function of the label and the three lists, so the same
/// crop always receives the same category assignment.
#[derive(Debug, Clone, Default)]
pub struct LabelRouter {
    ocr: Vec<String>,
    tableformer: Vec<String>,
    imagecaption: Vec<String>,
}

impl LabelRouter {
    pub fn new(ocr: Vec<String>, tableformer: Vec<String>, imagecaption: Vec<String>) -> Self {
        Self {
            ocr,
            tableformer,
            imagecaption,
        }
    }

    pub fn from_config(config: &FlowConfig) -> Self {
        Self::new(
            config.filtered_ocr_labels.clone(),
            config.filtered_tableformer_labels.clone(),
            config.filtered_imagecaption_labels.clone(),
        )
    }

    /// The first list containing `label` wins, in (OCR, TableFormer,
    /// ImageCaption) order. `None` when no list contains it.
    pub fn route_label(&self, label: &str) -> Option<RouteCategory> {
        if self.ocr.iter().any(|l| l == label) {
            return Some(RouteCategory::Ocr);
        }
        if self.tableformer.iter().any(|l| l == label) {
            return Some(RouteCategory::TableFormer);
        }
        if self.imagecaption.iter().any(|l| l == label) {
            return Some(RouteCategory::ImageCaption);
        }
        None
    }

    /// Fan one crop out into routed files, one per matched label.
    ///
    /// The crop's image is JPEG-encoded once and the bytes shared by all of
    /// its outputs; each output still gets its own generated object name.
    /// Unmatched labels produce nothing. A crop whose image the encoder
    /// rejects (a zero-area region, for instance) is dropped with a warning
    /// rather than failing the batch.
    pub fn route_crop(&self, crop: &Crop) -> Vec<RoutedFile> {
        let mut matched = Vec::new();
        for label in &crop.labels {
            match self.route_label(label) {
                Some(category) => matched.push((label.as_str(), category)),
                None => warn!("Label '{}' matches no routing list, dropping", label),
            }
        }
        if matched.is_empty() {
            return Vec::new();
        }

        let data = match encode::encode_jpeg(&crop.image) {
            Ok(data) => data,
            Err(e) => {
                warn!(
                    "Dropping crop {:?} ({}x{} px): JPEG encoding failed: {}",
                    crop.labels,
                    crop.image.width(),
                    crop.image.height(),
                    e
                );
                return Vec::new();
            }
        };

        matched
            .into_iter()
            .map(|(label, category)| {
                debug!("Routing label '{}' to {}", label, category);
                RoutedFile {
                    category,
                    file: FileToUpload {
                        object_name: encode::unique_jpeg_name(),
                        data: data.clone(),
                        content_type: JPEG_CONTENT_TYPE.to_string(),
                    },
                }
            })
            .collect()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::crop::{Crop, PixelRegion};
    use image::{DynamicImage, Rgb, RgbImage};

    fn test_router() -> LabelRouter {
        LabelRouter::new(
            vec!["text".to_string(), "title".to_string()],
            vec!["table".to_string()],
            vec!["picture".to_string()],
        )
    }

    fn crop_with_labels(labels: &[&str]) -> Crop {
        Crop {
            image: DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([0, 0, 255]))),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            region: PixelRegion {
                x: 0,
                y: 0,
                width: 20,
                height: 10,
            },
        }
    }

    #[test]
    fn label_only_in_tableformer_list_routes_there_once() {
        let routed = test_router().route_crop(&crop_with_labels(&["table"]));
        assert_eq!(routed.len(), 1);
        assert_eq!(routed[0].category, RouteCategory::TableFormer);
        assert!(routed[0].file.object_name.ends_with(".jpg"));
        assert_eq!(routed[0].file.content_type, JPEG_CONTENT_TYPE);
        assert_eq!(&routed[0].file.data[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn first_matching_list_wins_per_label() {
        // "text" sits in both the OCR and TableFormer lists; OCR is checked
        // first and claims it.
        let router = LabelRouter::new(
            vec!["text".to_string()],
            vec!["text".to_string()],
            vec![],
        );
        assert_eq!(router.route_label("text"), Some(RouteCategory::Ocr));
    }

    #[test]
    fn crop_fans_out_per_label_sharing_one_encoding() {
        let routed = test_router().route_crop(&crop_with_labels(&["text", "table"]));
        assert_eq!(routed.len(), 2);

        let categories: Vec<_> = routed.iter().map(|r| r.category).collect();
        assert!(categories.contains(&RouteCategory::Ocr));
        assert!(categories.contains(&RouteCategory::TableFormer));

        // One encode per crop: both outputs carry identical bytes but
        // independent object names.
        assert_eq!(routed[0].file.data, routed[1].file.data);
        assert_ne!(routed[0].file.object_name, routed[1].file.object_name);
    }

    #[test]
    fn unmatched_labels_are_dropped() {
        let routed = test_router().route_crop(&crop_with_labels(&["stamp"]));
        assert!(routed.is_empty());

        let partial = test_router().route_crop(&crop_with_labels(&["stamp", "title"]));
        assert_eq!(partial.len(), 1);
        assert_eq!(partial[0].category, RouteCategory::Ocr);
    }

    #[test]
    fn routing_is_idempotent_on_category_assignment() {
        let router = test_router();
        let crop = crop_with_labels(&["text", "picture"]);

        let mut first: Vec<_> = router.route_crop(&crop).iter().map(|r| r.category).collect();
        let mut second: Vec<_> = router.route_crop(&crop).iter().map(|r| r.category).collect();
        first.sort_by_key(|c| format!("{c}"));
        second.sort_by_key(|c| format!("{c}"));
        assert_eq!(first, second);
    }

    #[test]
    fn degenerate_crop_never_panics() {
        let degenerate = Crop {
            image: DynamicImage::ImageRgb8(RgbImage::new(0, 0)),
            labels: vec!["table".to_string()],
            region: PixelRegion {
                x: 50,
                y: 50,
                width: 0,
                height: 0,
            },
        };
        let routed = test_router().route_crop(&degenerate);
        // Whether the encoder accepts a zero-area image is its business; the
        // router must only stay on its feet and emit well-formed outputs.
        assert!(routed
            .iter()
            .all(|r| r.file.object_name.ends_with(".jpg")));
    }

    #[test]
    fn category_target_folders_follow_config() {
        let config = FlowConfig::builder()
            .target_ocr_folder("crops-ocr")
            .target_tableformer_folder("crops-tables")
            .target_imagecaption_folder("crops-captions")
            .build()
            .unwrap();
        assert_eq!(RouteCategory::Ocr.target_folder(&config), "crops-ocr");
        assert_eq!(
            RouteCategory::TableFormer.target_folder(&config),
            "crops-tables"
        );
        assert_eq!(
            RouteCategory::ImageCaption.target_folder(&config),
            "crops-captions"
        );
    }
}
