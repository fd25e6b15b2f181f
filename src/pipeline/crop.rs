//! Annotation-driven cropping: percentage geometry → absolute pixel crops.
//!
//! Annotation geometry is normalised to 0–100 percent of the source image,
//! so the pixel box must be recomputed against every image's true dimensions
//! rather than any assumed size. Percentages are not validated: out-of-range
//! input yields an out-of-range box, and the crop call truncates it at the
//! image boundary. A zero-area box is structurally fine here; whether its
//! JPEG survives encoding is the router's problem.

use crate::pipeline::annotations::{AnnotationResult, RECTANGLE_LABELS};
use image::DynamicImage;
use std::collections::HashSet;
use tracing::warn;

/// Absolute pixel geometry of one crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRegion {
    /// Convert percentage geometry into pixels against the given image size.
    ///
    /// Each value is `pct / 100 × dimension`, rounded half-to-even. Negative
    /// input saturates to zero at the cast.
    pub fn from_percentages(
        (x, y, width, height): (f64, f64, f64, f64),
        image_width: u32,
        image_height: u32,
    ) -> Self {
        let to_px = |pct: f64, dim: u32| (pct / 100.0 * f64::from(dim)).round_ties_even() as u32;
        Self {
            x: to_px(x, image_width),
            y: to_px(y, image_height),
            width: to_px(width, image_width),
            height: to_px(height, image_height),
        }
    }
}

/// One cropped sub-image plus the label set and pixel geometry it came from.
#[derive(Debug, Clone)]
pub struct Crop {
    pub image: DynamicImage,
    pub labels: Vec<String>,
    pub region: PixelRegion,
}

/// Cut every valid bounding-box result out of `image`.
///
/// Results are skipped with a warning when their type is not
/// [`RECTANGLE_LABELS`], their label set is empty, or any geometry field is
/// absent; the rest of the list is still processed. Duplicate labels within
/// one result collapse to their first occurrence, so a crop's label set
/// never routes the same label twice.
pub fn crop_annotated_regions(image: &DynamicImage, results: &[AnnotationResult]) -> Vec<Crop> {
    let mut crops = Vec::new();

    for result in results {
        if result.result_type != RECTANGLE_LABELS {
            warn!(
                "Skipping result of type '{}' (not a bounding box)",
                result.result_type
            );
            continue;
        }
        let labels = dedup_labels(&result.value.rectanglelabels);
        if labels.is_empty() {
            warn!("Skipping bounding box without labels");
            continue;
        }
        let Some(geometry) = result.value.geometry() else {
            warn!("Skipping result labelled {:?}: incomplete geometry", labels);
            continue;
        };

        let region = PixelRegion::from_percentages(geometry, image.width(), image.height());
        // crop_imm truncates regions that overhang the image boundary.
        let cropped = image.crop_imm(region.x, region.y, region.width, region.height);
        crops.push(Crop {
            image: cropped,
            labels,
            region,
        });
    }

    crops
}

fn dedup_labels(labels: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    labels
        .iter()
        .filter(|label| seen.insert(label.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::annotations::ResultValue;
    use image::{Rgb, RgbImage};

    fn rectangle(labels: &[&str], x: f64, y: f64, width: f64, height: f64) -> AnnotationResult {
        AnnotationResult {
            result_type: RECTANGLE_LABELS.to_string(),
            value: ResultValue {
                rectanglelabels: labels.iter().map(|s| s.to_string()).collect(),
                x: Some(x),
                y: Some(y),
                width: Some(width),
                height: Some(height),
            },
        }
    }

    fn blank_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
    }

    #[test]
    fn percent_box_on_1000x800_lands_at_100_80_300_240() {
        let image = blank_image(1000, 800);
        let crops = crop_annotated_regions(&image, &[rectangle(&["text"], 10.0, 10.0, 20.0, 20.0)]);

        assert_eq!(crops.len(), 1);
        let crop = &crops[0];
        assert_eq!(
            crop.region,
            PixelRegion {
                x: 100,
                y: 80,
                width: 200,
                height: 160
            }
        );
        // Box end: (x + width, y + height) = (300, 240).
        assert_eq!(crop.region.x + crop.region.width, 300);
        assert_eq!(crop.region.y + crop.region.height, 240);
        assert_eq!((crop.image.width(), crop.image.height()), (200, 160));
    }

    #[test]
    fn conversion_rounds_half_to_even() {
        // 0.5% of 300 px = 1.5 px → 2; 0.5% of 500 px = 2.5 px → 2.
        let region = PixelRegion::from_percentages((0.5, 0.5, 50.0, 50.0), 300, 500);
        assert_eq!(region.x, 2);
        assert_eq!(region.y, 2);
    }

    #[test]
    fn well_formed_box_stays_inside_the_image() {
        let region = PixelRegion::from_percentages((12.3, 45.6, 33.3, 21.9), 1000, 800);
        assert!(region.x + region.width <= 1000);
        assert!(region.y + region.height <= 800);
    }

    #[test]
    fn zero_area_region_does_not_panic() {
        let image = blank_image(100, 100);
        let crops = crop_annotated_regions(&image, &[rectangle(&["text"], 50.0, 50.0, 0.0, 0.0)]);
        assert_eq!(crops.len(), 1);
        assert_eq!(crops[0].image.width(), 0);
        assert_eq!(crops[0].image.height(), 0);
    }

    #[test]
    fn overhanging_region_truncates_at_the_boundary() {
        let image = blank_image(100, 100);
        let crops = crop_annotated_regions(&image, &[rectangle(&["text"], 90.0, 90.0, 20.0, 20.0)]);
        assert_eq!(crops.len(), 1);
        assert_eq!((crops[0].image.width(), crops[0].image.height()), (10, 10));
    }

    #[test]
    fn negative_percentages_saturate_to_zero() {
        let region = PixelRegion::from_percentages((-10.0, -5.0, 20.0, 20.0), 1000, 800);
        assert_eq!(region.x, 0);
        assert_eq!(region.y, 0);
    }

    #[test]
    fn invalid_results_are_skipped_without_aborting_the_list() {
        let image = blank_image(200, 200);

        let wrong_type = AnnotationResult {
            result_type: "choices".to_string(),
            ..rectangle(&["text"], 0.0, 0.0, 10.0, 10.0)
        };
        let no_labels = rectangle(&[], 0.0, 0.0, 10.0, 10.0);
        let mut incomplete = rectangle(&["text"], 0.0, 0.0, 10.0, 10.0);
        incomplete.value.height = None;
        let valid = rectangle(&["table"], 25.0, 25.0, 50.0, 50.0);

        let crops =
            crop_annotated_regions(&image, &[wrong_type, no_labels, incomplete, valid]);
        assert_eq!(crops.len(), 1);
        assert_eq!(crops[0].labels, vec!["table"]);
    }

    #[test]
    fn duplicate_labels_collapse_to_first_occurrence() {
        let image = blank_image(100, 100);
        let crops = crop_annotated_regions(
            &image,
            &[rectangle(&["text", "table", "text"], 0.0, 0.0, 50.0, 50.0)],
        );
        assert_eq!(crops[0].labels, vec!["text", "table"]);
    }
}
