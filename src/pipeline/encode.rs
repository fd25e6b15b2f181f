//! Image encoding: `DynamicImage` → JPEG bytes ready for upload.
//!
//! Every artefact this crate publishes is a JPEG. Training crops tolerate
//! lossy compression well, and at 300 DPI the storage and transfer volume of
//! lossless formats dwarfs any fidelity gain. Annotation tools also preview
//! JPEGs natively in the browser.

use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;
use uuid::Uuid;

/// Content type declared for every uploaded image.
///
/// The non-registered `image/jpg` spelling is kept deliberately: all objects
/// already stored by earlier runs carry it, and every consumer accepts it.
pub const JPEG_CONTENT_TYPE: &str = "image/jpg";

/// Generate a fresh `{uuid}.jpg` object name.
///
/// Names are random rather than derived from the source, so repeated runs
/// never overwrite earlier artefacts.
pub fn unique_jpeg_name() -> String {
    format!("{}.jpg", Uuid::new_v4())
}

/// Encode an image as JPEG bytes.
///
/// Images carrying an alpha channel are flattened to RGB first; the JPEG
/// encoder rejects RGBA input outright.
pub fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match img {
        DynamicImage::ImageRgb8(_) => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)?;
        }
        _ => {
            DynamicImage::ImageRgb8(img.to_rgb8())
                .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)?;
        }
    }
    debug!("Encoded image → {} bytes JPEG", buf.len());
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn encode_rgb_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 0, 0])));
        let bytes = encode_jpeg(&img).expect("encode should succeed");
        // JPEG start-of-image marker.
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn encode_rgba_image_flattens_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 255, 0, 128])));
        let bytes = encode_jpeg(&img).expect("alpha input should flatten, not fail");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn names_are_unique_and_jpg_suffixed() {
        let a = unique_jpeg_name();
        let b = unique_jpeg_name();
        assert!(a.ends_with(".jpg"));
        assert!(b.ends_with(".jpg"));
        assert_ne!(a, b);
    }
}
