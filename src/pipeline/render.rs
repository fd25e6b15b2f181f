//! PDF rasterisation: render every page to an RGB `DynamicImage` via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling during CPU-heavy rendering.
//!
//! ## Scale model
//!
//! PDF geometry is expressed in points, 72 per inch. Rendering at a target
//! DPI is a uniform scale of `dpi / 72` on both axes, so a US-Letter page
//! (612 × 792 pt) at 300 DPI produces a 2550 × 3300 px image.
//!
//! Pages of one document render strictly sequentially; parallelism happens
//! across documents in the flow layer, not inside a document.

use crate::config::FlowConfig;
use crate::error::DocPrepError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Uniform page scale factor for a target DPI.
pub fn scale_for_dpi(dpi: u32) -> f32 {
    dpi as f32 / 72.0
}

/// Rasterise a PDF byte buffer into one RGB image per page, in page order.
///
/// `key` is the object-store key the bytes came from; it appears in logs and
/// error values. Rendering honours `config.dpi` and stops early at
/// `config.max_pages`.
///
/// # Errors
/// [`DocPrepError::CorruptPdf`] if the bytes cannot be opened as a PDF;
/// [`DocPrepError::RasterisationFailed`] if any page fails to render. Page
/// failures are not individually recoverable: the whole document fails.
pub async fn render_pdf(
    bytes: Vec<u8>,
    key: &str,
    config: &FlowConfig,
) -> Result<Vec<DynamicImage>, DocPrepError> {
    let key = key.to_string();
    let dpi = config.dpi;
    let max_pages = config.max_pages;

    tokio::task::spawn_blocking(move || render_pdf_blocking(&bytes, &key, dpi, max_pages))
        .await
        .map_err(|e| DocPrepError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of document rendering.
fn render_pdf_blocking(
    bytes: &[u8],
    key: &str,
    dpi: u32,
    max_pages: Option<usize>,
) -> Result<Vec<DynamicImage>, DocPrepError> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| DocPrepError::CorruptPdf {
            key: key.to_string(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("'{}' opened: {} pages", key, total_pages);

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale_for_dpi(dpi));

    let mut images = Vec::with_capacity(max_pages.unwrap_or(total_pages).min(total_pages));

    for index in 0..total_pages {
        if let Some(cap) = max_pages {
            if index >= cap {
                info!(
                    "Reached page cap {} for '{}', skipping remaining {} pages",
                    cap,
                    key,
                    total_pages - index
                );
                break;
            }
        }

        let page = pages
            .get(index as u16)
            .map_err(|e| DocPrepError::RasterisationFailed {
                key: key.to_string(),
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| DocPrepError::RasterisationFailed {
                    key: key.to_string(),
                    page: index + 1,
                    detail: format!("{:?}", e),
                })?;

        // Alpha is discarded outright, never composited against a background.
        let image = DynamicImage::ImageRgb8(bitmap.as_image().to_rgb8());
        debug!(
            "Rendered page {} of '{}' at {}x{} px",
            index + 1,
            key,
            image.width(),
            image.height()
        );

        images.push(image);
    }

    Ok(images)
}
