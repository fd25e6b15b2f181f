//! The two production flows.
//!
//! Each flow is a complete unit of work against the object store: select
//! source objects, pull them through the processing pipeline, and push the
//! resulting JPEG files to their target buckets. Flows never hold global
//! state; the store handle is constructed once by the caller and injected,
//! which is also how tests run them against an in-memory store.
//!
//! Per-object transfer failures do not abort a flow. They are logged,
//! recorded on the [`FlowReport`], and the remaining objects continue.
//! Failures that poison the whole run (an unreachable bucket, a corrupt
//! PDF, a page that will not rasterise) surface as [`DocPrepError`].

use crate::config::FlowConfig;
use crate::error::DocPrepError;
use crate::output::FlowReport;
use crate::pipeline::annotations::{self, AnnotationExport, AnnotationResult};
use crate::pipeline::crop;
use crate::pipeline::encode::{self, JPEG_CONTENT_TYPE};
use crate::pipeline::render;
use crate::pipeline::route::{LabelRouter, RouteCategory, RoutedFile};
use crate::store::ObjectStore;
use crate::transfer::{self, FileToUpload, ObjectSelector, RawDocument};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Flow name for the PDF rasterisation flow, as it appears in config files
/// and logs.
pub const EXTRACT_PDFS_TO_IMAGES: &str = "extract_pdfs_to_images";

/// Flow name for the annotation cropping flow.
pub const EXTRACT_LAYOUT_TO_IMAGES: &str = "extract_layout_to_images";

/// Rasterise every PDF in the source bucket into per-page JPEG images.
///
/// Downloads all `.pdf` objects, renders each document's pages in order at
/// the configured DPI, and uploads one `{uuid}.jpg` per page to the target
/// bucket. Documents are rasterised one at a time; the transfer phases fan
/// out over the configured worker pool.
///
/// # Errors
///
/// Fatal when the source bucket cannot be listed, a downloaded document is
/// not a readable PDF, a page fails to rasterise, or a page image cannot be
/// encoded. Per-object download and upload failures are recorded on the
/// report instead.
pub async fn extract_pdfs_to_images(
    store: &Arc<dyn ObjectStore>,
    config: &FlowConfig,
) -> Result<FlowReport, DocPrepError> {
    let total_start = Instant::now();
    let mut report = FlowReport::new(EXTRACT_PDFS_TO_IMAGES);
    info!(
        "Starting {}: '{}' -> '{}' at {} DPI",
        EXTRACT_PDFS_TO_IMAGES, config.source_folder, config.target_folder, config.dpi
    );

    // ── Step 1: Download every PDF in the source bucket ──────────────────
    let download_start = Instant::now();
    let downloads = transfer::download_batch(
        store,
        &config.source_folder,
        ObjectSelector::Extensions(vec![".pdf".to_string()]),
        config,
    )
    .await?;
    report.download_duration_ms = download_start.elapsed().as_millis() as u64;
    report.objects_listed = downloads.succeeded.len() + downloads.failed.len();
    report.objects_downloaded = downloads.succeeded.len();
    report.failed_downloads = downloads.failed;

    // ── Step 2: Rasterise each document and encode its pages ─────────────
    let mut uploads = Vec::new();
    for document in downloads.succeeded {
        let RawDocument { key, bytes } = document;
        let pages = render::render_pdf(bytes, &key, config).await?;
        debug!("Rendered {} page(s) from '{}'", pages.len(), key);

        for page in &pages {
            let data = encode::encode_jpeg(page).map_err(|e| DocPrepError::EncodeFailed {
                key: key.clone(),
                detail: e.to_string(),
            })?;
            uploads.push(FileToUpload {
                object_name: encode::unique_jpeg_name(),
                data,
                content_type: JPEG_CONTENT_TYPE.to_string(),
            });
        }
    }
    report.outputs_produced = uploads.len();

    // ── Step 3: Upload the page images ───────────────────────────────────
    let upload_start = Instant::now();
    let uploaded = transfer::upload_batch(store, &config.target_folder, uploads, config).await;
    report.upload_duration_ms = upload_start.elapsed().as_millis() as u64;
    report.objects_uploaded = uploaded.succeeded.len();
    report.failed_uploads = uploaded.failed;

    report.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "{} complete: {}/{} documents processed, {} page image(s) uploaded, {}ms total",
        EXTRACT_PDFS_TO_IMAGES,
        report.objects_downloaded,
        report.objects_listed,
        report.objects_uploaded,
        report.total_duration_ms
    );
    Ok(report)
}

/// One annotation export whose image reference resolved to an object key.
struct ParsedExport {
    export_key: String,
    image_key: String,
    results: Vec<AnnotationResult>,
}

/// Cut labeled regions out of annotated images and sort them into the
/// OCR / TableFormer / ImageCaption buckets.
///
/// Downloads all `.json` annotation exports from the source bucket, resolves
/// each export's image reference to an object key, batch-downloads the
/// referenced images, crops every rectangle-labeled region at the image's
/// true pixel dimensions, and routes each crop by its labels. Exports that
/// cannot be parsed, resolved, or decoded are skipped with a warning and
/// counted on the report.
///
/// # Errors
///
/// Fatal only when the source bucket cannot be listed. Everything else is
/// either skipped (bad exports, unroutable labels) or recorded as a
/// per-object failure on the report.
pub async fn extract_layout_to_images(
    store: &Arc<dyn ObjectStore>,
    config: &FlowConfig,
) -> Result<FlowReport, DocPrepError> {
    let total_start = Instant::now();
    let mut report = FlowReport::new(EXTRACT_LAYOUT_TO_IMAGES);
    let router = LabelRouter::from_config(config);
    info!(
        "Starting {}: '{}' -> OCR '{}', TableFormer '{}', ImageCaption '{}'",
        EXTRACT_LAYOUT_TO_IMAGES,
        config.source_folder,
        config.target_ocr_folder,
        config.target_tableformer_folder,
        config.target_imagecaption_folder
    );

    // ── Step 1: Download the annotation exports ──────────────────────────
    let download_start = Instant::now();
    let exports = transfer::download_batch(
        store,
        &config.source_folder,
        ObjectSelector::Extensions(vec![".json".to_string()]),
        config,
    )
    .await?;
    report.download_duration_ms = download_start.elapsed().as_millis() as u64;
    report.objects_listed = exports.succeeded.len() + exports.failed.len();
    report.objects_downloaded = exports.succeeded.len();
    report.failed_downloads = exports.failed;

    // ── Step 2: Parse exports and resolve their image references ─────────
    let mut parsed: Vec<ParsedExport> = Vec::new();
    for RawDocument { key, bytes } in exports.succeeded {
        let export = match AnnotationExport::from_json(&bytes) {
            Ok(export) => export,
            Err(e) => {
                warn!("Skipping '{}': not a readable annotation export: {}", key, e);
                report.skipped += 1;
                continue;
            }
        };
        let image_key = {
            let Some(image_ref) = export.image_ref() else {
                warn!("Skipping '{}': export carries no image reference", key);
                report.skipped += 1;
                continue;
            };
            match annotations::object_key_from_image_ref(image_ref) {
                Some(image_key) => image_key,
                None => {
                    warn!(
                        "Skipping '{}': image reference '{}' has no object key",
                        key, image_ref
                    );
                    report.skipped += 1;
                    continue;
                }
            }
        };
        parsed.push(ParsedExport {
            export_key: key,
            image_key,
            results: export.result,
        });
    }

    // ── Step 3: Download the referenced images ───────────────────────────
    let mut seen = HashSet::new();
    let image_keys: Vec<String> = parsed
        .iter()
        .map(|p| p.image_key.clone())
        .filter(|k| seen.insert(k.clone()))
        .collect();
    let image_download_start = Instant::now();
    let images = transfer::download_batch(
        store,
        &config.source_folder,
        ObjectSelector::Keys(image_keys),
        config,
    )
    .await?;
    report.download_duration_ms += image_download_start.elapsed().as_millis() as u64;
    report.objects_listed += images.succeeded.len() + images.failed.len();
    report.objects_downloaded += images.succeeded.len();
    report.failed_downloads.extend(images.failed);

    let image_bytes: HashMap<String, Vec<u8>> = images
        .succeeded
        .into_iter()
        .map(|RawDocument { key, bytes }| (key, bytes))
        .collect();

    // ── Step 4: Crop every annotated region and route it by label ────────
    let mut routed: Vec<RoutedFile> = Vec::new();
    for export in parsed {
        // A missing entry here means the image download already failed and
        // was recorded; the export is skipped without a second warning.
        let Some(bytes) = image_bytes.get(&export.image_key) else {
            debug!(
                "Skipping '{}': referenced image '{}' was not downloaded",
                export.export_key, export.image_key
            );
            report.skipped += 1;
            continue;
        };
        let image = match image::load_from_memory(bytes) {
            Ok(image) => image,
            Err(e) => {
                warn!(
                    "Skipping '{}': image '{}' could not be decoded: {}",
                    export.export_key, export.image_key, e
                );
                report.skipped += 1;
                continue;
            }
        };

        let crops = crop::crop_annotated_regions(&image, &export.results);
        report.skipped += export.results.len() - crops.len();

        for crop in &crops {
            let files = router.route_crop(crop);
            if files.is_empty() {
                report.skipped += 1;
            }
            routed.extend(files);
        }
    }
    report.outputs_produced = routed.len();

    // ── Step 5: Upload each category's crops to its bucket ───────────────
    let mut by_category: HashMap<RouteCategory, Vec<FileToUpload>> = HashMap::new();
    for RoutedFile { category, file } in routed {
        by_category.entry(category).or_default().push(file);
    }

    let upload_start = Instant::now();
    for category in [
        RouteCategory::Ocr,
        RouteCategory::TableFormer,
        RouteCategory::ImageCaption,
    ] {
        let Some(files) = by_category.remove(&category) else {
            continue;
        };
        let bucket = category.target_folder(config);
        debug!("Uploading {} {} crop(s) to '{}'", files.len(), category, bucket);
        let outcome = transfer::upload_batch(store, bucket, files, config).await;
        report.objects_uploaded += outcome.succeeded.len();
        report.failed_uploads.extend(outcome.failed);
    }
    report.upload_duration_ms = upload_start.elapsed().as_millis() as u64;

    report.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "{} complete: {} object(s) downloaded, {} crop(s) routed, {} uploaded, {} skipped, {}ms total",
        EXTRACT_LAYOUT_TO_IMAGES,
        report.objects_downloaded,
        report.outputs_produced,
        report.objects_uploaded,
        report.skipped,
        report.total_duration_ms
    );
    Ok(report)
}
