//! Conversion entry points.
//!
//! [`generate`] runs the whole pipeline for one input document. The
//! narrower functions expose single halves of it: [`inspect`] reads and
//! parses without writing anything, and [`generate_sheet`] renders an
//! already-parsed record.

use crate::config::SheetConfig;
use crate::error::CostSheetError;
use crate::output::{SheetOutput, SheetStats};
use crate::pipeline::layout::{layout_sheet, LayoutOptions};
use crate::pipeline::{images, input, normalize, parse, sheet, text};
use crate::progress::Stage;
use crate::record::ParsedRecord;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert `config.input` into a costing sheet at `config.output`.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// The parsed record, the written paths and run statistics. A document with
/// no decodable image is not an error; `image_path` is `None` and the sheet
/// has no image section.
///
/// # Errors
/// Any [`CostSheetError`]: unreadable or non-PDF input, wrong password,
/// pdfium unavailable, or a failure writing the image or the sheet.
pub fn generate(config: &SheetConfig) -> Result<SheetOutput, CostSheetError> {
    let total_start = Instant::now();
    let cb = config.progress_callback.as_deref();
    info!("Starting costing sheet: {}", config.input.display());

    // ── Step 1: Validate input ───────────────────────────────────────────
    let pdf_path = input::resolve_input(&config.input)?;
    if let Some(cb) = cb {
        cb.on_run_start(&pdf_path);
    }

    // ── Step 2: Extract text ─────────────────────────────────────────────
    let text_start = Instant::now();
    if let Some(cb) = cb {
        cb.on_stage_start(Stage::ExtractText);
    }
    let (text, pages_scanned) = read_text(&pdf_path, config)?;
    let text_duration_ms = text_start.elapsed().as_millis() as u64;
    if let Some(cb) = cb {
        cb.on_stage_complete(Stage::ExtractText, &format!("{pages_scanned} pages"));
    }

    // ── Step 3: Extract main image ───────────────────────────────────────
    let image_start = Instant::now();
    let (image_path, images_skipped) = if config.extract_image {
        if let Some(cb) = cb {
            cb.on_stage_start(Stage::ExtractImage);
        }
        let (path, skipped) = extract_image(&pdf_path, config)?;
        if let Some(cb) = cb {
            let detail = match &path {
                Some(p) => p.display().to_string(),
                None => "no image".to_string(),
            };
            cb.on_stage_complete(Stage::ExtractImage, &detail);
        }
        (path, skipped)
    } else {
        debug!("Image extraction disabled");
        (None, 0)
    };
    let image_duration_ms = image_start.elapsed().as_millis() as u64;

    // ── Step 4: Parse ────────────────────────────────────────────────────
    if let Some(cb) = cb {
        cb.on_stage_start(Stage::Parse);
    }
    let record = parse::parse_text(&text, &config.triggers);
    if let Some(cb) = cb {
        cb.on_stage_complete(Stage::Parse, &format!("{} spec lines", record.specs.len()));
    }

    // ── Step 5: Render ───────────────────────────────────────────────────
    let render_start = Instant::now();
    if let Some(cb) = cb {
        cb.on_stage_start(Stage::Render);
    }
    let sheet_pages = generate_sheet(&record, image_path.as_deref(), config)?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    if let Some(cb) = cb {
        cb.on_stage_complete(Stage::Render, &format!("{sheet_pages} pages"));
        cb.on_run_complete(&config.output);
    }

    let stats = SheetStats {
        pages_scanned,
        spec_lines: record.specs.len(),
        grand_total: record.grand_total(),
        sheet_pages,
        images_skipped,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        text_duration_ms,
        image_duration_ms,
        render_duration_ms,
    };

    info!(
        "Costing sheet complete: {} spec lines, total {:.2}, {}ms",
        stats.spec_lines, stats.grand_total, stats.total_duration_ms
    );

    Ok(SheetOutput {
        record,
        output_path: config.output.clone(),
        image_path,
        stats,
    })
}

/// Render `record` to `config.output`, embedding the image at `image_path`
/// if given. Returns the number of pages written.
pub fn generate_sheet(
    record: &ParsedRecord,
    image_path: Option<&Path>,
    config: &SheetConfig,
) -> Result<usize, CostSheetError> {
    let image = image_path.map(sheet::load_image).transpose()?;

    let layout = layout_sheet(
        record,
        &LayoutOptions {
            title: &config.title,
            page_size: config.page_size,
            image_box_pt: image.as_ref().map(|_| config.image_box_pt),
        },
    );
    let bytes = sheet::render_to_bytes(&layout, image.as_ref())?;
    sheet::write_atomic(&config.output, &bytes)?;

    Ok(layout.pages.len())
}

/// Read and parse `config.input` without writing any file.
pub fn inspect(config: &SheetConfig) -> Result<ParsedRecord, CostSheetError> {
    let pdf_path = input::resolve_input(&config.input)?;
    let (text, _) = read_text(&pdf_path, config)?;
    Ok(parse::parse_text(&text, &config.triggers))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Extracted and normalised text plus the page count.
fn read_text(pdf_path: &Path, config: &SheetConfig) -> Result<(String, usize), CostSheetError> {
    let pdfium = text::bind_pdfium(config.pdfium_lib_path.as_deref())?;
    let extracted = text::extract_text(&pdfium, pdf_path, config.password.as_deref())?;
    Ok((normalize::normalise_text(&extracted.text), extracted.page_count))
}

/// Find and write the main image; returns its path and the skip count.
/// `config.image_dir` exists afterwards whether or not an image was found.
fn extract_image(
    pdf_path: &Path,
    config: &SheetConfig,
) -> Result<(Option<PathBuf>, usize), CostSheetError> {
    images::prepare_dir(&config.image_dir)?;
    let doc = images::load_document(pdf_path, config.password.as_deref())?;
    let scan = images::find_main_image(&doc);

    if let Some(cb) = config.progress_callback.as_deref() {
        for skip in &scan.skipped {
            cb.on_image_skipped(skip);
        }
    }

    let path = match scan.image {
        Some(img) => Some(img.write_to_dir(&config.image_dir)?),
        None => {
            warn!("No decodable image in {}", pdf_path.display());
            None
        }
    };
    Ok((path, scan.skipped.len()))
}
