//! Sheet renderer: serialise a [`SheetLayout`] into a PDF with lopdf.
//!
//! The document is built in memory: one Flate-compressed content stream per
//! page, the two standard fonts shared by every page, and at most one image
//! XObject. The bytes are then written next to the destination and renamed
//! over it, so a failed run never leaves a truncated file behind.

use crate::error::CostSheetError;
use crate::pipeline::fonts::{encode_win_ansi, Font};
use crate::pipeline::layout::{DrawOp, Rgb, SheetLayout};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

const IMAGE_RESOURCE: &str = "Im1";
const PRODUCER: &str = concat!("costsheet ", env!("CARGO_PKG_VERSION"));

/// Load the main image from disk for embedding.
pub fn load_image(path: &Path) -> Result<DynamicImage, CostSheetError> {
    image::open(path).map_err(|e| {
        CostSheetError::RenderFailed(format!("cannot load image '{}': {e}", path.display()))
    })
}

/// Render `layout` to PDF bytes. `image` fills every [`DrawOp::Image`].
pub fn render_to_bytes(
    layout: &SheetLayout,
    image: Option<&DynamicImage>,
) -> Result<Vec<u8>, CostSheetError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in [Font::Helvetica, Font::HelveticaBold] {
        let id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), id);
    }

    let mut resources = dictionary! { "Font" => fonts };
    if let Some(img) = image {
        let image_id = add_image(&mut doc, img)?;
        resources.set(
            "XObject",
            dictionary! { IMAGE_RESOURCE => image_id },
        );
    }
    let resources_id = doc.add_object(resources);

    let mut kids = Vec::with_capacity(layout.pages.len());
    for (n, page) in layout.pages.iter().enumerate() {
        let content = page_content(&page.ops, image.is_some());
        let stream = compressed_stream(&content)?;
        let content_id = doc.add_object(stream);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        debug!("Page {} → {} ops", n + 1, page.ops.len());
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), layout.width.into(), layout.height.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let info_id = doc.add_object(dictionary! {
        "Producer" => Object::string_literal(PRODUCER),
    });
    doc.trailer.set("Info", info_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| CostSheetError::RenderFailed(format!("serialise: {e}")))?;
    Ok(buf)
}

/// Write `bytes` to `path` atomically: temp file in the same directory, then
/// rename over the destination.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CostSheetError> {
    let write_err = |source: std::io::Error| CostSheetError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    info!("Wrote {} bytes → {}", bytes.len(), path.display());
    Ok(())
}

// ── Content streams ──────────────────────────────────────────────────────

fn rgb_operands(c: Rgb) -> Vec<Object> {
    vec![c.0.into(), c.1.into(), c.2.into()]
}

fn page_content(ops: &[DrawOp], has_image: bool) -> Content {
    let mut operations = Vec::new();

    for op in ops {
        match op {
            DrawOp::Text {
                x,
                y,
                font,
                size,
                color,
                text,
            } => {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new(
                    "Tf",
                    vec![Object::Name(font.resource_name().into()), (*size).into()],
                ));
                operations.push(Operation::new("rg", rgb_operands(*color)));
                operations.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                ));
                operations.push(Operation::new("ET", vec![]));
            }
            DrawOp::FillRect { x, y, w, h, color } => {
                operations.push(Operation::new("rg", rgb_operands(*color)));
                operations.push(Operation::new(
                    "re",
                    vec![(*x).into(), (*y).into(), (*w).into(), (*h).into()],
                ));
                operations.push(Operation::new("f", vec![]));
            }
            DrawOp::StrokeRect {
                x,
                y,
                w,
                h,
                line_width,
                color,
            } => {
                operations.push(Operation::new("w", vec![(*line_width).into()]));
                operations.push(Operation::new("RG", rgb_operands(*color)));
                operations.push(Operation::new(
                    "re",
                    vec![(*x).into(), (*y).into(), (*w).into(), (*h).into()],
                ));
                operations.push(Operation::new("S", vec![]));
            }
            DrawOp::Image { x, y, w, h } if has_image => {
                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new(
                    "cm",
                    vec![
                        (*w).into(),
                        0.into(),
                        0.into(),
                        (*h).into(),
                        (*x).into(),
                        (*y).into(),
                    ],
                ));
                operations.push(Operation::new(
                    "Do",
                    vec![Object::Name(IMAGE_RESOURCE.into())],
                ));
                operations.push(Operation::new("Q", vec![]));
            }
            DrawOp::Image { .. } => {}
        }
    }

    Content { operations }
}

fn compressed_stream(content: &Content) -> Result<Stream, CostSheetError> {
    let raw = content
        .encode()
        .map_err(|e| CostSheetError::RenderFailed(format!("content stream: {e}")))?;
    let compressed = deflate(&raw)?;
    Ok(Stream::new(dictionary! { "Filter" => "FlateDecode" }, compressed))
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, CostSheetError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|()| encoder.finish())
        .map_err(|e| CostSheetError::RenderFailed(format!("deflate: {e}")))
}

/// Embed `img` as an 8-bit RGB image XObject.
fn add_image(doc: &mut Document, img: &DynamicImage) -> Result<ObjectId, CostSheetError> {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let data = deflate(rgb.as_raw())?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    debug!("Embedding {}x{} image ({} bytes compressed)", width, height, data.len());
    Ok(doc.add_object(Stream::new(dict, data)))
}
