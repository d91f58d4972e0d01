//! Image extraction: find the first decodable embedded image.
//!
//! Pages are visited in page order and, within a page, image XObjects in the
//! order the page's resource dictionary lists them. The first image we can
//! turn into a standalone file wins:
//!
//! | Filter chain                 | Result                               |
//! |------------------------------|--------------------------------------|
//! | `… DCTDecode`                | JPEG bytes, written unchanged        |
//! | none / `FlateDecode` only    | 8-bit Gray, RGB or CMYK → PNG        |
//! | `JPXDecode`, `JBIG2Decode` … | [`ImageSkip`], scan continues        |
//!
//! Form XObjects are searched recursively, so an image wrapped in a form
//! counts at the form's place in the listing.

use crate::error::{CostSheetError, ImageSkip};
use crate::output::{ImageFormat, MainImage};
use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DCT: &str = "DCTDecode";
const FLATE: &str = "FlateDecode";
/// Form XObjects nested deeper than this are not searched.
const MAX_FORM_DEPTH: usize = 8;

/// Outcome of scanning a document for its main image.
#[derive(Debug, Default)]
pub struct ImageScan {
    pub image: Option<MainImage>,
    /// Images passed over before the main image was found (or all of them).
    pub skipped: Vec<ImageSkip>,
}

/// Load `pdf_path` with lopdf, decrypting with `password` if needed.
pub fn load_document(pdf_path: &Path, password: Option<&str>) -> Result<Document, CostSheetError> {
    let mut doc = Document::load(pdf_path).map_err(|e| CostSheetError::UnsupportedFormat {
        path: pdf_path.to_path_buf(),
        detail: e.to_string(),
    })?;

    if doc.is_encrypted() {
        let pwd = password.unwrap_or("");
        doc.decrypt(pwd).map_err(|_| match password {
            Some(_) => CostSheetError::WrongPassword {
                path: pdf_path.to_path_buf(),
            },
            None => CostSheetError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            },
        })?;
    }
    Ok(doc)
}

/// Scan `doc` for the first decodable image.
pub fn find_main_image(doc: &Document) -> ImageScan {
    let mut scan = ImageScan::default();

    for (page_no, page_id) in doc.get_pages() {
        let page = page_no as usize;
        for (object, stream) in page_images(doc, page_id) {
            match decode_image(page, object, stream) {
                Ok(image) => {
                    info!(
                        "Main image: page {}, object {} ({}x{} {})",
                        page,
                        object.0,
                        image.width,
                        image.height,
                        image.format.extension()
                    );
                    scan.image = Some(image);
                    return scan;
                }
                Err(skip) => {
                    warn!("Skipping image: {}", skip);
                    scan.skipped.push(skip);
                }
            }
        }
    }

    debug!("No decodable image found ({} skipped)", scan.skipped.len());
    scan
}

/// Extract the first decodable image of `pdf_path` into `dir`.
///
/// `dir` is created if absent, even when nothing ends up in it. Returns the
/// written path, or `None` when the document has no decodable image.
pub fn extract_main_image(
    pdf_path: &Path,
    dir: &Path,
    password: Option<&str>,
) -> Result<Option<PathBuf>, CostSheetError> {
    prepare_dir(dir)?;
    let doc = load_document(pdf_path, password)?;
    find_main_image(&doc)
        .image
        .map(|img| img.write_to_dir(dir))
        .transpose()
}

/// Create the image output directory.
pub fn prepare_dir(dir: &Path) -> Result<(), CostSheetError> {
    std::fs::create_dir_all(dir).map_err(|e| CostSheetError::ImageWriteFailed {
        path: dir.to_path_buf(),
        source: e,
    })
}

// ── Resource walking ─────────────────────────────────────────────────────

/// Image XObjects of a page, in resource listing order. Images drawn by a
/// form XObject are listed at the form's position.
fn page_images(doc: &Document, page_id: ObjectId) -> Vec<(ObjectId, &Stream)> {
    let mut found = Vec::new();
    if let Some(resources) = page_resources(doc, page_id) {
        let mut visited = HashSet::new();
        collect_images(doc, resources, 0, &mut visited, &mut found);
    }
    found
}

fn collect_images<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    found: &mut Vec<(ObjectId, &'a Stream)>,
) {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok())
    else {
        return;
    };

    for (_, obj) in xobjects.iter() {
        let Ok(id) = obj.as_reference() else {
            continue;
        };
        // A form may be drawn more than once, or reference itself.
        if !visited.insert(id) {
            continue;
        }
        let Some(stream) = doc.get_object(id).ok().and_then(|o| o.as_stream().ok()) else {
            continue;
        };
        let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name).ok();
        match subtype {
            Some(b"Image") => found.push((id, stream)),
            Some(b"Form") if depth < MAX_FORM_DEPTH => {
                let nested = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|res| resolve(doc, res).as_dict().ok());
                if let Some(nested) = nested {
                    debug!("Descending into form XObject {}", id.0);
                    collect_images(doc, nested, depth + 1, visited, found);
                }
            }
            _ => {}
        }
    }
}

/// The page's resource dictionary, following `/Parent` for inherited ones.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    // Page trees are shallow; the bound guards against reference cycles.
    for _ in 0..32 {
        if let Ok(res) = node.get(b"Resources") {
            return resolve(doc, res).as_dict().ok();
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    doc.dereference(obj).map(|(_, o)| o).unwrap_or(obj)
}

// ── Decoding ─────────────────────────────────────────────────────────────

fn decode_image(page: usize, object: ObjectId, stream: &Stream) -> Result<MainImage, ImageSkip> {
    let fail = |detail: String| ImageSkip::DecodeFailed {
        page,
        object: object.0,
        detail,
    };

    let filters = filter_names(&stream.dict);
    let (last, leading) = match filters.split_last() {
        Some((last, leading)) => (Some(last.as_str()), leading),
        None => (None, &[][..]),
    };

    if let Some(bad) = leading.iter().find(|f| f.as_str() != FLATE) {
        return Err(unsupported(page, object, bad));
    }

    match last {
        Some(DCT) => {
            let bytes = inflate_all(&stream.content, leading.len()).map_err(fail)?;
            let (width, height) = jpeg_dimensions(&bytes).map_err(fail)?;
            Ok(MainImage {
                bytes,
                format: ImageFormat::Jpeg,
                page,
                width,
                height,
            })
        }
        None | Some(FLATE) => {
            if has_predictor(&stream.dict) {
                return Err(fail("predictor-encoded samples".into()));
            }
            let samples = inflate_all(&stream.content, filters.len()).map_err(fail)?;
            let png = samples_to_png(&stream.dict, &samples).map_err(fail)?;
            Ok(MainImage {
                bytes: png.bytes,
                format: ImageFormat::Png,
                page,
                width: png.width,
                height: png.height,
            })
        }
        Some(other) => Err(unsupported(page, object, other)),
    }
}

fn unsupported(page: usize, object: ObjectId, filter: &str) -> ImageSkip {
    ImageSkip::UnsupportedFilter {
        page,
        object: object.0,
        filter: filter.to_string(),
    }
}

/// `/Filter` as a list of names; a single name is a one-element list.
fn filter_names(dict: &Dictionary) -> Vec<String> {
    let name = |o: &Object| o.as_name().ok().map(|n| String::from_utf8_lossy(n).into_owned());
    match dict.get(b"Filter") {
        Ok(Object::Array(items)) => items.iter().filter_map(name).collect(),
        Ok(obj) => name(obj).into_iter().collect(),
        Err(_) => Vec::new(),
    }
}

fn has_predictor(dict: &Dictionary) -> bool {
    let predictor = |d: &Dictionary| d.get(b"Predictor").and_then(Object::as_i64).unwrap_or(1);
    match dict.get(b"DecodeParms") {
        Ok(Object::Dictionary(d)) => predictor(d) > 1,
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_dict().ok())
            .any(|d| predictor(d) > 1),
        _ => false,
    }
}

/// Apply `count` rounds of zlib inflation.
fn inflate_all(data: &[u8], count: usize) -> Result<Vec<u8>, String> {
    let mut buf = data.to_vec();
    for _ in 0..count {
        let mut out = Vec::with_capacity(buf.len() * 2);
        ZlibDecoder::new(buf.as_slice())
            .read_to_end(&mut out)
            .map_err(|e| format!("inflate failed: {e}"))?;
        buf = out;
    }
    Ok(buf)
}

fn jpeg_dimensions(bytes: &[u8]) -> Result<(u32, u32), String> {
    image::ImageReader::with_format(Cursor::new(bytes), image::ImageFormat::Jpeg)
        .into_dimensions()
        .map_err(|e| format!("invalid JPEG: {e}"))
}

struct EncodedPng {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

fn samples_to_png(dict: &Dictionary, samples: &[u8]) -> Result<EncodedPng, String> {
    let dim = |key: &[u8]| -> Result<u32, String> {
        dict.get(key)
            .and_then(Object::as_i64)
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .ok_or_else(|| format!("missing or invalid /{}", String::from_utf8_lossy(key)))
    };
    let width = dim(b"Width")?;
    let height = dim(b"Height")?;

    let bpc = dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);
    if bpc != 8 {
        return Err(format!("{bpc}-bit samples"));
    }
    if let Ok(Object::Array(cs)) = dict.get(b"ColorSpace") {
        if cs.first().and_then(|o| o.as_name().ok()) == Some(b"Indexed".as_slice()) {
            return Err("indexed colour space".into());
        }
    }

    let pixels = width as usize * height as usize;
    let components = samples.len() / pixels;
    if components == 0 || samples.len() < pixels * components {
        return Err(format!(
            "{} bytes of samples for {width}x{height} pixels",
            samples.len()
        ));
    }
    let samples = &samples[..pixels * components];

    let img = match components {
        1 => GrayImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageRgb8),
        4 => RgbImage::from_raw(width, height, cmyk_to_rgb(samples)).map(DynamicImage::ImageRgb8),
        n => return Err(format!("{n} components per pixel")),
    }
    .ok_or_else(|| "sample buffer does not match dimensions".to_string())?;

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| format!("PNG encode failed: {e}"))?;
    debug!("Encoded {}x{} image → {} bytes PNG", width, height, bytes.len());

    Ok(EncodedPng {
        bytes,
        width,
        height,
    })
}

fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    samples
        .chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - u16::from(px[3]);
            let channel = |c: u8| ((255 - u16::from(c)) * k / 255) as u8;
            [channel(px[0]), channel(px[1]), channel(px[2])]
        })
        .collect()
}
