//! End-to-end integration tests for costsheet.
//!
//! Fixture PDFs are generated in-test with lopdf: a few lines of Helvetica
//! text and, optionally, embedded image XObjects. Tests that only touch the
//! lopdf side (image extraction, rendering) always run. Tests that extract
//! text need the pdfium native library and are gated behind the
//! `E2E_ENABLED` environment variable.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test e2e -- --nocapture

use costsheet::pipeline::{images, normalize};
use costsheet::{
    extract_main_image, generate, generate_from_bytes, generate_sheet, inspect, parse_text,
    CostSheetError, ImageFormat, SheetConfig, TriggerTable,
};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run pdfium-backed tests");
            return;
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter("costsheet=debug")
            .with_test_writer()
            .try_init();
    }};
}

const SPEC_LINES: &[&str] = &[
    "Tech Pack",
    "Style: A1",
    "Sizes: S,M,L",
    "E-mail: buyer@example.com",
    "Care Address: PO Box 12: Leeds",
    "Rib trim on cuffs",
    "Main Fabric used throughout",
    "Hang Tag attached at side seam",
];

/// One page per entry of `pages`; each page shows its text lines and lists
/// its images in order.
fn build_pdf(pages: &[(&[&str], Vec<Stream>)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for (lines, streams) in pages {
        let mut xobjects = Dictionary::new();
        for (i, s) in streams.iter().enumerate() {
            let id = doc.add_object(s.clone());
            xobjects.set(format!("Im{i}"), Object::Reference(id));
        }

        let mut operations = Vec::new();
        for (n, line) in lines.iter().enumerate() {
            let y = 740.0 - n as f32 * 20.0;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![72.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => xobjects,
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => kids, "Count" => count }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn jpeg_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(w, h, image::Rgb([30, 90, 200]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .unwrap();
    buf
}

fn image_xobject(filter: Option<&str>, cs: &str, w: i64, h: i64, data: Vec<u8>) -> Stream {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => w,
        "Height" => h,
        "ColorSpace" => cs,
        "BitsPerComponent" => 8,
    };
    if let Some(f) = filter {
        dict.set("Filter", Object::Name(f.as_bytes().to_vec()));
    }
    Stream::new(dict, data)
}

fn jpeg_xobject(w: u32, h: u32) -> Stream {
    image_xobject(Some("DCTDecode"), "DeviceRGB", w.into(), h.into(), jpeg_bytes(w, h))
}

fn flate_rgb_xobject(w: u32, h: u32) -> Stream {
    let raw = vec![128u8; (w * h * 3) as usize];
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&raw).unwrap();
    image_xobject(
        Some("FlateDecode"),
        "DeviceRGB",
        w.into(),
        h.into(),
        enc.finish().unwrap(),
    )
}

fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn config_in(dir: &Path, input: &Path) -> SheetConfig {
    SheetConfig::builder()
        .input(input)
        .output(dir.join("generated_output.pdf"))
        .image_dir(dir.join("extract_images"))
        .build()
        .unwrap()
}

fn sheet_text(path: &Path) -> String {
    let doc = Document::load(path).unwrap();
    let mut out = Vec::new();
    for page_id in doc.get_pages().values() {
        let content = doc.get_and_decode_page_content(*page_id).unwrap();
        for op in content.operations.iter().filter(|op| op.operator == "Tj") {
            if let Some(bytes) = op.operands.first().and_then(|o| o.as_str().ok()) {
                out.push(String::from_utf8_lossy(bytes).into_owned());
            }
        }
    }
    out.join("\n")
}

// ── Image extraction (lopdf only) ────────────────────────────────────────

#[test]
fn test_extract_first_image_across_pages() {
    let tmp = tempfile::tempdir().unwrap();
    let pdf = build_pdf(&[
        (&["cover page"], vec![]),
        (&["detail"], vec![jpeg_xobject(8, 6), flate_rgb_xobject(4, 4)]),
    ]);
    let input = write_fixture(tmp.path(), "in.pdf", &pdf);

    let dir = tmp.path().join("extract_images");
    let path = extract_main_image(&input, &dir, None).unwrap().unwrap();
    assert_eq!(path, dir.join("main_image.jpeg"));

    // Passthrough: bytes identical to the embedded stream.
    assert_eq!(std::fs::read(&path).unwrap(), jpeg_bytes(8, 6));
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);
}

#[test]
fn test_extract_flate_image_as_png() {
    let tmp = tempfile::tempdir().unwrap();
    let pdf = build_pdf(&[(&["x"], vec![flate_rgb_xobject(4, 3)])]);
    let input = write_fixture(tmp.path(), "in.pdf", &pdf);

    let doc = images::load_document(&input, None).unwrap();
    let img = images::find_main_image(&doc).image.unwrap();
    assert_eq!(img.format, ImageFormat::Png);
    assert_eq!((img.width, img.height, img.page), (4, 3, 1));

    let decoded = image::load_from_memory(&img.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (4, 3));
}

#[test]
fn test_undecodable_images_are_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let pdf = build_pdf(&[
        (&["a"], vec![image_xobject(Some("JPXDecode"), "DeviceRGB", 2, 2, vec![0; 16])]),
        (&["b"], vec![flate_rgb_xobject(2, 2)]),
    ]);
    let input = write_fixture(tmp.path(), "in.pdf", &pdf);

    let doc = images::load_document(&input, None).unwrap();
    let scan = images::find_main_image(&doc);
    assert_eq!(scan.skipped.len(), 1);
    assert_eq!(scan.image.unwrap().page, 2);
}

#[test]
fn test_no_images_yields_none() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_fixture(tmp.path(), "in.pdf", &build_pdf(&[(SPEC_LINES, vec![])]));
    let dir = tmp.path().join("extract_images");
    assert_eq!(extract_main_image(&input, &dir, None).unwrap(), None);
    // The directory is prepared even when it stays empty.
    assert!(dir.is_dir());
}

// ── Rendering (lopdf only) ───────────────────────────────────────────────

#[test]
fn test_render_parsed_text_with_image() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_fixture(
        tmp.path(),
        "in.pdf",
        &build_pdf(&[(SPEC_LINES, vec![jpeg_xobject(16, 16)])]),
    );
    let config = config_in(tmp.path(), &input);

    // Text as pdfium would hand it over: CRLF line breaks.
    let raw = SPEC_LINES.join("\r\n");
    let record = parse_text(&normalize::normalise_text(&raw), &TriggerTable::default());
    assert_eq!(record.care_address, "Leeds");
    assert!((record.grand_total() - 2.75).abs() < 1e-9);

    let image = extract_main_image(&input, &config.image_dir, None).unwrap();
    let pages = generate_sheet(&record, image.as_deref(), &config).unwrap();
    assert_eq!(pages, 1);

    let text = sheet_text(&config.output);
    assert!(text.contains("Costing Sheet"));
    assert!(text.contains("Style: A1"));
    assert!(text.contains("E-mail: buyer@example.com"));
    assert!(text.contains("Main Image:"));
    assert!(text.contains("Total Cost\n2.75"));
}

#[test]
fn test_render_empty_record_has_no_image_section() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), Path::new("unused.pdf"));

    let record = parse_text("nothing useful here\n", &TriggerTable::default());
    generate_sheet(&record, None, &config).unwrap();

    let text = sheet_text(&config.output);
    assert!(text.contains("Placement"));
    assert!(text.contains("Total Cost\n0.00"));
    assert!(!text.contains("Main Image:"));
}

#[test]
fn test_custom_trigger_table_from_file() {
    let tmp = tempfile::tempdir().unwrap();
    let table_path = tmp.path().join("triggers.json");
    std::fs::write(
        &table_path,
        r#"[
            { "kind": "field", "match": { "contains": "PO:" }, "field": "style" },
            { "kind": "spec", "match": { "regex": "(?i)zip(per)?" },
              "placement": "Zip", "composition": "Metal", "quantity": 2, "rate": 1.1 }
        ]"#,
    )
    .unwrap();
    let table = TriggerTable::from_path(&table_path).unwrap();

    let record = parse_text("PO: 7781\nRib trim\nYKK zipper, 20cm\n", &table);
    assert_eq!(record.style, "7781");
    assert_eq!(record.specs.len(), 1);

    let config = SheetConfig::builder()
        .output(tmp.path().join("sheet.pdf"))
        .triggers(table)
        .build()
        .unwrap();
    generate_sheet(&record, None, &config).unwrap();
    let text = sheet_text(&config.output);
    assert!(text.contains("Style: 7781"));
    assert!(text.contains("Total Cost\n2.20"));
}

// ── Input validation (no pdfium needed) ──────────────────────────────────

#[test]
fn test_generate_rejects_non_pdf() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_fixture(tmp.path(), "in.pdf", b"GIF89a not a pdf");
    let config = config_in(tmp.path(), &input);

    match generate(&config) {
        Err(CostSheetError::NotAPdf { magic, .. }) => assert_eq!(&magic, b"GIF8"),
        other => panic!("expected NotAPdf, got {other:?}"),
    }
    assert!(!config.output.exists());
}

#[test]
fn test_generate_missing_input() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), &tmp.path().join("input_doc.pdf"));
    assert!(matches!(
        generate(&config),
        Err(CostSheetError::FileNotFound { .. })
    ));
}

// ── Full pipeline (pdfium) ───────────────────────────────────────────────

#[test]
fn test_generate_full_pipeline() {
    e2e_skip_unless_ready!();

    let tmp = tempfile::tempdir().unwrap();
    let input = write_fixture(
        tmp.path(),
        "input_doc.pdf",
        &build_pdf(&[(SPEC_LINES, vec![]), (&["Thread: poly core"], vec![jpeg_xobject(20, 10)])]),
    );
    let config = config_in(tmp.path(), &input);

    let output = generate(&config).expect("generate() should succeed");

    let r = &output.record;
    assert_eq!(r.style, "A1");
    assert_eq!(r.sizes, "S,M,L");
    assert_eq!(r.email, "buyer@example.com");
    assert_eq!(r.care_address, "Leeds");
    let placements: Vec<_> = r.specs.iter().map(|s| s.placement.as_str()).collect();
    assert_eq!(placements, ["Rib", "Main Fabric", "Hang Tag", "Thread"]);
    assert!((r.grand_total() - 3.25).abs() < 1e-9);

    assert_eq!(output.stats.pages_scanned, 2);
    assert_eq!(output.stats.sheet_pages, 1);
    assert_eq!(
        output.image_path.as_deref(),
        Some(config.image_dir.join("main_image.jpeg").as_path())
    );
    assert!(sheet_text(&config.output).contains("Total Cost\n3.25"));

    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}

#[test]
fn test_generate_without_image() {
    e2e_skip_unless_ready!();

    let tmp = tempfile::tempdir().unwrap();
    let input = write_fixture(tmp.path(), "in.pdf", &build_pdf(&[(SPEC_LINES, vec![])]));
    let config = config_in(tmp.path(), &input);

    let output = generate(&config).unwrap();
    assert_eq!(output.image_path, None);
    assert!(!sheet_text(&config.output).contains("Main Image:"));
}

#[test]
fn test_inspect_writes_nothing() {
    e2e_skip_unless_ready!();

    let tmp = tempfile::tempdir().unwrap();
    let input = write_fixture(
        tmp.path(),
        "in.pdf",
        &build_pdf(&[(SPEC_LINES, vec![jpeg_xobject(4, 4)])]),
    );
    let config = config_in(tmp.path(), &input);

    let record = inspect(&config).unwrap();
    assert_eq!(record.specs.len(), 3);
    assert!(!config.output.exists());
    assert!(!config.image_dir.exists());
}

#[test]
fn test_generate_from_bytes() {
    e2e_skip_unless_ready!();

    let tmp = tempfile::tempdir().unwrap();
    let bytes = build_pdf(&[(SPEC_LINES, vec![])]);
    let config = config_in(tmp.path(), Path::new("ignored.pdf"));

    let output = generate_from_bytes(&bytes, &config).unwrap();
    assert_eq!(output.record.style, "A1");
    assert!(config.output.exists());
}
