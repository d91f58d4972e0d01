//! # costsheet
//!
//! Turn a garment spec PDF into a priced costing sheet.
//!
//! The input document carries labelled lines (`Style: …`, `Sizes: …`,
//! `E-mail: …`, `Care Address: …`) and free text that mentions materials
//! such as "Main Fabric" or "Hang Tag". Each recognised material maps to a
//! fixed bill-of-materials line with a quantity and rate. The output is a
//! one-or-more page PDF with the labelled values, a cost table with a grand
//! total, and the first image embedded in the source document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate path and %PDF header
//!  ├─ 2. Text       page text via pdfium, normalised
//!  ├─ 3. Image      first decodable image XObject via lopdf
//!  ├─ 4. Parse      line-by-line trigger table
//!  ├─ 5. Layout     page flow, Helvetica metrics, table geometry
//!  └─ 6. Sheet      lopdf writer, atomic file replace
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use costsheet::{generate, SheetConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SheetConfig::builder()
//!         .input("input_doc.pdf")
//!         .output("generated_output.pdf")
//!         .build()?;
//!     let output = generate(&config)?;
//!     println!("total cost: {:.2}", output.record.grand_total());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `costsheet` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! costsheet = { version = "0.1", default-features = false }
//! ```
//!
//! ## Native library
//!
//! Text extraction needs the pdfium shared library at runtime. Set
//! `PDFIUM_LIB_PATH`, place the library in the working directory, or install
//! it system-wide. Image extraction and sheet rendering are pure Rust.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod triggers;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageSize, SheetConfig, SheetConfigBuilder};
pub use convert::{generate, generate_sheet, inspect};
pub use error::{CostSheetError, ImageSkip};
pub use output::{ImageFormat, MainImage, SheetOutput, SheetStats};
pub use pipeline::images::extract_main_image;
pub use pipeline::parse::parse_text;
pub use progress::{NoopProgressCallback, ProgressCallback, SheetProgressCallback, Stage};
pub use record::{FieldKind, ParsedRecord, SpecLine};
pub use triggers::{Matcher, Trigger, TriggerTable};

use std::io::Write;

/// Generate a costing sheet from PDF bytes held in memory.
///
/// The bytes are written to a managed [`tempfile`] which is removed on
/// return; `config.input` is ignored.
///
/// # Example
/// ```rust,no_run
/// use costsheet::{generate_from_bytes, SheetConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("input_doc.pdf")?;
/// let config = SheetConfig::builder().output("sheet.pdf").build()?;
/// let output = generate_from_bytes(&bytes, &config)?;
/// println!("{}", output.output_path.display());
/// # Ok(())
/// # }
/// ```
pub fn generate_from_bytes(
    bytes: &[u8],
    config: &SheetConfig,
) -> Result<SheetOutput, CostSheetError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| CostSheetError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| CostSheetError::Internal(format!("tempfile write: {e}")))?;

    let mut config = config.clone();
    config.input = tmp.path().to_path_buf();
    // `tmp` is dropped (and the file deleted) when `generate` returns
    convert::generate(&config)
}
