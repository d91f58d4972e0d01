//! Error types for the costsheet library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CostSheetError`] is **fatal**: the run cannot proceed (bad input file,
//!   wrong password, unwritable output). Returned as `Err(CostSheetError)`
//!   from the top-level [`crate::convert`] functions.
//!
//! * [`ImageSkip`] is **non-fatal**: one embedded image could not be decoded.
//!   The image extractor records it and moves on to the next candidate; only
//!   the first decodable image is ever needed.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the costsheet library.
#[derive(Debug, Error)]
pub enum CostSheetError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The document could not be parsed as a PDF (corrupt xref, bad objects).
    #[error("Unsupported or corrupt document '{path}': {detail}")]
    UnsupportedFormat { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create the image directory or write the extracted image.
    #[error("Failed to write extracted image '{path}': {source}")]
    ImageWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the costing-sheet PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Building the output document failed before anything was written.
    #[error("Failed to render costing sheet: {0}")]
    RenderFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A trigger table could not be parsed or one of its patterns is invalid.
    #[error("Invalid trigger table: {0}")]
    InvalidTriggerTable(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
The text extractor needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib).\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<lopdf::Error> for CostSheetError {
    fn from(e: lopdf::Error) -> Self {
        CostSheetError::RenderFailed(e.to_string())
    }
}

/// A non-fatal decode failure for a single embedded image.
///
/// Reported through [`crate::progress::SheetProgressCallback::on_image_skipped`]
/// and logged; extraction continues with the next image in listing order.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageSkip {
    /// The stream uses a filter we cannot turn into a standalone image file.
    #[error("Page {page}, object {object}: unsupported image filter '{filter}'")]
    UnsupportedFilter {
        page: usize,
        object: u32,
        filter: String,
    },

    /// The sample data could not be decoded into pixels.
    #[error("Page {page}, object {object}: image decode failed: {detail}")]
    DecodeFailed {
        page: usize,
        object: u32,
        detail: String,
    },
}
