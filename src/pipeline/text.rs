//! Text extraction: pull the text layer of every page via pdfium.
//!
//! pdfium is bound once per run. The binding order is: an explicit library
//! path (config or `PDFIUM_LIB_PATH`), then a library sitting next to the
//! working directory, then the system library. The first that loads wins.

use crate::error::CostSheetError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Text of a document, joined page by page.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    /// Every page's text followed by a single `\n`, in page order.
    pub text: String,
    pub page_count: usize,
}

/// Bind to a pdfium library following the documented resolution order.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, CostSheetError> {
    let explicit = lib_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(Into::into));

    let bindings = match explicit {
        Some(path) => {
            debug!("Binding pdfium from {}", path.display());
            Pdfium::bind_to_library(&path).map_err(|e| {
                CostSheetError::PdfiumBindingFailed(format!("{}: {e:?}", path.display()))
            })?
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| CostSheetError::PdfiumBindingFailed(format!("{e:?}")))?,
    };

    Ok(Pdfium::new(bindings))
}

/// Extract the text layer of every page of `pdf_path`.
pub fn extract_text(
    pdfium: &Pdfium,
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<ExtractedText, CostSheetError> {
    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| map_load_error(pdf_path, password, e))?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("PDF loaded: {} pages", page_count);

    let mut text = String::new();
    for (idx, page) in pages.iter().enumerate() {
        let page_text = page
            .text()
            .map_err(|e| CostSheetError::UnsupportedFormat {
                path: pdf_path.to_path_buf(),
                detail: format!("page {}: {e:?}", idx + 1),
            })?
            .all();
        debug!("Page {} → {} chars", idx + 1, page_text.chars().count());
        text.push_str(&page_text);
        text.push('\n');
    }

    Ok(ExtractedText { text, page_count })
}

fn map_load_error(path: &Path, password: Option<&str>, e: PdfiumError) -> CostSheetError {
    let err_str = format!("{e:?}");
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            CostSheetError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            CostSheetError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        CostSheetError::UnsupportedFormat {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_errors_map_by_presence_of_password() {
        let path = Path::new("locked.pdf");
        let e = PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError);
        assert!(matches!(
            map_load_error(path, None, e),
            CostSheetError::PasswordRequired { .. }
        ));

        let e = PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError);
        assert!(matches!(
            map_load_error(path, Some("nope"), e),
            CostSheetError::WrongPassword { .. }
        ));
    }

    #[test]
    fn other_load_errors_are_unsupported_format() {
        let e = PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError);
        match map_load_error(Path::new("broken.pdf"), None, e) {
            CostSheetError::UnsupportedFormat { detail, .. } => {
                assert!(detail.contains("FormatError"))
            }
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn bad_explicit_library_path_fails_to_bind() {
        let result = bind_pdfium(Some(Path::new("/no/such/libpdfium.so")));
        assert!(matches!(
            result,
            Err(CostSheetError::PdfiumBindingFailed(_))
        ));
    }
}
