//! Input validation: make sure the user-supplied path is a readable PDF.
//!
//! Both backends (pdfium for text, lopdf for images) would eventually fail on
//! a missing or non-PDF file, but with opaque messages. Checking existence,
//! read permission and the `%PDF` magic bytes up front gives callers a
//! precise [`CostSheetError`] instead.

use crate::error::CostSheetError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate a local input path and return it unchanged on success.
pub fn resolve_input(path: &Path) -> Result<PathBuf, CostSheetError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(CostSheetError::FileNotFound { path });
    }
    if path.is_dir() {
        return Err(CostSheetError::UnsupportedFormat {
            path,
            detail: "path is a directory".into(),
        });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            match f.read_exact(&mut magic) {
                Ok(()) if &magic != b"%PDF" => {
                    return Err(CostSheetError::NotAPdf { path, magic });
                }
                Ok(()) => {}
                Err(_) => {
                    return Err(CostSheetError::UnsupportedFormat {
                        path,
                        detail: "file is shorter than a PDF header".into(),
                    });
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(CostSheetError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(CostSheetError::FileNotFound { path });
        }
    }

    debug!("Resolved input PDF: {}", path.display());
    Ok(path)
}
