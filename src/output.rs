//! Result types returned by a costing-sheet run.

use crate::error::CostSheetError;
use crate::record::ParsedRecord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File stem used for the extracted image (`main_image.<ext>`).
pub const MAIN_IMAGE_STEM: &str = "main_image";

/// Native encoding of an extracted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// `DCTDecode` stream, written byte-for-byte.
    Jpeg,
    /// Raw or Flate-compressed samples, re-encoded losslessly.
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
        }
    }
}

/// The first decodable image found in the input document.
#[derive(Debug, Clone, PartialEq)]
pub struct MainImage {
    /// Encoded file contents.
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    /// 1-indexed page the image was found on.
    pub page: usize,
    pub width: u32,
    pub height: u32,
}

impl MainImage {
    /// File name the image is written under.
    pub fn file_name(&self) -> String {
        format!("{MAIN_IMAGE_STEM}.{}", self.format.extension())
    }

    /// Write the image into `dir` (created if absent) and return its path.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, CostSheetError> {
        std::fs::create_dir_all(dir).map_err(|e| CostSheetError::ImageWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let path = dir.join(self.file_name());
        std::fs::write(&path, &self.bytes).map_err(|e| CostSheetError::ImageWriteFailed {
            path: path.clone(),
            source: e,
        })?;

        debug!("Wrote {} bytes → {}", self.bytes.len(), path.display());
        Ok(path)
    }
}

/// Timing and size figures for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetStats {
    /// Pages of text read from the input document.
    pub pages_scanned: usize,
    /// Number of spec lines in the cost table.
    pub spec_lines: usize,
    /// Sum of every line total.
    pub grand_total: f64,
    /// Pages in the rendered costing sheet.
    pub sheet_pages: usize,
    /// Embedded images that could not be decoded and were skipped.
    pub images_skipped: usize,
    pub total_duration_ms: u64,
    pub text_duration_ms: u64,
    pub image_duration_ms: u64,
    pub render_duration_ms: u64,
}

/// Everything produced by [`crate::convert::generate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetOutput {
    pub record: ParsedRecord,
    /// Path of the written costing sheet.
    pub output_path: PathBuf,
    /// Path of the extracted main image, if one was found.
    pub image_path: Option<PathBuf>,
    pub stats: SheetStats,
}
