//! Configuration for a costing-sheet run.
//!
//! Every path and knob the pipeline uses lives in [`SheetConfig`], built via
//! [`SheetConfig::builder()`]. Each stage receives the config explicitly;
//! nothing is read from globals.

use crate::error::CostSheetError;
use crate::progress::ProgressCallback;
use crate::triggers::TriggerTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Smallest and largest accepted image box edge, in points.
pub const IMAGE_BOX_RANGE_PT: (f32, f32) = (16.0, 1000.0);

/// Configuration for one input → costing-sheet conversion.
///
/// # Example
/// ```rust
/// use costsheet::{PageSize, SheetConfig};
///
/// let config = SheetConfig::builder()
///     .input("specs/tee.pdf")
///     .output("out/tee-costing.pdf")
///     .image_dir("out/images")
///     .page_size(PageSize::A4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SheetConfig {
    /// Input document. Default: `input_doc.pdf`.
    pub input: PathBuf,

    /// Costing-sheet PDF to write. Default: `generated_output.pdf`.
    pub output: PathBuf,

    /// Directory receiving `main_image.<ext>`. Created if absent.
    /// Default: `extract_images`.
    pub image_dir: PathBuf,

    /// Title printed at the top of the sheet. Default: `Costing Sheet`.
    pub title: String,

    /// Output page size. Default: [`PageSize::Letter`].
    pub page_size: PageSize,

    /// Edge of the square box the main image is scaled into, in points.
    /// Default: 300.
    pub image_box_pt: f32,

    /// Look for an embedded image at all. Default: true.
    pub extract_image: bool,

    /// Line classifier. Default: the built-in labels and material keywords.
    pub triggers: TriggerTable,

    /// PDF user password for encrypted input documents.
    pub password: Option<String>,

    /// Explicit path to the pdfium shared library. When `None` the library
    /// is looked up next to the working directory, then system-wide.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Optional stage-event callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("input_doc.pdf"),
            output: PathBuf::from("generated_output.pdf"),
            image_dir: PathBuf::from("extract_images"),
            title: "Costing Sheet".to_string(),
            page_size: PageSize::default(),
            image_box_pt: 300.0,
            extract_image: true,
            triggers: TriggerTable::default(),
            password: None,
            pdfium_lib_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SheetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetConfig")
            .field("input", &self.input)
            .field("output", &self.output)
            .field("image_dir", &self.image_dir)
            .field("title", &self.title)
            .field("page_size", &self.page_size)
            .field("image_box_pt", &self.image_box_pt)
            .field("extract_image", &self.extract_image)
            .field("triggers", &self.triggers.len())
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SheetProgressCallback>"),
            )
            .finish()
    }
}

impl SheetConfig {
    /// Create a new builder for `SheetConfig`.
    pub fn builder() -> SheetConfigBuilder {
        SheetConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SheetConfig`].
pub struct SheetConfigBuilder {
    config: SheetConfig,
}

impl SheetConfigBuilder {
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input = path.into();
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output = path.into();
        self
    }

    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_dir = dir.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn image_box_pt(mut self, pt: f32) -> Self {
        self.config.image_box_pt = pt;
        self
    }

    pub fn extract_image(mut self, v: bool) -> Self {
        self.config.extract_image = v;
        self
    }

    pub fn triggers(mut self, table: TriggerTable) -> Self {
        self.config.triggers = table;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SheetConfig, CostSheetError> {
        let c = &self.config;
        let (min, max) = IMAGE_BOX_RANGE_PT;
        if !(min..=max).contains(&c.image_box_pt) {
            return Err(CostSheetError::InvalidConfig(format!(
                "Image box must be {min}–{max} pt, got {}",
                c.image_box_pt
            )));
        }
        if c.input.as_os_str().is_empty() {
            return Err(CostSheetError::InvalidConfig("Input path is empty".into()));
        }
        if c.output.as_os_str().is_empty() {
            return Err(CostSheetError::InvalidConfig("Output path is empty".into()));
        }
        if c.input == c.output {
            return Err(CostSheetError::InvalidConfig(format!(
                "Output path would overwrite the input document: {}",
                c.output.display()
            )));
        }
        if c.title.trim().is_empty() {
            return Err(CostSheetError::InvalidConfig("Title is empty".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Output page size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PageSize {
    /// US Letter, 612 × 792 pt. (default)
    #[default]
    Letter,
    /// ISO A4, 595.28 × 841.89 pt.
    A4,
}

impl PageSize {
    /// `(width, height)` in PDF points.
    pub fn dimensions_pt(self) -> (f32, f32) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::A4 => (595.28, 841.89),
        }
    }
}

impl std::str::FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "letter" | "us-letter" => Ok(PageSize::Letter),
            "a4" => Ok(PageSize::A4),
            _ => Err(format!("Unknown page size: {s}. Use letter or a4")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_paths() {
        let c = SheetConfig::default();
        assert_eq!(c.input, PathBuf::from("input_doc.pdf"));
        assert_eq!(c.output, PathBuf::from("generated_output.pdf"));
        assert_eq!(c.image_dir, PathBuf::from("extract_images"));
        assert_eq!(c.title, "Costing Sheet");
        assert_eq!(c.image_box_pt, 300.0);
        assert!(c.extract_image);
        assert_eq!(c.triggers.len(), 12);
    }

    #[test]
    fn builder_rejects_out_of_range_image_box() {
        assert!(SheetConfig::builder().image_box_pt(4.0).build().is_err());
        assert!(SheetConfig::builder().image_box_pt(5000.0).build().is_err());
        assert!(SheetConfig::builder().image_box_pt(150.0).build().is_ok());
    }

    #[test]
    fn builder_rejects_output_equal_to_input() {
        let err = SheetConfig::builder()
            .input("same.pdf")
            .output("same.pdf")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("overwrite"));
    }

    #[test]
    fn builder_rejects_blank_title() {
        assert!(SheetConfig::builder().title("   ").build().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let c = SheetConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("redacted"));
    }

    #[test]
    fn page_size_parsing() {
        assert_eq!("A4".parse::<PageSize>().unwrap(), PageSize::A4);
        assert_eq!("letter".parse::<PageSize>().unwrap(), PageSize::Letter);
        assert!("legal".parse::<PageSize>().is_err());
        assert_eq!(PageSize::Letter.dimensions_pt(), (612.0, 792.0));
    }
}
