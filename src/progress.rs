//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn SheetProgressCallback>`] via
//! [`crate::config::SheetConfigBuilder::progress_callback`] to receive
//! events as the run moves through text extraction, image extraction,
//! parsing and rendering.
//!
//! # Example
//!
//! ```rust
//! use costsheet::{SheetConfig, SheetProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl SheetProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, detail: &str) {
//!         eprintln!("{stage}: {detail}");
//!     }
//! }
//!
//! let config = SheetConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn SheetProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::ImageSkip;
use std::fmt;
use std::sync::Arc;

/// A step of the conversion pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ExtractText,
    ExtractImage,
    Parse,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ExtractText => "Extracting text",
            Stage::ExtractImage => "Extracting image",
            Stage::Parse => "Parsing fields",
            Stage::Render => "Rendering sheet",
        };
        f.write_str(name)
    }
}

/// Called by the pipeline as it runs.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The pipeline is sequential and calls back from the
/// thread that invoked it; the `Send + Sync` bound lets implementations
/// forward events elsewhere.
pub trait SheetProgressCallback: Send + Sync {
    /// Called once before the first stage.
    fn on_run_start(&self, input: &std::path::Path) {
        let _ = input;
    }

    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    ///
    /// `detail` is a short human-readable summary ("3 pages", "12 spec lines").
    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        let _ = (stage, detail);
    }

    /// Called for every embedded image that could not be decoded.
    fn on_image_skipped(&self, skip: &ImageSkip) {
        let _ = skip;
    }

    /// Called once after the output file has been written.
    fn on_run_complete(&self, output: &std::path::Path) {
        let _ = output;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SheetProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SheetConfig`].
pub type ProgressCallback = Arc<dyn SheetProgressCallback>;
