//! Pipeline stages for input-document → costing-sheet conversion.
//!
//! Each submodule implements one step and can be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──▶ normalize ──▶ parse ──┐
//! (path)   (pdfium)   (cleanup)  (triggers)├──▶ layout ──▶ sheet
//!   └────▶ images ─────────────────────────┘   (geometry)  (lopdf)
//!          (lopdf)
//! ```
//!
//! 1. [`input`]     validate the path and the `%PDF` header
//! 2. [`text`]      bind pdfium and concatenate the text of every page
//! 3. [`normalize`] line endings, invisible characters, odd spaces
//! 4. [`images`]    first decodable embedded image, in page order
//! 5. [`parse`]     classify each line against the trigger table
//! 6. [`layout`]    page flow and table geometry, no I/O
//! 7. [`sheet`]     serialise pages, fonts and the image; atomic write
//!
//! [`fonts`] holds the metrics and text encoding shared by 6 and 7.

pub mod fonts;
pub mod images;
pub mod input;
pub mod layout;
pub mod normalize;
pub mod parse;
pub mod sheet;
pub mod text;
