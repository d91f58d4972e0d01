//! The parsed form of an input document: four labelled fields plus an
//! ordered bill of materials.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the labelled metadata fields printed above the cost table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Style,
    Sizes,
    Email,
    CareAddress,
}

impl FieldKind {
    /// All fields in the order they are printed on the sheet.
    pub const ALL: [FieldKind; 4] = [
        FieldKind::Style,
        FieldKind::Sizes,
        FieldKind::Email,
        FieldKind::CareAddress,
    ];

    /// Label used both in the source document and on the rendered sheet.
    pub fn label(self) -> &'static str {
        match self {
            FieldKind::Style => "Style",
            FieldKind::Sizes => "Sizes",
            FieldKind::Email => "E-mail",
            FieldKind::CareAddress => "Care Address",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the bill of materials.
///
/// The line total is always derived from `quantity × rate`; it is never
/// stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecLine {
    pub placement: String,
    #[serde(default)]
    pub composition: String,
    pub quantity: u32,
    pub rate: f64,
}

impl SpecLine {
    pub fn new(
        placement: impl Into<String>,
        composition: impl Into<String>,
        quantity: u32,
        rate: f64,
    ) -> Self {
        Self {
            placement: placement.into(),
            composition: composition.into(),
            quantity,
            rate,
        }
    }

    /// `quantity × rate`.
    pub fn total(&self) -> f64 {
        f64::from(self.quantity) * self.rate
    }
}

/// Everything the parser recognised in one input document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedRecord {
    pub style: String,
    pub sizes: String,
    pub email: String,
    pub care_address: String,
    pub specs: Vec<SpecLine>,
}

impl ParsedRecord {
    /// Value of a labelled field; empty when the label never appeared.
    pub fn field(&self, kind: FieldKind) -> &str {
        match kind {
            FieldKind::Style => &self.style,
            FieldKind::Sizes => &self.sizes,
            FieldKind::Email => &self.email,
            FieldKind::CareAddress => &self.care_address,
        }
    }

    /// Overwrite a labelled field. Later matches replace earlier ones.
    pub(crate) fn set_field(&mut self, kind: FieldKind, value: String) {
        let slot = match kind {
            FieldKind::Style => &mut self.style,
            FieldKind::Sizes => &mut self.sizes,
            FieldKind::Email => &mut self.email,
            FieldKind::CareAddress => &mut self.care_address,
        };
        *slot = value;
    }

    /// Sum of every spec line's total, recomputed on each call.
    pub fn grand_total(&self) -> f64 {
        self.specs.iter().map(SpecLine::total).sum()
    }
}
