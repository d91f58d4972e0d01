//! Line classifier: an ordered table of field and spec triggers.
//!
//! Each input line is tested against the table from top to bottom and the
//! first matching [`Trigger`] wins; a line produces at most one effect.
//! The default table ([`TriggerTable::default`]) reproduces the built-in
//! labels and material keywords, and a replacement table can be loaded from
//! JSON:
//!
//! ```json
//! [
//!   { "kind": "field", "match": { "contains": "Style:" }, "field": "style" },
//!   { "kind": "field", "match": { "regex": "^PO\\s*#\\s*(?P<value>\\d+)" }, "field": "style" },
//!   { "kind": "spec",  "match": { "contains": "Rib" },
//!     "placement": "Rib", "composition": "", "quantity": 2, "rate": 0.75 }
//! ]
//! ```
//!
//! A field trigger's value is everything after the last `:` on the line,
//! trimmed. For `regex` matchers a named capture `value` takes precedence.

use crate::error::CostSheetError;
use crate::record::{FieldKind, SpecLine};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

/// How a trigger recognises a line.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Plain substring test.
    Contains(String),
    /// Compiled regular expression.
    Regex(Regex),
}

impl Matcher {
    pub fn contains(needle: impl Into<String>) -> Self {
        Matcher::Contains(needle.into())
    }

    pub fn regex(pattern: &str) -> Result<Self, CostSheetError> {
        Regex::new(pattern)
            .map(Matcher::Regex)
            .map_err(|e| CostSheetError::InvalidTriggerTable(format!("bad regex {pattern:?}: {e}")))
    }

    pub fn is_match(&self, line: &str) -> bool {
        match self {
            Matcher::Contains(needle) => line.contains(needle.as_str()),
            Matcher::Regex(re) => re.is_match(line),
        }
    }

    /// Extract a field value from a line this matcher accepted.
    fn field_value(&self, line: &str) -> String {
        if let Matcher::Regex(re) = self {
            if let Some(m) = re.captures(line).and_then(|c| c.name("value")) {
                return m.as_str().trim().to_string();
            }
        }
        after_last_colon(line)
    }
}

/// Everything after the last `:` in `line`, trimmed. Lines without a colon
/// yield the whole line, trimmed.
pub fn after_last_colon(line: &str) -> String {
    match line.rfind(':') {
        Some(idx) => line[idx + 1..].trim().to_string(),
        None => line.trim().to_string(),
    }
}

/// A single classification rule.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Sets (overwrites) a labelled field.
    Field { matcher: Matcher, field: FieldKind },
    /// Appends a copy of `line` to the bill of materials.
    Spec { matcher: Matcher, line: SpecLine },
}

impl Trigger {
    pub fn matcher(&self) -> &Matcher {
        match self {
            Trigger::Field { matcher, .. } | Trigger::Spec { matcher, .. } => matcher,
        }
    }

    /// Value a field trigger assigns for `line`. `None` for spec triggers.
    pub fn field_value(&self, line: &str) -> Option<(FieldKind, String)> {
        match self {
            Trigger::Field { matcher, field } => Some((*field, matcher.field_value(line))),
            Trigger::Spec { .. } => None,
        }
    }
}

/// Ordered trigger list; earlier entries have priority.
#[derive(Debug, Clone)]
pub struct TriggerTable {
    triggers: Vec<Trigger>,
}

static DEFAULT_TRIGGERS: Lazy<Vec<Trigger>> = Lazy::new(|| {
    let field = |label: &str, field: FieldKind| Trigger::Field {
        matcher: Matcher::contains(label),
        field,
    };
    let spec = |keyword: &str, composition: &str, quantity: u32, rate: f64| Trigger::Spec {
        matcher: Matcher::contains(keyword),
        line: SpecLine::new(keyword, composition, quantity, rate),
    };

    vec![
        field("Style:", FieldKind::Style),
        field("Sizes:", FieldKind::Sizes),
        field("E-mail:", FieldKind::Email),
        field("Care Address:", FieldKind::CareAddress),
        spec("Main Fabric", "100% Organic in-conversion cotton", 3, 0.25),
        spec("Rib", "", 2, 0.75),
        spec("Finish/Treatment", "", 1, 2.0),
        spec("Thread", "", 2, 0.25),
        spec("Main Label", "100% Recycled Polyester", 1, 0.25),
        spec("Size Label", "100% Recycled Polyester", 2, 0.25),
        spec("Care Label", "100% Recycled Polyester", 1, 0.75),
        spec("Hang Tag", "100% Nylon", 1, 0.5),
    ]
});

impl Default for TriggerTable {
    fn default() -> Self {
        Self {
            triggers: DEFAULT_TRIGGERS.clone(),
        }
    }
}

impl TriggerTable {
    pub fn new(triggers: Vec<Trigger>) -> Result<Self, CostSheetError> {
        if triggers.is_empty() {
            return Err(CostSheetError::InvalidTriggerTable(
                "table must contain at least one trigger".into(),
            ));
        }
        Ok(Self { triggers })
    }

    /// Parse a JSON trigger table (see module docs for the format).
    pub fn from_json(json: &str) -> Result<Self, CostSheetError> {
        let raw: Vec<RawTrigger> = serde_json::from_str(json)
            .map_err(|e| CostSheetError::InvalidTriggerTable(e.to_string()))?;
        let triggers = raw
            .into_iter()
            .map(RawTrigger::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(triggers)
    }

    /// Read and parse a JSON trigger table from disk.
    pub fn from_path(path: &Path) -> Result<Self, CostSheetError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CostSheetError::InvalidTriggerTable(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// First trigger accepting `line`, if any.
    pub fn classify(&self, line: &str) -> Option<&Trigger> {
        self.triggers.iter().find(|t| t.matcher().is_match(line))
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

// ── JSON form ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawMatcher {
    Contains(String),
    Regex(String),
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RawTrigger {
    Field {
        #[serde(rename = "match")]
        matcher: RawMatcher,
        field: FieldKind,
    },
    Spec {
        #[serde(rename = "match")]
        matcher: RawMatcher,
        placement: String,
        #[serde(default)]
        composition: String,
        quantity: u32,
        rate: f64,
    },
}

impl RawMatcher {
    fn compile(self) -> Result<Matcher, CostSheetError> {
        match self {
            RawMatcher::Contains(s) if s.is_empty() => Err(CostSheetError::InvalidTriggerTable(
                "empty 'contains' pattern matches every line".into(),
            )),
            RawMatcher::Contains(s) => Ok(Matcher::Contains(s)),
            RawMatcher::Regex(p) => Matcher::regex(&p),
        }
    }
}

impl RawTrigger {
    fn compile(self) -> Result<Trigger, CostSheetError> {
        match self {
            RawTrigger::Field { matcher, field } => Ok(Trigger::Field {
                matcher: matcher.compile()?,
                field,
            }),
            RawTrigger::Spec {
                matcher,
                placement,
                composition,
                quantity,
                rate,
            } => {
                if !rate.is_finite() || rate < 0.0 {
                    return Err(CostSheetError::InvalidTriggerTable(format!(
                        "rate for '{placement}' must be a non-negative number, got {rate}"
                    )));
                }
                Ok(Trigger::Spec {
                    matcher: matcher.compile()?,
                    line: SpecLine::new(placement, composition, quantity, rate),
                })
            }
        }
    }
}
