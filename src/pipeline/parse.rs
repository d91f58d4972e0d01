//! Field/spec parser: classify each line of extracted text.
//!
//! Lines are independent. Each is handed to [`TriggerTable::classify`]; a
//! field trigger overwrites its field, a spec trigger appends a copy of its
//! [`SpecLine`]. Lines matching nothing are ignored, so arbitrary prose in the
//! input is harmless.

use crate::record::ParsedRecord;
use crate::triggers::{Trigger, TriggerTable};
use tracing::{debug, trace};

/// Build a [`ParsedRecord`] from the full text of a document.
pub fn parse_text(text: &str, table: &TriggerTable) -> ParsedRecord {
    let mut record = ParsedRecord::default();
    let mut ignored = 0usize;

    for (n, line) in text.lines().enumerate() {
        match table.classify(line) {
            Some(trigger @ Trigger::Field { .. }) => {
                if let Some((kind, value)) = trigger.field_value(line) {
                    trace!(line = n + 1, field = %kind, %value, "field");
                    record.set_field(kind, value);
                }
            }
            Some(Trigger::Spec { line: spec, .. }) => {
                trace!(line = n + 1, placement = %spec.placement, "spec line");
                record.specs.push(spec.clone());
            }
            None => ignored += 1,
        }
    }

    debug!(
        "Parsed {} spec lines, {} lines ignored, grand total {:.2}",
        record.specs.len(),
        ignored,
        record.grand_total()
    );
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SpecLine;

    fn parse(text: &str) -> ParsedRecord {
        parse_text(text, &TriggerTable::default())
    }

    #[test]
    fn worked_example() {
        let record = parse("Style: A1\nSizes: S,M,L\nRib trim\nMain Fabric used\n");
        assert_eq!(record.style, "A1");
        assert_eq!(record.sizes, "S,M,L");
        assert_eq!(record.email, "");
        assert_eq!(record.care_address, "");
        assert_eq!(
            record.specs,
            vec![
                SpecLine::new("Rib", "", 2, 0.75),
                SpecLine::new("Main Fabric", "100% Organic in-conversion cotton", 3, 0.25),
            ]
        );
        assert!((record.specs[0].total() - 1.5).abs() < 1e-9);
        assert!((record.specs[1].total() - 0.75).abs() < 1e-9);
        assert!((record.grand_total() - 2.25).abs() < 1e-9);
    }

    #[test]
    fn every_keyword_emits_its_fixed_line() {
        let text = "Main Fabric\nRib\nFinish/Treatment\nThread\nMain Label\nSize Label\nCare Label\nHang Tag\n";
        let record = parse(text);
        let got: Vec<_> = record
            .specs
            .iter()
            .map(|s| (s.placement.as_str(), s.composition.as_str(), s.quantity, s.rate))
            .collect();
        assert_eq!(
            got,
            vec![
                ("Main Fabric", "100% Organic in-conversion cotton", 3, 0.25),
                ("Rib", "", 2, 0.75),
                ("Finish/Treatment", "", 1, 2.0),
                ("Thread", "", 2, 0.25),
                ("Main Label", "100% Recycled Polyester", 1, 0.25),
                ("Size Label", "100% Recycled Polyester", 2, 0.25),
                ("Care Label", "100% Recycled Polyester", 1, 0.75),
                ("Hang Tag", "100% Nylon", 1, 0.5),
            ]
        );
        assert!((record.grand_total() - 6.75).abs() < 1e-9);
    }

    #[test]
    fn last_field_value_wins() {
        let record = parse("Style: First\nStyle: Second\n");
        assert_eq!(record.style, "Second");
    }

    #[test]
    fn value_is_text_after_last_colon() {
        let record = parse("E-mail: ops@example.com\nCare Address: Mill Rd: Unit 4\n");
        assert_eq!(record.email, "ops@example.com");
        assert_eq!(record.care_address, "Unit 4");
    }

    #[test]
    fn duplicate_keywords_are_not_deduplicated() {
        let record = parse("Rib cuffs\nRib collar\n");
        assert_eq!(record.specs.len(), 2);
        assert!((record.grand_total() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn one_effect_per_line() {
        // Label beats keyword, and only the first keyword counts.
        let record = parse("Style: Ribbed Tee\nThread and Hang Tag\n");
        assert_eq!(record.style, "Ribbed Tee");
        assert_eq!(record.specs.len(), 1);
        assert_eq!(record.specs[0].placement, "Thread");
    }

    #[test]
    fn field_label_in_prose_still_matches() {
        // Substring semantics: the label anywhere on the line counts.
        let record = parse("Available Sizes: XS-XL\n");
        assert_eq!(record.sizes, "XS-XL");
    }

    #[test]
    fn empty_and_unmatched_text() {
        let record = parse("");
        assert_eq!(record, ParsedRecord::default());

        let record = parse("Composition notes\nnothing here\n");
        assert!(record.specs.is_empty());
        assert_eq!(record.grand_total(), 0.0);
    }

    #[test]
    fn custom_table_is_used() {
        let table = TriggerTable::from_json(
            r#"[{ "kind": "spec", "match": { "contains": "Zip" },
                  "placement": "Zip", "quantity": 1, "rate": 1.2 }]"#,
        )
        .unwrap();
        let record = parse_text("Style: A1\nZip fly\nRib\n", &table);
        assert_eq!(record.style, "");
        assert_eq!(record.specs.len(), 1);
        assert_eq!(record.specs[0].placement, "Zip");
    }
}
