//! Text normalisation: deterministic cleanup of pdfium's text layer before
//! line scanning.
//!
//! pdfium reports text much as the producer wrote it. Depending on the
//! authoring tool that means `\r\n` or bare `\r` line breaks, a
//! non-breaking space inside a keyword (`Main\u{00A0}Fabric`), and the odd
//! zero-width character inside a label (`Sty\u{200B}le:`). Any of these
//! silently defeats substring triggers, so they are repaired here.
//!
//! Other whitespace, tabs included, is left alone so field values keep the
//! text the document carries.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so the per-line trim sees every line.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every cleanup rule, in order.
///
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Replace non-breaking spaces with an ASCII space
/// 4. Trim trailing whitespace per line
/// 5. Collapse runs of blank lines
///
/// Line content is never re-ordered or merged, so a label and its value that
/// pdfium placed on one line stay on one line.
pub fn normalise_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = normalise_spaces(&s);
    let s = trim_trailing_whitespace(&s);
    collapse_blank_lines(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ──────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Non-breaking spaces ──────────────────────────────────────────

fn normalise_spaces(input: &str) -> String {
    input.replace(['\u{00A0}', '\u{2007}', '\u{202F}'], " ")
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    let mut out = input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    if input.ends_with('\n') {
        out.push('\n');
    }
    out
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}
