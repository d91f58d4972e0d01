//! Sheet layout: turn a [`ParsedRecord`] into positioned drawing operations.
//!
//! Layout is pure geometry in PDF points (origin bottom-left) and performs no
//! I/O, so page flow and table geometry can be tested without writing a file.
//! [`crate::pipeline::sheet`] serialises the result.
//!
//! ## Flow
//!
//! Elements are placed top-down inside a frame inset by [`MARGIN_PT`]:
//!
//! ```text
//! title            Helvetica-Bold 18, centred
//! 4 × paragraph    Helvetica 10 / 12 leading, word-wrapped
//! cost table       left-aligned, split between rows across pages
//! "Main Image:"    Helvetica-Bold 14         (only with an image)
//! image            box × box, centred        (only with an image)
//! ```
//!
//! Anything that does not fit in the remaining frame height moves to a new
//! page. Vertical space before an element is dropped at the top of a page.

use crate::config::PageSize;
use crate::pipeline::fonts::Font;
use crate::record::{FieldKind, ParsedRecord};

pub const MARGIN_PT: f32 = 72.0;

/// Table column headers.
pub const TABLE_HEADER: [&str; 5] = ["Placement", "Composition", "Qty", "Rate", "Total"];

/// Label in the Rate column of the summary row.
pub const TOTAL_LABEL: &str = "Total Cost";

const TITLE: TextStyle = TextStyle {
    font: Font::HelveticaBold,
    size: 18.0,
    leading: 22.0,
    space_before: 0.0,
    space_after: 6.0,
};
const BODY: TextStyle = TextStyle {
    font: Font::Helvetica,
    size: 10.0,
    leading: 12.0,
    space_before: 0.0,
    space_after: 0.0,
};
const HEADING: TextStyle = TextStyle {
    font: Font::HelveticaBold,
    size: 14.0,
    leading: 18.0,
    space_before: 12.0,
    space_after: 6.0,
};

const CELL_FONT_SIZE: f32 = 10.0;
const CELL_LEADING: f32 = 12.0;
const CELL_PAD_X: f32 = 6.0;
const CELL_PAD_TOP: f32 = 3.0;
const CELL_PAD_BOTTOM: f32 = 3.0;
const HEADER_PAD_BOTTOM: f32 = 12.0;
const GRID_WIDTH: f32 = 1.0;

// ── Output types ─────────────────────────────────────────────────────────

/// An RGB colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
    pub const GREY: Rgb = Rgb(0.5, 0.5, 0.5);
    pub const WHITESMOKE: Rgb = Rgb(0.96, 0.96, 0.96);
    pub const BEIGE: Rgb = Rgb(0.96, 0.96, 0.86);
}

/// One drawing primitive. Rectangles and images are anchored at their
/// lower-left corner; text at the start of its baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        font: Font,
        size: f32,
        color: Rgb,
        text: String,
    },
    FillRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Rgb,
    },
    StrokeRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        line_width: f32,
        color: Rgb,
    },
    /// The main image, stretched to `w × h`.
    Image { x: f32, y: f32, w: f32, h: f32 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub ops: Vec<DrawOp>,
}

impl PageLayout {
    /// All text drawn on the page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn has_image(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, DrawOp::Image { .. }))
    }
}

/// A fully laid-out costing sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub width: f32,
    pub height: f32,
    pub pages: Vec<PageLayout>,
}

/// Inputs that shape the layout besides the record itself.
#[derive(Debug, Clone)]
pub struct LayoutOptions<'a> {
    pub title: &'a str,
    pub page_size: PageSize,
    /// Edge of the square image box, or `None` to omit the image section.
    pub image_box_pt: Option<f32>,
}

// ── Formatting ───────────────────────────────────────────────────────────

/// Two-decimal money value. Negative zero prints as `0.00`.
pub fn format_money(v: f64) -> String {
    let v = if v == 0.0 { 0.0 } else { v };
    format!("{v:.2}")
}

/// Cell text of the cost table, header first and summary row last.
pub fn table_rows(record: &ParsedRecord) -> Vec<[String; 5]> {
    let mut rows = Vec::with_capacity(record.specs.len() + 2);
    rows.push(TABLE_HEADER.map(String::from));
    for spec in &record.specs {
        rows.push([
            spec.placement.clone(),
            spec.composition.clone(),
            spec.quantity.to_string(),
            format_money(spec.rate),
            format_money(spec.total()),
        ]);
    }
    rows.push([
        String::new(),
        String::new(),
        String::new(),
        TOTAL_LABEL.to_string(),
        format_money(record.grand_total()),
    ]);
    rows
}

/// Greedy word wrap. Words wider than `max_width` get a line of their own.
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if font.text_width(&candidate, size) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

// ── Layout engine ────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
struct TextStyle {
    font: Font,
    size: f32,
    leading: f32,
    space_before: f32,
    space_after: f32,
}

#[derive(Clone, Copy, PartialEq)]
enum Align {
    Left,
    Center,
}

/// Top-down cursor over a sequence of pages.
struct Flow {
    width: f32,
    height: f32,
    pages: Vec<PageLayout>,
    cursor: f32,
}

impl Flow {
    fn new(page_size: PageSize) -> Self {
        let (width, height) = page_size.dimensions_pt();
        Self {
            width,
            height,
            pages: vec![PageLayout::default()],
            cursor: height - MARGIN_PT,
        }
    }

    fn frame_left(&self) -> f32 {
        MARGIN_PT
    }

    fn frame_width(&self) -> f32 {
        self.width - 2.0 * MARGIN_PT
    }

    fn frame_height(&self) -> f32 {
        self.height - 2.0 * MARGIN_PT
    }

    fn at_page_top(&self) -> bool {
        self.cursor >= self.height - MARGIN_PT
    }

    fn new_page(&mut self) {
        self.pages.push(PageLayout::default());
        self.cursor = self.height - MARGIN_PT;
    }

    /// Make room for `h` points, breaking the page if needed.
    fn reserve(&mut self, h: f32) {
        if self.cursor - h < MARGIN_PT && !self.at_page_top() {
            self.new_page();
        }
    }

    fn space(&mut self, h: f32) {
        if !self.at_page_top() {
            self.cursor = (self.cursor - h).max(MARGIN_PT);
        }
    }

    fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    fn paragraph(&mut self, text: &str, style: TextStyle, align: Align) {
        self.space(style.space_before);
        for line in wrap_text(text, style.font, style.size, self.frame_width()) {
            self.reserve(style.leading);
            let line_width = style.font.text_width(&line, style.size);
            let x = match align {
                Align::Left => self.frame_left(),
                Align::Center => self.frame_left() + (self.frame_width() - line_width) / 2.0,
            };
            self.push(DrawOp::Text {
                x,
                y: self.cursor - style.size,
                font: style.font,
                size: style.size,
                color: Rgb::BLACK,
                text: line,
            });
            self.cursor -= style.leading;
        }
        self.space(style.space_after);
    }

    fn table(&mut self, rows: &[[String; 5]]) {
        let widths = column_widths(rows);
        let left = self.frame_left();

        for (i, row) in rows.iter().enumerate() {
            let header = i == 0;
            let (font, pad_bottom, background, text_color) = if header {
                (Font::HelveticaBold, HEADER_PAD_BOTTOM, Rgb::GREY, Rgb::WHITESMOKE)
            } else {
                (Font::Helvetica, CELL_PAD_BOTTOM, Rgb::BEIGE, Rgb::BLACK)
            };
            let row_h = CELL_PAD_TOP + CELL_LEADING + pad_bottom;

            self.reserve(row_h);
            let bottom = self.cursor - row_h;
            let baseline = bottom + pad_bottom + (CELL_LEADING - CELL_FONT_SIZE);

            let mut x = left;
            for (cell, &w) in row.iter().zip(&widths) {
                self.push(DrawOp::FillRect {
                    x,
                    y: bottom,
                    w,
                    h: row_h,
                    color: background,
                });
                if !cell.is_empty() {
                    let text_w = font.text_width(cell, CELL_FONT_SIZE);
                    self.push(DrawOp::Text {
                        x: x + (w - text_w) / 2.0,
                        y: baseline,
                        font,
                        size: CELL_FONT_SIZE,
                        color: text_color,
                        text: cell.clone(),
                    });
                }
                self.push(DrawOp::StrokeRect {
                    x,
                    y: bottom,
                    w,
                    h: row_h,
                    line_width: GRID_WIDTH,
                    color: Rgb::BLACK,
                });
                x += w;
            }
            self.cursor = bottom;
        }
    }

    fn image(&mut self, edge: f32) {
        // Never larger than one frame.
        let w = edge.min(self.frame_width());
        let h = edge.min(self.frame_height());
        self.reserve(h);
        let x = self.frame_left() + (self.frame_width() - w) / 2.0;
        self.push(DrawOp::Image {
            x,
            y: self.cursor - h,
            w,
            h,
        });
        self.cursor -= h;
    }
}

/// Widest cell text per column plus horizontal padding.
fn column_widths(rows: &[[String; 5]]) -> [f32; 5] {
    let mut widths = [0.0f32; 5];
    for (i, row) in rows.iter().enumerate() {
        let font = if i == 0 { Font::HelveticaBold } else { Font::Helvetica };
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = w.max(font.text_width(cell, CELL_FONT_SIZE));
        }
    }
    widths.map(|w| w + 2.0 * CELL_PAD_X)
}

/// Lay out the complete costing sheet.
pub fn layout_sheet(record: &ParsedRecord, opts: &LayoutOptions<'_>) -> SheetLayout {
    let mut flow = Flow::new(opts.page_size);

    flow.paragraph(opts.title, TITLE, Align::Center);
    for kind in FieldKind::ALL {
        let text = format!("{}: {}", kind.label(), record.field(kind));
        flow.paragraph(&text, BODY, Align::Left);
    }
    flow.table(&table_rows(record));

    if let Some(edge) = opts.image_box_pt {
        flow.paragraph("Main Image:", HEADING, Align::Left);
        flow.image(edge);
    }

    SheetLayout {
        width: flow.width,
        height: flow.height,
        pages: flow.pages,
    }
}
