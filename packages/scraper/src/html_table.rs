//! HTML results-table extraction.
//!
//! Header labels and rows are located with two independent expressions,
//! so the header cells and the data rows may come from different parts of
//! the page. Each row's direct `<td>` children are paired with the header
//! labels by position.

use causelist_source_models::{CauseListTable, ExtractedRecord};
use scraper::{ElementRef, Html};

use crate::expression::{Expression, joined_text};

/// Mac Roman mojibake of a UTF-8 non-breaking space, replaced with a plain
/// space in cell text. A real U+00A0 is kept.
const NBSP_MOJIBAKE: &str = "\u{ac}\u{2020}";

/// Extracts the header labels and one record per row.
///
/// Never fails: expressions that match nothing produce empty sequences,
/// and a row without `<td>` children produces an empty record.
#[must_use]
pub fn extract_table(
    html: &[u8],
    header_expression: &Expression,
    row_expression: &Expression,
) -> CauseListTable {
    let document = Html::parse_document(&String::from_utf8_lossy(html));

    // ── Extract headers ─────────────────────────────────────────────
    let headers: Vec<String> = header_expression
        .elements(&document)
        .map(|el| joined_text(el).trim().to_owned())
        .collect();

    // ── Extract body rows ───────────────────────────────────────────
    let records = row_expression
        .elements(&document)
        .map(|row| {
            let cells: Vec<String> = direct_cells(row).map(cell_text).collect();
            ExtractedRecord::from_positional(&headers, &cells)
        })
        .collect();

    CauseListTable { headers, records }
}

/// Direct `<td>` children of `row`; cells of nested tables are skipped.
fn direct_cells(row: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
}

fn cell_text(cell: ElementRef<'_>) -> String {
    joined_text(cell).replace(NBSP_MOJIBAKE, " ").trim().to_owned()
}
