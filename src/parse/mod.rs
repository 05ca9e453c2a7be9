//! HTML extraction for the Banner schedule, catalog, and detail pages.

pub mod catalog;
pub mod detail;
pub mod listing;
pub mod options;

use html_scraper::{ElementRef, Selector};
use std::sync::LazyLock;

use crate::utils::squash_whitespace;

/// Parse a selector that is a compile-time constant.
///
/// Panics only on a malformed literal, which is a programming error.
fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector must be valid")
}

static TD: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static TR: LazyLock<Selector> = LazyLock::new(|| selector("tr"));

/// Whitespace-normalized text content of an element.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    squash_whitespace(&el.text().collect::<String>())
}

/// The cells of a table row, in order.
pub(crate) fn cells_of(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.select(&TD).collect()
}

/// The rows of a table, in order, including any header row.
pub(crate) fn rows_of(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    table.select(&TR).collect()
}
