//! Catalog-page extraction: per-course descriptions and contact hours.

use html_scraper::{Html, Selector};
use regex::Regex;
use std::sync::LazyLock;

use crate::data::models::CatalogEntry;
use crate::utils::squash_whitespace;

static TITLE_CELL: LazyLock<Selector> = LazyLock::new(|| super::selector("td.nttitle"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| super::selector("a"));
static CONTENT_CELL: LazyLock<Selector> = LazyLock::new(|| super::selector("td.ntdefault"));

static RE_CREDIT_HOURS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)\s+Credit hours").expect("valid regex"));
static RE_LECTURE_HOURS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)\s+Lecture hours").expect("valid regex"));
static RE_LAB_HOURS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)\s+Lab hours").expect("valid regex"));

fn captured_hours(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text).and_then(|cap| cap[1].parse::<f64>().ok())
}

/// Parse one catalog page into entries for every course of the subject.
///
/// Title cells read `"COE 221 - Digital Systems"`; the following row's
/// content cell starts with the prose description, then lists contact hours
/// and the owning department as bare text lines.
pub fn parse_catalog_page(html: &str) -> Vec<CatalogEntry> {
    let doc = Html::parse_document(html);
    let mut entries = Vec::new();

    for title_cell in doc.select(&TITLE_CELL) {
        let Some(link) = title_cell.select(&ANCHOR).next() else {
            continue;
        };
        let title_text = super::text_of(link);
        let Some((course_token, _title)) = title_text.split_once(" - ") else {
            continue;
        };
        let mut parts = course_token.split_whitespace();
        let Some(subject) = parts.next() else {
            continue;
        };
        let course_number = parts.collect::<Vec<_>>().join(" ");
        if course_number.is_empty() {
            continue;
        }

        let content_cell = title_cell
            .parent()
            .and_then(|tr| {
                tr.next_siblings()
                    .filter_map(html_scraper::ElementRef::wrap)
                    .next()
            })
            .and_then(|content_tr| content_tr.select(&CONTENT_CELL).next());
        let Some(content_cell) = content_cell else {
            continue;
        };

        // The description is the cell's leading text node, before any <br/>
        // or child element starts the hours/department block.
        let description = content_cell
            .children()
            .next()
            .and_then(|node| node.value().as_text().map(|text| squash_whitespace(text)))
            .unwrap_or_default();

        let full_text = content_cell.text().collect::<String>();
        let department = content_cell
            .text()
            .map(squash_whitespace)
            .find(|line| line.ends_with("Department"))
            .unwrap_or_default();

        entries.push(CatalogEntry {
            subject: subject.to_string(),
            course_number,
            description,
            credit_hours: captured_hours(&RE_CREDIT_HOURS, &full_text),
            lecture_hours: captured_hours(&RE_LECTURE_HOURS, &full_text),
            lab_hours: captured_hours(&RE_LAB_HOURS, &full_text),
            department,
        });
    }

    entries
}
