//! Section-detail-page extraction: prerequisites, corequisites,
//! restrictions, waitlist numbers, fees, and structured dependency links.
//!
//! The requirements text sits between `span.fieldlabeltext` headings with no
//! enclosing element, so the label fragments are sliced out of the cell's
//! raw HTML and re-parsed individually.

use html_scraper::{ElementRef, Html, Selector};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::data::models::{CourseDependency, SectionDetail};
use crate::utils::squash_whitespace;

static DETAIL_CELL: LazyLock<Selector> = LazyLock::new(|| super::selector("td.dddefault"));
static TABLE: LazyLock<Selector> = LazyLock::new(|| super::selector("table"));
static CAPTION: LazyLock<Selector> = LazyLock::new(|| super::selector("caption"));
static TH: LazyLock<Selector> = LazyLock::new(|| super::selector("th"));
static ANCHOR_HREF: LazyLock<Selector> = LazyLock::new(|| super::selector("a[href]"));

static RE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<span[^>]*class="fieldlabeltext"[^>]*>\s*(Prerequisites|Corequisites|Restrictions)[^<]*</span>"#)
        .expect("valid regex")
});
static RE_ANY_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<span[^>]*class="fieldlabeltext""#).expect("valid regex")
});
static RE_MIN_GRADE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Minimum Grade of\s+([A-Z][+-]?)").expect("valid regex"));

/// One itemized fee row, serialized into the detail's `fees` JSON array.
#[derive(Debug, Serialize)]
struct Fee {
    description: String,
    amount: String,
}

/// Locate the main detail cell: the first `td.dddefault` containing a
/// table, falling back to the largest such cell.
fn main_detail_cell(doc: &Html) -> Option<ElementRef<'_>> {
    let cells: Vec<ElementRef<'_>> = doc.select(&DETAIL_CELL).collect();
    cells
        .iter()
        .copied()
        .find(|cell| cell.select(&TABLE).next().is_some())
        .or_else(|| cells.into_iter().max_by_key(|cell| cell.html().len()))
}

fn parse_waitlist(table: ElementRef<'_>) -> Option<(i64, i64, i64)> {
    for row in super::rows_of(table) {
        let is_waitlist = row
            .select(&TH)
            .next()
            .is_some_and(|th| super::text_of(th).contains("Waitlist"));
        if !is_waitlist {
            continue;
        }
        let cells = super::cells_of(row);
        if cells.len() >= 3 {
            let parse = |cell: ElementRef<'_>| super::text_of(cell).parse::<i64>().ok();
            if let (Some(cap), Some(act), Some(rem)) =
                (parse(cells[0]), parse(cells[1]), parse(cells[2]))
            {
                return Some((cap, act, rem));
            }
        }
    }
    None
}

fn parse_fees(table: ElementRef<'_>) -> Vec<Fee> {
    let mut fees = Vec::new();
    for row in super::rows_of(table) {
        let cells = super::cells_of(row);
        if cells.len() < 2 {
            continue;
        }
        let description = super::text_of(cells[cells.len() - 2]);
        let amount = super::text_of(cells[cells.len() - 1]);
        if !description.is_empty() {
            fees.push(Fee {
                description,
                amount,
            });
        }
    }
    fees
}

/// Slice the raw HTML between a requirements label span and the next label
/// span or table. The regex crate has no lookahead, so boundaries are found
/// with a second scan instead of a zero-width assertion.
fn labeled_fragment<'a>(cell_html: &'a str, label: &str) -> Option<&'a str> {
    for cap in RE_LABEL.captures_iter(cell_html) {
        if !cap[1].eq_ignore_ascii_case(label) {
            continue;
        }
        let start = cap.get(0).map(|m| m.end())?;
        let rest = &cell_html[start..];
        let mut end = rest.len();
        if let Some(m) = RE_ANY_LABEL.find(rest) {
            end = end.min(m.start());
        }
        if let Some(idx) = rest.find("<table") {
            end = end.min(idx);
        }
        if let Some(idx) = rest.find("</td>") {
            end = end.min(idx);
        }
        return Some(&rest[..end]);
    }
    None
}

fn fragment_text(fragment_html: &str) -> String {
    let fragment = Html::parse_fragment(fragment_html);
    squash_whitespace(&fragment.root_element().text().collect::<String>())
}

/// Extract structured course links (with minimum grades from the trailing
/// text) out of a requirements fragment.
fn fragment_dependencies(
    fragment_html: &str,
    crn: &str,
    term_id: &str,
    dep_type: &str,
) -> Vec<CourseDependency> {
    let fragment = Html::parse_fragment(fragment_html);
    let mut deps = Vec::new();

    for anchor in fragment.select(&ANCHOR_HREF) {
        let link_text = super::text_of(anchor);
        let mut parts = link_text.split_whitespace();
        let (Some(subject), Some(course_number)) = (parts.next(), parts.next()) else {
            continue;
        };

        // The grade qualifier trails the link as a bare text node.
        let minimum_grade = anchor
            .next_siblings()
            .find_map(|node| node.value().as_text().map(|t| t.to_string()))
            .and_then(|tail| {
                RE_MIN_GRADE
                    .captures(&tail)
                    .map(|cap| cap[1].to_string())
            })
            .unwrap_or_default();

        deps.push(CourseDependency {
            crn: crn.to_string(),
            term_id: term_id.to_string(),
            dep_type: dep_type.to_string(),
            subject: subject.to_string(),
            course_number: course_number.to_string(),
            minimum_grade,
        });
    }

    deps
}

/// Parse one section detail page.
///
/// Always returns a detail row (possibly empty) so every fetched (crn,
/// term) pair is marked as done; dependency links may be empty.
pub fn parse_detail_page(
    html: &str,
    crn: &str,
    term_id: &str,
) -> (SectionDetail, Vec<CourseDependency>) {
    let mut detail = SectionDetail {
        crn: crn.to_string(),
        term_id: term_id.to_string(),
        ..SectionDetail::default()
    };

    let doc = Html::parse_document(html);
    let Some(main_cell) = main_detail_cell(&doc) else {
        return (detail, Vec::new());
    };

    for table in main_cell.select(&TABLE) {
        let caption = table
            .select(&CAPTION)
            .next()
            .map(super::text_of)
            .unwrap_or_default();

        if caption.contains("Registration Availability") {
            if let Some((cap, act, rem)) = parse_waitlist(table) {
                detail.waitlist_capacity = cap;
                detail.waitlist_actual = act;
                detail.waitlist_remaining = rem;
            }
        } else if caption.to_lowercase().contains("fee") {
            let fees = parse_fees(table);
            if !fees.is_empty() {
                detail.fees = serde_json::to_string(&fees).unwrap_or_default();
            }
        }
    }

    let cell_html = main_cell.html();
    let mut deps = Vec::new();

    if let Some(fragment) = labeled_fragment(&cell_html, "Prerequisites") {
        detail.prerequisites = fragment_text(fragment);
        deps.extend(fragment_dependencies(fragment, crn, term_id, "prerequisite"));
    }
    if let Some(fragment) = labeled_fragment(&cell_html, "Corequisites") {
        detail.corequisites = fragment_text(fragment);
        deps.extend(fragment_dependencies(fragment, crn, term_id, "corequisite"));
    }
    if let Some(fragment) = labeled_fragment(&cell_html, "Restrictions") {
        detail.restrictions = fragment_text(fragment);
    }

    (detail, deps)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_PAGE: &str = r#"
        <html><body><table class="datadisplaytable">
        <tr><td class="dddefault">
            Associated Term: Fall 2026
            <br/>
            <table class="datadisplaytable" summary="registration">
            <caption class="captiontext">Registration Availability</caption>
            <tr><th class="ddheader">&nbsp;</th><th>Capacity</th><th>Actual</th><th>Remaining</th></tr>
            <tr><th class="ddlabel">Seats</th><td>30</td><td>28</td><td>2</td></tr>
            <tr><th class="ddlabel">Waitlist Seats</th><td>10</td><td>3</td><td>7</td></tr>
            </table>
            <span class="fieldlabeltext">Restrictions:</span>
            <br/>Must be enrolled in the College of Engineering.
            <br/>
            <span class="fieldlabeltext">Prerequisites:</span>
            <br/><a href="/catalog?one_subj=MTH">MTH 104</a> Minimum Grade of C and
            <a href="/catalog?one_subj=PHY">PHY 101</a> Minimum Grade of D
            <br/>
            <span class="fieldlabeltext">Corequisites:</span>
            <br/><a href="/catalog?one_subj=COE">COE 202</a>
            <table class="datadisplaytable" summary="fees">
            <caption class="captiontext">Detail Fee Information</caption>
            <tr><th>Type</th><td>Lab Fee</td><td>$150.00</td></tr>
            </table>
        </td></tr>
        </table></body></html>
    "#;

    #[test]
    fn waitlist_numbers() {
        let (detail, _) = parse_detail_page(DETAIL_PAGE, "12345", "202620");
        assert_eq!(detail.waitlist_capacity, 10);
        assert_eq!(detail.waitlist_actual, 3);
        assert_eq!(detail.waitlist_remaining, 7);
    }

    #[test]
    fn requirements_text_and_dependencies() {
        let (detail, deps) = parse_detail_page(DETAIL_PAGE, "12345", "202620");
        assert!(detail.restrictions.contains("College of Engineering"));
        assert!(detail.prerequisites.contains("MTH 104"));
        assert!(detail.corequisites.contains("COE 202"));

        assert_eq!(deps.len(), 3);
        assert_eq!(deps[0].dep_type, "prerequisite");
        assert_eq!(deps[0].subject, "MTH");
        assert_eq!(deps[0].course_number, "104");
        assert_eq!(deps[0].minimum_grade, "C");
        assert_eq!(deps[1].subject, "PHY");
        assert_eq!(deps[1].minimum_grade, "D");
        assert_eq!(deps[2].dep_type, "corequisite");
        assert_eq!(deps[2].subject, "COE");
        assert_eq!(deps[2].minimum_grade, "");
    }

    #[test]
    fn fees_serialize_to_json() {
        let (detail, _) = parse_detail_page(DETAIL_PAGE, "12345", "202620");
        let fees: Vec<serde_json::Value> = serde_json::from_str(&detail.fees).unwrap();
        assert_eq!(fees.len(), 1);
        assert_eq!(fees[0]["description"], "Lab Fee");
        assert_eq!(fees[0]["amount"], "$150.00");
    }

    #[test]
    fn empty_page_is_an_empty_detail() {
        let (detail, deps) = parse_detail_page("<html></html>", "99999", "202510");
        assert_eq!(detail.crn, "99999");
        assert_eq!(detail.prerequisites, "");
        assert_eq!(detail.waitlist_capacity, 0);
        assert!(deps.is_empty());
    }
}
