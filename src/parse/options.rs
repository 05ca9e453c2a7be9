//! Term and subject enumeration from the Banner selector controls.

use html_scraper::Html;
use regex::Regex;
use std::sync::LazyLock;

use crate::data::models::{SubjectPair, Term};
use crate::error::{CrawlError, Result};

/// Matches `<OPTION VALUE="202620">Fall 2026</OPTION>` entries. Banner
/// emits these uppercase and unquoted-attribute-free, so a regex over the
/// raw page is both faster and more tolerant than a full DOM parse.
static RE_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)OPTION VALUE="([^"]+)"[^>]*>([^<]+)"#).expect("valid regex"));

/// Suffix Banner appends to terms that are closed for registration.
const VIEW_ONLY_SUFFIX: &str = " (View only)";

/// Enumerate every term offered by the term-selector page.
///
/// Drops the literal "None" placeholder entry, strips the "(View only)"
/// label suffix, and sorts ascending by term id. An absent or empty
/// selector is a [`CrawlError::Discovery`] since nothing downstream can run
/// without terms.
pub fn parse_term_options(html: &str) -> Result<Vec<Term>> {
    let mut terms: Vec<Term> = RE_OPTION
        .captures_iter(html)
        .filter_map(|cap| {
            let value = cap[1].trim();
            let label = cap[2].trim();
            if value.is_empty() || label == "None" {
                return None;
            }
            Some(Term {
                term_id: value.to_string(),
                term_name: label.replace(VIEW_ONLY_SUFFIX, ""),
            })
        })
        .collect();

    if terms.is_empty() {
        return Err(CrawlError::Discovery(
            "term selector missing or empty".to_string(),
        ));
    }

    terms.sort_by(|a, b| a.term_id.cmp(&b.term_id));
    Ok(terms)
}

/// The two parallel sequences scraped from the subject-selector form:
/// option values (short codes) and option labels (long names), both
/// including the leading "All Subjects" sentinel at index 0.
#[derive(Debug, Default)]
pub struct SubjectColumns {
    pub codes: Vec<String>,
    pub long_names: Vec<String>,
}

/// Scrape the subject-selector `<select name="sel_subj">` into its parallel
/// code/name sequences. Returns empty columns when the control is absent;
/// the caller decides whether that aborts the term.
pub fn parse_subject_columns(html: &str) -> SubjectColumns {
    static SELECT: LazyLock<html_scraper::Selector> =
        LazyLock::new(|| html_scraper::Selector::parse(r#"select[name="sel_subj"] option"#)
            .expect("static selector must be valid"));

    let doc = Html::parse_document(html);
    let mut columns = SubjectColumns::default();
    for option in doc.select(&SELECT) {
        let value = option.value().attr("value").unwrap_or("").trim();
        if value.is_empty() {
            continue;
        }
        columns.codes.push(value.to_string());
        columns.long_names.push(super::text_of(option));
    }
    columns
}

/// Align the parallel code/name sequences into subject pairs.
///
/// The sequences must be the same length; a mismatch is a term-scoped
/// [`CrawlError::Parse`]. The leading "All Subjects" sentinel pair (index 0,
/// code `%`) is dropped.
pub fn align_subjects(columns: &SubjectColumns) -> Result<Vec<SubjectPair>> {
    if columns.codes.len() != columns.long_names.len() {
        return Err(CrawlError::parse(
            "subject columns",
            format!(
                "length mismatch: {} codes vs {} names",
                columns.codes.len(),
                columns.long_names.len()
            ),
        ));
    }

    Ok(columns
        .codes
        .iter()
        .zip(&columns.long_names)
        .enumerate()
        .filter(|(i, (code, name))| {
            !(*i == 0 && (code.as_str() == "%" || name.as_str() == "All Subjects"))
        })
        .map(|(_, (code, name))| SubjectPair {
            short_name: code.clone(),
            long_name: name.clone(),
        })
        .collect())
}
