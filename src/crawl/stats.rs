//! Per-term and whole-run crawl statistics.

use num_format::{Locale, ToFormattedString};

use crate::data::reference::ReferenceCounts;
use crate::data::SummaryCounts;

/// What one term's persistence pass produced.
#[derive(Debug, Default)]
pub struct TermStats {
    pub courses: u64,
    pub new_subjects: u64,
    pub reference: ReferenceCounts,
}

/// Running totals across the whole crawl.
#[derive(Debug, Default)]
pub struct RunStats {
    pub terms_crawled: u64,
    pub terms_failed: u64,
    pub courses: u64,
    pub new_subjects: u64,
    pub reference: ReferenceCounts,
}

impl RunStats {
    pub fn absorb(&mut self, term: &TermStats) {
        self.terms_crawled += 1;
        self.courses += term.courses;
        self.new_subjects += term.new_subjects;
        self.reference.add(term.reference);
    }
}

/// Render the final table-count summary as log-friendly lines.
pub fn summary_lines(counts: &SummaryCounts) -> Vec<(&'static str, String)> {
    let fmt = |n: i64| n.to_formatted_string(&Locale::en);
    vec![
        ("semesters", fmt(counts.semesters)),
        ("subjects", fmt(counts.subjects)),
        ("instructors", fmt(counts.instructors)),
        ("levels", fmt(counts.levels)),
        ("attributes", fmt(counts.attributes)),
        ("courses", fmt(counts.courses)),
        ("catalog", fmt(counts.catalog)),
        ("section_details", fmt(counts.section_details)),
        ("course_dependencies", fmt(counts.course_dependencies)),
    ]
}
