//! Record types shared between the parsers and the persistence layer.

use bitflags::bitflags;

/// One academic term as enumerated from the term-selector control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    /// Opaque ordered code like `202620`. Fixed-width numeric, so lexical
    /// and numeric ordering coincide.
    pub term_id: String,
    pub term_name: String,
}

/// A (short code, long name) subject pair for one term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectPair {
    pub short_name: String,
    pub long_name: String,
}

bitflags! {
    /// Meeting-day flags over the Sunday-to-Thursday teaching week.
    ///
    /// Parsing sets at most one flag (first match over U, M, T, W, R); see
    /// [`DayFlags::from_meeting_days`]. The representation is a set so a
    /// multi-day rule is a one-function change if downstream consumers ever
    /// stop depending on the single-flag behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DayFlags: u8 {
        const SUNDAY = 1 << 0;
        const MONDAY = 1 << 1;
        const TUESDAY = 1 << 2;
        const WEDNESDAY = 1 << 3;
        const THURSDAY = 1 << 4;
    }
}

impl DayFlags {
    /// Derive day flags from a Banner meeting-days letter code.
    ///
    /// First-match precedence over U, M, T, W, R: if the text contains "U"
    /// the Sunday flag is set and no other letter is evaluated, even when the
    /// text names multiple days. This reproduces the upstream-observed
    /// behavior exactly; do not "fix" it here without a schema migration for
    /// consumers of the five boolean columns.
    pub fn from_meeting_days(text: &str) -> Self {
        const PRECEDENCE: [(char, DayFlags); 5] = [
            ('U', DayFlags::SUNDAY),
            ('M', DayFlags::MONDAY),
            ('T', DayFlags::TUESDAY),
            ('W', DayFlags::WEDNESDAY),
            ('R', DayFlags::THURSDAY),
        ];
        for (letter, flag) in PRECEDENCE {
            if text.contains(letter) {
                return flag;
            }
        }
        DayFlags::empty()
    }
}

/// One extracted course section, in document order.
///
/// Schedule-dependent fields are `None` for placeholder listings that have
/// no meeting table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseRecord {
    pub crn: String,
    pub subject: String,
    pub course_number: String,
    pub title: String,
    /// The raw "SUBJ NNN" token from the header line.
    pub short_name: String,
    pub section: String,
    pub levels: Option<String>,
    pub attributes: Option<String>,
    pub schedule_type: Option<String>,
    pub credits: Option<f64>,
    pub class_type: Option<String>,
    pub is_lab: Option<bool>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub days: DayFlags,
    pub seats_available: Option<bool>,
    pub classroom: Option<String>,
    pub instructor_name: Option<String>,
    pub instructor_email: Option<String>,
}

/// Sentinel email recorded when the instructor is TBA or has no mail link.
pub const EMAIL_NONE: &str = "none";

/// Instructor identity derived from the meeting table's instructor cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructorRecord {
    pub name: String,
    /// A real address, or [`EMAIL_NONE`].
    pub email: String,
}

/// One course record paired with its instructor record, if any.
///
/// Placeholder listings produce no instructor record.
#[derive(Debug, Clone)]
pub struct ExtractedSection {
    pub course: CourseRecord,
    pub instructor: Option<InstructorRecord>,
}

/// One catalog entry: the per-course (not per-section) description row.
#[derive(Debug, Clone, Default)]
pub struct CatalogEntry {
    pub subject: String,
    pub course_number: String,
    pub description: String,
    pub credit_hours: Option<f64>,
    pub lecture_hours: Option<f64>,
    pub lab_hours: Option<f64>,
    pub department: String,
}

/// Registration detail for one section: text requirements plus waitlist.
#[derive(Debug, Clone, Default)]
pub struct SectionDetail {
    pub crn: String,
    pub term_id: String,
    pub prerequisites: String,
    pub corequisites: String,
    pub restrictions: String,
    pub waitlist_capacity: i64,
    pub waitlist_actual: i64,
    pub waitlist_remaining: i64,
    /// JSON array of `{description, amount}`, or empty when no fees listed.
    pub fees: String,
}

/// A structured prerequisite/corequisite link extracted from a detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseDependency {
    pub crn: String,
    pub term_id: String,
    /// `"prerequisite"` or `"corequisite"`.
    pub dep_type: String,
    pub subject: String,
    pub course_number: String,
    pub minimum_grade: String,
}
