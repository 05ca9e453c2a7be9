//! Course-section extraction from the schedule listing page.
//!
//! The listing is a sequence of header/detail row pairs: a `th.ddtitle`
//! header line per section, followed by a `td.dddefault` detail cell that
//! holds free-text metadata and (usually) a meeting table. Headers are
//! free text joined with `" - "`, which the upstream also allows inside
//! titles, so token counts are not trustworthy and two documented
//! irregularities need a remap.

use html_scraper::{ElementRef, Html, Selector};
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use crate::data::models::{
    CourseRecord, DayFlags, EMAIL_NONE, ExtractedSection, InstructorRecord,
};
use crate::utils::squash_whitespace;

static HEADER: LazyLock<Selector> = LazyLock::new(|| super::selector("th.ddtitle"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| super::selector("a"));
static ANCHOR_HREF: LazyLock<Selector> = LazyLock::new(|| super::selector("a[href]"));
static DETAIL_CELL: LazyLock<Selector> = LazyLock::new(|| super::selector("td.dddefault"));
static MEETING_TABLE: LazyLock<Selector> =
    LazyLock::new(|| super::selector("table.datadisplaytable"));

static RE_CREDITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)\s+Credits").expect("valid regex"));
static RE_INSTRUCTOR_P: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+?)\s*\(P\)").expect("valid regex"));
static RE_CF_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/cdn-cgi/l/email-protection#([a-fA-F0-9]+)").expect("valid regex")
});

/// Literal marker for one upstream title that embeds an extra `" - "`
/// delimiter; triggers the same 5-token remap as the embedded-Lab case.
const SPLIT_TITLE_MARKER: &str = "Targeted eLipo";

/// Fields recovered from one header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFields {
    pub title: String,
    pub crn: String,
    pub subject: String,
    pub course_number: String,
    /// The raw "SUBJ NNN" token.
    pub short_name: String,
    pub section: String,
    /// True when the 5-token embedded-"Lab" remap applied.
    pub lab_hint: bool,
}

fn split_course_token(token: &str) -> (String, String) {
    let mut parts = token.split_whitespace();
    let subject = parts.next().unwrap_or(token).to_string();
    let number = parts.next().unwrap_or("").to_string();
    (subject, number)
}

/// Parse a `"Title - CRN - SUBJ NNN - Section"` header line.
///
/// The canonical shape is 4 tokens. Two documented irregularities produce 5
/// tokens (an extra "Lab" token inside the title, and the
/// [`SPLIT_TITLE_MARKER`] title); both remap identically. Any other header
/// with extra tokens is resolved from the end, treating everything before
/// the last three tokens as the title. Fewer than 4 tokens is unparseable.
pub fn parse_header(header: &str) -> Option<HeaderFields> {
    let tokens: Vec<&str> = header.split(" - ").collect();
    match tokens.len() {
        0..=3 => None,
        4 => {
            let (subject, course_number) = split_course_token(tokens[2]);
            Some(HeaderFields {
                title: tokens[0].trim().to_string(),
                crn: tokens[1].trim().to_string(),
                subject,
                course_number,
                short_name: tokens[2].trim().to_string(),
                section: tokens[3].trim().to_string(),
                lab_hint: false,
            })
        }
        5 if tokens[1].contains("Lab") || header.contains(SPLIT_TITLE_MARKER) => {
            let (subject, course_number) = split_course_token(tokens[3]);
            Some(HeaderFields {
                title: format!("{} {}", tokens[0].trim(), tokens[1].trim()),
                crn: tokens[2].trim().to_string(),
                subject,
                course_number,
                short_name: tokens[3].trim().to_string(),
                section: tokens[4].trim().to_string(),
                lab_hint: tokens[1].contains("Lab"),
            })
        }
        n => {
            // Unmarked extra delimiters: the last three tokens are always
            // crn / course / section, the rest is the title verbatim.
            let (subject, course_number) = split_course_token(tokens[n - 2]);
            Some(HeaderFields {
                title: tokens[..n - 3].join(" - ").trim().to_string(),
                crn: tokens[n - 3].trim().to_string(),
                subject,
                course_number,
                short_name: tokens[n - 2].trim().to_string(),
                section: tokens[n - 1].trim().to_string(),
                lab_hint: false,
            })
        }
    }
}

/// Free-text metadata from the detail cell, outside the meeting table.
#[derive(Debug, Default, PartialEq)]
struct DetailMeta {
    levels: Option<String>,
    attributes: Option<String>,
    schedule_type: Option<String>,
    credits: Option<f64>,
}

/// Walk the detail cell's text nodes and pick out the labeled metadata.
///
/// Labels come in two shapes depending on term vintage: a span whose text is
/// exactly `"Levels:"` followed by the value in the next text node, or a
/// single line `"Levels: Undergraduate"`. Both are handled.
fn extract_meta(detail_cell: ElementRef<'_>) -> DetailMeta {
    #[derive(Clone, Copy)]
    enum Pending {
        Levels,
        Attributes,
    }

    let mut meta = DetailMeta::default();
    let mut pending: Option<Pending> = None;

    for chunk in detail_cell.text() {
        let line = squash_whitespace(chunk);
        if line.is_empty() {
            continue;
        }

        if let Some(label) = pending.take() {
            match label {
                Pending::Levels => meta.levels.get_or_insert(line),
                Pending::Attributes => meta.attributes.get_or_insert(line),
            };
            continue;
        }

        if line == "Levels:" {
            pending = Some(Pending::Levels);
        } else if line == "Attributes:" {
            pending = Some(Pending::Attributes);
        } else if let Some((_, value)) = line.split_once("Levels: ") {
            meta.levels.get_or_insert(value.trim().to_string());
        } else if let Some((_, value)) = line.split_once("Attributes: ") {
            meta.attributes.get_or_insert(value.trim().to_string());
        } else if let Some(prefix) = line
            .strip_suffix(" Schedule Type")
            .or_else(|| line.strip_suffix(" Schedule"))
        {
            meta.schedule_type.get_or_insert(prefix.trim().to_string());
        } else if line.ends_with("Credits")
            && let Some(cap) = RE_CREDITS.captures(&line)
        {
            if meta.credits.is_none() {
                meta.credits = cap[1].parse::<f64>().ok();
            }
        }
    }

    meta
}

/// Decode a Cloudflare email-protection payload (hex, XOR with first byte).
fn decode_cf_email(encoded: &str) -> Option<String> {
    let key = u8::from_str_radix(encoded.get(0..2)?, 16).ok()?;
    let mut out = String::with_capacity(encoded.len() / 2);
    let mut i = 2;
    while i + 2 <= encoded.len() {
        let byte = u8::from_str_radix(&encoded[i..i + 2], 16).ok()?;
        out.push((byte ^ key) as char);
        i += 2;
    }
    Some(out)
}

/// Pull the instructor email out of the meeting table's instructor cell.
///
/// Returns `None` for cells with no usable mail link.
fn instructor_email(cell: ElementRef<'_>) -> Option<String> {
    for anchor in cell.select(&ANCHOR_HREF) {
        let href = anchor.value().attr("href").unwrap_or("");
        if let Some(address) = href.strip_prefix("mailto:") {
            let address = address.trim();
            if !address.is_empty() {
                return Some(address.to_string());
            }
        }
        if let Some(cap) = RE_CF_EMAIL.captures(href) {
            return decode_cf_email(&cap[1]).filter(|a| !a.is_empty());
        }
    }
    None
}

/// Strip the trailing `"(P)"` primary-instructor marker and everything
/// after it from the raw instructor cell text.
fn instructor_name(raw: &str) -> String {
    match RE_INSTRUCTOR_P.captures(raw) {
        Some(cap) => squash_whitespace(&cap[1]),
        None => squash_whitespace(raw),
    }
}

/// First data row of the meeting table, skipping the header row.
fn first_meeting_row<'a>(table: ElementRef<'a>) -> Option<Vec<ElementRef<'a>>> {
    super::rows_of(table)
        .into_iter()
        .skip(1)
        .map(super::cells_of)
        .find(|cells| cells.len() >= 8)
}

/// Extract every course section from one listing document, in document
/// order, pairing each with its instructor record where one exists.
///
/// Malformed headers are logged and skipped rather than failing the whole
/// document; a detail block with no meeting table is a valid placeholder
/// listing, not an error.
pub fn extract_sections(html: &str) -> Vec<ExtractedSection> {
    let doc = Html::parse_document(html);
    let mut sections = Vec::new();

    for header_cell in doc.select(&HEADER) {
        let header_text = match header_cell.select(&ANCHOR).next() {
            Some(anchor) => super::text_of(anchor),
            None => super::text_of(header_cell),
        };

        let Some(header) = parse_header(&header_text) else {
            warn!(header = %header_text, "unparseable section header, skipping");
            continue;
        };
        if header.crn.is_empty() {
            warn!(header = %header_text, "section header without CRN, skipping");
            continue;
        }

        let detail_cell = header_cell
            .parent()
            .and_then(|tr| {
                tr.next_siblings()
                    .filter_map(ElementRef::wrap)
                    .next()
            })
            .and_then(|detail_tr| detail_tr.select(&DETAIL_CELL).next());

        let Some(detail_cell) = detail_cell else {
            warn!(crn = %header.crn, "section header without detail block, skipping");
            continue;
        };

        let meta = extract_meta(detail_cell);
        let mut course = CourseRecord {
            crn: header.crn,
            subject: header.subject,
            course_number: header.course_number,
            title: header.title,
            short_name: header.short_name,
            section: header.section,
            levels: meta.levels,
            attributes: meta.attributes,
            schedule_type: meta.schedule_type,
            credits: meta.credits,
            ..CourseRecord::default()
        };

        let meeting_row = detail_cell
            .select(&MEETING_TABLE)
            .next()
            .and_then(first_meeting_row);

        let Some(cells) = meeting_row else {
            // Placeholder listing: no scheduled meeting. Every
            // schedule-dependent field stays at its absence value and no
            // instructor record is produced.
            sections.push(ExtractedSection {
                course,
                instructor: None,
            });
            continue;
        };

        let time_text = super::text_of(cells[1]);
        if time_text != "TBA"
            && let Some((start, end)) = time_text.split_once(" - ")
        {
            course.start_time = Some(start.trim().to_string());
            course.end_time = Some(end.trim().to_string());
        }

        course.days = DayFlags::from_meeting_days(&super::text_of(cells[2]));
        course.seats_available = Some(super::text_of(cells[3]) == "Y");
        course.classroom = Some(super::text_of(cells[4]));

        let class_type = super::text_of(cells[6]);
        course.is_lab = Some(header.lab_hint || class_type == "Lab");
        course.class_type = Some(class_type);

        let name = instructor_name(&super::text_of(cells[7]));
        let email = if name == "TBA" {
            None
        } else {
            instructor_email(cells[7])
        };
        course.instructor_name = Some(name.clone());
        course.instructor_email = email.clone();

        let instructor = InstructorRecord {
            name,
            email: email.unwrap_or_else(|| EMAIL_NONE.to_string()),
        };

        sections.push(ExtractedSection {
            course,
            instructor: Some(instructor),
        });
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_token_header_never_remaps() {
        let header = parse_header("Intro to Robotics - 12345 - COE 201 - 1").unwrap();
        assert_eq!(header.title, "Intro to Robotics");
        assert_eq!(header.crn, "12345");
        assert_eq!(header.subject, "COE");
        assert_eq!(header.course_number, "201");
        assert_eq!(header.short_name, "COE 201");
        assert_eq!(header.section, "1");
        assert!(!header.lab_hint);
    }

    #[test]
    fn five_token_lab_header_remaps() {
        let header = parse_header("Physics I - Lab - 20412 - PHY 101 - 3").unwrap();
        assert_eq!(header.title, "Physics I Lab");
        assert_eq!(header.crn, "20412");
        assert_eq!(header.subject, "PHY");
        assert_eq!(header.course_number, "101");
        assert_eq!(header.short_name, "PHY 101");
        assert_eq!(header.section, "3");
        assert!(header.lab_hint);
    }

    #[test]
    fn split_title_marker_remaps_identically() {
        let header = parse_header("Targeted eLipo - Workshop - 31999 - NUT 310 - 1").unwrap();
        assert_eq!(header.title, "Targeted eLipo Workshop");
        assert_eq!(header.crn, "31999");
        assert_eq!(header.subject, "NUT");
        assert_eq!(header.course_number, "310");
        assert_eq!(header.section, "1");
        assert!(!header.lab_hint);
    }

    #[test]
    fn unmarked_extra_tokens_resolve_from_the_end() {
        let header =
            parse_header("Topics - Past, Present - and Future - 44444 - HIS 390 - 2").unwrap();
        assert_eq!(header.crn, "44444");
        assert_eq!(header.subject, "HIS");
        assert_eq!(header.course_number, "390");
        assert_eq!(header.section, "2");
        assert_eq!(header.title, "Topics - Past, Present - and Future");
    }

    #[test]
    fn short_header_is_unparseable() {
        assert!(parse_header("Orientation - 12345").is_none());
        assert!(parse_header("").is_none());
    }

    #[test]
    fn instructor_name_strips_primary_marker() {
        assert_eq!(instructor_name("Jane Doe (P)"), "Jane Doe");
        assert_eq!(instructor_name("Jane   Doe (P), John Smith"), "Jane Doe");
        assert_eq!(instructor_name("TBA"), "TBA");
    }

    #[test]
    fn cf_email_roundtrip() {
        // "ab" XOR-encodes to itself under key 0x00; use a real-style payload.
        let key = 0x42u8;
        let plain = "jdoe@aus.edu";
        let encoded: String = std::iter::once(format!("{key:02x}"))
            .chain(plain.bytes().map(|b| format!("{:02x}", b ^ key)))
            .collect();
        assert_eq!(decode_cf_email(&encoded).unwrap(), plain);
        assert!(decode_cf_email("zz").is_none());
    }

    fn listing_fixture(header: &str, detail: &str) -> String {
        format!(
            r##"<html><body><table class="datadisplaytable">
            <tr><th class="ddtitle"><a href="#">{header}</a></th></tr>
            <tr><td class="dddefault">{detail}</td></tr>
            </table></body></html>"##
        )
    }

    const ROBOTICS_DETAIL: &str = r#"
        Hands-on robotics.
        <br/><span class="fieldlabeltext">Levels: </span>Undergraduate, Graduate
        <br/>3.000 Credits
        <br/>Lecture Schedule Type
        <table class="datadisplaytable">
        <tr><th>Type</th><th>Time</th><th>Days</th><th>Seats</th><th>Where</th>
            <th>Date Range</th><th>Schedule Type</th><th>Instructors</th></tr>
        <tr><td>Class</td><td>10:00 am - 10:50 am</td><td>MW</td><td>Y</td>
            <td>ENG 204</td><td>Jan 15 - May 10</td><td>Lecture</td>
            <td>Jane Doe (P)<a href="mailto:jdoe@aus.edu">E-mail</a></td></tr>
        </table>
    "#;

    #[test]
    fn full_extraction_scenario() {
        let html = listing_fixture("Intro to Robotics - 12345 - COE 201 - 1", ROBOTICS_DETAIL);
        let sections = extract_sections(&html);
        assert_eq!(sections.len(), 1);

        let course = &sections[0].course;
        assert_eq!(course.crn, "12345");
        assert_eq!(course.subject, "COE");
        assert_eq!(course.course_number, "201");
        assert_eq!(course.section, "1");
        assert_eq!(course.class_type.as_deref(), Some("Lecture"));
        assert_eq!(course.is_lab, Some(false));
        assert_eq!(course.days, DayFlags::MONDAY);
        assert!(!course.days.contains(DayFlags::SUNDAY));
        assert_eq!(course.seats_available, Some(true));
        assert_eq!(course.start_time.as_deref(), Some("10:00 am"));
        assert_eq!(course.end_time.as_deref(), Some("10:50 am"));
        assert_eq!(course.classroom.as_deref(), Some("ENG 204"));
        assert_eq!(course.levels.as_deref(), Some("Undergraduate, Graduate"));
        assert_eq!(course.attributes, None);
        assert_eq!(course.credits, Some(3.0));
        assert_eq!(course.schedule_type.as_deref(), Some("Lecture"));

        let instructor = sections[0].instructor.as_ref().unwrap();
        assert_eq!(instructor.name, "Jane Doe");
        assert_eq!(instructor.email, "jdoe@aus.edu");
    }

    #[test]
    fn lab_class_type_sets_lab_flag() {
        let detail = ROBOTICS_DETAIL.replace(">Lecture<", ">Lab<");
        let html = listing_fixture("Intro to Robotics - 12345 - COE 201 - 1", &detail);
        let sections = extract_sections(&html);
        assert_eq!(sections[0].course.is_lab, Some(true));
        assert_eq!(sections[0].course.class_type.as_deref(), Some("Lab"));
    }

    #[test]
    fn placeholder_listing_has_no_schedule_fields() {
        let detail = r#"
            <span class="fieldlabeltext">Levels: </span>Undergraduate
            <br/>3.000 Credits
            <br/>Lecture Schedule Type
        "#;
        let html = listing_fixture("Independent Study - 55555 - COE 499 - 1", detail);
        let sections = extract_sections(&html);
        assert_eq!(sections.len(), 1);

        let course = &sections[0].course;
        assert_eq!(course.crn, "55555");
        assert_eq!(course.levels.as_deref(), Some("Undergraduate"));
        assert_eq!(course.schedule_type.as_deref(), Some("Lecture"));
        assert_eq!(course.credits, Some(3.0));
        assert_eq!(course.class_type, None);
        assert_eq!(course.is_lab, None);
        assert_eq!(course.classroom, None);
        assert_eq!(course.start_time, None);
        assert_eq!(course.seats_available, None);
        assert_eq!(course.days, DayFlags::empty());
        assert!(sections[0].instructor.is_none());
    }

    #[test]
    fn tba_instructor_gets_sentinel_email() {
        let detail = ROBOTICS_DETAIL
            .replace(r#"Jane Doe (P)<a href="mailto:jdoe@aus.edu">E-mail</a>"#, "TBA");
        let html = listing_fixture("Intro to Robotics - 12345 - COE 201 - 1", &detail);
        let sections = extract_sections(&html);
        let instructor = sections[0].instructor.as_ref().unwrap();
        assert_eq!(instructor.name, "TBA");
        assert_eq!(instructor.email, EMAIL_NONE);
        assert_eq!(sections[0].course.instructor_email, None);
    }

    #[test]
    fn missing_mail_link_gets_sentinel_email() {
        let detail = ROBOTICS_DETAIL.replace(
            r#"Jane Doe (P)<a href="mailto:jdoe@aus.edu">E-mail</a>"#,
            "John Smith (P)",
        );
        let html = listing_fixture("Intro to Robotics - 12345 - COE 201 - 1", &detail);
        let sections = extract_sections(&html);
        let instructor = sections[0].instructor.as_ref().unwrap();
        assert_eq!(instructor.name, "John Smith");
        assert_eq!(instructor.email, EMAIL_NONE);
    }

    #[test]
    fn tba_time_leaves_times_absent() {
        let detail = ROBOTICS_DETAIL.replace("10:00 am - 10:50 am", "TBA");
        let html = listing_fixture("Intro to Robotics - 12345 - COE 201 - 1", &detail);
        let sections = extract_sections(&html);
        assert_eq!(sections[0].course.start_time, None);
        assert_eq!(sections[0].course.end_time, None);
    }

    #[test]
    fn attributes_label_is_extracted() {
        let detail = ROBOTICS_DETAIL.replace(
            r#"<span class="fieldlabeltext">Levels: </span>Undergraduate, Graduate"#,
            concat!(
                r#"<span class="fieldlabeltext">Levels: </span>Undergraduate"#,
                r#"<br/><span class="fieldlabeltext">Attributes: </span>Core Curriculum, Writing Intensive"#,
            ),
        );
        let html = listing_fixture("Intro to Robotics - 12345 - COE 201 - 1", &detail);
        let sections = extract_sections(&html);
        let course = &sections[0].course;
        assert_eq!(course.levels.as_deref(), Some("Undergraduate"));
        assert_eq!(
            course.attributes.as_deref(),
            Some("Core Curriculum, Writing Intensive")
        );
    }

    #[test]
    fn malformed_header_is_skipped_not_fatal() {
        let html = format!(
            "{}{}",
            listing_fixture("Just A Title", "irrelevant"),
            listing_fixture("Intro to Robotics - 12345 - COE 201 - 1", ROBOTICS_DETAIL),
        );
        let sections = extract_sections(&html);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].course.crn, "12345");
    }
}
