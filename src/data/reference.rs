//! Lookup-or-insert handling for the small reference tables (levels,
//! attributes) plus the combined per-section pass.

use sqlx::SqlitePool;

use crate::data::instructors;
use crate::data::models::ExtractedSection;
use crate::error::Result;

/// New reference rows created while persisting one section.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceCounts {
    pub instructors: u64,
    pub levels: u64,
    pub attributes: u64,
}

impl ReferenceCounts {
    pub fn add(&mut self, other: ReferenceCounts) {
        self.instructors += other.instructors;
        self.levels += other.levels;
        self.attributes += other.attributes;
    }
}

pub async fn upsert_level(pool: &SqlitePool, level: &str, first_seen_term: &str) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO levels (level, first_seen) VALUES (?, ?) ON CONFLICT(level) DO NOTHING",
    )
    .bind(level)
    .bind(first_seen_term)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn upsert_attribute(
    pool: &SqlitePool,
    attribute: &str,
    first_seen_term: &str,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO attributes (attribute, first_seen) VALUES (?, ?)
         ON CONFLICT(attribute) DO NOTHING",
    )
    .bind(attribute)
    .bind(first_seen_term)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Register every reference value a section mentions, before the course row
/// itself is written: instructor first, then attributes, then levels.
///
/// Comma-separated list fields are split on `", "`; empty entries are
/// skipped. Idempotent, so re-running a term never inflates the counts.
pub async fn upsert_for_section(
    pool: &SqlitePool,
    section: &ExtractedSection,
    term_id: &str,
) -> Result<ReferenceCounts> {
    let mut counts = ReferenceCounts::default();

    if let Some(instructor) = &section.instructor
        && instructors::upsert_instructor(pool, instructor, term_id).await?
    {
        counts.instructors += 1;
    }

    if let Some(attributes) = &section.course.attributes {
        for attribute in attributes.split(", ").filter(|a| !a.is_empty()) {
            if upsert_attribute(pool, attribute, term_id).await? {
                counts.attributes += 1;
            }
        }
    }

    if let Some(levels) = &section.course.levels {
        for level in levels.split(", ").filter(|l| !l.is_empty()) {
            if upsert_level(pool, level, term_id).await? {
                counts.levels += 1;
            }
        }
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::models::{CourseRecord, InstructorRecord};
    use crate::data::test_pool;

    fn section() -> ExtractedSection {
        ExtractedSection {
            course: CourseRecord {
                crn: "10001".into(),
                levels: Some("Undergraduate, Graduate".into()),
                attributes: Some("General Education".into()),
                ..CourseRecord::default()
            },
            instructor: Some(InstructorRecord {
                name: "Sami Khouri".into(),
                email: "skhouri@aus.edu".into(),
            }),
        }
    }

    #[tokio::test]
    async fn list_fields_split_into_rows() {
        let pool = test_pool().await;

        let counts = upsert_for_section(&pool, &section(), "202510").await.unwrap();
        assert_eq!(counts.instructors, 1);
        assert_eq!(counts.levels, 2);
        assert_eq!(counts.attributes, 1);

        let levels: Vec<String> = sqlx::query_scalar("SELECT level FROM levels ORDER BY level")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(levels, vec!["Graduate", "Undergraduate"]);
    }

    #[tokio::test]
    async fn rerun_creates_nothing_new() {
        let pool = test_pool().await;
        let section = section();

        upsert_for_section(&pool, &section, "202510").await.unwrap();
        let counts = upsert_for_section(&pool, &section, "202620").await.unwrap();

        assert_eq!(counts.instructors, 0);
        assert_eq!(counts.levels, 0);
        assert_eq!(counts.attributes, 0);
    }
}
