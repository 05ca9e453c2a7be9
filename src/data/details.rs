//! Database operations for the `section_details` and `course_dependencies`
//! tables.

use std::collections::HashSet;

use sqlx::SqlitePool;

use crate::data::models::{CourseDependency, SectionDetail};
use crate::error::Result;

/// Bulk-write a batch of section details and their dependency links.
///
/// Both tables use insert-or-ignore at their unique keys, so a batch that
/// overlaps an interrupted earlier run writes only the missing rows.
pub async fn save_details(
    pool: &SqlitePool,
    details: &[SectionDetail],
    deps: &[CourseDependency],
) -> Result<()> {
    for detail in details {
        sqlx::query(
            "INSERT OR IGNORE INTO section_details
             (crn, term_id, prerequisites, corequisites, restrictions,
              waitlist_capacity, waitlist_actual, waitlist_remaining, fees)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&detail.crn)
        .bind(&detail.term_id)
        .bind(&detail.prerequisites)
        .bind(&detail.corequisites)
        .bind(&detail.restrictions)
        .bind(detail.waitlist_capacity)
        .bind(detail.waitlist_actual)
        .bind(detail.waitlist_remaining)
        .bind(&detail.fees)
        .execute(pool)
        .await?;
    }

    for dep in deps {
        sqlx::query(
            "INSERT OR IGNORE INTO course_dependencies
             (crn, term_id, dep_type, subject, course_number, minimum_grade)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&dep.crn)
        .bind(&dep.term_id)
        .bind(&dep.dep_type)
        .bind(&dep.subject)
        .bind(&dep.course_number)
        .bind(&dep.minimum_grade)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// (crn, term_id) pairs that already have a detail row. Used to skip
/// already-fetched sections when resuming.
pub async fn existing_detail_keys(pool: &SqlitePool) -> Result<HashSet<(String, String)>> {
    let keys: Vec<(String, String)> =
        sqlx::query_as("SELECT crn, term_id FROM section_details")
            .fetch_all(pool)
            .await?;
    Ok(keys.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_pool;

    fn detail(crn: &str) -> SectionDetail {
        SectionDetail {
            crn: crn.into(),
            term_id: "202620".into(),
            prerequisites: "MTH 104 Minimum Grade of C".into(),
            waitlist_capacity: 10,
            ..SectionDetail::default()
        }
    }

    fn dep(crn: &str) -> CourseDependency {
        CourseDependency {
            crn: crn.into(),
            term_id: "202620".into(),
            dep_type: "prerequisite".into(),
            subject: "MTH".into(),
            course_number: "104".into(),
            minimum_grade: "C".into(),
        }
    }

    #[tokio::test]
    async fn overlapping_batches_do_not_duplicate() {
        let pool = test_pool().await;

        save_details(&pool, &[detail("10001")], &[dep("10001")]).await.unwrap();
        save_details(
            &pool,
            &[detail("10001"), detail("10002")],
            &[dep("10001"), dep("10002")],
        )
        .await
        .unwrap();

        let details: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM section_details")
            .fetch_one(&pool)
            .await
            .unwrap();
        let deps: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM course_dependencies")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(details, 2);
        assert_eq!(deps, 2);

        let existing = existing_detail_keys(&pool).await.unwrap();
        assert!(existing.contains(&("10002".to_string(), "202620".to_string())));
    }
}
