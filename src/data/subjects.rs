//! Database operations for the `subjects` reference table.

use sqlx::SqlitePool;

use crate::data::models::SubjectPair;
use crate::error::Result;

/// Insert a subject if its short code is new, stamping `first_seen` with the
/// term it was first observed in. Existing rows are left untouched, long
/// name included.
///
/// Returns true when a new row was created.
pub async fn upsert_subject(
    pool: &SqlitePool,
    subject: &SubjectPair,
    first_seen_term: &str,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO subjects (short_name, long_name, first_seen) VALUES (?, ?, ?)
         ON CONFLICT(short_name) DO NOTHING",
    )
    .bind(&subject.short_name)
    .bind(&subject.long_name)
    .bind(first_seen_term)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Subject codes that actually have course rows, ascending.
pub async fn crawled_subject_codes(pool: &SqlitePool) -> Result<Vec<String>> {
    let codes = sqlx::query_scalar("SELECT DISTINCT subject FROM courses ORDER BY subject")
        .fetch_all(pool)
        .await?;
    Ok(codes)
}

/// Re-derive `first_seen` from the earliest term each subject actually has
/// courses in. Subject lists are global, so the insertion-time stamp can be
/// earlier than any real offering.
pub async fn backfill_first_seen(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE subjects SET first_seen = (
             SELECT MIN(c.term_id) FROM courses c WHERE c.subject = subjects.short_name
         ) WHERE EXISTS (SELECT 1 FROM courses c WHERE c.subject = subjects.short_name)",
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_pool;

    fn subject(short: &str, long: &str) -> SubjectPair {
        SubjectPair {
            short_name: short.into(),
            long_name: long.into(),
        }
    }

    #[tokio::test]
    async fn first_insert_wins() {
        let pool = test_pool().await;

        assert!(
            upsert_subject(&pool, &subject("COE", "Computer Engineering"), "200910")
                .await
                .unwrap()
        );
        // Second sighting in a later term: not inserted, nothing updated.
        assert!(
            !upsert_subject(&pool, &subject("COE", "Comp. Engineering"), "202620")
                .await
                .unwrap()
        );

        let (long_name, first_seen): (String, String) =
            sqlx::query_as("SELECT long_name, first_seen FROM subjects WHERE short_name = 'COE'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(long_name, "Computer Engineering");
        assert_eq!(first_seen, "200910");
    }

    #[tokio::test]
    async fn backfill_uses_earliest_course_term() {
        let pool = test_pool().await;
        upsert_subject(&pool, &subject("MTH", "Mathematics"), "200410")
            .await
            .unwrap();

        for term in ["200820", "200610"] {
            sqlx::query(
                "INSERT INTO courses (crn, term_id, subject, course_number, title, short_name)
                 VALUES (?, ?, 'MTH', '104', 'Calculus I', 'MTH 104')",
            )
            .bind(format!("1{term}"))
            .bind(term)
            .execute(&pool)
            .await
            .unwrap();
        }

        backfill_first_seen(&pool).await.unwrap();

        let first_seen: String =
            sqlx::query_scalar("SELECT first_seen FROM subjects WHERE short_name = 'MTH'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(first_seen, "200610");
    }
}
