//! Database operations for the `instructors` reference table.
//!
//! Identity is the (name, email) pair: the same name with a different email
//! is treated as a different person, and the "TBA"/sentinel-email record is
//! a single shared row.

use sqlx::SqlitePool;

use crate::data::models::InstructorRecord;
use crate::error::Result;

/// Insert an instructor if unseen, stamping `first_seen`. Returns true when
/// a new row was created.
pub async fn upsert_instructor(
    pool: &SqlitePool,
    instructor: &InstructorRecord,
    first_seen_term: &str,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO instructors (name, email, first_seen) VALUES (?, ?, ?)
         ON CONFLICT(name, email) DO NOTHING",
    )
    .bind(&instructor.name)
    .bind(&instructor.email)
    .bind(first_seen_term)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}
