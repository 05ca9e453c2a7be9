//! Database operations for the `semesters` table.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::data::models::Term;
use crate::error::Result;

/// Record a term, stamping `crawled_at` on first insert only.
pub async fn insert_term(pool: &SqlitePool, term: &Term) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO semesters (term_id, term_name, crawled_at) VALUES (?, ?, ?)",
    )
    .bind(&term.term_id)
    .bind(&term.term_name)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// Term ids with at least one course row, ascending. Drives the catalog
/// term sample on resumed runs.
pub async fn crawled_term_ids(pool: &SqlitePool) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar("SELECT DISTINCT term_id FROM courses ORDER BY term_id")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// Term ids already crawled, for `--resume`.
pub async fn existing_term_ids(pool: &SqlitePool) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar("SELECT term_id FROM semesters ORDER BY term_id")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}
