//! Database operations for the `catalog` table.

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::data::models::CatalogEntry;
use crate::error::Result;

/// Bulk-write catalog entries.
///
/// The same course appears in several sampled terms; only the entry with
/// the longest description is kept, and a replace keeps later (usually
/// richer) crawls authoritative.
pub async fn save_catalog(pool: &SqlitePool, entries: &[CatalogEntry]) -> Result<u64> {
    let mut best: HashMap<(&str, &str), &CatalogEntry> = HashMap::new();
    for entry in entries {
        let key = (entry.subject.as_str(), entry.course_number.as_str());
        match best.get(&key) {
            Some(current) if current.description.len() >= entry.description.len() => {}
            _ => {
                best.insert(key, entry);
            }
        }
    }

    let mut written = 0;
    for entry in best.values() {
        sqlx::query(
            "INSERT OR REPLACE INTO catalog
             (subject, course_number, description, credit_hours, lecture_hours, lab_hours, department)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.subject)
        .bind(&entry.course_number)
        .bind(&entry.description)
        .bind(entry.credit_hours)
        .bind(entry.lecture_hours)
        .bind(entry.lab_hours)
        .bind(&entry.department)
        .execute(pool)
        .await?;
        written += 1;
    }

    Ok(written)
}
