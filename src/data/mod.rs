//! Database access: pool setup, migrations, and per-table operations.

pub mod catalog;
pub mod courses;
pub mod details;
pub mod instructors;
pub mod models;
pub mod reference;
pub mod subjects;
pub mod terms;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

use crate::error::Result;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Open (or create) the crawl database and bring its schema up to date.
///
/// The pool is capped at one connection: SQLite allows one writer, and the
/// crawl serializes all writes anyway. `force` removes any existing
/// database file first.
pub async fn init_db(path: &Path, force: bool) -> Result<SqlitePool> {
    if force {
        for suffix in ["", "-wal", "-shm"] {
            let mut target = path.as_os_str().to_owned();
            target.push(suffix);
            match std::fs::remove_file(&target) {
                Ok(()) => info!(path = %Path::new(&target).display(), "Removed existing database file"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(crate::error::CrawlError::Persistence(err.into())),
            }
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Off)
        .pragma("cache_size", "-64000")
        .pragma("temp_store", "MEMORY");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await.map_err(sqlx::Error::from)?;
    info!(path = %path.display(), "Database ready");

    Ok(pool)
}

/// Final row counts, logged at the end of a crawl.
#[derive(Debug)]
pub struct SummaryCounts {
    pub semesters: i64,
    pub subjects: i64,
    pub instructors: i64,
    pub levels: i64,
    pub attributes: i64,
    pub courses: i64,
    pub catalog: i64,
    pub section_details: i64,
    pub course_dependencies: i64,
}

pub async fn summary_counts(pool: &SqlitePool) -> Result<SummaryCounts> {
    async fn count(pool: &SqlitePool, query: &str) -> Result<i64> {
        Ok(sqlx::query_scalar(query).fetch_one(pool).await?)
    }

    Ok(SummaryCounts {
        semesters: count(pool, "SELECT COUNT(*) FROM semesters").await?,
        subjects: count(pool, "SELECT COUNT(*) FROM subjects").await?,
        instructors: count(pool, "SELECT COUNT(*) FROM instructors").await?,
        levels: count(pool, "SELECT COUNT(*) FROM levels").await?,
        attributes: count(pool, "SELECT COUNT(*) FROM attributes").await?,
        courses: count(pool, "SELECT COUNT(*) FROM courses").await?,
        catalog: count(pool, "SELECT COUNT(*) FROM catalog").await?,
        section_details: count(pool, "SELECT COUNT(*) FROM section_details").await?,
        course_dependencies: count(pool, "SELECT COUNT(*) FROM course_dependencies").await?,
    })
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    MIGRATOR.run(&pool).await.unwrap();
    pool
}
