//! Database operations for the `courses` table.

use sqlx::SqlitePool;

use crate::data::models::{CourseRecord, DayFlags};
use crate::error::Result;

/// Write one course row, keyed on (crn, term_id). A re-crawled section
/// overwrites its previous row rather than appending a duplicate.
pub async fn upsert_course(pool: &SqlitePool, term_id: &str, course: &CourseRecord) -> Result<()> {
    let days = course.days;
    sqlx::query(
        "INSERT INTO courses (
            crn, term_id, subject, course_number, title, short_name, section,
            credits, schedule_type, levels, attributes, class_type, is_lab,
            start_time, end_time,
            is_sunday, is_monday, is_tuesday, is_wednesday, is_thursday,
            seats_available, classroom, instructor_name, instructor_email
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(crn, term_id) DO UPDATE SET
            subject = excluded.subject,
            course_number = excluded.course_number,
            title = excluded.title,
            short_name = excluded.short_name,
            section = excluded.section,
            credits = excluded.credits,
            schedule_type = excluded.schedule_type,
            levels = excluded.levels,
            attributes = excluded.attributes,
            class_type = excluded.class_type,
            is_lab = excluded.is_lab,
            start_time = excluded.start_time,
            end_time = excluded.end_time,
            is_sunday = excluded.is_sunday,
            is_monday = excluded.is_monday,
            is_tuesday = excluded.is_tuesday,
            is_wednesday = excluded.is_wednesday,
            is_thursday = excluded.is_thursday,
            seats_available = excluded.seats_available,
            classroom = excluded.classroom,
            instructor_name = excluded.instructor_name,
            instructor_email = excluded.instructor_email",
    )
    .bind(&course.crn)
    .bind(term_id)
    .bind(&course.subject)
    .bind(&course.course_number)
    .bind(&course.title)
    .bind(&course.short_name)
    .bind(&course.section)
    .bind(course.credits)
    .bind(&course.schedule_type)
    .bind(&course.levels)
    .bind(&course.attributes)
    .bind(&course.class_type)
    .bind(course.is_lab)
    .bind(&course.start_time)
    .bind(&course.end_time)
    .bind(days.contains(DayFlags::SUNDAY))
    .bind(days.contains(DayFlags::MONDAY))
    .bind(days.contains(DayFlags::TUESDAY))
    .bind(days.contains(DayFlags::WEDNESDAY))
    .bind(days.contains(DayFlags::THURSDAY))
    .bind(course.seats_available)
    .bind(&course.classroom)
    .bind(&course.instructor_name)
    .bind(&course.instructor_email)
    .execute(pool)
    .await?;
    Ok(())
}

/// Every distinct (crn, term_id) pair with a course row.
pub async fn all_section_keys(pool: &SqlitePool) -> Result<Vec<(String, String)>> {
    let keys = sqlx::query_as(
        "SELECT DISTINCT crn, term_id FROM courses ORDER BY term_id, crn",
    )
    .fetch_all(pool)
    .await?;
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_pool;

    fn course(title: &str) -> CourseRecord {
        CourseRecord {
            crn: "20250".into(),
            subject: "COE".into(),
            course_number: "221".into(),
            title: title.into(),
            short_name: "COE 221".into(),
            section: "01".into(),
            days: DayFlags::from_meeting_days("MW"),
            seats_available: Some(true),
            ..CourseRecord::default()
        }
    }

    #[tokio::test]
    async fn recrawl_overwrites_instead_of_duplicating() {
        let pool = test_pool().await;

        upsert_course(&pool, "202620", &course("Digital Systems")).await.unwrap();
        upsert_course(&pool, "202620", &course("Digital Systems I")).await.unwrap();

        let rows: Vec<(String, bool)> =
            sqlx::query_as("SELECT title, is_monday FROM courses WHERE crn = '20250'")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(rows, vec![("Digital Systems I".to_string(), true)]);
    }

    #[tokio::test]
    async fn same_crn_in_two_terms_is_two_rows() {
        let pool = test_pool().await;

        upsert_course(&pool, "202510", &course("Digital Systems")).await.unwrap();
        upsert_course(&pool, "202620", &course("Digital Systems")).await.unwrap();

        let keys = all_section_keys(&pool).await.unwrap();
        assert_eq!(
            keys,
            vec![
                ("20250".to_string(), "202510".to_string()),
                ("20250".to_string(), "202620".to_string()),
            ]
        );
    }
}
