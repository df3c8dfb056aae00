//! Record access for the evaluation engine.
//!
//! `RecordStore` is the seam between the engine and whatever holds the
//! records. `SqliteStore` is the workspace-backed implementation.

use anyhow::Context;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::calc::{CourseworkGrade, CourseworkItem, CourseworkKind, Enrollment, LetterGrade};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub code: String,
    pub title: String,
    pub credit_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub required_credits: u32,
    /// Last value written back by the engine.
    pub completed_credits: u64,
}

pub trait RecordStore {
    fn fetch_coursework_items(&self, course_code: &str) -> anyhow::Result<Vec<CourseworkItem>>;
    fn fetch_grades(
        &self,
        student_id: &str,
        course_code: &str,
    ) -> anyhow::Result<Vec<CourseworkGrade>>;
    fn fetch_enrollments(&self, student_id: &str) -> anyhow::Result<Vec<Enrollment>>;
    fn fetch_course(&self, course_code: &str) -> anyhow::Result<Option<Course>>;
    fn fetch_student(&self, student_id: &str) -> anyhow::Result<Option<Student>>;
    fn fetch_students(&self) -> anyhow::Result<Vec<Student>>;
    /// `None` clears the grade (course back in progress).
    fn write_final_grade(
        &self,
        enrollment_id: &str,
        grade: Option<LetterGrade>,
    ) -> anyhow::Result<()>;
    fn write_completed_credits(&self, student_id: &str, credits: u64) -> anyhow::Result<()>;
}

pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn parse_due_date(raw: Option<String>) -> Option<NaiveDate> {
    let raw = raw?;
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
            tracing::warn!(due_date = %raw, "unparseable coursework due date ignored");
            None
        }
    }
}

fn non_negative(v: i64) -> u32 {
    u32::try_from(v.max(0)).unwrap_or(u32::MAX)
}

pub(crate) fn coursework_item_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<CourseworkItem> {
    let kind_raw: String = r.get(2)?;
    Ok(CourseworkItem {
        item_id: r.get(0)?,
        course_code: r.get(1)?,
        // Unknown kinds only affect reporting; grading treats all kinds alike.
        kind: CourseworkKind::parse(&kind_raw).unwrap_or(CourseworkKind::Assignment),
        title: r.get(3)?,
        total_marks: r.get(4)?,
        weight: r.get(5)?,
        due_date: parse_due_date(r.get(6)?),
    })
}

fn student_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        name: r.get(1)?,
        required_credits: non_negative(r.get(2)?),
        completed_credits: u64::try_from(r.get::<_, i64>(3)?.max(0)).unwrap_or(0),
    })
}

pub(crate) fn enrollment_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        enrollment_id: r.get(0)?,
        student_id: r.get(1)?,
        course_code: r.get(2)?,
        semester: r.get(3)?,
        year: r.get(4)?,
        credit_hours: non_negative(r.get(5)?),
        final_grade: r.get(6)?,
    })
}

impl RecordStore for SqliteStore<'_> {
    fn fetch_coursework_items(&self, course_code: &str) -> anyhow::Result<Vec<CourseworkItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, course_code, kind, title, total_marks, weight, due_date
             FROM coursework_items
             WHERE course_code = ?
             ORDER BY sort_order, rowid",
        )?;
        let items = stmt
            .query_map([course_code], coursework_item_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to load coursework items")?;
        Ok(items)
    }

    fn fetch_grades(
        &self,
        student_id: &str,
        course_code: &str,
    ) -> anyhow::Result<Vec<CourseworkGrade>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, student_id, course_code, item_id, marks_obtained
             FROM coursework_grades
             WHERE student_id = ? AND course_code = ?
             ORDER BY rowid",
        )?;
        let grades = stmt
            .query_map((student_id, course_code), |r| {
                Ok(CourseworkGrade {
                    grade_id: r.get(0)?,
                    student_id: r.get(1)?,
                    course_code: r.get(2)?,
                    item_id: r.get(3)?,
                    marks_obtained: r.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to load coursework grades")?;
        Ok(grades)
    }

    fn fetch_enrollments(&self, student_id: &str) -> anyhow::Result<Vec<Enrollment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, student_id, course_code, semester, year, credit_hours, final_grade
             FROM enrollments
             WHERE student_id = ?
             ORDER BY year, rowid",
        )?;
        let enrollments = stmt
            .query_map([student_id], enrollment_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to load enrollments")?;
        Ok(enrollments)
    }

    fn fetch_course(&self, course_code: &str) -> anyhow::Result<Option<Course>> {
        let course = self
            .conn
            .query_row(
                "SELECT code, title, credit_hours FROM courses WHERE code = ?",
                [course_code],
                |r| {
                    Ok(Course {
                        code: r.get(0)?,
                        title: r.get(1)?,
                        credit_hours: non_negative(r.get(2)?),
                    })
                },
            )
            .optional()?;
        Ok(course)
    }

    fn fetch_student(&self, student_id: &str) -> anyhow::Result<Option<Student>> {
        let student = self
            .conn
            .query_row(
                "SELECT id, name, required_credits, completed_credits FROM students WHERE id = ?",
                [student_id],
                student_from_row,
            )
            .optional()?;
        Ok(student)
    }

    fn fetch_students(&self) -> anyhow::Result<Vec<Student>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, required_credits, completed_credits
             FROM students
             ORDER BY name, id",
        )?;
        let students = stmt
            .query_map([], student_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to load students")?;
        Ok(students)
    }

    fn write_final_grade(
        &self,
        enrollment_id: &str,
        grade: Option<LetterGrade>,
    ) -> anyhow::Result<()> {
        self.conn
            .execute(
                "UPDATE enrollments SET final_grade = ? WHERE id = ?",
                (grade.map(|g| g.as_str()), enrollment_id),
            )
            .with_context(|| format!("failed to write final grade for {enrollment_id}"))?;
        Ok(())
    }

    fn write_completed_credits(&self, student_id: &str, credits: u64) -> anyhow::Result<()> {
        self.conn
            .execute(
                "UPDATE students SET completed_credits = ? WHERE id = ?",
                (i64::try_from(credits).unwrap_or(i64::MAX), student_id),
            )
            .with_context(|| format!("failed to write completed credits for {student_id}"))?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn items_load_in_catalog_order_with_kinds() {
        let conn = memory_db();
        add_course(&conn, "CS101", 3);
        add_item(&conn, "a1", "CS101", 20.0, 30.0);
        conn.execute(
            "INSERT INTO coursework_items(id, course_code, kind, title, total_marks, weight, due_date, sort_order)
             VALUES('fin', 'CS101', 'final_exam', 'Final', 50, 40, '2023-12-15', 1)",
            [],
        )
        .expect("insert final");

        let store = SqliteStore::new(&conn);
        let items = store.fetch_coursework_items("CS101").expect("items");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].kind, CourseworkKind::FinalExam);
        assert_eq!(items[1].due_date, NaiveDate::from_ymd_opt(2023, 12, 15));
        assert!(store.fetch_coursework_items("NOPE").expect("empty").is_empty());
    }

    #[test]
    fn write_backs_land_in_rows() {
        let conn = memory_db();
        add_student(&conn, "s1", 120);
        add_course(&conn, "CS101", 3);
        add_enrollment(&conn, "e1", "s1", "CS101", ("Fall", 2023), 3, None);

        let store = SqliteStore::new(&conn);
        store
            .write_final_grade("e1", Some(LetterGrade::BPlus))
            .expect("write grade");
        store.write_completed_credits("s1", 3).expect("write credits");

        let enrollments = store.fetch_enrollments("s1").expect("enrollments");
        assert_eq!(enrollments[0].final_grade.as_deref(), Some("B+"));
        let student = store.fetch_student("s1").expect("student").expect("exists");
        assert_eq!(student.completed_credits, 3);

        store.write_final_grade("e1", None).expect("clear grade");
        let enrollments = store.fetch_enrollments("s1").expect("enrollments");
        assert_eq!(enrollments[0].final_grade, None);
    }

    #[test]
    fn missing_references_are_none() {
        let conn = memory_db();
        let store = SqliteStore::new(&conn);
        assert_eq!(store.fetch_course("CS999").expect("query"), None);
        assert_eq!(store.fetch_student("ghost").expect("query"), None);
        assert!(store.fetch_students().expect("query").is_empty());
    }
}
