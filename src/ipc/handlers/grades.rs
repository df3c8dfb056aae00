use crate::calc::coursework::{validate_marks, LedgerViolation};
use crate::config;
use crate::evaluation::{CommitSummary, Evaluator};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_f64, required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{coursework_item_from_row, RecordStore, SqliteStore};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

fn require_student(conn: &Connection, student_id: &str) -> Result<(), HandlerErr> {
    let student = SqliteStore::new(conn)
        .fetch_student(student_id)
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    if student.is_none() {
        return Err(HandlerErr::new("not_found", "student not found")
            .with_details(json!({ "studentId": student_id })));
    }
    Ok(())
}

/// Recomputes and writes back inside the caller's transaction.
fn recommit(
    conn: &Connection,
    student_id: &str,
    course_code: &str,
) -> Result<CommitSummary, HandlerErr> {
    let store = SqliteStore::new(conn);
    let policy = config::load_policy(conn);
    Ok(Evaluator::new(&store, policy).commit_course_grade(student_id, course_code)?)
}

fn handle_grades_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let course_code = match required_str(req, "courseCode") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match SqliteStore::new(conn).fetch_grades(&student_id, &course_code) {
        Ok(grades) => ok(&req.id, json!({ "grades": grades })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn record_grade(
    conn: &Connection,
    student_id: &str,
    course_code: &str,
    item_id: &str,
    marks: f64,
) -> Result<serde_json::Value, HandlerErr> {
    require_student(conn, student_id)?;

    let item = conn
        .query_row(
            "SELECT id, course_code, kind, title, total_marks, weight, due_date
             FROM coursework_items
             WHERE id = ?",
            [item_id],
            coursework_item_from_row,
        )
        .optional()
        .map_err(|e| HandlerErr::db("db_query_failed", e))?
        .ok_or_else(|| {
            HandlerErr::new("not_found", "coursework item not found")
                .with_details(json!({ "itemId": item_id }))
        })?;
    if item.course_code != course_code {
        return Err(
            HandlerErr::new("bad_params", "coursework item belongs to another course")
                .with_details(json!({ "itemId": item_id, "itemCourseCode": item.course_code })),
        );
    }

    if let Err(violation) = validate_marks(&item, marks) {
        let details = match &violation {
            LedgerViolation::NonPositiveTotal { total_marks } => {
                json!({ "itemId": item_id, "totalMarks": total_marks })
            }
            LedgerViolation::OutOfRange { marks, total_marks } => {
                json!({ "itemId": item_id, "marksObtained": marks, "totalMarks": total_marks })
            }
        };
        return Err(HandlerErr::new("marks_out_of_range", violation.to_string()).with_details(details));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;

    let grade_id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO coursework_grades(id, student_id, course_code, item_id, marks_obtained)
         VALUES(?, ?, ?, ?, ?)
         ON CONFLICT(student_id, item_id) DO UPDATE SET
           marks_obtained = excluded.marks_obtained,
           course_code = excluded.course_code",
        (&grade_id, student_id, course_code, item_id, marks),
    )
    .map_err(|e| {
        HandlerErr::db("db_insert_failed", e).with_details(json!({ "table": "coursework_grades" }))
    })?;
    let grade_id: String = tx
        .query_row(
            "SELECT id FROM coursework_grades WHERE student_id = ? AND item_id = ?",
            (student_id, item_id),
            |r| r.get(0),
        )
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;

    let summary = recommit(&tx, student_id, course_code)?;
    tx.commit()
        .map_err(|e| HandlerErr::db("db_commit_failed", e))?;

    tracing::info!(
        student = student_id,
        course = course_code,
        item = item_id,
        marks,
        status = summary.course_grade.status.label(),
        "grade recorded"
    );

    Ok(json!({
        "gradeId": grade_id,
        "courseGrade": summary.course_grade,
        "enrollmentId": summary.enrollment_id,
        "completedCredits": summary.completed_credits,
    }))
}

fn handle_grades_record(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let course_code = match required_str(req, "courseCode") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let item_id = match required_str(req, "itemId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let marks = match required_f64(req, "marksObtained") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match record_grade(conn, &student_id, &course_code, &item_id, marks) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

fn delete_grade(
    conn: &Connection,
    student_id: &str,
    item_id: &str,
) -> Result<serde_json::Value, HandlerErr> {
    let course_code: Option<String> = conn
        .query_row(
            "SELECT course_code FROM coursework_grades WHERE student_id = ? AND item_id = ?",
            (student_id, item_id),
            |r| r.get(0),
        )
        .optional()
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    let Some(course_code) = course_code else {
        return Err(HandlerErr::new("not_found", "grade not found")
            .with_details(json!({ "studentId": student_id, "itemId": item_id })));
    };

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;
    tx.execute(
        "DELETE FROM coursework_grades WHERE student_id = ? AND item_id = ?",
        (student_id, item_id),
    )
    .map_err(|e| {
        HandlerErr::db("db_delete_failed", e).with_details(json!({ "table": "coursework_grades" }))
    })?;
    let summary = recommit(&tx, student_id, &course_code)?;
    tx.commit()
        .map_err(|e| HandlerErr::db("db_commit_failed", e))?;

    Ok(json!({
        "courseCode": course_code,
        "courseGrade": summary.course_grade,
        "enrollmentId": summary.enrollment_id,
        "completedCredits": summary.completed_credits,
    }))
}

fn handle_grades_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let item_id = match required_str(req, "itemId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match delete_grade(conn, &student_id, &item_id) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.list" => Some(handle_grades_list(state, req)),
        "grades.record" => Some(handle_grades_record(state, req)),
        "grades.delete" => Some(handle_grades_delete(state, req)),
        _ => None,
    }
}
