use crate::calc::LetterGrade;
use crate::config;
use crate::evaluation::Evaluator;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, required_bounded_u32, required_i32, required_str, HandlerErr, MAX_CREDIT_HOURS,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{enrollment_from_row, RecordStore, SqliteStore};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

fn handle_enrollments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match SqliteStore::new(conn).fetch_enrollments(&student_id) {
        Ok(enrollments) => ok(&req.id, json!({ "enrollments": enrollments })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

struct NewEnrollment {
    student_id: String,
    course_code: String,
    semester: String,
    year: i32,
    credit_hours: Option<u32>,
}

fn create_enrollment(conn: &Connection, input: NewEnrollment) -> Result<serde_json::Value, HandlerErr> {
    let store = SqliteStore::new(conn);
    if store
        .fetch_student(&input.student_id)
        .map_err(|e| HandlerErr::db("db_query_failed", e))?
        .is_none()
    {
        return Err(HandlerErr::new("not_found", "student not found")
            .with_details(json!({ "studentId": input.student_id })));
    }
    let course = store
        .fetch_course(&input.course_code)
        .map_err(|e| HandlerErr::db("db_query_failed", e))?
        .ok_or_else(|| {
            HandlerErr::new("not_found", "course not found")
                .with_details(json!({ "courseCode": input.course_code }))
        })?;

    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM enrollments
             WHERE student_id = ? AND course_code = ? AND semester = ? AND year = ?",
            (&input.student_id, &input.course_code, &input.semester, input.year),
            |r| r.get(0),
        )
        .optional()
        .map_err(|e| HandlerErr::db("db_query_failed", e))?;
    if let Some(enrollment_id) = existing {
        return Err(HandlerErr::new(
            "duplicate_enrollment",
            "student is already enrolled in this course for the term",
        )
        .with_details(json!({ "enrollmentId": enrollment_id })));
    }

    let credit_hours = input.credit_hours.unwrap_or(course.credit_hours);
    let enrollment_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO enrollments(id, student_id, course_code, semester, year, credit_hours, final_grade)
         VALUES(?, ?, ?, ?, ?, ?, NULL)",
        (
            &enrollment_id,
            &input.student_id,
            &input.course_code,
            &input.semester,
            input.year,
            i64::from(credit_hours),
        ),
    )
    .map_err(|e| HandlerErr::db("db_insert_failed", e).with_details(json!({ "table": "enrollments" })))?;

    tracing::info!(
        student = %input.student_id,
        course = %input.course_code,
        term = %format!("{} {}", input.semester, input.year),
        "enrollment created"
    );
    Ok(json!({ "enrollmentId": enrollment_id, "creditHours": credit_hours }))
}

fn handle_enrollments_create(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let semester = match required_str(req, "semester") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let year = match required_i32(req, "year") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let credit_hours = if req.params.get("creditHours").map_or(true, |v| v.is_null()) {
        None
    } else {
        match required_bounded_u32(req, "creditHours", MAX_CREDIT_HOURS) {
            Ok(v) => Some(v),
            Err(e) => return e,
        }
    };

    let input = NewEnrollment {
        student_id,
        course_code,
        semester,
        year,
        credit_hours,
    };
    match create_enrollment(conn, input) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

/// `None` clears the grade; "IP" and null are accepted for that.
fn parse_final_grade_param(req: &Request) -> Result<Option<LetterGrade>, serde_json::Value> {
    let Some(raw) = req.params.get("finalGrade") else {
        return Err(err(&req.id, "bad_params", "missing finalGrade", None));
    };
    if raw.is_null() {
        return Ok(None);
    }
    let Some(s) = raw.as_str().map(str::trim) else {
        return Err(err(
            &req.id,
            "bad_params",
            "finalGrade must be a string or null",
            Some(json!({ "finalGrade": raw })),
        ));
    };
    if s.is_empty() || s.eq_ignore_ascii_case("IP") {
        return Ok(None);
    }
    s.parse::<LetterGrade>().map(Some).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            e.to_string(),
            Some(json!({ "finalGrade": s })),
        )
    })
}

fn set_final_grade(
    conn: &Connection,
    enrollment_id: &str,
    grade: Option<LetterGrade>,
) -> Result<serde_json::Value, HandlerErr> {
    let enrollment = conn
        .query_row(
            "SELECT id, student_id, course_code, semester, year, credit_hours, final_grade
             FROM enrollments
             WHERE id = ?",
            [enrollment_id],
            enrollment_from_row,
        )
        .optional()
        .map_err(|e| HandlerErr::db("db_query_failed", e))?
        .ok_or_else(|| {
            HandlerErr::new("not_found", "enrollment not found")
                .with_details(json!({ "enrollmentId": enrollment_id }))
        })?;

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::db("db_tx_failed", e))?;
    let store = SqliteStore::new(&tx);
    store
        .write_final_grade(enrollment_id, grade)
        .map_err(|e| HandlerErr::db("db_update_failed", e))?;
    let completed_credits = Evaluator::new(&store, config::load_policy(&tx))
        .refresh_completed_credits(&enrollment.student_id)?;
    tx.commit()
        .map_err(|e| HandlerErr::db("db_commit_failed", e))?;

    tracing::info!(
        enrollment = enrollment_id,
        student = %enrollment.student_id,
        grade = grade.map(|g| g.as_str()).unwrap_or("IP"),
        "final grade set"
    );
    Ok(json!({
        "enrollmentId": enrollment_id,
        "finalGrade": grade,
        "completedCredits": completed_credits,
    }))
}

fn handle_enrollments_set_final_grade(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let enrollment_id = match required_str(req, "enrollmentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let grade = match parse_final_grade_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match set_final_grade(conn, &enrollment_id, grade) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "enrollments.list" => Some(handle_enrollments_list(state, req)),
        "enrollments.create" => Some(handle_enrollments_create(state, req)),
        "enrollments.setFinalGrade" => Some(handle_enrollments_set_final_grade(state, req)),
        _ => None,
    }
}
