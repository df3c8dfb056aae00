use crate::config;
use crate::evaluation::{EvalResult, Evaluator};
use crate::ipc::error::ok;
use crate::ipc::helpers::{db_conn, required_i32, required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::SqliteStore;
use rusqlite::Connection;
use serde_json::json;

/// Runs one read-only evaluation against the open workspace.
fn evaluate<T>(
    conn: &Connection,
    f: impl FnOnce(&Evaluator<'_, SqliteStore<'_>>) -> EvalResult<T>,
) -> Result<T, HandlerErr> {
    let store = SqliteStore::new(conn);
    let evaluator = Evaluator::new(&store, config::load_policy(conn));
    Ok(f(&evaluator)?)
}

fn respond<T>(
    req: &Request,
    result: Result<T, HandlerErr>,
    shape: impl FnOnce(T) -> serde_json::Value,
) -> serde_json::Value {
    match result {
        Ok(v) => ok(&req.id, shape(v)),
        Err(e) => e.response(&req.id),
    }
}

fn handle_course_grade(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let result = evaluate(conn, |ev| ev.compute_course_grade(&student_id, &course_code));
    respond(req, result, |grade| {
        json!({
            "studentId": student_id,
            "courseCode": course_code,
            "percentage": grade.percentage,
            "status": grade.status,
            "letter": grade.letter(),
            "items": grade.items,
            "orphanedGrades": grade.orphaned_grades,
        })
    })
}

fn handle_semester_gpa(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
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

    let result = evaluate(conn, |ev| ev.compute_semester_gpa(&student_id, &semester, year));
    respond(req, result, |gpa| {
        json!({ "studentId": student_id, "semester": semester, "year": year, "gpa": gpa })
    })
}

fn handle_cgpa(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let result = evaluate(conn, |ev| ev.compute_cgpa(&student_id));
    respond(req, result, |cgpa| json!({ "studentId": student_id, "cgpa": cgpa }))
}

fn handle_completed_credits(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let result = evaluate(conn, |ev| ev.compute_completed_credits(&student_id));
    respond(req, result, |credits| {
        json!({ "studentId": student_id, "completedCredits": credits })
    })
}

fn handle_standing(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let result = evaluate(conn, |ev| ev.evaluate_standing(&student_id));
    respond(req, result, |standing| json!(standing))
}

fn handle_transcript(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let result = evaluate(conn, |ev| ev.transcript(&student_id));
    respond(req, result, |transcript| json!(transcript))
}

fn handle_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let result = evaluate(conn, |ev| ev.cohort_summary());
    respond(req, result, |summary| json!(summary))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "academics.courseGrade" => Some(handle_course_grade(state, req)),
        "academics.semesterGpa" => Some(handle_semester_gpa(state, req)),
        "academics.cgpa" => Some(handle_cgpa(state, req)),
        "academics.completedCredits" => Some(handle_completed_credits(state, req)),
        "academics.standing" => Some(handle_standing(state, req)),
        "academics.transcript" => Some(handle_transcript(state, req)),
        "academics.summary" => Some(handle_summary(state, req)),
        _ => None,
    }
}
