use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_bounded_u32, required_str, MAX_CREDIT_HOURS};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;

fn handle_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    // Item counts let the UI flag courses with no coursework yet.
    let mut stmt = match conn.prepare(
        "SELECT
           c.code,
           c.title,
           c.credit_hours,
           (SELECT COUNT(*) FROM coursework_items ci WHERE ci.course_code = c.code) AS item_count
         FROM courses c
         ORDER BY c.code",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let code: String = row.get(0)?;
            let title: String = row.get(1)?;
            let credit_hours: i64 = row.get(2)?;
            let item_count: i64 = row.get(3)?;
            Ok(json!({
                "code": code,
                "title": title,
                "creditHours": credit_hours,
                "itemCount": item_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(courses) => ok(&req.id, json!({ "courses": courses })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_courses_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let code = match required_str(req, "code") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let title = match required_str(req, "title") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let credit_hours = match required_bounded_u32(req, "creditHours", MAX_CREDIT_HOURS) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let exists: Option<i64> = match conn
        .query_row("SELECT 1 FROM courses WHERE code = ?", [&code], |r| r.get(0))
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_some() {
        return err(
            &req.id,
            "bad_params",
            "course code already exists",
            Some(json!({ "code": code })),
        );
    }

    if let Err(e) = conn.execute(
        "INSERT INTO courses(code, title, credit_hours) VALUES(?, ?, ?)",
        (&code, &title, i64::from(credit_hours)),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "courses" })),
        );
    }

    ok(
        &req.id,
        json!({ "courseCode": code, "title": title, "creditHours": credit_hours }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(handle_courses_list(state, req)),
        "courses.create" => Some(handle_courses_create(state, req)),
        _ => None,
    }
}
