use crate::calc::coursework::validate_item_shape;
use crate::calc::CourseworkKind;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, optional_str, required_f64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::store::{RecordStore, SqliteStore};
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;

fn parse_kind(req: &Request, raw: &str) -> Result<CourseworkKind, serde_json::Value> {
    CourseworkKind::parse(raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            "kind must be one of: assignment, midtermExam, finalExam",
            Some(json!({ "kind": raw })),
        )
    })
}

fn handle_coursework_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let course_code = match required_str(req, "courseCode") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let kind = match optional_str(req, "kind") {
        None => None,
        Some(raw) => match parse_kind(req, &raw) {
            Ok(k) => Some(k),
            Err(e) => return e,
        },
    };

    let items = match SqliteStore::new(conn).fetch_coursework_items(&course_code) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let items: Vec<_> = items
        .into_iter()
        .filter(|i| kind.map(|k| i.kind == k).unwrap_or(true))
        .collect();
    let total_weight: f64 = items.iter().map(|i| i.weight).sum();

    ok(
        &req.id,
        json!({ "courseCode": course_code, "items": items, "totalWeight": total_weight }),
    )
}

fn handle_coursework_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let course_code = match required_str(req, "courseCode") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let kind = match required_str(req, "kind").and_then(|raw| parse_kind(req, &raw)) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let title = match required_str(req, "title") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let total_marks = match required_f64(req, "totalMarks") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let weight = match required_f64(req, "weight") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = validate_item_shape(total_marks, weight) {
        return err(
            &req.id,
            "bad_params",
            e.to_string(),
            Some(json!({ "totalMarks": total_marks, "weight": weight })),
        );
    }
    let due_date = match optional_str(req, "dueDate") {
        None => None,
        Some(raw) => match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                return err(
                    &req.id,
                    "bad_params",
                    "dueDate must be YYYY-MM-DD",
                    Some(json!({ "dueDate": raw })),
                )
            }
        },
    };

    match SqliteStore::new(conn).fetch_course(&course_code) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return err(
                &req.id,
                "not_found",
                "course not found",
                Some(json!({ "courseCode": course_code })),
            )
        }
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    let next_sort: i64 = match conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM coursework_items WHERE course_code = ?",
        [&course_code],
        |r| r.get(0),
    ) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let item_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO coursework_items(id, course_code, kind, title, total_marks, weight, due_date, sort_order)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &item_id,
            &course_code,
            kind.as_str(),
            &title,
            total_marks,
            weight,
            due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            next_sort,
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "coursework_items" })),
        );
    }

    ok(&req.id, json!({ "itemId": item_id, "courseCode": course_code }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "coursework.list" => Some(handle_coursework_list(state, req)),
        "coursework.create" => Some(handle_coursework_create(state, req)),
        _ => None,
    }
}
