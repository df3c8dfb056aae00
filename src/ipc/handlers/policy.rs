use crate::calc::AcademicPolicy;
use crate::config;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::db_conn;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

const MAX_GRADE_POINTS: f64 = 4.0;

fn handle_policy_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "policy": config::load_policy(conn) }))
}

/// Reads an optional threshold on the 0..=4 grade-point scale.
fn threshold(req: &Request, key: &str) -> Result<Option<f64>, serde_json::Value> {
    let Some(v) = req.params.get(key).filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    match v.as_f64() {
        Some(n) if n.is_finite() && (0.0..=MAX_GRADE_POINTS).contains(&n) => Ok(Some(n)),
        _ => Err(err(
            &req.id,
            "bad_params",
            format!("{} must be a number between 0 and 4", key),
            Some(json!({ key: v })),
        )),
    }
}

fn handle_policy_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let probation_below = match threshold(req, "probationBelow") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let graduation_min_cgpa = match threshold(req, "graduationMinCgpa") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let current = config::load_policy(conn);
    let policy = AcademicPolicy {
        probation_below: probation_below.unwrap_or(current.probation_below),
        graduation_min_cgpa: graduation_min_cgpa.unwrap_or(current.graduation_min_cgpa),
    };
    if let Err(e) = config::save_policy(conn, &policy) {
        return err(
            &req.id,
            "db_update_failed",
            format!("{e:#}"),
            Some(json!({ "key": config::POLICY_KEY })),
        );
    }

    tracing::info!(
        probation_below = policy.probation_below,
        graduation_min_cgpa = policy.graduation_min_cgpa,
        "academic policy updated"
    );
    ok(&req.id, json!({ "policy": policy }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "policy.get" => Some(handle_policy_get(state, req)),
        "policy.update" => Some(handle_policy_update(state, req)),
        _ => None,
    }
}
