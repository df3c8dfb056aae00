use rusqlite::Connection;
use serde_json::json;

use crate::evaluation::EvalError;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn db(code: &'static str, e: impl std::fmt::Display) -> Self {
        Self::new(code, e.to_string())
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<EvalError> for HandlerErr {
    fn from(e: EvalError) -> Self {
        let details = match &e {
            EvalError::UnknownStudent(id) => Some(json!({ "studentId": id })),
            EvalError::Store(_) => None,
        };
        if let EvalError::Store(inner) = &e {
            tracing::error!(error = ?inner, "record store failure during evaluation");
        }
        HandlerErr {
            code: e.code(),
            message: e.to_string(),
            details,
        }
    }
}

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    match req.params.get(key).and_then(|v| v.as_str()).map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        Some(_) => Err(err(
            &req.id,
            "bad_params",
            format!("{} must not be empty", key),
            None,
        )),
        None => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn required_f64(req: &Request, key: &str) -> Result<f64, serde_json::Value> {
    match req.params.get(key) {
        None => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
        Some(v) => v.as_f64().filter(|n| n.is_finite()).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be a number", key),
                Some(json!({ key: v })),
            )
        }),
    }
}

/// Upper bound for one course or enrollment.
pub const MAX_CREDIT_HOURS: u32 = 100;
/// Upper bound for a degree's required credits.
pub const MAX_REQUIRED_CREDITS: u32 = 1_000;

/// Integer in `1..=max`.
pub fn required_bounded_u32(req: &Request, key: &str, max: u32) -> Result<u32, serde_json::Value> {
    let Some(v) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    v.as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| (1..=max).contains(n))
        .ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be an integer between 1 and {}", key, max),
                Some(json!({ key: v })),
            )
        })
}

pub fn required_i32(req: &Request, key: &str) -> Result<i32, serde_json::Value> {
    let Some(v) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    v.as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be an integer", key),
                Some(json!({ key: v })),
            )
        })
}
