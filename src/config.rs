use std::path::PathBuf;

use anyhow::Context;
use rusqlite::Connection;

use crate::calc::AcademicPolicy;
use crate::db;

pub const WORKSPACE_ENV: &str = "RECORDSD_WORKSPACE";
pub const POLICY_KEY: &str = "academics.policy";

#[derive(Debug, Clone, Default)]
pub struct SidecarConfig {
    /// Workspace opened before the first request, if any.
    pub workspace: Option<PathBuf>,
}

impl SidecarConfig {
    pub fn from_env() -> Self {
        let workspace = std::env::var_os(WORKSPACE_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self { workspace }
    }
}

/// Workspace policy, falling back to defaults when unset or unreadable.
pub fn load_policy(conn: &Connection) -> AcademicPolicy {
    let stored = match db::settings_get_json(conn, POLICY_KEY) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "could not read academic policy; using defaults");
            return AcademicPolicy::default();
        }
    };
    let Some(value) = stored else {
        return AcademicPolicy::default();
    };
    match serde_json::from_value::<AcademicPolicy>(value) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "malformed academic policy; using defaults");
            AcademicPolicy::default()
        }
    }
}

pub fn save_policy(conn: &Connection, policy: &AcademicPolicy) -> anyhow::Result<()> {
    let value = serde_json::to_value(policy).context("failed to serialize academic policy")?;
    db::settings_set_json(conn, POLICY_KEY, &value)
}
