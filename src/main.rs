mod calc;
mod config;
mod db;
mod evaluation;
mod ipc;
mod logging;
mod store;

use std::io::{self, BufRead, Write};

fn main() {
    logging::init();

    let cfg = config::SidecarConfig::from_env();
    let mut state = ipc::AppState::default();
    if let Some(path) = cfg.workspace {
        // A bad startup workspace must not keep the sidecar from serving.
        match ipc::open_workspace(&mut state, &path) {
            Ok(()) => tracing::info!(workspace = %path.display(), "workspace opened from env"),
            Err(e) => tracing::error!(workspace = %path.display(), error = ?e, "failed to open workspace"),
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed; shutting down");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request line");
                // Can't reply without id.
                let _ = writeln!(
                    stdout,
                    "{}",
                    serde_json::json!({
                        "ok": false,
                        "error": { "code": "bad_json", "message": e.to_string() }
                    })
                );
                let _ = stdout.flush();
                continue;
            }
        };

        tracing::debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
