use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar_with_workspace(
    workspace: &std::path::Path,
) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_recordsd");
    let mut child = Command::new(exe)
        .env("RECORDSD_WORKSPACE", workspace)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn recordsd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn workspace_from_env_and_policy_thresholds_drive_standing() {
    let workspace = temp_dir("recordsd-policy");
    let (_child, mut stdin, mut reader) = spawn_sidecar_with_workspace(&workspace);

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(
        health.get("workspacePath").and_then(|v| v.as_str()),
        Some(workspace.to_string_lossy().as_ref())
    );

    let defaults = request_ok(&mut stdin, &mut reader, "2", "policy.get", json!({}));
    assert_eq!(
        defaults
            .pointer("/policy/probationBelow")
            .and_then(|v| v.as_f64()),
        Some(2.0)
    );
    assert_eq!(
        defaults
            .pointer("/policy/graduationMinCgpa")
            .and_then(|v| v.as_f64()),
        Some(2.0)
    );

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({ "name": "Hal", "requiredCredits": 3 }),
    );
    let student_id = student
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "courses.create",
        json!({ "code": "ART100", "title": "Drawing", "creditHours": 3 }),
    );
    let enrollment = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "enrollments.create",
        json!({
            "studentId": student_id,
            "courseCode": "ART100",
            "semester": "Spring",
            "year": 2024
        }),
    );
    let enrollment_id = enrollment
        .get("enrollmentId")
        .and_then(|v| v.as_str())
        .expect("enrollmentId")
        .to_string();
    let set = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "enrollments.setFinalGrade",
        json!({ "enrollmentId": enrollment_id, "finalGrade": "C+" }),
    );
    assert_eq!(set.get("completedCredits").and_then(|v| v.as_u64()), Some(3));

    let before = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "academics.standing",
        json!({ "studentId": student_id }),
    );
    assert_eq!(before.get("onProbation").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        before
            .get("eligibleForGraduation")
            .and_then(|v| v.as_bool()),
        Some(true)
    );

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "policy.update",
        json!({ "probationBelow": 2.75, "graduationMinCgpa": 3.0 }),
    );
    assert_eq!(
        updated
            .pointer("/policy/probationBelow")
            .and_then(|v| v.as_f64()),
        Some(2.75)
    );

    let after = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "academics.standing",
        json!({ "studentId": student_id }),
    );
    assert_eq!(after.get("onProbation").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        after.get("eligibleForGraduation").and_then(|v| v.as_bool()),
        Some(false)
    );

    let out_of_scale = request(
        &mut stdin,
        &mut reader,
        "10",
        "policy.update",
        json!({ "graduationMinCgpa": 4.5 }),
    );
    assert_eq!(
        out_of_scale
            .pointer("/error/code")
            .and_then(|v| v.as_str()),
        Some("bad_params")
    );
    let unchanged = request_ok(&mut stdin, &mut reader, "11", "policy.get", json!({}));
    assert_eq!(
        unchanged
            .pointer("/policy/graduationMinCgpa")
            .and_then(|v| v.as_f64()),
        Some(3.0)
    );
}
