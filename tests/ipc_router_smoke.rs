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

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_collegeadmind");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn collegeadmind");
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
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_default()
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("collegeadmin-router-smoke");
    let upload = workspace.join("notice.pdf");
    std::fs::write(&upload, b"%PDF-1.4 smoke").expect("write upload");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health["workspacePath"].is_null());
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let calls: Vec<(&str, serde_json::Value)> = vec![
        ("settings.get", json!({})),
        ("settings.update", json!({ "settings": { "pageSize": 20 } })),
        ("entities.list", json!({})),
        ("records.list", json!({ "entity": "subjects" })),
        ("records.get", json!({ "entity": "graduation", "id": "grad-2025-001" })),
        ("view.open", json!({ "entity": "subjects" })),
        ("view.get", json!({ "entity": "subjects" })),
        ("view.search", json!({ "entity": "subjects", "query": "optics" })),
        ("view.filter", json!({ "entity": "subjects", "category": "department", "values": ["physics"] })),
        ("view.toggleFilter", json!({ "entity": "subjects", "category": "status", "value": "active" })),
        ("view.range", json!({ "entity": "subjects", "category": "credits", "min": 1, "max": 4 })),
        ("view.clearFilters", json!({ "entity": "subjects" })),
        ("view.sort", json!({ "entity": "subjects", "field": "credits", "direction": "desc" })),
        ("view.page", json!({ "entity": "subjects", "page": 1 })),
        ("overlay.openCreate", json!({ "entity": "subjects" })),
        ("form.validate", json!({ "entity": "subjects", "form": { "name": "Optics" } })),
        ("form.submit", json!({ "entity": "subjects", "form": { "name": "Optics", "code": "PH201", "credits": 4 } })),
        ("overlay.openView", json!({ "entity": "graduation", "id": "grad-2025-001" })),
        ("overlay.openEdit", json!({ "entity": "graduation", "id": "grad-2025-001" })),
        ("overlay.close", json!({ "entity": "graduation" })),
        ("records.toggleStatus", json!({ "entity": "fee_structures", "id": "fee-001" })),
        ("records.requestDelete", json!({ "entity": "fee_structures", "id": "fee-002" })),
        ("confirm.cancel", json!({ "entity": "fee_structures" })),
        ("attachments.requestDelete", json!({ "entity": "circulars", "id": "missing" })),
        ("attachments.requestSwitchMode", json!({ "entity": "circulars", "id": "missing", "mode": "link" })),
        ("confirm.accept", json!({ "entity": "circulars" })),
        ("stats.get", json!({ "entity": "graduation" })),
        ("records.import", json!({ "entity": "fee_structures", "csv": "program,category,academic_year\nMBA,tuition,2025-26\n" })),
        ("files.validate", json!({ "path": upload.to_string_lossy() })),
        ("files.upload", json!({ "path": upload.to_string_lossy(), "entity": "circulars" })),
        ("files.resolveUrl", json!({ "url": "https://example.org/a.pdf" })),
        ("files.delete", json!({ "url": "storage://circulars/none.pdf" })),
    ];

    for (i, (method, params)) in calls.into_iter().enumerate() {
        let id = format!("s{}", i);
        let resp = request(&mut stdin, &mut reader, &id, method, params);
        if resp.get("ok").and_then(|v| v.as_bool()) == Some(false) {
            let code = resp["error"]["code"].as_str().unwrap_or("unknown");
            assert_ne!(code, "not_implemented", "unexpected unknown method for {}", method);
            assert_ne!(code, "bad_params", "{} rejected its params: {}", method, resp);
        }
    }

    let unknown = request(&mut stdin, &mut reader, "u1", "reports.export", json!({}));
    assert_eq!(unknown["error"]["code"], "not_implemented");

    writeln!(stdin, "not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json");
    let bad: serde_json::Value = serde_json::from_str(line.trim()).expect("parse");
    assert_eq!(bad["error"]["code"], "bad_json");

    drop(stdin);
    let _ = child.wait();
}
