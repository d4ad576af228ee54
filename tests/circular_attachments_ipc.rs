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

fn circular_form(title: &str, attachment: Option<&str>) -> serde_json::Value {
    let mut form = json!({
        "title": title,
        "message_body": "Semester exams begin next week",
        "publish_date": "2025-06-15",
        "expire_date": "2025-06-30",
        "priority": "high",
    });
    if let Some(url) = attachment {
        form["attachment_url"] = json!(url);
    }
    form
}

#[test]
fn delete_proceeds_when_attachment_cleanup_fails() {
    let workspace = temp_dir("collegeadmin-attachments");
    let src = workspace.join("timetable.pdf");
    std::fs::write(&src, vec![1u8; 200 * 1024]).expect("write source file");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let uploaded = request_ok(
        &mut stdin,
        &mut reader,
        "up",
        "files.upload",
        json!({ "path": src.to_string_lossy(), "entity": "circulars" }),
    );
    assert_eq!(uploaded["upload"]["success"], true);
    let url = uploaded["upload"]["url"].as_str().expect("url").to_string();
    assert!(url.starts_with("storage://circulars/"));
    let progress = uploaded["progress"].as_array().expect("progress");
    assert_eq!(progress.first(), Some(&json!(0)));
    assert_eq!(progress.last(), Some(&json!(100)));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "oc",
        "overlay.openCreate",
        json!({ "entity": "circulars" }),
    );
    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "c1",
        "form.submit",
        json!({ "entity": "circulars", "today": "2025-06-10", "form": circular_form("Exam notice", Some(&url)) }),
    );
    assert_eq!(saved["saved"], true);
    let id = saved["record"]["id"].as_str().expect("id").to_string();
    assert_eq!(saved["stats"]["byFacet"]["has_attachment"]["yes"], 1);

    // The stored file disappears out from under the record.
    let removed = request_ok(&mut stdin, &mut reader, "fd", "files.delete", json!({ "url": url }));
    assert_eq!(removed["deleted"], true);

    let asked = request_ok(
        &mut stdin,
        &mut reader,
        "rd",
        "records.requestDelete",
        json!({ "entity": "circulars", "id": id }),
    );
    assert_eq!(asked["overlay"]["pending"]["attachment"], json!(url));

    let done = request_ok(
        &mut stdin,
        &mut reader,
        "ca",
        "confirm.accept",
        json!({ "entity": "circulars" }),
    );
    assert_eq!(done["view"]["totalItems"], 0);
    assert_eq!(done["overlay"]["kind"], "none");
    assert_eq!(done["notices"][0]["message"], "Circular deleted successfully");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn attachment_removal_and_mode_switch() {
    let workspace = temp_dir("collegeadmin-attachment-modes");
    let src = workspace.join("syllabus.pdf");
    std::fs::write(&src, b"%PDF-1.4 syllabus").expect("write source file");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let uploaded = request_ok(
        &mut stdin,
        &mut reader,
        "up",
        "files.upload",
        json!({ "path": src.to_string_lossy(), "entity": "circulars" }),
    );
    let url = uploaded["upload"]["url"].as_str().expect("url").to_string();
    let stored = request_ok(
        &mut stdin,
        &mut reader,
        "ru",
        "files.resolveUrl",
        json!({ "url": url, "mode": "download" }),
    );
    assert!(stored["url"].as_str().unwrap_or("").contains("?download="));

    let _ = request_ok(&mut stdin, &mut reader, "oc", "overlay.openCreate", json!({ "entity": "circulars" }));
    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "c1",
        "form.submit",
        json!({ "entity": "circulars", "today": "2025-06-10", "form": circular_form("Syllabus", Some(&url)) }),
    );
    let id = saved["record"]["id"].as_str().expect("id").to_string();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ad",
        "attachments.requestDelete",
        json!({ "entity": "circulars", "id": id }),
    );
    let cleared = request_ok(&mut stdin, &mut reader, "ac", "confirm.accept", json!({ "entity": "circulars" }));
    assert_eq!(cleared["outcome"]["action"], "deleteAttachment");
    assert!(cleared["view"]["items"][0].get("attachment_url").is_none());
    let gone = request_ok(&mut stdin, &mut reader, "fd", "files.delete", json!({ "url": url }));
    assert_eq!(gone["deleted"], false);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "sm",
        "attachments.requestSwitchMode",
        json!({ "entity": "circulars", "id": id, "mode": "link" }),
    );
    let switched = request_ok(&mut stdin, &mut reader, "sc", "confirm.accept", json!({ "entity": "circulars" }));
    assert_eq!(switched["view"]["items"][0]["attachment_mode"], "link");

    let rejected = request(
        &mut stdin,
        &mut reader,
        "bad",
        "attachments.requestDelete",
        json!({ "entity": "departments", "id": id }),
    );
    assert_eq!(rejected["error"]["code"], "not_supported");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn past_publish_date_is_rejected_before_save() {
    let workspace = temp_dir("collegeadmin-circular-dates");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "oc", "overlay.openCreate", json!({ "entity": "circulars" }));

    let mut form = circular_form("Late", None);
    form["publish_date"] = json!("2025-06-01");
    form["expire_date"] = json!("2025-05-30");
    let checked = request_ok(
        &mut stdin,
        &mut reader,
        "v",
        "form.validate",
        json!({ "entity": "circulars", "today": "2025-06-10", "form": form }),
    );
    assert_eq!(checked["valid"], false);
    assert_eq!(checked["errors"]["publish_date"], "Publish date cannot be in the past");
    assert_eq!(checked["errors"]["expire_date"], "Expiry date must be after publish date");

    let submitted = request_ok(
        &mut stdin,
        &mut reader,
        "s",
        "form.submit",
        json!({ "entity": "circulars", "today": "2025-06-10", "form": form }),
    );
    assert_eq!(submitted["saved"], false);
    assert_eq!(submitted["overlay"]["kind"], "create");
    assert_eq!(submitted["stats"]["total"], 0);

    let bad_files = request_ok(
        &mut stdin,
        &mut reader,
        "fv",
        "files.validate",
        json!({ "path": workspace.join("collegeadmin.sqlite3").to_string_lossy() }),
    );
    assert_eq!(bad_files["valid"], false);

    drop(stdin);
    let _ = child.wait();
}
