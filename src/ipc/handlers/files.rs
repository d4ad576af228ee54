use crate::entities::EntityKind;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::storage::{AccessMode, DiskStorage, FileMeta, FileRules, FileStorage, UploadOutcome};
use serde_json::json;
use std::path::Path;

fn storage<'a>(state: &'a AppState, req: &Request) -> Result<&'a DiskStorage, serde_json::Value> {
    state
        .storage
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Explicit `params.rules` win over the configured upload limits.
fn rules_for(state: &AppState, req: &Request) -> Result<FileRules, serde_json::Value> {
    match req.params.get("rules") {
        Some(v) if !v.is_null() => serde_json::from_value(v.clone())
            .map_err(|e| err(&req.id, "bad_params", format!("invalid rules: {}", e), None)),
        _ => Ok(FileRules {
            max_size: state.config.max_upload_bytes,
            allowed_types: state.config.allowed_upload_types.clone(),
        }),
    }
}

fn file_meta(req: &Request) -> Result<FileMeta, serde_json::Value> {
    let path = required_str(req, "path")?;
    FileMeta::from_path(Path::new(path)).map_err(|e| {
        err(
            &req.id,
            "file_unreadable",
            e.to_string(),
            Some(json!({ "path": path })),
        )
    })
}

fn handle_files_validate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let storage = match storage(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let rules = match rules_for(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let meta = match file_meta(req) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    ok(&req.id, json!(storage.validate(&meta, &rules)))
}

fn handle_files_upload(state: &mut AppState, req: &Request) -> serde_json::Value {
    let storage = match storage(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let rules = match rules_for(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let meta = match file_meta(req) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    let folder = match (optional_str(req, "folder"), optional_str(req, "entity")) {
        (Some(f), _) => f.to_string(),
        (None, Some(e)) => match EntityKind::parse(e) {
            Some(kind) => kind.upload_folder().to_string(),
            None => return err(&req.id, "bad_params", format!("unknown entity: {}", e), None),
        },
        (None, None) => return err(&req.id, "bad_params", "missing folder or entity", None),
    };

    let check = storage.validate(&meta, &rules);
    if !check.valid {
        let outcome = UploadOutcome {
            success: false,
            url: None,
            error: check.error,
        };
        return ok(&req.id, json!({ "upload": outcome, "progress": [] }));
    }

    let src = Path::new(optional_str(req, "path").unwrap_or_default());
    let mut progress: Vec<u8> = Vec::new();
    let outcome = storage.upload(src, &folder, &mut |done: u64, total: u64| {
        let pct = if total == 0 { 100 } else { (done * 100 / total) as u8 };
        if progress.last() != Some(&pct) {
            progress.push(pct);
        }
    });
    ok(&req.id, json!({ "upload": outcome, "progress": progress }))
}

fn handle_files_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let storage = match storage(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let url = match required_str(req, "url") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let deleted = storage.delete(url);
    if !deleted {
        tracing::warn!(%url, "file delete removed nothing");
    }
    ok(&req.id, json!({ "deleted": deleted }))
}

fn handle_files_resolve_url(state: &mut AppState, req: &Request) -> serde_json::Value {
    let storage = match storage(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let url = match required_str(req, "url") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let mode = match optional_str(req, "mode") {
        None | Some("view") => AccessMode::View,
        Some("download") => AccessMode::Download,
        Some(other) => {
            return err(
                &req.id,
                "bad_params",
                format!("mode must be view or download, got {}", other),
                None,
            )
        }
    };
    match storage.resolve_access_url(url, mode) {
        Some(resolved) => ok(&req.id, json!({ "url": resolved })),
        None => err(&req.id, "bad_params", "unresolvable storage url", Some(json!({ "url": url }))),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "files.validate" => Some(handle_files_validate(state, req)),
        "files.upload" => Some(handle_files_upload(state, req)),
        "files.delete" => Some(handle_files_delete(state, req)),
        "files.resolveUrl" => Some(handle_files_resolve_url(state, req)),
        _ => None,
    }
}
