use crate::cache::QueryKey;
use crate::entities::EntityKind;
use crate::ipc::error::{err, ok, page_err};
use crate::import;
use crate::ipc::helpers::{criteria_param, entity_param, optional_str, page_ctx, required_str, snapshot, today_param};
use crate::ipc::types::{AppState, Request};
use crate::page::{AttachmentMode, Import, PageError};
use crate::service::{Backends, RecordService, SqliteRecords};
use crate::storage::FileStorage;
use serde_json::json;

fn handle_records_list(state: &mut AppState, req: &Request, kind: EntityKind) -> serde_json::Value {
    let criteria = criteria_param(req);
    let svc = Backends {
        sqlite: state.db.as_ref().map(SqliteRecords::new),
        memory: &mut state.memory,
    };
    let key = QueryKey::new(kind, format!("list:{}", criteria.scope_key()));
    match state.cache.fetch(key, &svc, &criteria) {
        Ok(entry) => {
            let records: Vec<_> = entry.records.iter().map(|r| r.to_json()).collect();
            ok(&req.id, json!({ "records": records, "version": entry.version }))
        }
        Err(e) => err(&req.id, e.code(), e.to_string(), Some(json!({ "entity": kind }))),
    }
}

fn handle_records_get(state: &mut AppState, req: &Request, kind: EntityKind) -> serde_json::Value {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let svc = Backends {
        sqlite: state.db.as_ref().map(SqliteRecords::new),
        memory: &mut state.memory,
    };
    match svc.get(kind, id) {
        Ok(r) => ok(&req.id, json!({ "record": r.to_json() })),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

fn handle_stats_get(state: &mut AppState, req: &Request, kind: EntityKind) -> serde_json::Value {
    let ctx = page_ctx(state, kind);
    if let Some(msg) = &ctx.page.load_error {
        return err(&req.id, "load_failed", msg.clone(), Some(json!({ "entity": kind })));
    }
    ok(&req.id, json!({ "entity": kind, "stats": ctx.page.stats }))
}

/// CSV text comes inline as `params.csv` or from a file at `params.path`.
fn handle_records_import(state: &mut AppState, req: &Request, kind: EntityKind) -> serde_json::Value {
    let text = match (optional_str(req, "csv"), optional_str(req, "path")) {
        (Some(t), _) => t.to_string(),
        (None, Some(path)) => match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                return err(
                    &req.id,
                    "file_unreadable",
                    e.to_string(),
                    Some(json!({ "path": path })),
                )
            }
        },
        (None, None) => return err(&req.id, "bad_params", "missing csv or path", None),
    };
    let today = match today_param(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let rows = match import::parse_csv(kind, &text) {
        Ok(r) => r,
        Err(e) => return page_err(&req.id, &PageError::from(e), Some(json!({ "entity": kind }))),
    };
    let mut ctx = page_ctx(state, kind);
    match ctx.page.import(&mut ctx.svc, ctx.cache, rows, today) {
        Ok(Import::Rejected(errors)) => {
            let mut result = snapshot(ctx.page, &[]);
            result["imported"] = json!(0);
            result["errors"] = json!(errors);
            ok(&req.id, result)
        }
        Ok(Import::Created(records)) => {
            let mut result = snapshot(ctx.page, &[]);
            result["imported"] = json!(records.len());
            result["errors"] = json!([]);
            result["records"] = json!(records.iter().map(|r| r.to_json()).collect::<Vec<_>>());
            ok(&req.id, result)
        }
        Err(e) => {
            let details = snapshot(ctx.page, &[]);
            page_err(&req.id, &e, Some(details))
        }
    }
}

/// Write commands: each one ends with the refreshed page snapshot.
fn handle_page_command(state: &mut AppState, req: &Request, kind: EntityKind) -> serde_json::Value {
    let mut ctx = page_ctx(state, kind);
    let outcome = match req.method.as_str() {
        "confirm.cancel" => {
            ctx.page.cancel_confirm();
            Ok(json!(null))
        }
        "confirm.accept" => {
            let storage = ctx.storage.map(|s| s as &dyn FileStorage);
            ctx.page
                .confirm(&mut ctx.svc, storage, ctx.cache)
                .map(|done| json!(done))
        }
        _ => {
            let id = match required_str(req, "id") {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            match req.method.as_str() {
                "records.requestDelete" => ctx.page.request_delete(id).map(|o| json!(o)),
                "attachments.requestDelete" => ctx.page.request_attachment_delete(id).map(|o| json!(o)),
                "attachments.requestSwitchMode" => {
                    let mode = match req
                        .params
                        .get("mode")
                        .cloned()
                        .map(serde_json::from_value::<AttachmentMode>)
                    {
                        Some(Ok(m)) => m,
                        _ => return err(&req.id, "bad_params", "mode must be upload or link", None),
                    };
                    ctx.page.request_switch_mode(id, mode).map(|o| json!(o))
                }
                _ => ctx
                    .page
                    .toggle_status(&mut ctx.svc, ctx.cache, id)
                    .map(|r| r.to_json()),
            }
        }
    };
    match outcome {
        Ok(value) => {
            let mut result = snapshot(ctx.page, &[]);
            result["outcome"] = value;
            ok(&req.id, result)
        }
        Err(e) => {
            let details = snapshot(ctx.page, &[]);
            page_err(&req.id, &e, Some(details))
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.list" | "records.get" | "records.requestDelete" | "records.toggleStatus"
        | "attachments.requestDelete" | "attachments.requestSwitchMode" | "confirm.accept"
        | "confirm.cancel" | "stats.get" | "records.import" => {}
        _ => return None,
    }
    let kind = match entity_param(req) {
        Ok(k) => k,
        Err(resp) => return Some(resp),
    };
    Some(match req.method.as_str() {
        "records.list" => handle_records_list(state, req, kind),
        "records.get" => handle_records_get(state, req, kind),
        "stats.get" => handle_stats_get(state, req, kind),
        "records.import" => handle_records_import(state, req, kind),
        _ => handle_page_command(state, req, kind),
    })
}
