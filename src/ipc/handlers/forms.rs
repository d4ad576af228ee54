use crate::entities::EntityKind;
use crate::ipc::error::{ok, page_err};
use crate::ipc::helpers::{entity_param, form_param, page_ctx, required_str, snapshot, today_param};
use crate::ipc::types::{AppState, Request};
use crate::page::Submit;
use serde_json::json;

fn handle_overlay(state: &mut AppState, req: &Request, kind: EntityKind) -> serde_json::Value {
    let ctx = page_ctx(state, kind);
    let page = ctx.page;
    let record = match req.method.as_str() {
        "overlay.openCreate" => {
            page.open_create();
            None
        }
        "overlay.openEdit" | "overlay.openView" => {
            let id = match required_str(req, "id") {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            let opened = if req.method == "overlay.openEdit" {
                page.open_edit(id)
            } else {
                page.open_view(id)
            };
            match opened {
                Ok(r) => Some(r.to_json()),
                Err(e) => return page_err(&req.id, &e, None),
            }
        }
        _ => {
            page.close_overlay();
            None
        }
    };
    let mut result = snapshot(page, &[]);
    result["record"] = json!(record);
    ok(&req.id, result)
}

fn handle_form_validate(state: &mut AppState, req: &Request, kind: EntityKind) -> serde_json::Value {
    let form = match form_param(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let today = match today_param(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let ctx = page_ctx(state, kind);
    let errors = ctx.page.validate_form(&form, today).clone();
    ok(
        &req.id,
        json!({ "valid": errors.is_empty(), "errors": errors }),
    )
}

fn handle_form_submit(state: &mut AppState, req: &Request, kind: EntityKind) -> serde_json::Value {
    let form = match form_param(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let today = match today_param(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let mut ctx = page_ctx(state, kind);
    match ctx.page.submit(&mut ctx.svc, ctx.cache, form, today) {
        Ok(Submit::Invalid(errors)) => {
            let mut result = snapshot(ctx.page, &[]);
            result["saved"] = json!(false);
            result["errors"] = json!(errors);
            ok(&req.id, result)
        }
        Ok(Submit::Saved(record)) => {
            let mut result = snapshot(ctx.page, &[]);
            result["saved"] = json!(true);
            result["record"] = record.to_json();
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
        "overlay.openCreate" | "overlay.openEdit" | "overlay.openView" | "overlay.close"
        | "form.validate" | "form.submit" => {}
        _ => return None,
    }
    let kind = match entity_param(req) {
        Ok(k) => k,
        Err(resp) => return Some(resp),
    };
    Some(match req.method.as_str() {
        "form.validate" => handle_form_validate(state, req, kind),
        "form.submit" => handle_form_submit(state, req, kind),
        _ => handle_overlay(state, req, kind),
    })
}
