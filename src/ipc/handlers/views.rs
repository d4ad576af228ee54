use crate::entities::EntityKind;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{criteria_param, entity_param, page_ctx, required_str, snapshot};
use crate::ipc::types::{AppState, Request};
use crate::page::PageSession;
use crate::view::{FacetRule, SortDirection, ViewEffect};
use serde_json::json;

fn handle_view_open(state: &mut AppState, req: &Request, kind: EntityKind) -> serde_json::Value {
    let criteria = criteria_param(req);
    let page_size = state.config.page_size;
    state
        .pages
        .insert(kind, PageSession::new(kind, page_size, criteria));
    let ctx = page_ctx(state, kind);
    ctx.page.reload(&ctx.svc, ctx.cache);
    ok(&req.id, snapshot(ctx.page, &[]))
}

fn string_list(v: Option<&serde_json::Value>) -> Option<Vec<String>> {
    match v? {
        serde_json::Value::Array(items) => items
            .iter()
            .map(|i| match i {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::Bool(b) => Some(if *b { "yes" } else { "no" }.to_string()),
                _ => None,
            })
            .collect(),
        serde_json::Value::Null => Some(Vec::new()),
        _ => None,
    }
}

fn number_or_null(req: &Request, key: &str) -> Result<Option<f64>, serde_json::Value> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| err(&req.id, "bad_params", format!("{} must be a number", key), None)),
    }
}

/// Applies one view-state change and returns the refreshed page.
fn handle_view_change(state: &mut AppState, req: &Request, kind: EntityKind) -> serde_json::Value {
    let ctx = page_ctx(state, kind);
    let page = ctx.page;
    let mut effects: Vec<ViewEffect> = Vec::new();

    match req.method.as_str() {
        "view.get" => {}
        "view.search" => {
            let query = req.params.get("query").and_then(|v| v.as_str()).unwrap_or("");
            page.view.set_search(query);
        }
        "view.filter" | "view.toggleFilter" | "view.range" => {
            let category = match required_str(req, "category") {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            let Some(facet) = page.schema.facet(category) else {
                return err(
                    &req.id,
                    "bad_params",
                    format!("unknown filter category: {}", category),
                    Some(json!({ "entity": kind })),
                );
            };
            let is_range = matches!(facet.rule, FacetRule::Range { .. });
            if is_range != (req.method == "view.range") {
                let hint = if is_range { "view.range" } else { "view.filter or view.toggleFilter" };
                return err(
                    &req.id,
                    "bad_params",
                    format!("{} filters are set with {}", category, hint),
                    Some(json!({ "entity": kind, "category": category })),
                );
            }
            match req.method.as_str() {
                "view.filter" => {
                    let Some(values) = string_list(req.params.get("values")) else {
                        return err(&req.id, "bad_params", "values must be a list of strings", None);
                    };
                    page.view.set_filter(category, values);
                }
                "view.toggleFilter" => {
                    let value = match required_str(req, "value") {
                        Ok(v) => v,
                        Err(resp) => return resp,
                    };
                    page.view.toggle_filter(category, value);
                }
                _ => {
                    let min = match number_or_null(req, "min") {
                        Ok(v) => v,
                        Err(resp) => return resp,
                    };
                    let max = match number_or_null(req, "max") {
                        Ok(v) => v,
                        Err(resp) => return resp,
                    };
                    page.view.set_range(category, min, max);
                }
            }
        }
        "view.clearFilters" => page.view.clear_filters(),
        "view.sort" => {
            let field = match required_str(req, "field") {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            let direction = match req.params.get("direction").and_then(|v| v.as_str()) {
                None => None,
                Some(raw) => match SortDirection::parse(raw) {
                    Some(d) => Some(d),
                    None => return err(&req.id, "bad_params", "direction must be asc or desc", None),
                },
            };
            page.view.set_sort(field, direction);
        }
        "view.page" => {
            let Some(n) = req.params.get("page").and_then(|v| v.as_u64()) else {
                return err(&req.id, "bad_params", "missing page", None);
            };
            effects = page.view.set_page(usize::try_from(n).unwrap_or(usize::MAX));
        }
        _ => return err(&req.id, "not_implemented", format!("unknown method: {}", req.method), None),
    }
    ok(&req.id, snapshot(page, &effects))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "view.open" | "view.get" | "view.search" | "view.filter" | "view.toggleFilter"
        | "view.range" | "view.clearFilters" | "view.sort" | "view.page" => {}
        _ => return None,
    }
    let kind = match entity_param(req) {
        Ok(k) => k,
        Err(resp) => return Some(resp),
    };
    if req.method == "view.open" {
        return Some(handle_view_open(state, req, kind));
    }
    Some(handle_view_change(state, req, kind))
}
