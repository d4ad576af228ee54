use crate::config::Config;
use crate::db;
use crate::entities::{self, ALL_KINDS};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::storage::DiskStorage;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match db::open_db(&path) {
        Ok(conn) => {
            state.config = Config::from_env().with_workspace(&conn);
            state.storage = Some(DiskStorage::new(path.join("storage")));
            state.workspace = Some(path.clone());
            state.db = Some(conn);
            // Sessions and cached collections belong to the previous workspace.
            state.pages.clear();
            state.cache.clear();
            tracing::info!(workspace = %path.display(), "workspace selected");
            ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
        }
        Err(e) => {
            tracing::error!(workspace = %path.display(), error = %e, "workspace open failed");
            err(&req.id, "db_open_failed", format!("{e:?}"), None)
        }
    }
}

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "settings": state.config }))
}

fn handle_settings_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(patch) = req.params.get("settings").filter(|v| v.is_object()) else {
        return err(&req.id, "bad_params", "missing settings object", None);
    };
    if let Err(e) = state.config.update_workspace(conn, patch) {
        return err(&req.id, "bad_params", e.to_string(), None);
    }
    // Page size applies to sessions opened from now on.
    state.pages.clear();
    ok(&req.id, json!({ "settings": state.config }))
}

fn handle_entities_list(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let entities: Vec<_> = ALL_KINDS
        .iter()
        .map(|k| {
            let schema = k.view_schema(0);
            json!({
                "entity": k,
                "label": k.label(),
                "backing": k.backing(),
                "persistent": k.backing() == entities::Backing::Sqlite,
                "attachmentField": k.attachment_field(),
                "statusField": k.status_field(),
                "statusToggle": k.status_toggle().map(|t| json!([t.on, t.off])),
                "searchFields": schema.search_fields,
                "filters": schema.facets.iter().map(|f| json!({ "key": f.key, "label": f.label })).collect::<Vec<_>>(),
                "sortKeys": schema.sort_keys.iter().map(|s| json!({ "key": s.key, "label": s.label })).collect::<Vec<_>>(),
                "defaultSort": schema.default_sort,
            })
        })
        .collect();
    ok(&req.id, json!({ "entities": entities }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.update" => Some(handle_settings_update(state, req)),
        "entities.list" => Some(handle_entities_list(state, req)),
        _ => None,
    }
}
