use chrono::NaiveDate;
use serde_json::json;

use crate::cache::QueryCache;
use crate::entities::EntityKind;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::page::PageSession;
use crate::service::{Backends, ListCriteria, Payload, SqliteRecords};
use crate::storage::DiskStorage;
use crate::validate;
use crate::view::ViewEffect;

pub fn required_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, serde_json::Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) => Ok(v),
        None => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

pub fn optional_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

pub fn entity_param(req: &Request) -> Result<EntityKind, serde_json::Value> {
    let raw = required_str(req, "entity")?;
    EntityKind::parse(raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            format!("unknown entity: {}", raw),
            None,
        )
    })
}

pub fn criteria_param(req: &Request) -> ListCriteria {
    ListCriteria {
        college_id: optional_str(req, "collegeId")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    }
}

/// `params.today` when given (YYYY-MM-DD), otherwise the local date.
pub fn today_param(req: &Request) -> Result<NaiveDate, serde_json::Value> {
    match optional_str(req, "today") {
        None => Ok(chrono::Local::now().date_naive()),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| err(&req.id, "bad_params", "today must be YYYY-MM-DD", None)),
    }
}

pub fn form_param(req: &Request) -> Result<Payload, serde_json::Value> {
    let raw = req.params.get("form").cloned().unwrap_or(serde_json::Value::Null);
    validate::form_from_json(&raw)
        .map_err(|e| err(&req.id, "bad_params", format!("form must be an object: {}", e), None))
}

/// Disjoint borrows of the state a page command needs.
pub struct PageCtx<'a> {
    pub page: &'a mut PageSession,
    pub svc: Backends<'a>,
    pub cache: &'a mut QueryCache,
    pub storage: Option<&'a DiskStorage>,
}

/// The session for `kind`, opened and loaded on first use.
pub fn page_ctx(state: &mut AppState, kind: EntityKind) -> PageCtx<'_> {
    let AppState {
        db,
        memory,
        cache,
        storage,
        config,
        pages,
        ..
    } = state;
    let svc = Backends {
        sqlite: db.as_ref().map(SqliteRecords::new),
        memory,
    };
    let page = pages.entry(kind).or_insert_with(|| {
        let mut p = PageSession::new(kind, config.page_size, ListCriteria::default());
        p.reload(&svc, &mut *cache);
        p
    });
    PageCtx {
        page,
        svc,
        cache,
        storage: storage.as_ref(),
    }
}

/// Everything a list page shell renders, with pending notices drained.
pub fn snapshot(page: &mut PageSession, effects: &[ViewEffect]) -> serde_json::Value {
    let mut view = serde_json::to_value(page.render()).unwrap_or_default();
    view["effects"] = json!(effects);
    json!({
        "entity": page.kind,
        "view": view,
        "overlay": page.overlay,
        "loading": page.loading,
        "banner": page.banner,
        "loadError": page.load_error,
        "formErrors": page.form_errors,
        "stats": page.stats,
        "notices": page.drain_notices(),
    })
}
