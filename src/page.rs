//! One management page: the loaded collection, its view state, the open
//! overlay and the write commands that always end in a full reload.

use crate::cache::{QueryCache, QueryKey};
use crate::entities::EntityKind;
use crate::import::ImportRow;
use crate::service::{ListCriteria, Payload, RecordService, ServiceError};
use crate::storage::{FileStorage, URL_SCHEME};
use crate::validate::{self, ErrorMap};
use crate::view::{self, FacetRule, FieldValue, Record, ViewPage, ViewSchema, ViewState};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("{0} is not in the loaded collection")]
    UnknownRecord(String),

    #[error("no create or edit form is open")]
    NoForm,

    #[error("nothing is waiting for confirmation")]
    NothingToConfirm,

    #[error("{0} records have no attachment")]
    NoAttachment(&'static str),

    #[error(transparent)]
    Import(#[from] crate::import::ImportError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl PageError {
    pub fn code(&self) -> &'static str {
        match self {
            PageError::UnknownRecord(_) => "not_found",
            PageError::NoForm => "no_form",
            PageError::NothingToConfirm => "nothing_to_confirm",
            PageError::NoAttachment(_) => "not_supported",
            PageError::Import(_) => "invalid_csv",
            PageError::Service(e) => e.code(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentMode {
    Upload,
    Link,
}

impl AttachmentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AttachmentMode::Upload => "upload",
            AttachmentMode::Link => "link",
        }
    }
}

/// Destructive actions held back until the user confirms.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PendingAction {
    DeleteRecord {
        id: String,
        attachment: Option<String>,
    },
    DeleteAttachment {
        id: String,
        url: String,
    },
    SwitchAttachmentMode {
        id: String,
        mode: AttachmentMode,
        attachment: Option<String>,
    },
}

/// At most one overlay is open per page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Overlay {
    None,
    Create,
    Edit { id: String },
    View { id: String },
    ConfirmDelete { pending: PendingAction },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_facet: BTreeMap<String, BTreeMap<String, usize>>,
}

impl EntityStats {
    /// Aggregates over the whole collection; range facets have no counts.
    pub fn compute(kind: EntityKind, schema: &ViewSchema, records: &[Record]) -> Self {
        let field = kind.status_field();
        let mut by_status = BTreeMap::new();
        for r in records {
            let key = r
                .get(field)
                .and_then(|v| v.facet_key())
                .unwrap_or_else(|| "unknown".to_string());
            *by_status.entry(key).or_insert(0) += 1;
        }
        let by_facet = schema
            .facets
            .iter()
            .filter(|f| !matches!(f.rule, FacetRule::Range { .. }))
            .map(|f| {
                let counts = view::filter::facet_options(records, f)
                    .options
                    .into_iter()
                    .map(|o| (o.value, o.count))
                    .collect();
                (f.key.to_string(), counts)
            })
            .collect();
        Self {
            total: records.len(),
            by_status,
            by_facet,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submit {
    /// Validation failed before any call; the form stays open.
    Invalid(ErrorMap),
    Saved(Record),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Import {
    /// `Row N: message` lines; nothing was written.
    Rejected(Vec<String>),
    Created(Vec<Record>),
}

pub struct PageSession {
    pub kind: EntityKind,
    pub schema: ViewSchema,
    pub view: ViewState,
    pub overlay: Overlay,
    pub loading: bool,
    pub banner: Option<String>,
    pub form_errors: ErrorMap,
    pub load_error: Option<String>,
    pub collection: Vec<Record>,
    pub stats: Option<EntityStats>,
    pub criteria: ListCriteria,
    notices: Vec<Notice>,
}

impl PageSession {
    pub fn new(kind: EntityKind, page_size: usize, criteria: ListCriteria) -> Self {
        let schema = kind.view_schema(page_size);
        let view = ViewState::new(&schema);
        Self {
            kind,
            schema,
            view,
            overlay: Overlay::None,
            loading: false,
            banner: None,
            form_errors: ErrorMap::new(),
            load_error: None,
            collection: Vec::new(),
            stats: None,
            criteria,
            notices: Vec::new(),
        }
    }

    fn key(&self, scope: &str) -> QueryKey {
        QueryKey::new(self.kind, format!("{}:{}", scope, self.criteria.scope_key()))
    }

    /// Loads the collection and its stats. A failed load leaves an empty
    /// collection and the raw message in `load_error`.
    pub fn reload(&mut self, svc: &dyn RecordService, cache: &mut QueryCache) -> bool {
        let list_key = self.key("list");
        match cache.fetch(list_key, svc, &self.criteria) {
            Ok(entry) => {
                self.collection = entry.records.clone();
                self.load_error = None;
            }
            Err(e) => {
                tracing::warn!(entity = self.kind.as_str(), error = %e, "collection load failed");
                self.collection.clear();
                self.stats = None;
                self.load_error = Some(e.to_string());
                return false;
            }
        }
        let stats_key = self.key("stats");
        match cache.fetch(stats_key, svc, &self.criteria) {
            Ok(entry) => self.stats = Some(EntityStats::compute(self.kind, &self.schema, &entry.records)),
            Err(e) => {
                tracing::warn!(entity = self.kind.as_str(), error = %e, "stats load failed");
                self.stats = None;
            }
        }
        true
    }

    pub fn render(&self) -> ViewPage {
        view::render(&self.collection, &self.schema, &self.view)
    }

    pub fn record(&self, id: &str) -> Result<&Record, PageError> {
        self.collection
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| PageError::UnknownRecord(id.to_string()))
    }

    pub fn open_create(&mut self) {
        self.form_errors.clear();
        self.banner = None;
        self.overlay = Overlay::Create;
    }

    pub fn open_edit(&mut self, id: &str) -> Result<&Record, PageError> {
        self.record(id)?;
        self.form_errors.clear();
        self.banner = None;
        self.overlay = Overlay::Edit { id: id.to_string() };
        self.record(id)
    }

    pub fn open_view(&mut self, id: &str) -> Result<&Record, PageError> {
        self.record(id)?;
        self.overlay = Overlay::View { id: id.to_string() };
        self.record(id)
    }

    pub fn close_overlay(&mut self) {
        self.overlay = Overlay::None;
        self.form_errors.clear();
        self.banner = None;
    }

    /// Recomputes the error map for the open form.
    pub fn validate_form(&mut self, form: &Payload, today: NaiveDate) -> &ErrorMap {
        self.form_errors = validate::validate(self.kind.checks(), form, today);
        &self.form_errors
    }

    fn succeed(&mut self, svc: &dyn RecordService, cache: &mut QueryCache, message: String) {
        cache.invalidate(self.kind);
        self.reload(svc, cache);
        self.overlay = Overlay::None;
        self.form_errors.clear();
        self.banner = None;
        self.loading = false;
        tracing::info!(entity = self.kind.as_str(), "{}", message);
        self.notices.push(Notice {
            level: NoticeLevel::Success,
            message,
        });
    }

    fn fail(&mut self, action: &str, err: ServiceError) -> PageError {
        self.loading = false;
        let message = format!("Failed to {} {}: {}", action, self.kind.label().to_lowercase(), err);
        tracing::warn!(entity = self.kind.as_str(), error = %err, "{} failed", action);
        self.banner = Some(message.clone());
        self.notices.push(Notice {
            level: NoticeLevel::Error,
            message,
        });
        PageError::Service(err)
    }

    /// Validates and sends the open create/edit form.
    pub fn submit(
        &mut self,
        svc: &mut dyn RecordService,
        cache: &mut QueryCache,
        form: Payload,
        today: NaiveDate,
    ) -> Result<Submit, PageError> {
        let editing = match &self.overlay {
            Overlay::Create => None,
            Overlay::Edit { id } => Some(id.clone()),
            _ => return Err(PageError::NoForm),
        };
        if !self.validate_form(&form, today).is_empty() {
            return Ok(Submit::Invalid(self.form_errors.clone()));
        }

        self.loading = true;
        let label = self.kind.label();
        let result = match &editing {
            None => svc.create(self.kind, form),
            Some(id) => svc.update(self.kind, id, form),
        };
        match result {
            Ok(record) => {
                let verb = if editing.is_some() { "updated" } else { "created" };
                self.succeed(&*svc, cache, format!("{} {} successfully", label, verb));
                Ok(Submit::Saved(record))
            }
            Err(e) => Err(self.fail(if editing.is_some() { "update" } else { "create" }, e)),
        }
    }

    /// Validates every row first and writes only when all pass. The
    /// collection is reloaded once after the batch.
    pub fn import(
        &mut self,
        svc: &mut dyn RecordService,
        cache: &mut QueryCache,
        rows: Vec<ImportRow>,
        today: NaiveDate,
    ) -> Result<Import, PageError> {
        let mut problems = Vec::new();
        for row in &rows {
            for message in validate::validate(self.kind.checks(), &row.fields, today).into_values() {
                problems.push(format!("Row {}: {}", row.row, message));
            }
        }
        if !problems.is_empty() {
            tracing::info!(
                entity = self.kind.as_str(),
                rows = rows.len(),
                problems = problems.len(),
                "import rejected"
            );
            return Ok(Import::Rejected(problems));
        }

        self.loading = true;
        let mut created = Vec::with_capacity(rows.len());
        for row in rows {
            match svc.create(self.kind, row.fields) {
                Ok(record) => created.push(record),
                Err(e) => {
                    // Rows written before the failure are real; show them.
                    if !created.is_empty() {
                        cache.invalidate(self.kind);
                        self.reload(&*svc, cache);
                    }
                    tracing::warn!(entity = self.kind.as_str(), row = row.row, written = created.len(), "import stopped");
                    return Err(self.fail("import", e));
                }
            }
        }
        let message = format!("{} import complete: {} created", self.kind.label(), created.len());
        self.succeed(&*svc, cache, message);
        Ok(Import::Created(created))
    }

    pub fn toggle_status(
        &mut self,
        svc: &mut dyn RecordService,
        cache: &mut QueryCache,
        id: &str,
    ) -> Result<Record, PageError> {
        let field = self.kind.status_field();
        let current = self
            .record(id)?
            .get(field)
            .and_then(|v| v.facet_key())
            .unwrap_or_default();
        self.loading = true;
        match svc.toggle_status(self.kind, id, &current) {
            Ok(record) => {
                let now = record.text(field).unwrap_or_default().to_string();
                self.succeed(
                    &*svc,
                    cache,
                    format!("{} marked {}", self.kind.label(), now),
                );
                Ok(record)
            }
            Err(e) => Err(self.fail("update", e)),
        }
    }

    fn attachment_of(&self, id: &str) -> Result<Option<String>, PageError> {
        let record = self.record(id)?;
        Ok(self
            .kind
            .attachment_field()
            .and_then(|f| record.text(f))
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string()))
    }

    pub fn request_delete(&mut self, id: &str) -> Result<&Overlay, PageError> {
        let attachment = self.attachment_of(id)?;
        self.overlay = Overlay::ConfirmDelete {
            pending: PendingAction::DeleteRecord {
                id: id.to_string(),
                attachment,
            },
        };
        Ok(&self.overlay)
    }

    pub fn request_attachment_delete(&mut self, id: &str) -> Result<&Overlay, PageError> {
        if self.kind.attachment_field().is_none() {
            return Err(PageError::NoAttachment(self.kind.as_str()));
        }
        let Some(url) = self.attachment_of(id)? else {
            return Err(PageError::UnknownRecord(format!("attachment of {}", id)));
        };
        self.overlay = Overlay::ConfirmDelete {
            pending: PendingAction::DeleteAttachment {
                id: id.to_string(),
                url,
            },
        };
        Ok(&self.overlay)
    }

    pub fn request_switch_mode(&mut self, id: &str, mode: AttachmentMode) -> Result<&Overlay, PageError> {
        if self.kind.attachment_field().is_none() {
            return Err(PageError::NoAttachment(self.kind.as_str()));
        }
        let attachment = self.attachment_of(id)?;
        self.overlay = Overlay::ConfirmDelete {
            pending: PendingAction::SwitchAttachmentMode {
                id: id.to_string(),
                mode,
                attachment,
            },
        };
        Ok(&self.overlay)
    }

    pub fn cancel_confirm(&mut self) {
        if matches!(self.overlay, Overlay::ConfirmDelete { .. }) {
            self.overlay = Overlay::None;
        }
    }

    /// Files owned by this service are removed best-effort; a failure is logged
    /// and never blocks the record write that follows.
    fn cleanup_file(&self, storage: Option<&dyn FileStorage>, url: &str) {
        if !url.starts_with(URL_SCHEME) {
            return;
        }
        let Some(storage) = storage else {
            tracing::warn!(entity = self.kind.as_str(), %url, "no file storage configured, skipping cleanup");
            return;
        };
        if storage.delete(url) {
            tracing::debug!(entity = self.kind.as_str(), %url, "attachment removed");
        } else {
            tracing::warn!(entity = self.kind.as_str(), %url, "attachment cleanup failed, continuing");
        }
    }

    /// Runs the pending action: file cleanup, then the record write, then reload.
    pub fn confirm(
        &mut self,
        svc: &mut dyn RecordService,
        storage: Option<&dyn FileStorage>,
        cache: &mut QueryCache,
    ) -> Result<PendingAction, PageError> {
        let Overlay::ConfirmDelete { pending } = self.overlay.clone() else {
            return Err(PageError::NothingToConfirm);
        };
        self.loading = true;
        let label = self.kind.label();
        let result = match &pending {
            PendingAction::DeleteRecord { id, attachment } => {
                if let Some(url) = attachment {
                    self.cleanup_file(storage, url);
                }
                svc.delete(self.kind, id)
                    .map(|_| format!("{} deleted successfully", label))
            }
            PendingAction::DeleteAttachment { id, url } => {
                self.cleanup_file(storage, url);
                let field = self.kind.attachment_field().unwrap_or("attachment_url");
                let mut patch = Payload::new();
                patch.insert(field.to_string(), FieldValue::Null);
                svc.update(self.kind, id, patch)
                    .map(|_| "Attachment removed".to_string())
            }
            PendingAction::SwitchAttachmentMode {
                id,
                mode,
                attachment,
            } => {
                if let Some(url) = attachment {
                    self.cleanup_file(storage, url);
                }
                let field = self.kind.attachment_field().unwrap_or("attachment_url");
                let mut patch = Payload::new();
                patch.insert(field.to_string(), FieldValue::Null);
                patch.insert("attachment_mode".into(), FieldValue::from(mode.as_str()));
                svc.update(self.kind, id, patch)
                    .map(|_| format!("Attachment mode set to {}", mode.as_str()))
            }
        };
        match result {
            Ok(message) => {
                self.succeed(&*svc, cache, message);
                Ok(pending)
            }
            Err(e) => {
                let action = match pending {
                    PendingAction::DeleteRecord { .. } => "delete",
                    _ => "update",
                };
                Err(self.fail(action, e))
            }
        }
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{MemoryRecords, ServiceResult};
    use crate::storage::{AccessMode, FileCheck, FileMeta, FileRules, UploadOutcome};
    use std::cell::RefCell;
    use std::path::Path;

    /// Storage double that records deletes and can be told to fail them.
    #[derive(Default)]
    struct FakeStorage {
        fail_deletes: bool,
        deleted: RefCell<Vec<String>>,
    }

    impl FileStorage for FakeStorage {
        fn upload(&self, _src: &Path, _folder: &str, _p: &mut dyn FnMut(u64, u64)) -> UploadOutcome {
            UploadOutcome {
                success: false,
                url: None,
                error: Some("unused".into()),
            }
        }
        fn delete(&self, url: &str) -> bool {
            self.deleted.borrow_mut().push(url.to_string());
            !self.fail_deletes
        }
        fn validate(&self, _meta: &FileMeta, _rules: &FileRules) -> FileCheck {
            FileCheck {
                valid: true,
                error: None,
            }
        }
        fn resolve_access_url(&self, url: &str, _mode: AccessMode) -> Option<String> {
            Some(url.to_string())
        }
    }

    /// Service double whose writes fail on demand.
    struct Flaky {
        inner: MemoryRecords,
        fail_writes: bool,
    }

    impl RecordService for Flaky {
        fn list(&self, kind: EntityKind, c: &ListCriteria) -> ServiceResult<Vec<Record>> {
            self.inner.list(kind, c)
        }
        fn get(&self, kind: EntityKind, id: &str) -> ServiceResult<Record> {
            self.inner.get(kind, id)
        }
        fn create(&mut self, kind: EntityKind, p: Payload) -> ServiceResult<Record> {
            if self.fail_writes {
                return Err(ServiceError::InvalidPayload("backend rejected".into()));
            }
            self.inner.create(kind, p)
        }
        fn update(&mut self, kind: EntityKind, id: &str, p: Payload) -> ServiceResult<Record> {
            if self.fail_writes {
                return Err(ServiceError::InvalidPayload("backend rejected".into()));
            }
            self.inner.update(kind, id, p)
        }
        fn delete(&mut self, kind: EntityKind, id: &str) -> ServiceResult<()> {
            if self.fail_writes {
                return Err(ServiceError::InvalidPayload("backend rejected".into()));
            }
            self.inner.delete(kind, id)
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).expect("date")
    }

    fn circular_form(title: &str) -> Payload {
        let mut f = Payload::new();
        f.insert("title".into(), title.into());
        f.insert("message_body".into(), "Exam timetable released".into());
        f.insert("publish_date".into(), "2025-06-15".into());
        f.insert("expire_date".into(), "2025-06-20".into());
        f
    }

    fn session(kind: EntityKind) -> (PageSession, Flaky, QueryCache) {
        let svc = Flaky {
            inner: MemoryRecords::default(),
            fail_writes: false,
        };
        let mut cache = QueryCache::default();
        let mut page = PageSession::new(kind, 25, ListCriteria::default());
        assert!(page.reload(&svc, &mut cache));
        (page, svc, cache)
    }

    #[test]
    fn successful_create_reloads_and_closes() {
        let (mut page, mut svc, mut cache) = session(EntityKind::Circulars);
        page.open_create();
        let out = page
            .submit(&mut svc, &mut cache, circular_form("Holiday"), today())
            .expect("submit");
        assert!(matches!(out, Submit::Saved(_)));
        assert_eq!(page.overlay, Overlay::None);
        assert!(!page.loading);
        assert_eq!(page.collection.len(), 1);
        assert_eq!(page.stats.as_ref().map(|s| s.total), Some(1));
        let notices = page.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Success);
        assert!(page.drain_notices().is_empty());
    }

    #[test]
    fn import_is_all_or_nothing_with_one_reload() {
        let (mut page, mut svc, mut cache) = session(EntityKind::Students);
        let version = cache.version(EntityKind::Students);

        let bad = crate::import::parse_csv(
            EntityKind::Students,
            "name,email,roll_number,cgpa
             Asha Nair,asha@college.edu,CS24001,8.1
             Ravi Menon,ravi-at-college,CS24002,11
             Meera Das,meera@college.edu,,7.5
",
        )
        .expect("parse");
        let Import::Rejected(problems) = page
            .import(&mut svc, &mut cache, bad, today())
            .expect("import")
        else {
            panic!("expected rejection");
        };
        assert_eq!(
            problems,
            vec![
                "Row 3: CGPA must be between 0 and 10".to_string(),
                "Row 3: Email must be a valid email address".to_string(),
                "Row 4: Roll number is required".to_string(),
            ]
        );
        assert!(page.collection.is_empty());
        assert!(svc.inner.list(EntityKind::Students, &ListCriteria::default()).expect("list").is_empty());
        assert_eq!(cache.version(EntityKind::Students), version);

        let good = crate::import::parse_csv(
            EntityKind::Students,
            "Name,Email,Roll Number
             Asha Nair,asha@college.edu,CS24001
             Ravi Menon,ravi@college.edu,CS24002
",
        )
        .expect("parse");
        let Import::Created(created) = page
            .import(&mut svc, &mut cache, good, today())
            .expect("import")
        else {
            panic!("expected created rows");
        };
        assert_eq!(created.len(), 2);
        assert_eq!(cache.version(EntityKind::Students), version + 1);
        assert_eq!(page.collection.len(), 2);
        assert_eq!(page.stats.as_ref().and_then(|s| s.by_status.get("active")), Some(&2));
        let notices = page.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "Student import complete: 2 created");
    }

    #[test]
    fn invalid_form_never_reaches_the_service() {
        let (mut page, mut svc, mut cache) = session(EntityKind::Circulars);
        svc.fail_writes = true;
        page.open_create();
        let mut form = circular_form("");
        form.insert("publish_date".into(), "2025-06-01".into());
        let out = page.submit(&mut svc, &mut cache, form, today()).expect("submit");
        let Submit::Invalid(errors) = out else {
            panic!("expected validation errors");
        };
        assert!(errors.contains_key("title"));
        assert!(errors.contains_key("publish_date"));
        assert_eq!(page.overlay, Overlay::Create);
        assert!(page.drain_notices().is_empty());
    }

    #[test]
    fn failed_write_keeps_form_open_without_reload() {
        let (mut page, mut svc, mut cache) = session(EntityKind::Circulars);
        let version = cache.version(EntityKind::Circulars);
        svc.fail_writes = true;
        page.open_create();
        let err = page
            .submit(&mut svc, &mut cache, circular_form("Holiday"), today())
            .expect_err("write fails");
        assert_eq!(err.code(), "bad_params");
        assert_eq!(page.overlay, Overlay::Create);
        assert!(page.banner.is_some());
        assert_eq!(cache.version(EntityKind::Circulars), version);
        assert_eq!(page.drain_notices()[0].level, NoticeLevel::Error);
    }

    #[test]
    fn delete_goes_through_even_when_file_cleanup_fails() {
        let (mut page, mut svc, mut cache) = session(EntityKind::Circulars);
        let mut form = circular_form("With file");
        form.insert("attachment_url".into(), "storage://circulars/abc-file.pdf".into());
        page.open_create();
        let Submit::Saved(saved) = page.submit(&mut svc, &mut cache, form, today()).expect("create") else {
            panic!("expected save");
        };

        let storage = FakeStorage {
            fail_deletes: true,
            ..Default::default()
        };
        page.request_delete(&saved.id).expect("request");
        assert!(matches!(
            page.overlay,
            Overlay::ConfirmDelete {
                pending: PendingAction::DeleteRecord { .. }
            }
        ));
        page.confirm(&mut svc, Some(&storage), &mut cache).expect("confirm");
        assert_eq!(
            storage.deleted.borrow().as_slice(),
            &["storage://circulars/abc-file.pdf".to_string()]
        );
        assert!(page.collection.iter().all(|r| r.id != saved.id));
        assert_eq!(page.overlay, Overlay::None);
    }

    #[test]
    fn cancel_leaves_record_and_confirm_without_pending_errors() {
        let (mut page, mut svc, mut cache) = session(EntityKind::Departments);
        page.open_create();
        let mut form = Payload::new();
        form.insert("name".into(), "Physics".into());
        form.insert("code".into(), "PHY".into());
        form.insert("status".into(), "active".into());
        page.submit(&mut svc, &mut cache, form, today()).expect("create");
        let id = page.collection[0].id.clone();

        page.request_delete(&id).expect("request");
        page.cancel_confirm();
        assert_eq!(page.overlay, Overlay::None);
        let storage = FakeStorage::default();
        assert!(matches!(
            page.confirm(&mut svc, Some(&storage), &mut cache),
            Err(PageError::NothingToConfirm)
        ));
        assert_eq!(page.collection.len(), 1);

        let toggled = page.toggle_status(&mut svc, &mut cache, &id).expect("toggle");
        assert_eq!(toggled.text("status"), Some("inactive"));
        assert_eq!(page.stats.as_ref().and_then(|s| s.by_status.get("inactive")), Some(&1));
    }

    #[test]
    fn switching_attachment_mode_drops_the_stored_file() {
        let (mut page, mut svc, mut cache) = session(EntityKind::Verifications);
        page.open_create();
        let mut form = Payload::new();
        form.insert("student_name".into(), "Ananya".into());
        form.insert("document_type".into(), "transcript".into());
        form.insert("document_url".into(), "storage://verification-documents/x.pdf".into());
        page.submit(&mut svc, &mut cache, form, today()).expect("create");
        let id = page.collection[0].id.clone();

        let storage = FakeStorage::default();
        page.request_switch_mode(&id, AttachmentMode::Link).expect("request");
        page.confirm(&mut svc, Some(&storage), &mut cache).expect("confirm");
        let rec = page.record(&id).expect("still there");
        assert!(rec.get("document_url").is_none());
        assert_eq!(rec.text("attachment_mode"), Some("link"));
        assert_eq!(storage.deleted.borrow().len(), 1);

        assert!(matches!(
            page.request_attachment_delete(&id),
            Err(PageError::UnknownRecord(_))
        ));
    }
}
