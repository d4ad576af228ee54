//! Record collection services. The page layer only sees the `RecordService`
//! trait; SQLite and in-memory collections sit behind it.

use crate::entities::{self, EntityKind};
use crate::view::{FieldValue, Record};
use rusqlite::{Connection, OptionalExtension};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0} has no status toggle")]
    NoStatusToggle(&'static str),

    #[error("{0} requires a workspace; select one first")]
    NoWorkspace(&'static str),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Database(_) => "db_query_failed",
            ServiceError::Serialization(_) => "bad_payload",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InvalidPayload(_) => "bad_params",
            ServiceError::NoStatusToggle(_) => "not_supported",
            ServiceError::NoWorkspace(_) => "no_workspace",
        }
    }
}

/// Narrowing applied by the service itself. Everything else is done client side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListCriteria {
    pub college_id: Option<String>,
}

impl ListCriteria {
    pub fn scope_key(&self) -> String {
        self.college_id.clone().unwrap_or_else(|| "*".to_string())
    }

    fn admits(&self, record: &Record) -> bool {
        match &self.college_id {
            None => true,
            Some(cid) => record.text("college_id") == Some(cid.as_str()),
        }
    }
}

pub type Payload = BTreeMap<String, FieldValue>;

pub trait RecordService {
    fn list(&self, kind: EntityKind, criteria: &ListCriteria) -> ServiceResult<Vec<Record>>;
    fn get(&self, kind: EntityKind, id: &str) -> ServiceResult<Record>;
    fn create(&mut self, kind: EntityKind, payload: Payload) -> ServiceResult<Record>;
    /// Merges `payload` into the stored fields. `Null` clears a field.
    fn update(&mut self, kind: EntityKind, id: &str, payload: Payload) -> ServiceResult<Record>;
    fn delete(&mut self, kind: EntityKind, id: &str) -> ServiceResult<()>;

    fn toggle_status(&mut self, kind: EntityKind, id: &str, current: &str) -> ServiceResult<Record> {
        let toggle = kind
            .status_toggle()
            .ok_or(ServiceError::NoStatusToggle(kind.as_str()))?;
        let mut patch = Payload::new();
        patch.insert(toggle.field.to_string(), FieldValue::from(toggle.next(current)));
        self.update(kind, id, patch)
    }
}

fn merge(fields: &mut BTreeMap<String, FieldValue>, payload: Payload) {
    for (k, v) in payload {
        if k == "id" {
            continue;
        }
        match v {
            FieldValue::Null => {
                fields.remove(&k);
            }
            v => {
                fields.insert(k, v);
            }
        }
    }
}

fn clean(payload: Payload) -> Payload {
    payload
        .into_iter()
        .filter(|(k, v)| k != "id" && *v != FieldValue::Null)
        .collect()
}

pub struct SqliteRecords<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteRecords<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn row_to_record(id: String, payload: String, created_at: String, updated_at: Option<String>) -> ServiceResult<Record> {
        let value: serde_json::Value = serde_json::from_str(&payload)?;
        let mut record = Record::from_json(&id, &value)?;
        record.fields.insert("created_at".into(), FieldValue::Text(created_at));
        if let Some(u) = updated_at {
            record.fields.insert("updated_at".into(), FieldValue::Text(u));
        }
        Ok(record)
    }

    fn write_payload(&self, id: &str, fields: &BTreeMap<String, FieldValue>) -> ServiceResult<()> {
        let mut stored = fields.clone();
        stored.remove("created_at");
        stored.remove("updated_at");
        let json = serde_json::to_string(&stored)?;
        self.conn.execute(
            "UPDATE records
             SET payload = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now')
             WHERE id = ?",
            (json, id),
        )?;
        Ok(())
    }
}

impl RecordService for SqliteRecords<'_> {
    fn list(&self, kind: EntityKind, criteria: &ListCriteria) -> ServiceResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, payload, created_at, updated_at
             FROM records
             WHERE entity = ?
             ORDER BY sort_order",
        )?;
        let rows = stmt
            .query_map([kind.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(rows.len());
        for (id, payload, created_at, updated_at) in rows {
            let record = Self::row_to_record(id, payload, created_at, updated_at)?;
            if criteria.admits(&record) {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn get(&self, kind: EntityKind, id: &str) -> ServiceResult<Record> {
        let row = self
            .conn
            .query_row(
                "SELECT id, payload, created_at, updated_at FROM records WHERE id = ? AND entity = ?",
                (id, kind.as_str()),
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, payload, created_at, updated_at)) = row else {
            return Err(ServiceError::NotFound(format!("{} {}", kind.label(), id)));
        };
        Self::row_to_record(id, payload, created_at, updated_at)
    }

    fn create(&mut self, kind: EntityKind, payload: Payload) -> ServiceResult<Record> {
        let id = Uuid::new_v4().to_string();
        let mut fields = clean(payload);
        fields.remove("created_at");
        fields.remove("updated_at");
        let json = serde_json::to_string(&fields)?;
        let sort_order: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM records WHERE entity = ?",
            [kind.as_str()],
            |r| r.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO records(id, entity, payload, sort_order, created_at)
             VALUES(?, ?, ?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
            (&id, kind.as_str(), json, sort_order),
        )?;
        self.get(kind, &id)
    }

    fn update(&mut self, kind: EntityKind, id: &str, payload: Payload) -> ServiceResult<Record> {
        let mut current = self.get(kind, id)?;
        merge(&mut current.fields, payload);
        self.write_payload(id, &current.fields)?;
        self.get(kind, id)
    }

    fn delete(&mut self, kind: EntityKind, id: &str) -> ServiceResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM records WHERE id = ? AND entity = ?",
            (id, kind.as_str()),
        )?;
        if changed == 0 {
            return Err(ServiceError::NotFound(format!("{} {}", kind.label(), id)));
        }
        Ok(())
    }
}

/// Process-local collections. Mutations only touch the in-memory arrays.
#[derive(Debug, Default)]
pub struct MemoryRecords {
    collections: HashMap<EntityKind, Vec<Record>>,
}

impl MemoryRecords {
    pub fn seeded() -> Self {
        let mut collections = HashMap::new();
        for kind in entities::ALL_KINDS {
            if kind.backing() == entities::Backing::Memory {
                collections.insert(kind, entities::seed(kind));
            }
        }
        Self { collections }
    }

    fn rows_mut(&mut self, kind: EntityKind) -> &mut Vec<Record> {
        self.collections.entry(kind).or_default()
    }
}

impl RecordService for MemoryRecords {
    fn list(&self, kind: EntityKind, criteria: &ListCriteria) -> ServiceResult<Vec<Record>> {
        Ok(self
            .collections
            .get(&kind)
            .map(|rows| rows.iter().filter(|r| criteria.admits(r)).cloned().collect())
            .unwrap_or_default())
    }

    fn get(&self, kind: EntityKind, id: &str) -> ServiceResult<Record> {
        self.collections
            .get(&kind)
            .and_then(|rows| rows.iter().find(|r| r.id == id))
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("{} {}", kind.label(), id)))
    }

    fn create(&mut self, kind: EntityKind, payload: Payload) -> ServiceResult<Record> {
        let mut record = Record::new(Uuid::new_v4().to_string());
        record.fields = clean(payload);
        self.rows_mut(kind).push(record.clone());
        Ok(record)
    }

    fn update(&mut self, kind: EntityKind, id: &str, payload: Payload) -> ServiceResult<Record> {
        let label = kind.label();
        let rows = self.rows_mut(kind);
        let Some(record) = rows.iter_mut().find(|r| r.id == id) else {
            return Err(ServiceError::NotFound(format!("{} {}", label, id)));
        };
        merge(&mut record.fields, payload);
        Ok(record.clone())
    }

    fn delete(&mut self, kind: EntityKind, id: &str) -> ServiceResult<()> {
        let label = kind.label();
        let rows = self.rows_mut(kind);
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(ServiceError::NotFound(format!("{} {}", label, id)));
        }
        Ok(())
    }
}

/// Routes each entity kind to the collection that backs it.
pub struct Backends<'a> {
    pub sqlite: Option<SqliteRecords<'a>>,
    pub memory: &'a mut MemoryRecords,
}

impl Backends<'_> {
    fn no_workspace(kind: EntityKind) -> ServiceError {
        ServiceError::NoWorkspace(kind.as_str())
    }
}

impl RecordService for Backends<'_> {
    fn list(&self, kind: EntityKind, criteria: &ListCriteria) -> ServiceResult<Vec<Record>> {
        match kind.backing() {
            entities::Backing::Memory => self.memory.list(kind, criteria),
            entities::Backing::Sqlite => match &self.sqlite {
                Some(s) => s.list(kind, criteria),
                None => Err(Self::no_workspace(kind)),
            },
        }
    }

    fn get(&self, kind: EntityKind, id: &str) -> ServiceResult<Record> {
        match kind.backing() {
            entities::Backing::Memory => self.memory.get(kind, id),
            entities::Backing::Sqlite => match &self.sqlite {
                Some(s) => s.get(kind, id),
                None => Err(Self::no_workspace(kind)),
            },
        }
    }

    fn create(&mut self, kind: EntityKind, payload: Payload) -> ServiceResult<Record> {
        match kind.backing() {
            entities::Backing::Memory => self.memory.create(kind, payload),
            entities::Backing::Sqlite => match &mut self.sqlite {
                Some(s) => s.create(kind, payload),
                None => Err(Self::no_workspace(kind)),
            },
        }
    }

    fn update(&mut self, kind: EntityKind, id: &str, payload: Payload) -> ServiceResult<Record> {
        match kind.backing() {
            entities::Backing::Memory => self.memory.update(kind, id, payload),
            entities::Backing::Sqlite => match &mut self.sqlite {
                Some(s) => s.update(kind, id, payload),
                None => Err(Self::no_workspace(kind)),
            },
        }
    }

    fn delete(&mut self, kind: EntityKind, id: &str) -> ServiceResult<()> {
        match kind.backing() {
            entities::Backing::Memory => self.memory.delete(kind, id),
            entities::Backing::Sqlite => match &mut self.sqlite {
                Some(s) => s.delete(kind, id),
                None => Err(Self::no_workspace(kind)),
            },
        }
    }
}
