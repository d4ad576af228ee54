use crate::entities::EntityKind;
use crate::service::{ListCriteria, RecordService, ServiceResult};
use crate::view::Record;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub entity: EntityKind,
    pub scope: String,
}

impl QueryKey {
    pub fn new(entity: EntityKind, scope: impl Into<String>) -> Self {
        Self {
            entity,
            scope: scope.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub records: Vec<Record>,
    pub version: u64,
}

/// Collections keyed by query. Writes never patch an entry; they invalidate it
/// and the next read refetches the whole collection.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<QueryKey, CacheEntry>,
    versions: HashMap<EntityKind, u64>,
}

impl QueryCache {
    pub fn version(&self, entity: EntityKind) -> u64 {
        self.versions.get(&entity).copied().unwrap_or(0)
    }

    /// Cached collection for `key`, fetching it through `svc` when absent or stale.
    pub fn fetch(
        &mut self,
        key: QueryKey,
        svc: &dyn RecordService,
        criteria: &ListCriteria,
    ) -> ServiceResult<&CacheEntry> {
        let version = self.version(key.entity);
        let fresh = self
            .entries
            .get(&key)
            .map(|e| e.version == version)
            .unwrap_or(false);
        if !fresh {
            tracing::debug!(entity = key.entity.as_str(), scope = %key.scope, "cache miss, loading collection");
            let records = svc.list(key.entity, criteria)?;
            self.entries.insert(key.clone(), CacheEntry { records, version });
        }
        Ok(&self.entries[&key])
    }

    /// Drops every scope cached for `entity` and bumps its version.
    pub fn invalidate(&mut self, entity: EntityKind) {
        self.entries.retain(|k, _| k.entity != entity);
        *self.versions.entry(entity).or_insert(0) += 1;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        for v in self.versions.values_mut() {
            *v += 1;
        }
    }
}
