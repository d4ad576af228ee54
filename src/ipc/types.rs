use std::collections::HashMap;
use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::cache::QueryCache;
use crate::config::Config;
use crate::entities::EntityKind;
use crate::page::PageSession;
use crate::service::MemoryRecords;
use crate::storage::DiskStorage;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub memory: MemoryRecords,
    pub cache: QueryCache,
    pub storage: Option<DiskStorage>,
    pub config: Config,
    pub pages: HashMap<EntityKind, PageSession>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            workspace: None,
            db: None,
            memory: MemoryRecords::seeded(),
            cache: QueryCache::default(),
            storage: None,
            config,
            pages: HashMap::new(),
        }
    }
}
