use crate::db;
use crate::view::pager::DEFAULT_PAGE_SIZE;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

pub const LOG_ENV: &str = "COLLEGEADMIN_LOG";
const PAGE_SIZE_ENV: &str = "COLLEGEADMIN_PAGE_SIZE";
const MAX_UPLOAD_ENV: &str = "COLLEGEADMIN_MAX_UPLOAD_BYTES";

const PAGE_SIZE_KEY: &str = "view.page_size";
const MAX_UPLOAD_KEY: &str = "uploads.max_bytes";
const ALLOWED_TYPES_KEY: &str = "uploads.allowed_types";

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub page_size: usize,
    pub max_upload_bytes: u64,
    pub allowed_upload_types: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_upload_types: ["pdf", "doc", "docx", "png", "jpg", "jpeg", "xlsx", "csv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl Config {
    /// Built-in defaults overridden by environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Config::default();
        if let Some(n) = env_parse::<usize>(PAGE_SIZE_ENV).filter(|n| *n > 0) {
            cfg.page_size = n;
        }
        if let Some(n) = env_parse::<u64>(MAX_UPLOAD_ENV).filter(|n| *n > 0) {
            cfg.max_upload_bytes = n;
        }
        cfg
    }

    /// Applies per-workspace overrides stored in the settings table.
    /// Unreadable values are skipped.
    pub fn with_workspace(mut self, conn: &Connection) -> Self {
        if let Ok(Some(v)) = db::settings_get_json(conn, PAGE_SIZE_KEY) {
            if let Some(n) = v.as_u64().filter(|n| *n > 0) {
                self.page_size = n as usize;
            }
        }
        if let Ok(Some(v)) = db::settings_get_json(conn, MAX_UPLOAD_KEY) {
            if let Some(n) = v.as_u64().filter(|n| *n > 0) {
                self.max_upload_bytes = n;
            }
        }
        if let Ok(Some(v)) = db::settings_get_json(conn, ALLOWED_TYPES_KEY) {
            if let Ok(types) = serde_json::from_value::<Vec<String>>(v) {
                self.allowed_upload_types = types;
            }
        }
        self
    }

    /// Persists the overridable fields present in `patch` and applies them.
    pub fn update_workspace(&mut self, conn: &Connection, patch: &serde_json::Value) -> anyhow::Result<()> {
        if let Some(v) = patch.get("pageSize") {
            let n = v
                .as_u64()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow::anyhow!("pageSize must be a positive integer"))?;
            db::settings_set_json(conn, PAGE_SIZE_KEY, &serde_json::json!(n))?;
            self.page_size = n as usize;
        }
        if let Some(v) = patch.get("maxUploadBytes") {
            let n = v
                .as_u64()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow::anyhow!("maxUploadBytes must be a positive integer"))?;
            db::settings_set_json(conn, MAX_UPLOAD_KEY, &serde_json::json!(n))?;
            self.max_upload_bytes = n;
        }
        if let Some(v) = patch.get("allowedUploadTypes") {
            let types: Vec<String> = serde_json::from_value(v.clone())
                .map_err(|e| anyhow::anyhow!("allowedUploadTypes must be a list of strings: {e}"))?;
            db::settings_set_json(conn, ALLOWED_TYPES_KEY, &serde_json::json!(types))?;
            self.allowed_upload_types = types;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn workspace_overrides_survive_reopen() {
        let dir = std::env::temp_dir().join(format!(
            "collegeadmin-cfg-{}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        let conn = db::open_db(&dir).expect("open db");
        let mut cfg = Config::default();
        cfg.update_workspace(&conn, &serde_json::json!({ "pageSize": 10, "allowedUploadTypes": ["pdf"] }))
            .expect("update");
        assert_eq!(cfg.page_size, 10);
        assert!(cfg
            .update_workspace(&conn, &serde_json::json!({ "pageSize": 0 }))
            .is_err());

        let reloaded = Config::default().with_workspace(&conn);
        assert_eq!(reloaded.page_size, 10);
        assert_eq!(reloaded.allowed_upload_types, vec!["pdf".to_string()]);
        assert_eq!(reloaded.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }
}
