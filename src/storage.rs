//! Attachment storage. Files live under `<workspace>/storage/<folder>/` and are
//! addressed by `storage://<folder>/<key>` urls.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};

pub const URL_SCHEME: &str = "storage://";
const CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadOutcome {
    fn failed(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            url: None,
            error: Some(msg.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRules {
    pub max_size: u64,
    /// Extensions or MIME types. Empty allows everything.
    #[serde(default)]
    pub allowed_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
    pub mime: String,
}

impl FileMeta {
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let md = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("file")
            .to_string();
        let mime = mime_for(&name).to_string();
        Ok(Self {
            name,
            size: md.len(),
            mime,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    View,
    Download,
}

fn extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn mime_for(name: &str) -> &'static str {
    match extension(name).as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "csv" => "text/csv",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

pub trait FileStorage {
    fn upload(&self, src: &Path, folder: &str, on_progress: &mut dyn FnMut(u64, u64)) -> UploadOutcome;
    /// `false` when nothing was removed; callers treat that as a soft failure.
    fn delete(&self, url: &str) -> bool;
    fn validate(&self, meta: &FileMeta, rules: &FileRules) -> FileCheck;
    fn resolve_access_url(&self, url: &str, mode: AccessMode) -> Option<String>;
}

pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a storage url to a path under the root. Rejects anything escaping it.
    pub fn path_for(&self, url: &str) -> Option<PathBuf> {
        let rel = url.strip_prefix(URL_SCHEME)?;
        let rel = Path::new(rel);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(rel))
    }

    fn store(&self, src: &Path, folder: &str, on_progress: &mut dyn FnMut(u64, u64)) -> anyhow::Result<String> {
        let folder = sanitize(folder);
        let meta = FileMeta::from_path(src)?;
        let mut hasher = Sha256::new();
        hasher.update(folder.as_bytes());
        hasher.update(meta.name.as_bytes());
        hasher.update(uuid::Uuid::new_v4().as_bytes());
        let digest = hasher.finalize();
        let prefix: String = digest.iter().take(6).map(|b| format!("{:02x}", b)).collect();
        let key = format!("{}-{}", prefix, sanitize(&meta.name));

        let dir = self.root.join(&folder);
        std::fs::create_dir_all(&dir)?;
        let mut input = File::open(src)?;
        let mut out = File::create(dir.join(&key))?;
        let mut buf = vec![0u8; CHUNK];
        let mut done: u64 = 0;
        on_progress(0, meta.size);
        loop {
            let n = input.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])?;
            done += n as u64;
            on_progress(done, meta.size);
        }
        out.flush()?;
        Ok(format!("{}{}/{}", URL_SCHEME, folder, key))
    }
}

fn sanitize(raw: &str) -> String {
    let s: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let s = s.trim_matches('.').to_string();
    if s.is_empty() {
        "file".to_string()
    } else {
        s
    }
}

impl FileStorage for DiskStorage {
    fn upload(&self, src: &Path, folder: &str, on_progress: &mut dyn FnMut(u64, u64)) -> UploadOutcome {
        match self.store(src, folder, on_progress) {
            Ok(url) => {
                tracing::info!(%url, "stored upload");
                UploadOutcome {
                    success: true,
                    url: Some(url),
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(src = %src.display(), error = %e, "upload failed");
                UploadOutcome::failed(e.to_string())
            }
        }
    }

    fn delete(&self, url: &str) -> bool {
        let Some(path) = self.path_for(url) else {
            return false;
        };
        std::fs::remove_file(path).is_ok()
    }

    fn validate(&self, meta: &FileMeta, rules: &FileRules) -> FileCheck {
        if meta.size > rules.max_size {
            let mb = rules.max_size as f64 / (1024.0 * 1024.0);
            return FileCheck {
                valid: false,
                error: Some(format!("File size must be less than {:.1}MB", mb)),
            };
        }
        if !rules.allowed_types.is_empty() {
            let ext = extension(&meta.name);
            let ok = rules.allowed_types.iter().any(|t| {
                let t = t.trim().to_ascii_lowercase();
                t == meta.mime || t.trim_start_matches('.') == ext
            });
            if !ok {
                return FileCheck {
                    valid: false,
                    error: Some(format!(
                        "File type not allowed. Allowed types: {}",
                        rules.allowed_types.join(", ")
                    )),
                };
            }
        }
        FileCheck {
            valid: true,
            error: None,
        }
    }

    fn resolve_access_url(&self, url: &str, mode: AccessMode) -> Option<String> {
        if !url.starts_with(URL_SCHEME) {
            // External links are handed back untouched.
            return Some(url.to_string());
        }
        let path = self.path_for(url)?;
        let base = format!("file://{}", path.to_string_lossy());
        match mode {
            AccessMode::View => Some(base),
            AccessMode::Download => {
                let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("file");
                Some(format!("{}?download={}", base, name))
            }
        }
    }
}
