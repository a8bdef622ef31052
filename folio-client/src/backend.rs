//! Storage backends
//!
//! A session is mirrored into two backends: a durable key-value store that stays
//! on the client, and a cookie store that travels with every request. Both sit
//! behind [`StorageBackend`] so the session store does not care which concrete
//! storage it is talking to.

use folio_core::{storage_error, ErrorContext, FolioError, FolioResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// String key-value storage
pub trait StorageBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> FolioResult<()>;

    /// Removing an absent key is not an error
    fn remove(&self, key: &str) -> FolioResult<()>;
}

/// In-memory key-value store (for development and testing)
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> FolioResult<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> FolioResult<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Durable key-value store persisted as a single JSON object on disk
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileBackend {
    /// Open (or lazily create) the store at `path`.
    ///
    /// An unreadable or malformed file is treated as empty; it gets replaced on
    /// the next write.
    pub fn open<P: AsRef<Path>>(path: P) -> FolioResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                storage_error!(
                    format!("Failed to create {}: {}", parent.display(), e),
                    "file_backend",
                    e
                )
            })?;
        }

        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring malformed store file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Ignoring unreadable store file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        debug!("Opened file store at {}", path.display());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> FolioResult<()> {
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json).map_err(|e| FolioError::Storage {
            message: format!("Failed to write {}: {}", self.path.display(), e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("file_backend")
                .with_operation("persist")
                .with_suggestion("Check that the data directory is writable"),
        })
    }
}

impl StorageBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> FolioResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> FolioResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

/// Serialized form of one stored cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCookie {
    value: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

/// Client-side cookie jar.
///
/// Every cookie set through it shares the same max-age, so the token and user
/// cookies written together also expire together. [`CookieStore::header_value`]
/// renders the `Cookie` request header the route gate reads.
#[derive(Debug)]
pub struct CookieStore {
    cookies: RwLock<BTreeMap<String, StoredCookie>>,
    max_age: chrono::Duration,
    path: Option<PathBuf>,
}

impl CookieStore {
    pub fn in_memory(max_age_days: u32) -> Self {
        Self {
            cookies: RwLock::new(BTreeMap::new()),
            max_age: chrono::Duration::days(i64::from(max_age_days)),
            path: None,
        }
    }

    /// Cookie jar that writes through to a JSON file on every change
    pub fn persistent<P: AsRef<Path>>(path: P, max_age_days: u32) -> Self {
        let path = path.as_ref().to_path_buf();
        let cookies = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(cookies) => Some(cookies),
                Err(e) => {
                    warn!("Ignoring malformed cookie jar {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_default();

        Self {
            cookies: RwLock::new(cookies),
            max_age: chrono::Duration::days(i64::from(max_age_days)),
            path: Some(path),
        }
    }

    /// `Cookie` header for the live cookies, values percent-encoded
    pub fn header_value(&self) -> Option<String> {
        let now = chrono::Utc::now();
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        let pairs: Vec<String> = cookies
            .iter()
            .filter(|(_, cookie)| cookie.expires_at > now)
            .map(|(name, cookie)| format!("{}={}", name, urlencoding::encode(&cookie.value)))
            .collect();

        (!pairs.is_empty()).then(|| pairs.join("; "))
    }

    fn persist(&self, cookies: &BTreeMap<String, StoredCookie>) -> FolioResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(cookies)?;
        std::fs::write(path, json).map_err(|e| {
            storage_error!(
                format!("Failed to write cookie jar {}: {}", path.display(), e),
                "cookie_store",
                e
            )
        })
    }
}

impl StorageBackend for CookieStore {
    fn name(&self) -> &'static str {
        "cookie"
    }

    fn get(&self, key: &str) -> Option<String> {
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        cookies
            .get(key)
            .filter(|cookie| cookie.expires_at > chrono::Utc::now())
            .map(|cookie| cookie.value.clone())
    }

    fn set(&self, key: &str, value: &str) -> FolioResult<()> {
        let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
        cookies.insert(
            key.to_string(),
            StoredCookie {
                value: value.to_string(),
                expires_at: chrono::Utc::now() + self.max_age,
            },
        );
        self.persist(&cookies)
    }

    fn remove(&self, key: &str) -> FolioResult<()> {
        let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
        if cookies.remove(key).is_some() {
            self.persist(&cookies)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_basic_ops() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("k"), None);

        backend.set("k", "v").unwrap();
        assert_eq!(backend.get("k").as_deref(), Some("v"));

        backend.remove("k").unwrap();
        backend.remove("k").unwrap();
        assert_eq!(backend.get("k"), None);
    }

    #[test]
    fn test_memory_backend_clones_share_entries() {
        let backend = MemoryBackend::new();
        let other = backend.clone();
        backend.set("k", "v").unwrap();
        assert_eq!(other.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_file_backend_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = FileBackend::open(&path).unwrap();
        store.set("user", r#"{"id":1}"#).unwrap();
        drop(store);

        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.get("user").as_deref(), Some(r#"{"id":1}"#));
    }

    #[test]
    fn test_file_backend_treats_malformed_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{{{").unwrap();

        let store = FileBackend::open(&path).unwrap();
        assert_eq!(store.get("user"), None);
        store.set("user", "x").unwrap();
        assert_eq!(FileBackend::open(&path).unwrap().get("user").as_deref(), Some("x"));
    }

    #[test]
    fn test_cookie_header_encodes_values() {
        let jar = CookieStore::in_memory(7);
        jar.set("token", "abc").unwrap();
        jar.set("user", r#"{"id":1,"username":"a b"}"#).unwrap();

        let header = jar.header_value().unwrap();
        assert!(header.starts_with("token=abc; user="));
        assert!(!header.contains('"'));
        assert!(!header[header.find("user=").unwrap()..].contains(' '));
    }

    #[test]
    fn test_expired_cookies_are_invisible() {
        let jar = CookieStore::in_memory(0);
        jar.set("token", "abc").unwrap();
        assert_eq!(jar.get("token"), None);
        assert_eq!(jar.header_value(), None);
    }

    #[test]
    fn test_persistent_cookie_jar_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        let jar = CookieStore::persistent(&path, 7);
        jar.set("token", "abc").unwrap();

        let reloaded = CookieStore::persistent(&path, 7);
        assert_eq!(reloaded.get("token").as_deref(), Some("abc"));
        reloaded.remove("token").unwrap();
        assert_eq!(CookieStore::persistent(&path, 7).get("token"), None);
    }
}
