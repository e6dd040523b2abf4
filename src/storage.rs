//! Local collaborators of the account flow: session values and the on-disk cache.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use serde::{Deserialize, Serialize};

pub const ACCESS_TOKEN: &str = "accessToken";
pub const REFRESH_TOKEN: &str = "refreshToken";

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Error with file '{path}'")]
    FileError {
        path: PathBuf,
        #[source]
        io_error: io::Error,
    },
    #[error("Malformed session file")]
    JsonError(#[from] serde_json::Error),
}

/// Named secret values such as the token pair.
pub trait CredentialStore {
    fn credential(&self, key: &str) -> Option<String>;
    fn set_credential(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// The persisted "needs re-auth" flag.
pub trait SessionFlags {
    fn needs_reauth(&self) -> bool;
    fn set_needs_reauth(&self, value: bool) -> Result<(), StorageError>;
}

/// Downloaded files plus the local store of routes and user data.
pub trait CacheStore {
    /// Remove every cached file. Returns whether everything was removed.
    fn clean_files(&self) -> bool;
    /// Wipe the local store, or only its routes when `routes_only` is set.
    fn wipe_store(&self, routes_only: bool) -> bool;
    /// Human readable size of all cached files.
    fn size_all_files(&self) -> String;
}

impl<T: CacheStore + ?Sized> CacheStore for Arc<T> {
    fn clean_files(&self) -> bool {
        self.as_ref().clean_files()
    }

    fn wipe_store(&self, routes_only: bool) -> bool {
        self.as_ref().wipe_store(routes_only)
    }

    fn size_all_files(&self) -> String {
        self.as_ref().size_all_files()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionData {
    #[serde(default)]
    credentials: BTreeMap<String, String>,
    #[serde(default)]
    show_auth: bool,
}

/// Session values kept in a single JSON file, rewritten on every change.
#[derive(Debug)]
pub struct JsonSessionStore {
    path: PathBuf,
    data: Mutex<SessionData>,
}

impl JsonSessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No session file at '{}', starting empty.", path.display());
                SessionData::default()
            }
            Err(io_error) => return Err(StorageError::FileError { path, io_error }),
        };
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Apply `change` and persist it. Memory only takes the change once the file is written.
    fn update(&self, change: impl FnOnce(&mut SessionData)) -> Result<(), StorageError> {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        let mut updated = data.clone();
        change(&mut updated);
        let json = serde_json::to_vec_pretty(&updated)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|io_error| StorageError::FileError {
                path: parent.to_path_buf(),
                io_error,
            })?;
        }
        fs::write(&self.path, json).map_err(|io_error| StorageError::FileError {
            path: self.path.clone(),
            io_error,
        })?;
        *data = updated;
        Ok(())
    }
}

impl CredentialStore for JsonSessionStore {
    fn credential(&self, key: &str) -> Option<String> {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.credentials.get(key).cloned()
    }

    fn set_credential(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|data| {
            data.credentials.insert(key.to_string(), value.to_string());
        })
    }
}

impl SessionFlags for JsonSessionStore {
    fn needs_reauth(&self) -> bool {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .show_auth
    }

    fn set_needs_reauth(&self, value: bool) -> Result<(), StorageError> {
        self.update(|data| data.show_auth = value)
    }
}

/// Cache on disk: `files/` holds downloads, `store/` the local database with its `routes/` part.
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    const FILES_DIR: &'static str = "files";
    const STORE_DIR: &'static str = "store";
    const ROUTES_DIR: &'static str = "routes";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn files_dir(&self) -> PathBuf {
        self.root.join(Self::FILES_DIR)
    }

    pub fn store_dir(&self) -> PathBuf {
        self.root.join(Self::STORE_DIR)
    }

    pub fn routes_dir(&self) -> PathBuf {
        self.store_dir().join(Self::ROUTES_DIR)
    }
}

impl CacheStore for FileCache {
    fn clean_files(&self) -> bool {
        match clear_dir(&self.files_dir()) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to clean '{}': {}", self.files_dir().display(), e);
                false
            }
        }
    }

    fn wipe_store(&self, routes_only: bool) -> bool {
        let dir = if routes_only {
            self.routes_dir()
        } else {
            self.store_dir()
        };
        match clear_dir(&dir) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to wipe '{}': {}", dir.display(), e);
                false
            }
        }
    }

    fn size_all_files(&self) -> String {
        let size = dir_size(&self.files_dir()).unwrap_or_else(|e| {
            log::debug!("Could not measure cache: {}", e);
            0
        });
        format_size(size)
    }
}

/// Remove the contents of `dir`, keeping the directory itself.
/// A missing directory is already clear.
fn clear_dir(dir: &Path) -> io::Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

fn dir_size(dir: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        total += if metadata.is_dir() {
            dir_size(&entry.path())?
        } else {
            metadata.len()
        };
    }
    Ok(total)
}

/// Decimal units, one fraction digit above a kilobyte.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1000 {
        return format!("{} bytes", bytes);
    }
    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Session kept in memory only.
#[derive(Default)]
pub struct MemorySession {
    credentials: Mutex<BTreeMap<String, String>>,
    needs_reauth: AtomicBool,
}

impl MemorySession {
    pub fn with_tokens(access_token: &str, refresh_token: &str) -> Self {
        let session = Self::default();
        {
            let mut credentials = session
                .credentials
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            credentials.insert(ACCESS_TOKEN.into(), access_token.into());
            credentials.insert(REFRESH_TOKEN.into(), refresh_token.into());
        }
        session
    }
}

impl CredentialStore for MemorySession {
    fn credential(&self, key: &str) -> Option<String> {
        self.credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_credential(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
        Ok(())
    }
}

impl SessionFlags for MemorySession {
    fn needs_reauth(&self) -> bool {
        self.needs_reauth.load(Ordering::SeqCst)
    }

    fn set_needs_reauth(&self, value: bool) -> Result<(), StorageError> {
        self.needs_reauth.store(value, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCall {
    CleanFiles,
    WipeStore { routes_only: bool },
}

/// Cache double that reports a fixed outcome and remembers what it was asked to do.
pub struct MemoryCache {
    clean_result: bool,
    size: String,
    calls: Mutex<Vec<CacheCall>>,
}

impl MemoryCache {
    pub fn new(clean_result: bool, size: &str) -> Self {
        Self {
            clean_result,
            size: size.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CacheCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: CacheCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl CacheStore for MemoryCache {
    fn clean_files(&self) -> bool {
        self.record(CacheCall::CleanFiles);
        self.clean_result
    }

    fn wipe_store(&self, routes_only: bool) -> bool {
        self.record(CacheCall::WipeStore { routes_only });
        true
    }

    fn size_all_files(&self) -> String {
        self.size.clone()
    }
}
