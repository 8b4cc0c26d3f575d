//! Whole-file JSON store guarded by an in-process lock and an OS file lock.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, error};

use crate::error::{ReminderError, Result};
use crate::store::types::StoreData;

/// JSON-file backed store for medicines and reminder history.
///
/// Writers hold the in-process lock and an exclusive advisory lock on a
/// sibling `<file>.lock` for the whole load-mutate-save, so separate
/// processes sharing one data file (e.g. a CLI edit while `run` is active)
/// never interleave their writes.
#[derive(Debug)]
pub struct MedicineStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl MedicineStore {
    /// Create a store backed by `path`. The file is not touched until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the advisory lock file next to the data file.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("med_data.json"));
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Load the whole store. A missing file yields empty data.
    ///
    /// Saves replace the file atomically, so readers need no file lock.
    ///
    /// # Errors
    ///
    /// [`ReminderError::Io`] if the file cannot be read,
    /// [`ReminderError::Format`] if it is not a valid store document.
    pub fn load(&self) -> Result<StoreData> {
        let _guard = self.guard();
        load_from_path(&self.path)
    }

    /// Overwrite the whole store.
    ///
    /// # Errors
    ///
    /// [`ReminderError::Io`] if the file cannot be locked or written.
    pub fn save(&self, data: &StoreData) -> Result<()> {
        self.exclusive(|| save_to_path(&self.path, data))
    }

    /// Load, apply `f`, and save, all under both locks.
    ///
    /// Nothing is written when `f` returns an error.
    ///
    /// # Errors
    ///
    /// Propagates lock/load/save failures and any error returned by `f`.
    pub fn update<T>(&self, f: impl FnOnce(&mut StoreData) -> Result<T>) -> Result<T> {
        self.exclusive(|| {
            let mut data = load_from_path(&self.path)?;
            let out = f(&mut data)?;
            save_to_path(&self.path, &data)?;
            Ok(out)
        })
    }

    fn exclusive<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self.guard();

        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        let mut file_lock = fd_lock::RwLock::new(file);
        let _held = file_lock.write()?;

        f()
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The lock protects no in-memory data, so a poisoned guard is still usable.
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load_from_path(path: &Path) -> Result<StoreData> {
    let bytes = match std::fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no store at {}, starting empty", path.display());
            return Ok(StoreData::default());
        }
        Err(e) => return Err(ReminderError::Io(e)),
    };

    serde_json::from_slice(&bytes)
        .map_err(|e| ReminderError::Format(format!("cannot parse {}: {e}", path.display())))
}

fn save_to_path(path: &Path, data: &StoreData) -> Result<()> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let json = serde_json::to_string_pretty(data)
        .map_err(|e| ReminderError::Format(format!("cannot serialize store: {e}")))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| {
        error!("cannot replace store {}: {}", path.display(), e.error);
        ReminderError::Io(e.error)
    })?;

    debug!(
        medicines = data.medicines.len(),
        history = data.history.len(),
        "saved store to {}",
        path.display()
    );
    Ok(())
}
