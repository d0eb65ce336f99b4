use std::borrow::Cow;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::{Paths, StoreConfig};

use super::StatusStore;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

const STATUS_FILE_NAME: &str = "status.bin";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lock acquisition timeout")]
    LockTimeout,
}

/// File-backed status store.
///
/// Writes go through a temporary sibling file and an atomic rename, so a
/// crash mid-write leaves the previous blob intact.
#[derive(Debug, Clone)]
pub struct FileStatusStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

impl FileStatusStore {
    pub fn new() -> Self {
        Self::with_path(Paths::state_dir().join(STATUS_FILE_NAME))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self::with_path_and_timeout(path, DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_path_and_timeout(path: PathBuf, lock_timeout: Duration) -> Self {
        let lock_path = sibling_path(&path, ".lock");
        Self {
            path,
            lock_path,
            lock_timeout,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        let path = config
            .path
            .clone()
            .unwrap_or_else(|| Paths::state_dir().join(STATUS_FILE_NAME));
        Self::with_path_and_timeout(path, Duration::from_millis(config.lock_timeout_ms))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored blob, surfacing any I/O or locking failure.
    ///
    /// A missing file is not an error and yields an empty blob.
    pub fn read_blob(&self) -> Result<Vec<u8>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let lock_file = self.open_lock_file()?;
        self.lock_shared_with_timeout(&lock_file)?;

        let mut file = File::open(&self.path)?;
        let mut blob = Vec::new();
        file.read_to_end(&mut blob)?;
        Ok(blob)
    }

    /// Atomically replaces the stored blob, surfacing any failure.
    pub fn write_blob(&self, blob: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_file = self.open_lock_file()?;
        self.lock_exclusive_with_timeout(&lock_file)?;

        let temp_path = sibling_path(&self.path, ".tmp");
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;

        temp_file.write_all(blob)?;
        temp_file.sync_all()?;

        self.apply_owner_permissions(&temp_path)?;

        fs::rename(&temp_path, &self.path)?;
        self.apply_owner_permissions(&self.path)?;

        info!(path = %self.path.display(), len = blob.len(), "Status persisted");
        Ok(())
    }

    fn open_lock_file(&self) -> Result<File, StoreError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;
        self.apply_owner_permissions(&self.lock_path)?;
        Ok(file)
    }

    fn lock_shared_with_timeout(&self, file: &File) -> Result<(), StoreError> {
        self.lock_with_timeout(|| fs2::FileExt::try_lock_shared(file))
    }

    fn lock_exclusive_with_timeout(&self, file: &File) -> Result<(), StoreError> {
        self.lock_with_timeout(|| fs2::FileExt::try_lock_exclusive(file))
    }

    fn lock_with_timeout<F>(&self, mut try_lock: F) -> Result<(), StoreError>
    where
        F: FnMut() -> std::io::Result<()>,
    {
        let start = Instant::now();
        loop {
            match try_lock() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() >= self.lock_timeout {
                        return Err(StoreError::LockTimeout);
                    }
                    sleep(Duration::from_millis(50));
                }
                Err(err) => return Err(StoreError::Io(err)),
            }
        }
    }

    fn apply_owner_permissions(&self, path: &Path) -> Result<(), StoreError> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
        #[cfg(not(unix))]
        let _ = path;
        Ok(())
    }
}

impl Default for FileStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusStore for FileStatusStore {
    fn read_status(&self) -> Cow<'_, [u8]> {
        match self.read_blob() {
            Ok(blob) => {
                debug!(path = %self.path.display(), len = blob.len(), "Status read");
                Cow::Owned(blob)
            }
            Err(err) => {
                warn!(
                    error = %err,
                    path = %self.path.display(),
                    "Failed to read status, starting fresh"
                );
                Cow::Owned(Vec::new())
            }
        }
    }

    fn store_status(&mut self, blob: &[u8]) {
        if let Err(err) = self.write_blob(blob) {
            warn!(error = %err, path = %self.path.display(), "Failed to persist status");
        }
    }
}

/// `status.bin` + `.lock` -> `status.bin.lock`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from(STATUS_FILE_NAME));
    name.push(suffix);
    path.with_file_name(name)
}
