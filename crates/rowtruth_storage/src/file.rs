//! File-based payload store for persistent storage.

use crate::error::{StorageError, StorageResult};
use crate::location::PayloadLocation;
use crate::store::PayloadStore;
use std::fs;
use std::path::{Path, PathBuf};

/// A file-based payload store.
///
/// Each payload is written to its own file under a root directory, laid out
/// as `<root>/<table_id>/<uuid>`. Data survives process restarts.
///
/// # Durability
///
/// Writes go through a temporary file and an atomic rename, so a payload is
/// either fully present or absent - never truncated.
///
/// # Thread Safety
///
/// This store is thread-safe; location keys never collide, so concurrent
/// writes touch distinct files.
///
/// # Example
///
/// ```no_run
/// use rowtruth_storage::{PayloadStore, FilePayloadStore};
/// use std::path::Path;
///
/// let store = FilePayloadStore::open(Path::new("/var/lib/rowtruth")).unwrap();
/// let location = store.write(7, b"persistent payload").unwrap();
/// ```
#[derive(Debug)]
pub struct FilePayloadStore {
    root: PathBuf,
}

impl FilePayloadStore {
    /// Opens a store rooted at the given directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: &Path) -> StorageResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Returns the root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, location: &PayloadLocation) -> PathBuf {
        self.root.join(location.as_key())
    }
}

impl PayloadStore for FilePayloadStore {
    fn write(&self, table_id: u64, data: &[u8]) -> StorageResult<PayloadLocation> {
        let location = PayloadLocation::mint(table_id);
        let path = self.path_for(&location);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write-then-rename keeps a crashed write from leaving a partial payload.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;

        Ok(location)
    }

    fn read(&self, location: &PayloadLocation) -> StorageResult<Vec<u8>> {
        let path = self.path_for(location);
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::location_not_found(location.as_key()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete_table(&self, table_id: u64) -> StorageResult<()> {
        let table_dir = self.root.join(table_id.to_string());
        match fs::remove_dir_all(&table_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
