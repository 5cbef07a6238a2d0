use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::StorageError;
use crate::record::StoredCheckIn;

/// Key-value blob store that keeps the whole check-in collection. Platform
/// adapters implement this; the full collection is written on every change.
pub trait RecordStorage: Send + Sync {
    fn load(&self) -> Result<Vec<StoredCheckIn>, StorageError>;
    fn save(&self, records: &[StoredCheckIn]) -> Result<(), StorageError>;

    /// Copies an unreadable blob aside so the next `save` does not destroy it.
    fn back_up(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

impl<T: RecordStorage + ?Sized> RecordStorage for Arc<T> {
    fn load(&self) -> Result<Vec<StoredCheckIn>, StorageError> {
        (**self).load()
    }

    fn save(&self, records: &[StoredCheckIn]) -> Result<(), StorageError> {
        (**self).save(records)
    }

    fn back_up(&self) -> Result<(), StorageError> {
        (**self).back_up()
    }
}

fn encode(records: &[StoredCheckIn], limit: Option<usize>) -> Result<Vec<u8>, StorageError> {
    let payload = serde_json::to_vec(records)?;
    if let Some(limit) = limit {
        if payload.len() > limit {
            return Err(StorageError::Full {
                needed: payload.len(),
                limit,
            });
        }
    }
    Ok(payload)
}

fn decode(raw: &[u8]) -> Result<Vec<StoredCheckIn>, StorageError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(raw)?)
}

/// Single JSON file holding the collection.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
    limit_bytes: Option<usize>,
}

impl JsonFileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            limit_bytes: None,
        }
    }

    pub fn with_limit(mut self, limit_bytes: usize) -> Self {
        self.limit_bytes = Some(limit_bytes);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where [`RecordStorage::back_up`] copies an unreadable file.
    pub fn backup_path(&self) -> PathBuf {
        self.sibling(".bak")
    }

    fn staging_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }
}

impl RecordStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<StoredCheckIn>, StorageError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no check-in file yet");
            return Ok(Vec::new());
        }
        let raw = fs::read(&self.path)?;
        decode(&raw)
    }

    fn save(&self, records: &[StoredCheckIn]) -> Result<(), StorageError> {
        let payload = encode(records, self.limit_bytes)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let staging = self.staging_path();
        fs::write(&staging, &payload)?;
        fs::rename(&staging, &self.path)?;
        tracing::debug!(
            path = %self.path.display(),
            bytes = payload.len(),
            count = records.len(),
            "persisted check-ins"
        );
        Ok(())
    }

    fn back_up(&self) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        let backup = self.backup_path();
        fs::copy(&self.path, &backup)?;
        tracing::info!(
            path = %self.path.display(),
            backup = %backup.display(),
            "kept a copy of the unreadable check-in file"
        );
        Ok(())
    }
}

/// In-process blob store with an optional quota.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blob: Mutex<Option<Vec<u8>>>,
    limit_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit_bytes: usize) -> Self {
        Self {
            blob: Mutex::new(None),
            limit_bytes: Some(limit_bytes),
        }
    }

    pub fn seeded(records: &[StoredCheckIn]) -> Result<Self, StorageError> {
        let storage = Self::new();
        storage.save(records)?;
        Ok(storage)
    }

    pub fn raw(&self) -> Option<String> {
        self.blob
            .lock()
            .as_ref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

impl RecordStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<StoredCheckIn>, StorageError> {
        match self.blob.lock().as_deref() {
            Some(raw) => decode(raw),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, records: &[StoredCheckIn]) -> Result<(), StorageError> {
        let payload = encode(records, self.limit_bytes)?;
        *self.blob.lock() = Some(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(id: &str) -> StoredCheckIn {
        StoredCheckIn {
            id: id.to_string(),
            date: "2024-05-01T08:00:00.000Z".to_string(),
            image_data: None,
            images: Some(crate::record::StoredImages {
                front: "data:front".to_string(),
                side: Some("data:side".to_string()),
            }),
            course_id: "zone".to_string(),
        }
    }

    #[test]
    fn file_storage_round_trips_and_creates_parents() {
        let temp = tempdir().expect("tempdir");
        let storage = JsonFileStorage::new(temp.path().join("nested").join("checkins.json"));
        assert!(storage.load().unwrap().is_empty());

        storage.save(&[sample("1"), sample("2")]).unwrap();
        let loaded = storage.load().unwrap();
        assert_eq!(loaded, vec![sample("1"), sample("2")]);
        assert!(!storage.staging_path().exists());
    }

    #[test]
    fn file_storage_rejects_oversized_payloads_without_touching_disk() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("checkins.json");
        let storage = JsonFileStorage::new(&path).with_limit(16);
        let err = storage.save(&[sample("1")]).unwrap_err();
        assert!(matches!(err, StorageError::Full { limit: 16, .. }));
        assert!(!path.exists());
    }

    #[test]
    fn empty_file_loads_as_empty_collection() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("checkins.json");
        fs::write(&path, "  \n").unwrap();
        assert!(JsonFileStorage::new(&path).load().unwrap().is_empty());
    }

    #[test]
    fn unreadable_file_is_copied_aside() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("checkins.json");
        fs::write(&path, "{not json").unwrap();
        let storage = JsonFileStorage::new(&path);
        assert!(matches!(storage.load(), Err(StorageError::Serialization(_))));

        storage.back_up().unwrap();
        assert_eq!(fs::read_to_string(storage.backup_path()).unwrap(), "{not json");
        assert_eq!(fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn memory_storage_enforces_quota_and_keeps_previous_blob() {
        let storage = MemoryStorage::with_limit(200);
        storage.save(&[sample("1")]).unwrap();
        let before = storage.raw();

        let many: Vec<StoredCheckIn> = (0..10).map(|i| sample(&i.to_string())).collect();
        assert!(matches!(
            storage.save(&many),
            Err(StorageError::Full { .. })
        ));
        assert_eq!(storage.raw(), before);
        assert_eq!(storage.load().unwrap().len(), 1);
    }
}
