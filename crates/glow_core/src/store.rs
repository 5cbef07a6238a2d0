use std::collections::HashSet;

use chrono::TimeZone;
use parking_lot::RwLock;

use crate::date::DayKey;
use crate::error::{GlowError, StorageError};
use crate::record::{CheckInId, CheckInRecord, StoredCheckIn};

/// Outcome of turning a persisted blob into records.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub rejected: Vec<GlowError>,
    /// Set when the blob itself could not be read; the store then starts empty.
    pub unreadable: Option<StorageError>,
}

#[derive(Debug, Default)]
struct StoreState {
    records: Vec<CheckInRecord>,
    /// Entries rejected at load, written back untouched on every save.
    retained: Vec<StoredCheckIn>,
    version: u64,
}

/// Live check-in collection, most recent first. Every mutation bumps
/// [`CheckInStore::version`] so derived views can tell when they are stale.
#[derive(Debug, Default)]
pub struct CheckInStore {
    state: RwLock<StoreState>,
}

impl CheckInStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_stored(stored: Vec<StoredCheckIn>) -> (Self, LoadReport) {
        let mut report = LoadReport::default();
        let mut records: Vec<CheckInRecord> = Vec::with_capacity(stored.len());
        let mut retained = Vec::new();
        let mut seen: HashSet<CheckInId> = HashSet::new();

        for entry in stored {
            match CheckInRecord::try_from(entry.clone()) {
                Ok(record) => {
                    if !seen.insert(record.id().clone()) {
                        tracing::warn!(id = %record.id(), "skipping duplicate check-in");
                        report.rejected.push(GlowError::DuplicateId(record.id().clone()));
                        retained.push(entry);
                        continue;
                    }
                    records.push(record);
                }
                Err(err) => {
                    tracing::warn!(%err, "skipping invalid check-in");
                    report.rejected.push(err);
                    retained.push(entry);
                }
            }
        }

        report.loaded = records.len();
        let store = Self {
            state: RwLock::new(StoreState {
                records,
                retained,
                version: 0,
            }),
        };
        (store, report)
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Copy of the current records, safe to sort or iterate while the store
    /// keeps changing.
    pub fn snapshot(&self) -> Vec<CheckInRecord> {
        self.state.read().records.clone()
    }

    /// Records together with the version they were read at.
    pub fn versioned_snapshot(&self) -> (u64, Vec<CheckInRecord>) {
        let state = self.state.read();
        (state.version, state.records.clone())
    }

    pub fn contains(&self, id: &CheckInId) -> bool {
        self.state.read().records.iter().any(|record| record.id() == id)
    }

    pub fn get(&self, id: &CheckInId) -> Option<CheckInRecord> {
        self.state
            .read()
            .records
            .iter()
            .find(|record| record.id() == id)
            .cloned()
    }

    pub fn append(&self, record: CheckInRecord) -> Result<(), GlowError> {
        let mut state = self.state.write();
        if state.records.iter().any(|existing| existing.id() == record.id()) {
            return Err(GlowError::DuplicateId(record.id().clone()));
        }
        tracing::debug!(id = %record.id(), date = %record.date(), "appending check-in");
        state.records.insert(0, record);
        state.version += 1;
        Ok(())
    }

    pub fn remove(&self, id: &CheckInId) -> Option<CheckInRecord> {
        let mut state = self.state.write();
        let position = state.records.iter().position(|record| record.id() == id)?;
        let removed = state.records.remove(position);
        state.version += 1;
        tracing::debug!(%id, "removed check-in");
        Some(removed)
    }

    pub fn completed_days<Tz: TimeZone>(&self, tz: &Tz) -> HashSet<DayKey> {
        self.state
            .read()
            .records
            .iter()
            .map(|record| DayKey::in_zone(record.date(), tz))
            .collect()
    }

    /// Stored entries that could not be loaded as records.
    pub fn retained(&self) -> Vec<StoredCheckIn> {
        self.state.read().retained.clone()
    }

    /// Persisted form of the collection: live records in display order, then
    /// the retained entries exactly as they were read.
    pub fn to_stored(&self) -> Vec<StoredCheckIn> {
        let state = self.state.read();
        state
            .records
            .iter()
            .map(StoredCheckIn::from)
            .chain(state.retained.iter().cloned())
            .collect()
    }
}
