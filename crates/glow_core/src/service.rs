use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::instrument;

use crate::{
    calendar::{self, CalendarMonth, YearMonth},
    date::DayKey,
    error::{GlowError, StorageError},
    playback::{PlaybackController, TickScheduler},
    record::{CapturedImages, CheckInId, CheckInRecord, ViewMode},
    storage::{MemoryStorage, RecordStorage},
    store::{CheckInStore, LoadReport},
    streak::{StreakState, StreakSummary},
    timeline::{Timeline, TimelineCursor},
    tip::{self, TipSource},
};

pub const STORAGE_FULL_WARNING: &str = "Gallery is full! Oldest photos might not be saved.";
pub const STORAGE_ERROR_WARNING: &str =
    "Your latest change could not be saved and may be lost after a restart.";

/// Result of writing the collection back to storage after a change. The
/// in-memory change stands in every case.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved,
    Unchanged,
    Degraded(StorageError),
}

impl SaveOutcome {
    pub fn is_persisted(&self) -> bool {
        !matches!(self, SaveOutcome::Degraded(_))
    }

    pub fn warning(&self) -> Option<&'static str> {
        match self {
            SaveOutcome::Degraded(StorageError::Full { .. }) => Some(STORAGE_FULL_WARNING),
            SaveOutcome::Degraded(_) => Some(STORAGE_ERROR_WARNING),
            SaveOutcome::Saved | SaveOutcome::Unchanged => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub streak: StreakState,
    pub summary: StreakSummary,
    pub calendar: CalendarMonth,
    pub total_check_ins: usize,
}

pub struct CheckInService {
    store: CheckInStore,
    storage: Box<dyn RecordStorage>,
    tip_source: Option<Box<dyn TipSource>>,
    load_report: LoadReport,
    /// The stored blob could not be read and has not been copied aside yet.
    backup_pending: AtomicBool,
    timeline_cache: Mutex<Option<(u64, Arc<Timeline>)>>,
}

pub struct CheckInServiceBuilder {
    storage: Option<Box<dyn RecordStorage>>,
    tip_source: Option<Box<dyn TipSource>>,
}

impl CheckInServiceBuilder {
    pub fn new() -> Self {
        Self {
            storage: None,
            tip_source: None,
        }
    }

    pub fn with_storage(mut self, storage: Box<dyn RecordStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_tip_source(mut self, source: Box<dyn TipSource>) -> Self {
        self.tip_source = Some(source);
        self
    }

    pub fn build(self) -> Result<CheckInService, GlowError> {
        let storage = self
            .storage
            .unwrap_or_else(|| Box::new(MemoryStorage::new()));
        let (store, load_report) = match storage.load() {
            Ok(stored) => CheckInStore::from_stored(stored),
            Err(err) => {
                tracing::warn!(%err, "stored check-ins are unreadable, starting empty");
                let report = LoadReport {
                    unreadable: Some(err),
                    ..LoadReport::default()
                };
                (CheckInStore::new(), report)
            }
        };
        tracing::info!(
            loaded = load_report.loaded,
            rejected = load_report.rejected.len(),
            unreadable = load_report.unreadable.is_some(),
            "check-ins loaded"
        );
        Ok(CheckInService {
            store,
            storage,
            tip_source: self.tip_source,
            backup_pending: AtomicBool::new(load_report.unreadable.is_some()),
            load_report,
            timeline_cache: Mutex::new(None),
        })
    }
}

impl Default for CheckInServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckInService {
    pub fn builder() -> CheckInServiceBuilder {
        CheckInServiceBuilder::new()
    }

    pub fn store(&self) -> &CheckInStore {
        &self.store
    }

    pub fn records(&self) -> Vec<CheckInRecord> {
        self.store.snapshot()
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    /// Stores a fresh capture stamped with the current time.
    pub fn record_capture(
        &self,
        captured: CapturedImages,
        routine_id: Option<&str>,
    ) -> Result<(CheckInId, SaveOutcome), GlowError> {
        self.record_capture_at(captured, routine_id, Utc::now())
    }

    #[instrument(skip(self, captured))]
    pub fn record_capture_at(
        &self,
        captured: CapturedImages,
        routine_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(CheckInId, SaveOutcome), GlowError> {
        let id = self.next_id(at);
        let record = CheckInRecord::from_capture(id.clone(), at, captured, routine_id);
        let outcome = self.append(record)?;
        Ok((id, outcome))
    }

    pub fn append(&self, record: CheckInRecord) -> Result<SaveOutcome, GlowError> {
        let id = record.id().clone();
        self.store.append(record)?;
        tracing::info!(%id, total = self.store.len(), "check-in recorded");
        Ok(self.persist())
    }

    /// Deletes permanently; an unknown id leaves everything untouched.
    #[instrument(skip(self))]
    pub fn delete(&self, id: &CheckInId) -> SaveOutcome {
        match self.store.remove(id) {
            Some(_) => {
                tracing::info!(%id, total = self.store.len(), "check-in deleted");
                self.persist()
            }
            None => {
                tracing::debug!(%id, "delete requested for unknown check-in");
                SaveOutcome::Unchanged
            }
        }
    }

    pub fn completed_days<Tz: TimeZone>(&self, tz: &Tz) -> HashSet<DayKey> {
        self.store.completed_days(tz)
    }

    /// Streak and calendar for `month` (defaults to the month of `today`).
    pub fn progress<Tz: TimeZone>(
        &self,
        today: DayKey,
        month: Option<YearMonth>,
        tz: &Tz,
    ) -> ProgressSnapshot {
        let completed = self.completed_days(tz);
        let month = month.unwrap_or_else(|| YearMonth::containing(today));
        ProgressSnapshot {
            streak: StreakState::evaluate(&completed, today),
            summary: StreakSummary::evaluate(&completed, today),
            calendar: calendar::build_month(month, &completed, today),
            total_check_ins: self.store.len(),
        }
    }

    /// Sorted timeline, rebuilt whenever the store changed since the last call.
    pub fn timeline(&self) -> Arc<Timeline> {
        let mut cache = self.timeline_cache.lock();
        if let Some((version, timeline)) = cache.as_ref() {
            if *version == self.store.version() {
                return Arc::clone(timeline);
            }
        }
        let (version, records) = self.store.versioned_snapshot();
        let timeline = Arc::new(Timeline::new(records));
        tracing::debug!(version, len = timeline.len(), "timeline rebuilt");
        *cache = Some((version, Arc::clone(&timeline)));
        timeline
    }

    pub fn cursor(&self, view_mode: ViewMode) -> TimelineCursor {
        TimelineCursor::new(self.timeline(), view_mode)
    }

    pub fn playback<S: TickScheduler>(
        &self,
        view_mode: ViewMode,
        scheduler: S,
    ) -> PlaybackController<S> {
        PlaybackController::new(self.cursor(view_mode), scheduler)
    }

    pub fn daily_tip(&self) -> String {
        tip::resolve_tip(self.tip_source.as_deref())
    }
}

impl CheckInService {
    fn next_id(&self, at: DateTime<Utc>) -> CheckInId {
        let mut millis = at.timestamp_millis();
        loop {
            let candidate = CheckInId::new(millis.to_string());
            if !self.store.contains(&candidate) {
                return candidate;
            }
            millis += 1;
        }
    }

    fn persist(&self) -> SaveOutcome {
        if self.backup_pending.load(Ordering::Acquire) {
            if let Err(err) = self.storage.back_up() {
                tracing::warn!(%err, "unreadable check-ins not backed up, leaving them in place");
                return SaveOutcome::Degraded(err);
            }
            self.backup_pending.store(false, Ordering::Release);
        }
        let stored = self.store.to_stored();
        match self.storage.save(&stored) {
            Ok(()) => SaveOutcome::Saved,
            Err(err) => {
                tracing::warn!(%err, count = stored.len(), "check-ins kept in memory only");
                SaveOutcome::Degraded(err)
            }
        }
    }
}
