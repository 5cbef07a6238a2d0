use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::record::{has_side, image_for, CheckInRecord, ImagePayload, ViewMode};

/// Check-ins ordered oldest to newest for before/after playback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    records: Vec<CheckInRecord>,
}

impl Timeline {
    /// Stable sort by date: check-ins with equal timestamps keep input order.
    pub fn new(mut records: Vec<CheckInRecord>) -> Self {
        records.sort_by_key(CheckInRecord::date);
        Self { records }
    }

    pub fn records(&self) -> &[CheckInRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&CheckInRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.records.len().saturating_sub(1)
    }
}

/// What a viewer renders for the cursor position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    pub index: usize,
    pub total: usize,
    pub date: DateTime<Utc>,
    pub image: Option<&'a ImagePayload>,
    /// Side view requested but this check-in has none.
    pub missing_side: bool,
}

/// Index-based navigation over a timeline. Every index it holds is clamped to
/// the valid range; out-of-range requests never fail.
#[derive(Debug, Clone)]
pub struct TimelineCursor {
    timeline: Arc<Timeline>,
    index: usize,
    view_mode: ViewMode,
}

impl TimelineCursor {
    pub fn new(timeline: Arc<Timeline>, view_mode: ViewMode) -> Self {
        Self {
            timeline,
            index: 0,
            view_mode,
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn toggle_view_mode(&mut self) -> ViewMode {
        self.view_mode = self.view_mode.toggle();
        self.view_mode
    }

    pub fn seek(&mut self, index: usize) -> usize {
        self.index = index.min(self.timeline.last_index());
        self.index
    }

    /// Returns whether the cursor moved.
    pub fn step_forward(&mut self) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.index += 1;
        true
    }

    pub fn step_back(&mut self) -> bool {
        if self.is_at_start() {
            return false;
        }
        self.index -= 1;
        true
    }

    pub fn is_at_start(&self) -> bool {
        self.index == 0
    }

    pub fn is_at_end(&self) -> bool {
        self.index >= self.timeline.last_index()
    }

    /// One-based position and total, e.g. `(3, 12)` for "3 / 12".
    pub fn position(&self) -> (usize, usize) {
        if self.is_empty() {
            (0, 0)
        } else {
            (self.index + 1, self.len())
        }
    }

    pub fn current(&self) -> Option<&CheckInRecord> {
        self.timeline.get(self.index)
    }

    pub fn current_image(&self) -> Option<&ImagePayload> {
        self.current()
            .and_then(|record| image_for(record, self.view_mode))
    }

    pub fn current_has_side(&self) -> bool {
        self.current().map(has_side).unwrap_or(false)
    }

    pub fn frame(&self) -> Option<Frame<'_>> {
        let record = self.current()?;
        Some(Frame {
            index: self.index,
            total: self.len(),
            date: record.date(),
            image: image_for(record, self.view_mode),
            missing_side: self.view_mode == ViewMode::Side && !has_side(record),
        })
    }
}
