use std::time::Duration;

use crate::record::ViewMode;
use crate::timeline::TimelineCursor;

/// Fixed cadence of the timelapse.
pub const PLAYBACK_INTERVAL: Duration = Duration::from_millis(600);

/// Identifies one scheduled tick. A handle is only honoured while it is the
/// controller's pending tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

impl TickHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Host event loop hook. The host fires a scheduled tick by passing its handle
/// to [`PlaybackController::on_tick`] once `after` has elapsed.
pub trait TickScheduler {
    fn schedule(&mut self, after: Duration) -> TickHandle;
    fn cancel(&mut self, handle: TickHandle);
}

impl<T: TickScheduler + ?Sized> TickScheduler for &mut T {
    fn schedule(&mut self, after: Duration) -> TickHandle {
        (**self).schedule(after)
    }

    fn cancel(&mut self, handle: TickHandle) {
        (**self).cancel(handle)
    }
}

/// Single-slot scheduler for cooperative event loops: at most one tick is
/// outstanding at a time.
#[derive(Debug, Default)]
pub struct CooperativeScheduler {
    next_id: u64,
    pending: Option<(TickHandle, Duration)>,
}

impl CooperativeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<(TickHandle, Duration)> {
        self.pending
    }

    /// Removes and returns the outstanding tick so the host can deliver it.
    pub fn take_due(&mut self) -> Option<TickHandle> {
        self.pending.take().map(|(handle, _)| handle)
    }
}

impl TickScheduler for CooperativeScheduler {
    fn schedule(&mut self, after: Duration) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        if let Some((previous, _)) = self.pending.replace((handle, after)) {
            tracing::warn!(previous = previous.id(), "replacing an uncancelled tick");
        }
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        if matches!(self.pending, Some((pending, _)) if pending == handle) {
            self.pending = None;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing { pending: TickHandle },
}

/// Drives a [`TimelineCursor`] forward one check-in per tick. Leaving the
/// playing state always cancels the pending tick before anything else runs.
pub struct PlaybackController<S: TickScheduler> {
    cursor: TimelineCursor,
    scheduler: S,
    state: PlaybackState,
}

impl<S: TickScheduler> PlaybackController<S> {
    pub fn new(cursor: TimelineCursor, scheduler: S) -> Self {
        Self {
            cursor,
            scheduler,
            state: PlaybackState::Stopped,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing { .. })
    }

    pub fn cursor(&self) -> &TimelineCursor {
        &self.cursor
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn play(&mut self) {
        if self.is_playing() {
            return;
        }
        if self.cursor.len() <= 1 {
            tracing::debug!(len = self.cursor.len(), "nothing to play");
            return;
        }
        if self.cursor.is_at_end() {
            self.cursor.seek(0);
        }
        let pending = self.scheduler.schedule(PLAYBACK_INTERVAL);
        self.state = PlaybackState::Playing { pending };
        tracing::debug!(index = self.cursor.index(), "playback started");
    }

    pub fn pause(&mut self) {
        self.stop();
    }

    pub fn toggle(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Delivers a fired tick. Returns `false` for handles that were cancelled
    /// or superseded; those never touch the cursor.
    pub fn on_tick(&mut self, handle: TickHandle) -> bool {
        match self.state {
            PlaybackState::Playing { pending } if pending == handle => {}
            _ => {
                tracing::debug!(tick = handle.id(), "ignoring stale tick");
                return false;
            }
        }

        self.state = PlaybackState::Stopped;
        self.cursor.step_forward();
        if self.cursor.is_at_end() {
            tracing::debug!(index = self.cursor.index(), "playback reached the end");
        } else {
            let pending = self.scheduler.schedule(PLAYBACK_INTERVAL);
            self.state = PlaybackState::Playing { pending };
        }
        true
    }

    pub fn seek(&mut self, index: usize) -> usize {
        self.stop();
        self.cursor.seek(index)
    }

    pub fn step_forward(&mut self) -> bool {
        self.stop();
        self.cursor.step_forward()
    }

    pub fn step_back(&mut self) -> bool {
        self.stop();
        self.cursor.step_back()
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.cursor.set_view_mode(mode);
    }

    pub fn toggle_view_mode(&mut self) -> ViewMode {
        self.cursor.toggle_view_mode()
    }

    /// Tears the viewer down; no tick can apply afterwards.
    pub fn close(&mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let PlaybackState::Playing { pending } =
            std::mem::replace(&mut self.state, PlaybackState::Stopped)
        {
            self.scheduler.cancel(pending);
            tracing::debug!(index = self.cursor.index(), "playback stopped");
        }
    }
}

impl<S: TickScheduler> Drop for PlaybackController<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
