//! Single-threaded cancellable timer queue over a virtual clock.
//!
//! Nothing here sleeps. The owner advances the clock with [`Scheduler::pop_due`]
//! and dispatches each fired timer itself, so a callback can never run while
//! another one is in flight and a cleared handle can never fire.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Which component a timer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum TimerKind {
    Reveal,
    CursorBlink,
}

/// Opaque handle returned by `set_timeout`/`set_interval`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// A timer that came due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub handle: TimerHandle,
    pub kind: TimerKind,
    pub at: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    handle: TimerHandle,
    kind: TimerKind,
    period: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    next_id: u64,
    // (deadline, insertion order) keeps ties in scheduling order
    queue: BTreeMap<(Duration, u64), Entry>,
    keys: HashMap<TimerHandle, (Duration, u64)>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time since the scheduler was created
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn set_timeout(&mut self, delay: Duration, kind: TimerKind) -> TimerHandle {
        self.insert(delay, kind, None)
    }

    /// Fires every `period` until cleared. A zero period is bumped to 1ms so
    /// the queue always makes progress.
    pub fn set_interval(&mut self, period: Duration, kind: TimerKind) -> TimerHandle {
        let period = period.max(Duration::from_millis(1));
        self.insert(period, kind, Some(period))
    }

    /// Cancel a timer. Returns whether it was still pending.
    pub fn clear(&mut self, handle: TimerHandle) -> bool {
        match self.keys.remove(&handle) {
            Some(key) => self.queue.remove(&key).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.keys.contains_key(&handle)
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to
    /// its deadline. Intervals are re-armed before they are returned.
    pub fn pop_due(&mut self, until: Duration) -> Option<Fired> {
        let (&key, _) = self.queue.iter().next()?;
        let (deadline, _) = key;
        if deadline > until {
            return None;
        }

        let entry = self.queue.remove(&key)?;
        self.keys.remove(&entry.handle);
        self.now = self.now.max(deadline);

        if let Some(period) = entry.period {
            let rearmed = (deadline + period, self.bump());
            self.queue.insert(rearmed, entry);
            self.keys.insert(entry.handle, rearmed);
        }

        Some(Fired {
            handle: entry.handle,
            kind: entry.kind,
            at: deadline,
        })
    }

    /// Move the clock forward once every due timer has been popped
    pub fn settle(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    fn insert(&mut self, delay: Duration, kind: TimerKind, period: Option<Duration>) -> TimerHandle {
        let handle = TimerHandle(self.bump());
        let key = (self.now + delay, handle.0);
        self.queue.insert(
            key,
            Entry {
                handle,
                kind,
                period,
            },
        );
        self.keys.insert(handle, key);
        handle
    }

    fn bump(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}
