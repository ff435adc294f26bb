use std::time::Duration;
use tracing::debug;

use crate::page::{NodeId, Page};
use crate::scheduler::{Scheduler, TimerHandle, TimerKind};

/// Offset from the stylesheet's own blink period so the two never line up
pub const BLINK_INTERVAL: Duration = Duration::from_millis(530);

#[derive(Debug, Clone, PartialEq)]
pub struct CursorState {
    pub is_visible: bool,
    pub blink_timer: Option<TimerHandle>,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            is_visible: true,
            blink_timer: None,
        }
    }
}

/// Blinks a cursor glyph by toggling its opacity.
///
/// Without a cursor element every method is a no-op.
#[derive(Debug)]
pub struct CursorBlinker {
    cursor: Option<NodeId>,
    state: CursorState,
    toggles: u64,
}

impl CursorBlinker {
    pub fn new(cursor: Option<NodeId>) -> Self {
        Self {
            cursor,
            state: CursorState::default(),
            toggles: 0,
        }
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    pub fn is_blinking(&self) -> bool {
        self.state.blink_timer.is_some()
    }

    /// Total opacity flips since construction
    pub fn toggles(&self) -> u64 {
        self.toggles
    }

    /// Start blinking unless the page is already hidden
    pub fn init(&mut self, page: &mut Page, sched: &mut Scheduler) {
        if self.cursor.is_none() {
            return;
        }
        if page.hidden {
            self.stop(page, sched);
        } else {
            self.start(page, sched);
        }
    }

    /// (Re)start the interval from a visible cursor
    pub fn start(&mut self, page: &mut Page, sched: &mut Scheduler) {
        let Some(cursor) = self.cursor else {
            return;
        };
        if let Some(handle) = self.state.blink_timer.take() {
            sched.clear(handle);
        }
        self.state.is_visible = true;
        page.set_style(cursor, "opacity", "1");
        self.state.blink_timer = Some(sched.set_interval(BLINK_INTERVAL, TimerKind::CursorBlink));
    }

    /// Clear the interval and leave the cursor fully opaque
    pub fn stop(&mut self, page: &mut Page, sched: &mut Scheduler) {
        let Some(cursor) = self.cursor else {
            return;
        };
        if let Some(handle) = self.state.blink_timer.take() {
            sched.clear(handle);
        }
        self.state.is_visible = true;
        page.set_style(cursor, "opacity", "1");
    }

    pub fn on_visibility_change(&mut self, hidden: bool, page: &mut Page, sched: &mut Scheduler) {
        if self.cursor.is_none() {
            return;
        }
        debug!(hidden, "cursor blink following page visibility");
        if hidden {
            self.stop(page, sched);
        } else {
            self.start(page, sched);
        }
    }

    /// Returns false for a handle this blinker does not own
    pub fn on_timer(&mut self, handle: TimerHandle, page: &mut Page) -> bool {
        let Some(cursor) = self.cursor else {
            return false;
        };
        if self.state.blink_timer != Some(handle) {
            return false;
        }
        self.state.is_visible = !self.state.is_visible;
        page.set_style(cursor, "opacity", if self.state.is_visible { "1" } else { "0" });
        self.toggles += 1;
        true
    }

    pub fn hide(&self, page: &mut Page) {
        if let Some(cursor) = self.cursor {
            page.set_style(cursor, "display", "none");
        }
    }

    pub fn show(&self, page: &mut Page) {
        if let Some(cursor) = self.cursor {
            page.set_style(cursor, "display", "inline-block");
        }
    }
}
