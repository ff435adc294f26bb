use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::config::AnimationConfig;
use crate::page::{NodeId, Page};
use crate::scheduler::{Scheduler, TimerHandle, TimerKind};

/// Replayed on the display once the whole text is shown
pub const ENTRANCE_ANIMATION: &str = "fadeInUp 0.3s ease-out";

const CURSOR_ID: &str = "cursor";
const MAX_JITTER_MS: f64 = 50.0;

/// Sent to every subscriber when a run reveals its last character
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingComplete {
    pub text: String,
}

/// Mutable state of one run; zeroed by `reset`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypingSession {
    pub current_index: usize,
    /// Reserved for a backspace pass; never set
    pub is_deleting: bool,
    pub is_paused: bool,
    pub is_complete: bool,
    pub pending_timer: Option<TimerHandle>,
}

/// Reveals `text` into one display element, one character per step.
///
/// Steps are chained through the scheduler: each step schedules the next only
/// after rendering, so the session never owns more than one timer.
#[derive(Debug)]
pub struct TypingController {
    display: NodeId,
    text: String,
    // byte offset just past each char, so prefix(n) is text[..ends[n - 1]]
    ends: Vec<usize>,
    config: AnimationConfig,
    session: TypingSession,
    rng: StdRng,
    subscribers: Vec<Sender<TypingComplete>>,
}

impl TypingController {
    /// The display element must exist; callers check before constructing.
    pub fn new(display: NodeId, text: impl Into<String>, config: AnimationConfig) -> Self {
        Self::with_rng(display, text, config, StdRng::from_entropy())
    }

    pub fn with_rng(
        display: NodeId,
        text: impl Into<String>,
        config: AnimationConfig,
        rng: StdRng,
    ) -> Self {
        let text = text.into();
        let ends = text
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .collect();
        Self {
            display,
            text,
            ends,
            config,
            session: TypingSession::default(),
            rng,
            subscribers: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn session(&self) -> &TypingSession {
        &self.session
    }

    pub fn current_index(&self) -> usize {
        self.session.current_index
    }

    pub fn is_paused(&self) -> bool {
        self.session.is_paused
    }

    pub fn is_complete(&self) -> bool {
        self.session.is_complete
    }

    pub fn display(&self) -> NodeId {
        self.display
    }

    /// Length of the text in characters
    pub fn char_len(&self) -> usize {
        self.ends.len()
    }

    /// Receive a [`TypingComplete`] for every finished run
    pub fn subscribe(&mut self) -> Receiver<TypingComplete> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Clear the display (keeping the cursor child when enabled) and schedule
    /// the first reveal after the initial delay.
    pub fn start(&mut self, page: &mut Page, sched: &mut Scheduler) {
        self.cancel_pending(sched);

        page.set_text(self.display, "");
        if !self.config.show_cursor {
            let cursors: Vec<NodeId> = page
                .element(self.display)
                .children
                .iter()
                .copied()
                .filter(|c| page.element(*c).id.as_deref() == Some(CURSOR_ID))
                .collect();
            for cursor in cursors {
                page.remove_child(self.display, cursor);
            }
        }

        let handle = sched.set_timeout(self.config.initial_delay(), TimerKind::Reveal);
        self.session.pending_timer = Some(handle);
        debug!(
            delay_ms = self.config.initial_delay_ms,
            chars = self.char_len(),
            "typing scheduled"
        );
    }

    pub fn pause(&mut self, sched: &mut Scheduler) {
        self.session.is_paused = true;
        self.cancel_pending(sched);
        debug!(index = self.session.current_index, "typing paused");
    }

    /// Continue from the index the run was paused at, revealing the next
    /// character right away. Does nothing unless paused.
    pub fn resume(&mut self, page: &mut Page, sched: &mut Scheduler) {
        if !self.session.is_paused {
            return;
        }
        self.session.is_paused = false;
        debug!(index = self.session.current_index, "typing resumed");
        self.reveal(page, sched);
    }

    /// Back to index 0 with the initial delay, as if freshly constructed.
    /// The pending timer is cancelled first so a stale step can't write into
    /// the new run.
    pub fn reset(&mut self, page: &mut Page, sched: &mut Scheduler) {
        self.cancel_pending(sched);
        self.session = TypingSession::default();
        self.start(page, sched);
    }

    /// Dispatch a fired reveal timer. Returns false for a handle that is no
    /// longer the session's pending timer.
    pub fn on_timer(&mut self, handle: TimerHandle, page: &mut Page, sched: &mut Scheduler) -> bool {
        if self.session.pending_timer != Some(handle) {
            debug!(?handle, "ignoring stale reveal timer");
            return false;
        }
        self.session.pending_timer = None;
        self.reveal(page, sched);
        true
    }

    fn reveal(&mut self, page: &mut Page, sched: &mut Scheduler) {
        if self.session.is_paused || self.session.is_complete {
            return;
        }

        let len = self.char_len();
        if self.session.current_index < len {
            let end = self.ends[self.session.current_index];
            page.set_text(self.display, &self.text[..end]);
            self.session.current_index += 1;
        }

        if self.session.current_index < len {
            let delay = self.next_delay();
            trace!(index = self.session.current_index, ?delay, "next reveal");
            self.session.pending_timer = Some(sched.set_timeout(delay, TimerKind::Reveal));
        } else {
            self.complete(page);
        }
    }

    fn complete(&mut self, page: &mut Page) {
        self.session.is_complete = true;
        page.replay_animation(self.display, ENTRANCE_ANIMATION);

        let event = TypingComplete {
            text: self.text.clone(),
        };
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        info!(chars = self.char_len(), "typing complete");
    }

    fn next_delay(&mut self) -> Duration {
        let jitter_ms = self.rng.gen_range(0.0..MAX_JITTER_MS);
        self.config.type_speed() + Duration::from_secs_f64(jitter_ms / 1000.0)
    }

    fn cancel_pending(&mut self, sched: &mut Scheduler) {
        if let Some(handle) = self.session.pending_timer.take() {
            sched.clear(handle);
        }
    }
}
