//! Application context: owns the page, the scheduler and every component,
//! and routes page events and fired timers to them.

use rand::{rngs::StdRng, SeedableRng};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::a11y::AccessibilityEnhancer;
use crate::config::{AnimationConfig, AnimationOverrides};
use crate::cursor::CursorBlinker;
use crate::error::{Result, TypistError};
use crate::page::{Key, NodeId, Page, PageEvent, ReadyState};
use crate::scheduler::{Fired, Scheduler, TimerKind};
use crate::timing::TimingMonitor;
use crate::typing::{TypingComplete, TypingController};

pub const TYPING_TEXT: &str = "i aint doing all that 😭🙏";
pub const DISPLAY_ID: &str = "typedText";
pub const CURSOR_ID: &str = "cursor";
pub const CONTAINER_CLASS: &str = "typing-container";
pub const RESTART_TITLE: &str = "Click to restart typing animation";

/// What the app did with a page event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored,
    Handled,
    /// Handled, and the host should skip its default action
    DefaultPrevented,
}

#[derive(Debug)]
struct Widget {
    typing: TypingController,
    cursor: CursorBlinker,
    completions: Receiver<TypingComplete>,
}

#[derive(Debug)]
pub struct App {
    page: Page,
    sched: Scheduler,
    text: String,
    overrides: AnimationOverrides,
    rng: Option<StdRng>,
    monitor: TimingMonitor,
    a11y: Option<AccessibilityEnhancer>,
    widget: Option<Widget>,
    container: Option<NodeId>,
    listeners: Vec<Sender<TypingComplete>>,
    error_handlers: bool,
    set_up: bool,
}

impl App {
    /// Create the app for `page`. Wiring happens now if the page is past
    /// loading, otherwise on [`PageEvent::DomContentLoaded`].
    pub fn new(page: Page, text: impl Into<String>, overrides: AnimationOverrides) -> Self {
        Self::build(page, text.into(), overrides, None)
    }

    /// Same as [`App::new`] with a fixed jitter source
    pub fn with_rng(
        page: Page,
        text: impl Into<String>,
        overrides: AnimationOverrides,
        rng: StdRng,
    ) -> Self {
        Self::build(page, text.into(), overrides, Some(rng))
    }

    fn build(page: Page, text: String, overrides: AnimationOverrides, rng: Option<StdRng>) -> Self {
        let sched = Scheduler::new();
        let monitor = TimingMonitor::new(&page, sched.now());
        let mut app = Self {
            page,
            sched,
            text,
            overrides,
            rng,
            monitor,
            a11y: None,
            widget: None,
            container: None,
            listeners: Vec::new(),
            error_handlers: false,
            set_up: false,
        };

        if app.page.ready_state == ReadyState::Loading {
            debug!("page still loading, deferring setup");
        } else {
            app.setup();
        }
        app
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn now(&self) -> Duration {
        self.sched.now()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.sched.next_deadline()
    }

    pub fn is_set_up(&self) -> bool {
        self.set_up
    }

    pub fn typing(&self) -> Option<&TypingController> {
        self.widget.as_ref().map(|w| &w.typing)
    }

    pub fn cursor(&self) -> Option<&CursorBlinker> {
        self.widget.as_ref().map(|w| &w.cursor)
    }

    pub fn monitor(&self) -> &TimingMonitor {
        &self.monitor
    }

    pub fn accessibility(&self) -> Option<&AccessibilityEnhancer> {
        self.a11y.as_ref()
    }

    /// The element clicks restart on, once wired
    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    /// Completion notifications for every finished run
    pub fn subscribe_completion(&mut self) -> Receiver<TypingComplete> {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        rx
    }

    fn setup(&mut self) {
        self.set_up = true;

        let mut a11y = AccessibilityEnhancer::new();
        a11y.init(&mut self.page);
        self.a11y = Some(a11y);

        if let Err(err) = self.setup_widget() {
            error!("{err}; typing animation disabled");
            return;
        }

        self.monitor.mark_typing_start(self.sched.now());
        self.install_error_handlers();
        self.setup_interactions();
        info!(chars = self.text.chars().count(), "typing widget ready");
    }

    fn setup_widget(&mut self) -> Result<()> {
        let display = self
            .page
            .get_element_by_id(DISPLAY_ID)
            .ok_or(TypistError::MissingElement(DISPLAY_ID))?;
        let cursor_el = self.page.get_element_by_id(CURSOR_ID);

        let mut cursor = CursorBlinker::new(cursor_el);
        cursor.init(&mut self.page, &mut self.sched);

        let config = AnimationConfig::merged(&self.overrides);
        let rng = self.rng.take().unwrap_or_else(StdRng::from_entropy);
        let mut typing = TypingController::with_rng(display, self.text.clone(), config, rng);
        let completions = typing.subscribe();
        typing.start(&mut self.page, &mut self.sched);

        self.widget = Some(Widget {
            typing,
            cursor,
            completions,
        });
        Ok(())
    }

    fn install_error_handlers(&mut self) {
        self.error_handlers = true;
    }

    fn setup_interactions(&mut self) {
        if let Some(container) = self.page.query_class(CONTAINER_CLASS) {
            self.page.set_style(container, "cursor", "pointer");
            self.page.set_title(container, RESTART_TITLE);
            self.container = Some(container);
        }
    }

    /// Restart the run from the first character
    pub fn restart(&mut self) {
        let Some(widget) = self.widget.as_mut() else {
            return;
        };
        widget.typing.reset(&mut self.page, &mut self.sched);
        self.monitor.mark_typing_start(self.sched.now());
        debug!("typing restarted");
    }

    /// Pause a running animation or resume a paused one
    pub fn toggle_pause(&mut self) {
        let Some(widget) = self.widget.as_mut() else {
            return;
        };
        if widget.typing.is_paused() {
            widget.typing.resume(&mut self.page, &mut self.sched);
        } else {
            widget.typing.pause(&mut self.sched);
        }
        self.drain_completions();
    }

    pub fn handle_event(&mut self, event: PageEvent) -> EventOutcome {
        match event {
            PageEvent::DomContentLoaded => {
                if self.page.ready_state == ReadyState::Loading {
                    self.page.ready_state = ReadyState::Interactive;
                }
                self.monitor.on_dom_ready(self.sched.now());
                if !self.set_up {
                    self.setup();
                }
                EventOutcome::Handled
            }
            PageEvent::VisibilityChange { hidden } => {
                self.page.hidden = hidden;
                if let Some(widget) = self.widget.as_mut() {
                    widget
                        .cursor
                        .on_visibility_change(hidden, &mut self.page, &mut self.sched);
                }
                EventOutcome::Handled
            }
            PageEvent::ReducedMotionChange { matches } => {
                self.page.prefers_reduced_motion = matches;
                if let Some(a11y) = self.a11y.as_ref() {
                    a11y.on_reduced_motion_change(matches, &mut self.page);
                }
                EventOutcome::Handled
            }
            PageEvent::Click(target) => match self.container {
                Some(container) if self.page.contains(container, target) => {
                    self.restart();
                    EventOutcome::Handled
                }
                _ => EventOutcome::Ignored,
            },
            PageEvent::KeyDown(Key::Char(' ')) | PageEvent::KeyDown(Key::Enter) => {
                if self.widget.is_none() {
                    return EventOutcome::Ignored;
                }
                self.restart();
                EventOutcome::DefaultPrevented
            }
            PageEvent::KeyDown(_) => EventOutcome::Ignored,
            PageEvent::Focus(node) => {
                self.page.focused = Some(node);
                if let Some(a11y) = self.a11y.as_ref() {
                    a11y.on_focus(node, &mut self.page);
                }
                EventOutcome::Handled
            }
            PageEvent::Blur(node) => {
                if self.page.focused == Some(node) {
                    self.page.focused = None;
                }
                if let Some(a11y) = self.a11y.as_ref() {
                    a11y.on_blur(node, &mut self.page);
                }
                EventOutcome::Handled
            }
            PageEvent::Paint(entry) => {
                self.monitor.on_paint(&entry);
                self.page.paint_entries.push(entry);
                EventOutcome::Handled
            }
            PageEvent::Error(message) => {
                if self.error_handlers {
                    error!("Application error: {message}");
                } else {
                    warn!("uncaught error before setup: {message}");
                }
                EventOutcome::Handled
            }
            PageEvent::UnhandledRejection(reason) => {
                if self.error_handlers {
                    error!("Unhandled promise rejection: {reason}");
                } else {
                    warn!("unhandled rejection before setup: {reason}");
                }
                EventOutcome::Handled
            }
        }
    }

    /// Fire every timer due up to `now`, in deadline order
    pub fn advance_to(&mut self, now: Duration) {
        while let Some(fired) = self.sched.pop_due(now) {
            self.dispatch(fired);
        }
        self.sched.settle(now);
    }

    pub fn advance_by(&mut self, delta: Duration) {
        let target = self.sched.now() + delta;
        self.advance_to(target);
    }

    fn dispatch(&mut self, fired: Fired) {
        let Some(widget) = self.widget.as_mut() else {
            return;
        };
        match fired.kind {
            TimerKind::Reveal => {
                widget
                    .typing
                    .on_timer(fired.handle, &mut self.page, &mut self.sched);
                self.drain_completions();
            }
            TimerKind::CursorBlink => {
                widget.cursor.on_timer(fired.handle, &mut self.page);
            }
        }
    }

    fn drain_completions(&mut self) {
        let Some(widget) = self.widget.as_ref() else {
            return;
        };
        let events: Vec<TypingComplete> = widget.completions.try_iter().collect();
        for event in events {
            self.monitor.on_typing_complete(self.sched.now());
            if let Some(a11y) = self.a11y.as_ref() {
                a11y.on_typing_complete(&event, &mut self.page);
            }
            self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}
