use std::time::Duration;

use crate::a11y::REDUCED_MOTION_CLASS;
use crate::page::{NodeId, Page};

const DEFAULT_DURATION: Duration = Duration::from_millis(300);

/// Split an `animation` shorthand like `fadeInUp 0.3s ease-out` into its
/// name and duration. Accepts `s` and `ms` units.
pub fn parse_animation(value: &str) -> Option<(&str, Duration)> {
    let mut parts = value.split_whitespace();
    let name = parts.next().filter(|n| *n != "none")?;
    let duration = parts.find_map(parse_time).unwrap_or(DEFAULT_DURATION);
    Some((name, duration))
}

fn parse_time(token: &str) -> Option<Duration> {
    let (number, scale) = match token.strip_suffix("ms") {
        Some(ms) => (ms, 1.0),
        None => (token.strip_suffix('s')?, 1000.0),
    };
    number
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| Duration::from_millis((v * scale).round() as u64))
}

/// Terminal playback of the display's entrance animation.
///
/// Watches the element's animation run counter and plays once per replay,
/// unless the page root carries the reduced-motion class.
#[derive(Debug, Default)]
pub struct EntranceTransition {
    runs_seen: u32,
    started_at: Option<Duration>,
    duration: Duration,
}

impl EntranceTransition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(&mut self, page: &Page, display: NodeId, now: Duration) {
        let el = page.element(display);
        if el.animation_runs == self.runs_seen {
            return;
        }
        self.runs_seen = el.animation_runs;

        let reduced = page
            .element(page.document_element())
            .has_class(REDUCED_MOTION_CLASS);
        match el.style("animation").and_then(parse_animation) {
            Some((_, duration)) if !reduced => {
                self.started_at = Some(now);
                self.duration = duration;
            }
            _ => self.started_at = None,
        }
    }

    /// 0.0..1.0 while playing
    pub fn progress(&self, now: Duration) -> Option<f64> {
        let started = self.started_at?;
        let elapsed = now.checked_sub(started)?;
        if elapsed >= self.duration || self.duration.is_zero() {
            return None;
        }
        Some(elapsed.as_secs_f64() / self.duration.as_secs_f64())
    }

    pub fn is_active(&self, now: Duration) -> bool {
        self.progress(now).is_some()
    }

    /// Rows below the resting position; the text rises into place
    pub fn row_offset(&self, now: Duration) -> u16 {
        match self.progress(now) {
            Some(p) if p < 0.5 => 1,
            _ => 0,
        }
    }
}
