use chrono::{DateTime, Local};
use itertools::Itertools;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::page::{Page, PaintEntry, ReadyState};

const FIRST_PAINT: &str = "first-paint";

/// Lifecycle timestamps relative to the monitor's construction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsRecord {
    pub dom_ready: Option<Duration>,
    pub first_paint: Option<Duration>,
    pub typing_started: Option<Duration>,
    pub typing_completed: Option<Duration>,
}

/// Serialized form written to the log
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub recorded_at: DateTime<Local>,
    pub dom_content_loaded_ms: Option<f64>,
    pub first_paint_ms: Option<f64>,
    pub typing_started_ms: Option<f64>,
    pub typing_completed_ms: Option<f64>,
}

fn as_ms(d: Option<Duration>) -> Option<f64> {
    d.map(|d| d.as_micros() as f64 / 1000.0)
}

impl MetricsRecord {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            recorded_at: Local::now(),
            dom_content_loaded_ms: as_ms(self.dom_ready),
            first_paint_ms: as_ms(self.first_paint),
            typing_started_ms: as_ms(self.typing_started),
            typing_completed_ms: as_ms(self.typing_completed),
        }
    }

    /// Two-column table, one row per field; unset fields print as `-`
    pub fn table(&self) -> String {
        let rows = [
            ("domContentLoaded", self.dom_ready),
            ("firstPaint", self.first_paint),
            ("typingStarted", self.typing_started),
            ("typingCompleted", self.typing_completed),
        ];
        let body = rows
            .iter()
            .map(|(name, value)| {
                let value = as_ms(*value)
                    .map(|ms| format!("{ms:.1}"))
                    .unwrap_or_else(|| "-".to_string());
                format!("{name:<18}{value:>10}")
            })
            .join("\n");
        format!("{:<18}{:>10}\n{body}", "metric", "ms")
    }
}

/// Best-effort recorder of page-load and typing lifecycle times.
///
/// Missing platform support leaves a field unset; nothing here fails.
#[derive(Debug)]
pub struct TimingMonitor {
    started_at: Duration,
    observing_paint: bool,
    metrics: MetricsRecord,
}

impl TimingMonitor {
    pub fn new(page: &Page, now: Duration) -> Self {
        let mut monitor = Self {
            started_at: now,
            observing_paint: page.paint_timing_supported,
            metrics: MetricsRecord::default(),
        };

        if page.ready_state != ReadyState::Loading {
            monitor.metrics.dom_ready = Some(Duration::ZERO);
        }

        if monitor.observing_paint {
            // entries that landed before we started observing are buffered
            for entry in &page.paint_entries {
                monitor.on_paint(entry);
            }
        } else {
            debug!("Paint timing not available");
        }

        monitor
    }

    pub fn record(&self) -> &MetricsRecord {
        &self.metrics
    }

    fn since_start(&self, now: Duration) -> Duration {
        now.saturating_sub(self.started_at)
    }

    pub fn on_dom_ready(&mut self, now: Duration) {
        if self.metrics.dom_ready.is_none() {
            self.metrics.dom_ready = Some(self.since_start(now));
        }
    }

    pub fn on_paint(&mut self, entry: &PaintEntry) {
        if !self.observing_paint || entry.name != FIRST_PAINT || self.metrics.first_paint.is_some() {
            return;
        }
        self.metrics.first_paint = Some(self.since_start(entry.start_time));
    }

    /// Start of a run; a restart overwrites the previous start time.
    pub fn mark_typing_start(&mut self, now: Duration) {
        self.metrics.typing_started = Some(self.since_start(now));
    }

    pub fn on_typing_complete(&mut self, now: Duration) {
        self.metrics.typing_completed = Some(self.since_start(now));
        self.log_metrics();
    }

    pub fn log_metrics(&self) {
        let table = self.metrics.table();
        match serde_json::to_string(&self.metrics.snapshot()) {
            Ok(json) => info!(metrics = %json, "performance metrics\n{table}"),
            Err(_) => info!("performance metrics\n{table}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_dom_ready_is_zero_when_already_interactive() {
        let mut page = Page::new();
        page.ready_state = ReadyState::Interactive;
        let mut m = TimingMonitor::new(&page, ms(40));
        assert_eq!(m.record().dom_ready, Some(Duration::ZERO));

        m.on_dom_ready(ms(900));
        assert_eq!(m.record().dom_ready, Some(Duration::ZERO));
    }

    #[test]
    fn test_dom_ready_recorded_relative_to_construction() {
        let page = Page::new();
        let mut m = TimingMonitor::new(&page, ms(10));
        assert_eq!(m.record().dom_ready, None);
        m.on_dom_ready(ms(35));
        assert_eq!(m.record().dom_ready, Some(ms(25)));
    }

    #[test]
    fn test_first_paint_is_write_once_and_ignores_other_entries() {
        let page = Page::new();
        let mut m = TimingMonitor::new(&page, ms(0));
        m.on_paint(&PaintEntry {
            name: "first-contentful-paint".into(),
            start_time: ms(5),
        });
        assert_eq!(m.record().first_paint, None);

        m.on_paint(&PaintEntry::first_paint(ms(16)));
        m.on_paint(&PaintEntry::first_paint(ms(32)));
        assert_eq!(m.record().first_paint, Some(ms(16)));
    }

    #[test]
    fn test_buffered_paint_entries_are_picked_up() {
        let mut page = Page::new();
        page.paint_entries.push(PaintEntry::first_paint(ms(12)));
        let m = TimingMonitor::new(&page, ms(0));
        assert_eq!(m.record().first_paint, Some(ms(12)));
    }

    #[test]
    fn test_unsupported_paint_timing_stays_unset() {
        let mut page = Page::new();
        page.paint_timing_supported = false;
        let mut m = TimingMonitor::new(&page, ms(0));
        m.on_paint(&PaintEntry::first_paint(ms(16)));
        assert_eq!(m.record().first_paint, None);
    }

    #[test]
    fn test_restart_overwrites_start_and_keeps_completion() {
        let page = Page::new();
        let mut m = TimingMonitor::new(&page, ms(100));
        m.mark_typing_start(ms(150));
        m.on_typing_complete(ms(2150));
        assert_eq!(m.record().typing_started, Some(ms(50)));
        assert_eq!(m.record().typing_completed, Some(ms(2050)));

        // a restart moves the start but keeps the last completion
        m.mark_typing_start(ms(3000));
        assert_eq!(m.record().typing_started, Some(ms(2900)));
        assert_eq!(m.record().typing_completed, Some(ms(2050)));

        m.on_typing_complete(ms(5000));
        assert_eq!(m.record().typing_completed, Some(ms(4900)));
    }

    #[test]
    fn test_table_lists_all_fields() {
        let record = MetricsRecord {
            dom_ready: Some(Duration::ZERO),
            first_paint: None,
            typing_started: Some(ms(3)),
            typing_completed: Some(ms(4200)),
        };
        let table = record.table();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("domContentLoaded") && lines[1].ends_with("0.0"));
        assert!(lines[2].ends_with('-'));
        assert!(lines[4].ends_with("4200.0"));
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let record = MetricsRecord {
            typing_started: Some(ms(7)),
            ..MetricsRecord::default()
        };
        let json = serde_json::to_value(record.snapshot()).unwrap();
        assert_eq!(json["typingStartedMs"], 7.0);
        assert!(json["firstPaintMs"].is_null());
        assert!(json.get("recordedAt").is_some());
    }
}
