//! Incremental export window.
//!
//! A single `since` instant decides which notes count as new. The tracker
//! captures "now" when a run starts and commits it only after the run
//! completes, so notes edited while a run is in flight are picked up again
//! by the next run instead of being skipped.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::error::ConfigError;

/// Format of a configured export start, e.g. `2023-06-01 12:00:00`.
pub const SINCE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Start used when nothing is configured; early enough to export everything.
pub const DEFAULT_SINCE: &str = "1980-03-26 12:00:00";

/// The instant from which notes are exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExportWindow {
    since: DateTime<Utc>,
}

impl ExportWindow {
    /// Build the first window from an optional configured start string.
    ///
    /// `None` or an empty string selects [`DEFAULT_SINCE`].
    pub fn initial(configured: Option<&str>) -> Result<Self, ConfigError> {
        let value = configured
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SINCE);
        let naive = NaiveDateTime::parse_from_str(value, SINCE_FORMAT).map_err(|_| {
            ConfigError::InvalidSince {
                value: value.to_string(),
            }
        })?;
        Ok(Self {
            since: naive.and_utc(),
        })
    }

    pub fn from_timestamp(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0)
            .single()
            .map(|since| Self { since })
    }

    pub fn since(&self) -> DateTime<Utc> {
        self.since
    }

    /// `since` in whole seconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.since.timestamp()
    }

    /// Whether a note last updated at `updated_secs` belongs to this window.
    ///
    /// The boundary is inclusive: a note updated exactly at `since` is
    /// exported again rather than risk missing it.
    pub fn includes(&self, updated_secs: i64) -> bool {
        updated_secs >= self.timestamp()
    }

    pub fn display(&self) -> String {
        self.since.format(SINCE_FORMAT).to_string()
    }
}

/// Owns the window across runs.
#[derive(Debug, Clone)]
pub struct WindowTracker {
    current: ExportWindow,
    pending: Option<DateTime<Utc>>,
}

impl WindowTracker {
    pub fn new(current: ExportWindow) -> Self {
        Self {
            current,
            pending: None,
        }
    }

    pub fn current(&self) -> ExportWindow {
        self.current
    }

    /// Mark the start of a run. Returns the window the run must use.
    pub fn start_run(&mut self) -> ExportWindow {
        self.start_run_at(Utc::now())
    }

    pub fn start_run_at(&mut self, now: DateTime<Utc>) -> ExportWindow {
        self.pending = Some(now);
        self.current
    }

    /// Commit the start time of the completed run as the new window.
    ///
    /// Without a run started since the last call this is a no-op. The
    /// window never moves backwards.
    pub fn advance(&mut self) -> ExportWindow {
        if let Some(started) = self.pending.take() {
            let started = truncate_to_secs(started);
            if started > self.current.since {
                self.current = ExportWindow { since: started };
            }
        }
        self.current
    }

    /// Drop the captured start without advancing, e.g. after a fatal error.
    pub fn abandon_run(&mut self) {
        self.pending = None;
    }
}

fn truncate_to_secs(t: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(t.timestamp(), 0).single().unwrap_or(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, SINCE_FORMAT)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_initial_default_is_far_past() {
        let w = ExportWindow::initial(None).unwrap();
        assert_eq!(w.display(), DEFAULT_SINCE);
        let empty = ExportWindow::initial(Some("  ")).unwrap();
        assert_eq!(empty, w);
    }

    #[test]
    fn test_initial_parses_configured() {
        let w = ExportWindow::initial(Some("2023-06-21 12:00:00")).unwrap();
        assert_eq!(w.since(), at("2023-06-21 12:00:00"));
    }

    #[test]
    fn test_initial_rejects_malformed() {
        let err = ExportWindow::initial(Some("2023-06-21")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSince { .. }));
    }

    #[test]
    fn test_boundary_inclusive() {
        let w = ExportWindow::initial(Some("2023-06-21 12:00:00")).unwrap();
        assert!(w.includes(w.timestamp()));
        assert!(!w.includes(w.timestamp() - 1));
    }

    #[test]
    fn test_advance_commits_run_start() {
        let mut tracker = WindowTracker::new(ExportWindow::initial(None).unwrap());
        let used = tracker.start_run_at(at("2024-01-01 08:00:00"));
        assert_eq!(used.display(), DEFAULT_SINCE);
        let next = tracker.advance();
        assert_eq!(next.since(), at("2024-01-01 08:00:00"));
    }

    #[test]
    fn test_advance_twice_is_idempotent() {
        let mut tracker = WindowTracker::new(ExportWindow::initial(None).unwrap());
        tracker.start_run_at(at("2024-01-01 08:00:00"));
        let first = tracker.advance();
        let second = tracker.advance();
        assert_eq!(first, second);
    }

    #[test]
    fn test_advance_without_run_is_noop() {
        let start = ExportWindow::initial(Some("2023-01-01 00:00:00")).unwrap();
        let mut tracker = WindowTracker::new(start);
        assert_eq!(tracker.advance(), start);
    }

    #[test]
    fn test_never_moves_backwards() {
        let start = ExportWindow::initial(Some("2030-01-01 00:00:00")).unwrap();
        let mut tracker = WindowTracker::new(start);
        tracker.start_run_at(at("2024-01-01 00:00:00"));
        assert_eq!(tracker.advance(), start);
    }

    #[test]
    fn test_abandoned_run_does_not_advance() {
        let start = ExportWindow::initial(None).unwrap();
        let mut tracker = WindowTracker::new(start);
        tracker.start_run_at(at("2024-01-01 00:00:00"));
        tracker.abandon_run();
        assert_eq!(tracker.advance(), start);
    }
}
