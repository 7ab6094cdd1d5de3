//! Tournament window calculation.
//!
//! Tournaments run on fixed UTC weekdays, midnight to midnight. A window's
//! start is the most recent scheduled weekday at 00:00 UTC, today included,
//! so the per-window submission counter resets the moment a new scheduled
//! day begins.

use anyhow::{bail, Result};
use chrono::{DateTime, Datelike, Days, NaiveTime, Utc, Weekday};

/// Weekly schedule of active tournament days.
#[derive(Debug, Clone)]
pub struct TournamentSchedule {
    active_days: Vec<Weekday>,
}

/// Derived window state for a point in time. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TournamentWindow {
    /// Whether a window is open at the queried instant.
    pub is_active: bool,
    /// Start of the current (or most recently started) window.
    pub start: DateTime<Utc>,
}

impl TournamentSchedule {
    /// Builds a schedule from a set of weekdays. At least one day is
    /// required; duplicates are collapsed.
    pub fn new(days: impl IntoIterator<Item = Weekday>) -> Result<Self> {
        let mut active_days: Vec<Weekday> = Vec::new();
        for day in days {
            if !active_days.contains(&day) {
                active_days.push(day);
            }
        }
        if active_days.is_empty() {
            bail!("tournament schedule must contain at least one weekday");
        }
        Ok(Self { active_days })
    }

    /// Computes the window state at `now`.
    ///
    /// Scans backward from today (inclusive) for the nearest scheduled
    /// weekday; `new()` guarantees a non-empty schedule, so the scan always
    /// matches within seven days.
    pub fn window_at(&self, now: DateTime<Utc>) -> TournamentWindow {
        let today = now.date_naive();
        let is_active = self.active_days.contains(&today.weekday());

        let start = (0..7u64)
            .filter_map(|days_back| today.checked_sub_days(Days::new(days_back)))
            .find(|day| self.active_days.contains(&day.weekday()))
            .unwrap_or(today)
            .and_time(NaiveTime::MIN)
            .and_utc();

        TournamentWindow { is_active, start }
    }
}

impl Default for TournamentSchedule {
    /// The shipped schedule: Monday, Thursday and Saturday.
    fn default() -> Self {
        Self {
            active_days: vec![Weekday::Mon, Weekday::Thu, Weekday::Sat],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_schedule_rejected() {
        assert!(TournamentSchedule::new([]).is_err());
    }

    #[test]
    fn test_active_day_starts_window_today() {
        let schedule = TournamentSchedule::default();

        // 2026-01-05 is a Monday.
        let window = schedule.window_at(at(2026, 1, 5, 15));
        assert!(window.is_active);
        assert_eq!(window.start, at(2026, 1, 5, 0));

        // Still the same window one minute after midnight.
        let window = schedule.window_at(at(2026, 1, 5, 0));
        assert_eq!(window.start, at(2026, 1, 5, 0));
    }

    #[test]
    fn test_inactive_day_reaches_back_to_previous_window() {
        let schedule = TournamentSchedule::default();

        // 2026-01-04 is a Sunday; the nearest scheduled day behind it is
        // Saturday the 3rd.
        let window = schedule.window_at(at(2026, 1, 4, 9));
        assert!(!window.is_active);
        assert_eq!(window.start, at(2026, 1, 3, 0));

        // Wednesday the 7th reaches back to Monday the 5th.
        let window = schedule.window_at(at(2026, 1, 7, 23));
        assert!(!window.is_active);
        assert_eq!(window.start, at(2026, 1, 5, 0));

        // Friday the 9th reaches back to Thursday the 8th.
        let window = schedule.window_at(at(2026, 1, 9, 1));
        assert!(!window.is_active);
        assert_eq!(window.start, at(2026, 1, 8, 0));
    }

    #[test]
    fn test_single_day_schedule_spans_a_week() {
        let schedule = TournamentSchedule::new([Weekday::Wed]).unwrap();

        // Tuesday the 6th is six days past Wednesday 2025-12-31.
        let window = schedule.window_at(at(2026, 1, 6, 12));
        assert!(!window.is_active);
        assert_eq!(window.start, at(2025, 12, 31, 0));
    }

    #[test]
    fn test_duplicate_days_collapse() {
        let schedule = TournamentSchedule::new([Weekday::Mon, Weekday::Mon]).unwrap();
        let window = schedule.window_at(at(2026, 1, 5, 8));
        assert!(window.is_active);
    }
}
