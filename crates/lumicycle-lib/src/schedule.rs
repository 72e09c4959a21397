//! Cyclic color schedule and the decisions driven by it.
//!
//! Pure state, no I/O. The supervisor owns the timers and the connection;
//! this module only answers which color is current, which comes next, and
//! how long each entry holds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{LumicycleError, Result};

/// One schedule step as configured: hold `color` for `duration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Hold time as `"H:MM:SS"`. Hours are unbounded, minutes and seconds
    /// are two digits each and may exceed 59 (they carry upward).
    pub duration: String,
    pub color: Color,
}

/// A resolved entry: parsed hold time plus the original text for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleState {
    pub color: Color,
    pub hold: Duration,
    pub label: String,
}

/// Outcome of comparing an observed lamp color against the current entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Observed color matches; nothing to send.
    InSync,
    /// Observed color differs; apply this one.
    Apply(Color),
}

/// Ordered cyclic schedule with a cursor.
///
/// The cursor starts before the first entry; the first [`advance`] selects
/// index 0. It never moves backwards and is never reset, so the position
/// survives connection loss.
///
/// [`advance`]: Schedule::advance
#[derive(Debug, Clone)]
pub struct Schedule {
    states: Vec<ScheduleState>,
    cursor: Option<usize>,
}

impl Schedule {
    /// Resolve configured entries into a schedule. Fails on an empty list or
    /// an unparseable duration.
    pub fn from_entries(entries: &[ScheduleEntry]) -> Result<Self> {
        if entries.is_empty() {
            return Err(LumicycleError::Schedule("schedule has no entries".into()));
        }
        let mut states = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let hold = parse_duration(&entry.duration).map_err(|reason| {
                LumicycleError::Schedule(format!("entry {index}: {reason}"))
            })?;
            states.push(ScheduleState {
                color: entry.color,
                hold,
                label: entry.duration.clone(),
            });
        }
        Ok(Schedule { states, cursor: None })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Current cursor position; `None` until the first advancement.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The entry the cursor points at, if it has advanced at least once.
    pub fn current(&self) -> Option<&ScheduleState> {
        self.cursor.map(|i| &self.states[i])
    }

    /// Hold duration of the current entry; zero before the first advancement.
    pub fn current_hold(&self) -> Duration {
        self.current().map(|s| s.hold).unwrap_or(Duration::ZERO)
    }

    /// Move the cursor to the next entry, wrapping at the end, and return it.
    pub fn advance(&mut self) -> &ScheduleState {
        let next = match self.cursor {
            Some(i) if i + 1 < self.states.len() => i + 1,
            _ => 0,
        };
        self.cursor = Some(next);
        &self.states[next]
    }

    /// Compare an observed color against the current entry.
    ///
    /// Returns `None` before the first advancement, when there is no target
    /// to compare against.
    pub fn reconcile(&self, observed: Color) -> Option<ReconcileAction> {
        let current = self.current()?;
        if observed == current.color {
            Some(ReconcileAction::InSync)
        } else {
            Some(ReconcileAction::Apply(current.color))
        }
    }
}

/// Parse an `"H:MM:SS"` duration into a fixed span.
///
/// The whole string must match: one or more digits for hours, then exactly
/// two digits each for minutes and seconds. Values of 60 or more in the
/// minute and second fields carry upward, so `"0:90:00"` is ninety minutes.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("expected \"H:MM:SS\", got \"{s}\""));
    }
    let (hours, minutes, seconds) = (parts[0], parts[1], parts[2]);
    if hours.is_empty() || !hours.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("hours must be decimal digits, got \"{hours}\""));
    }
    for (name, field) in [("minutes", minutes), ("seconds", seconds)] {
        if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("{name} must be exactly two digits, got \"{field}\""));
        }
    }
    let h: u64 = hours.parse().map_err(|_| format!("hours out of range: \"{hours}\""))?;
    let m: u64 = minutes.parse().map_err(|_| format!("minutes out of range: \"{minutes}\""))?;
    let sec: u64 = seconds.parse().map_err(|_| format!("seconds out of range: \"{seconds}\""))?;
    let total = h
        .checked_mul(3600)
        .and_then(|t| t.checked_add(m * 60 + sec))
        .ok_or_else(|| format!("duration too large: \"{s}\""))?;
    Ok(Duration::from_secs(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(duration: &str, r: u16, g: u16, b: u16) -> ScheduleEntry {
        ScheduleEntry {
            duration: duration.into(),
            color: Color::new(r, g, b),
        }
    }

    fn two_state_schedule() -> Schedule {
        Schedule::from_entries(&[entry("0:00:05", 100, 200, 300), entry("0:00:10", 50, 60, 70)])
            .unwrap()
    }

    // ── parse_duration ──

    #[test]
    fn parses_hours_minutes_seconds() {
        assert_eq!(parse_duration("1:02:03").unwrap(), Duration::from_secs(3723));
    }

    #[test]
    fn parses_zero() {
        assert_eq!(parse_duration("0:00:00").unwrap(), Duration::ZERO);
    }

    #[test]
    fn hours_are_unbounded() {
        assert_eq!(parse_duration("48:00:00").unwrap(), Duration::from_secs(48 * 3600));
        assert_eq!(parse_duration("100:00:00").unwrap(), Duration::from_secs(360_000));
    }

    #[test]
    fn minutes_and_seconds_carry_past_sixty() {
        assert_eq!(parse_duration("0:90:00").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("0:00:99").unwrap(), Duration::from_secs(99));
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(parse_duration("10:00").is_err());
        assert!(parse_duration("1:2:3:4").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn rejects_single_digit_minutes_or_seconds() {
        assert!(parse_duration("1:2:03").is_err());
        assert!(parse_duration("1:02:3").is_err());
        assert!(parse_duration("1:002:03").is_err());
    }

    #[test]
    fn rejects_surrounding_garbage() {
        assert!(parse_duration("x1:22:33").is_err());
        assert!(parse_duration("1:22:33y").is_err());
        assert!(parse_duration(" 1:22:33").is_err());
    }

    #[test]
    fn rejects_negative_and_non_digit_fields() {
        assert!(parse_duration("-1:00:00").is_err());
        assert!(parse_duration("1:0a:00").is_err());
    }

    #[test]
    fn rejects_absurdly_large_hours() {
        assert!(parse_duration("99999999999999999999:00:00").is_err());
    }

    // ── from_entries ──

    #[test]
    fn from_entries_rejects_empty_list() {
        assert!(Schedule::from_entries(&[]).is_err());
    }

    #[test]
    fn from_entries_names_the_bad_entry() {
        let err = Schedule::from_entries(&[entry("0:00:05", 1, 2, 3), entry("bogus", 4, 5, 6)])
            .unwrap_err();
        assert!(err.to_string().contains("entry 1"));
    }

    #[test]
    fn from_entries_keeps_duration_text_as_label() {
        let schedule = Schedule::from_entries(&[entry("0:90:00", 1, 2, 3)]).unwrap();
        assert_eq!(schedule.states[0].label, "0:90:00");
        assert_eq!(schedule.states[0].hold, Duration::from_secs(5400));
    }

    // ── Cursor and advancement ──

    #[test]
    fn cursor_starts_before_first_entry() {
        let schedule = two_state_schedule();
        assert_eq!(schedule.cursor(), None);
        assert!(schedule.current().is_none());
        assert_eq!(schedule.current_hold(), Duration::ZERO);
    }

    #[test]
    fn first_advance_selects_index_zero() {
        let mut schedule = two_state_schedule();
        let state = schedule.advance();
        assert_eq!(state.color, Color::new(100, 200, 300));
        assert_eq!(state.hold, Duration::from_secs(5));
        assert_eq!(schedule.cursor(), Some(0));
    }

    #[test]
    fn advance_cycles_through_all_entries() {
        let mut schedule = two_state_schedule();
        assert_eq!(schedule.advance().hold, Duration::from_secs(5));
        assert_eq!(schedule.advance().hold, Duration::from_secs(10));
        assert_eq!(schedule.advance().hold, Duration::from_secs(5));
        assert_eq!(schedule.cursor(), Some(0));
    }

    #[test]
    fn single_entry_schedule_advances_to_itself() {
        let mut schedule = Schedule::from_entries(&[entry("0:00:01", 7, 8, 9)]).unwrap();
        assert_eq!(schedule.advance().color, Color::new(7, 8, 9));
        assert_eq!(schedule.advance().color, Color::new(7, 8, 9));
        assert_eq!(schedule.cursor(), Some(0));
    }

    // ── Reconciliation ──

    #[test]
    fn reconcile_has_no_target_before_first_advance() {
        let schedule = two_state_schedule();
        assert_eq!(schedule.reconcile(Color::new(100, 200, 300)), None);
    }

    #[test]
    fn reconcile_reports_in_sync_on_exact_match() {
        let mut schedule = two_state_schedule();
        schedule.advance();
        assert_eq!(
            schedule.reconcile(Color::new(100, 200, 300)),
            Some(ReconcileAction::InSync)
        );
    }

    #[test]
    fn reconcile_requests_current_color_on_mismatch() {
        let mut schedule = two_state_schedule();
        schedule.advance();
        assert_eq!(
            schedule.reconcile(Color::new(100, 200, 299)),
            Some(ReconcileAction::Apply(Color::new(100, 200, 300)))
        );
    }

    #[test]
    fn reconcile_tracks_the_cursor() {
        let mut schedule = two_state_schedule();
        schedule.advance();
        schedule.advance();
        assert_eq!(
            schedule.reconcile(Color::new(100, 200, 300)),
            Some(ReconcileAction::Apply(Color::new(50, 60, 70)))
        );
    }
}
