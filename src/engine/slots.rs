//! Slot calculator
//!
//! Turns a doctor's recurring weekly availability into concrete bookable
//! start times for a calendar date. Every slot is 30 minutes long and the
//! calculator never consults the database: callers pass the windows and the
//! times already taken.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use std::collections::HashSet;

/// Length of one appointment slot in minutes
pub const SLOT_MINUTES: i64 = 30;

/// A recurring availability window, `[start, end)` on one weekday
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyWindow {
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WeeklyWindow {
    /// Slot start times of this window in chronological order.
    ///
    /// A window shorter than one slot yields nothing. Generation stops
    /// rather than wrapping past midnight.
    pub fn slots(&self) -> Vec<NaiveTime> {
        let step = Duration::minutes(SLOT_MINUTES);
        let mut slots = Vec::new();
        let mut current = self.start;

        while current < self.end {
            slots.push(current);
            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            current = next;
        }

        slots
    }
}

/// Bookable start times on `date`, ascending.
///
/// Windows on other weekdays are ignored and any generated time equal to a
/// booked time is dropped. Overlapping windows are not merged, so a time
/// covered by two windows is offered twice.
pub fn available_slots(
    windows: &[WeeklyWindow],
    booked: &HashSet<NaiveTime>,
    date: NaiveDate,
) -> Vec<NaiveTime> {
    let day = date.weekday();

    let mut slots: Vec<NaiveTime> = windows
        .iter()
        .filter(|w| w.day == day)
        .flat_map(|w| w.slots())
        .filter(|t| !booked.contains(t))
        .collect();

    // Stable, keeps duplicates from overlapping windows
    slots.sort();
    slots
}

/// Distinct weekdays that have at least one window, Monday first
pub fn available_days(windows: &[WeeklyWindow]) -> Vec<Weekday> {
    let mut days: Vec<Weekday> = Vec::new();
    for window in windows {
        if !days.contains(&window.day) {
            days.push(window.day);
        }
    }
    days.sort_by_key(|d| d.num_days_from_monday());
    days
}

/// Dates in `[from, to]` whose weekday has a window
pub fn bookable_dates(windows: &[WeeklyWindow], from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let days = available_days(windows);
    from.iter_days()
        .take_while(|d| *d <= to)
        .filter(|d| days.contains(&d.weekday()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn window(day: Weekday, start: NaiveTime, end: NaiveTime) -> WeeklyWindow {
        WeeklyWindow { day, start, end }
    }

    // 2025-03-03 is a Monday
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    #[test]
    fn test_window_generates_half_hour_steps() {
        let w = window(Weekday::Mon, t(9, 0), t(11, 0));
        assert_eq!(w.slots(), vec![t(9, 0), t(9, 30), t(10, 0), t(10, 30)]);

        let uneven = window(Weekday::Mon, t(9, 0), t(10, 15));
        assert_eq!(uneven.slots(), vec![t(9, 0), t(9, 30), t(10, 0)]);
    }

    #[test]
    fn test_short_window_yields_nothing() {
        let w = window(Weekday::Mon, t(9, 0), t(9, 20));
        assert!(w.slots().is_empty());

        let inverted = window(Weekday::Mon, t(10, 0), t(9, 0));
        assert!(inverted.slots().is_empty());
    }

    #[test]
    fn test_late_window_does_not_wrap_past_midnight() {
        let w = window(Weekday::Mon, t(23, 0), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
        assert_eq!(w.slots(), vec![t(23, 0), t(23, 30)]);
    }

    #[test]
    fn test_booked_time_is_excluded() {
        let windows = [window(Weekday::Mon, t(9, 0), t(10, 0))];
        let booked = HashSet::from([t(9, 30)]);

        assert_eq!(available_slots(&windows, &booked, monday()), vec![t(9, 0)]);
    }

    #[test]
    fn test_booking_outside_slots_changes_nothing() {
        let windows = [window(Weekday::Mon, t(9, 0), t(10, 0))];
        let booked = HashSet::from([t(9, 15), t(14, 0)]);

        assert_eq!(
            available_slots(&windows, &booked, monday()),
            vec![t(9, 0), t(9, 30)]
        );
    }

    #[test]
    fn test_weekday_without_windows_is_empty() {
        let windows = [window(Weekday::Mon, t(9, 0), t(10, 0))];
        let tuesday = monday().succ_opt().unwrap();

        assert!(available_slots(&windows, &HashSet::new(), tuesday).is_empty());
    }

    #[test]
    fn test_multiple_windows_are_sorted() {
        let windows = [
            window(Weekday::Mon, t(14, 0), t(15, 0)),
            window(Weekday::Tue, t(8, 0), t(9, 0)),
            window(Weekday::Mon, t(9, 0), t(10, 0)),
        ];

        assert_eq!(
            available_slots(&windows, &HashSet::new(), monday()),
            vec![t(9, 0), t(9, 30), t(14, 0), t(14, 30)]
        );
    }

    #[test]
    fn test_overlapping_windows_keep_duplicates() {
        let windows = [
            window(Weekday::Mon, t(9, 0), t(10, 0)),
            window(Weekday::Mon, t(9, 30), t(10, 30)),
        ];

        assert_eq!(
            available_slots(&windows, &HashSet::new(), monday()),
            vec![t(9, 0), t(9, 30), t(9, 30), t(10, 0)]
        );
    }

    #[test]
    fn test_available_days_are_distinct_and_ordered() {
        let windows = [
            window(Weekday::Fri, t(8, 0), t(12, 0)),
            window(Weekday::Mon, t(9, 0), t(17, 0)),
            window(Weekday::Fri, t(13, 0), t(15, 0)),
        ];

        assert_eq!(available_days(&windows), vec![Weekday::Mon, Weekday::Fri]);
        assert!(available_days(&[]).is_empty());
    }

    #[test]
    fn test_bookable_dates_follow_weekdays() {
        let windows = [
            window(Weekday::Mon, t(9, 0), t(17, 0)),
            window(Weekday::Wed, t(9, 0), t(17, 0)),
        ];
        let from = monday();
        let to = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();

        let dates = bookable_dates(&windows, from, to);
        let expected: Vec<NaiveDate> = [3, 5, 10, 12]
            .iter()
            .map(|d| NaiveDate::from_ymd_opt(2025, 3, *d).unwrap())
            .collect();
        assert_eq!(dates, expected);

        assert!(bookable_dates(&windows, to, from).is_empty());
    }
}
