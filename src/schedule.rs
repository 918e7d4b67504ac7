// ABOUTME: Calendar anchor math translating relative (week, day-of-week) pairs to dates
// ABOUTME: Pure functions; anchor repair persistence lives in the planner layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

//! # Schedule Anchor
//!
//! Every plan hangs off a single calendar reference point: the Monday of
//! the week its goal started ("first Monday"). Relative plan-entry
//! coordinates — a 1-based week index and an ISO day-of-week — are
//! translated to and from absolute dates through that anchor.
//!
//! All functions here are pure. The repair policy (persisting a corrected
//! anchor when a stored start date drifted off Monday) is applied by the
//! planner before any materialization or lookup.

use crate::errors::{AppError, AppResult};
use crate::models::ScheduleSlot;
use chrono::{Datelike, Duration, NaiveDate};

/// Days per schedule week
const DAYS_PER_WEEK: u32 = 7;

/// ISO weekday number: 1 = Monday .. 7 = Sunday
#[must_use]
pub fn iso_weekday(date: NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}

/// Roll a reference date back to the Monday of its week.
///
/// Identity when the date already falls on a Monday, so the function is
/// idempotent: `first_monday(first_monday(d)) == first_monday(d)`.
#[must_use]
pub fn first_monday(reference: NaiveDate) -> NaiveDate {
    let weekday = iso_weekday(reference);
    reference - Duration::days(i64::from(weekday) - 1)
}

/// Translate an absolute date into (week, day-of-week) relative to the
/// anchor Monday.
///
/// # Errors
///
/// Returns `ValueOutOfRange` when `date` precedes `anchor`.
pub fn resolve_coordinates(date: NaiveDate, anchor: NaiveDate) -> AppResult<(u32, u32)> {
    let day_offset = (date - anchor).num_days();
    if day_offset < 0 {
        return Err(AppError::out_of_range(format!(
            "date {date} precedes schedule anchor {anchor}"
        )));
    }
    let week = u32::try_from(day_offset).map_or(u32::MAX, |d| d / DAYS_PER_WEEK + 1);
    Ok((week, iso_weekday(date)))
}

/// Translate (week, day-of-week) relative coordinates into an absolute
/// date via the anchor Monday.
///
/// # Errors
///
/// Returns `ValueOutOfRange` when `week` is zero or `day_of_week` is
/// outside 1..=7.
pub fn resolve_date(week: u32, day_of_week: u32, anchor: NaiveDate) -> AppResult<NaiveDate> {
    if week == 0 {
        return Err(AppError::out_of_range("week index must be >= 1"));
    }
    if !(1..=DAYS_PER_WEEK).contains(&day_of_week) {
        return Err(AppError::out_of_range(format!(
            "day-of-week {day_of_week} outside 1..=7"
        )));
    }
    let offset = i64::from(week - 1) * i64::from(DAYS_PER_WEEK) + i64::from(day_of_week - 1);
    Ok(anchor + Duration::days(offset))
}

/// Resolve a schedule slot to its calendar date.
///
/// Explicit dates are authoritative; relative coordinates go through the
/// anchor.
///
/// # Errors
///
/// Returns `ValueOutOfRange` for invalid relative coordinates.
pub fn resolve_slot(slot: &ScheduleSlot, anchor: NaiveDate) -> AppResult<NaiveDate> {
    match slot {
        ScheduleSlot::Explicit { date } => Ok(*date),
        ScheduleSlot::Relative { week, day_of_week } => resolve_date(*week, *day_of_week, anchor),
    }
}

/// Whether a stored anchor date needs repair (i.e. is not a Monday)
#[must_use]
pub fn needs_repair(start_date: NaiveDate) -> bool {
    iso_weekday(start_date) != 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_monday_rolls_back() {
        // 2024-01-10 is a Wednesday; its week's Monday is 2024-01-08
        assert_eq!(first_monday(date(2024, 1, 10)), date(2024, 1, 8));
        // Sunday is weekday 7 and rolls back six days
        assert_eq!(first_monday(date(2024, 1, 14)), date(2024, 1, 8));
    }

    #[test]
    fn test_first_monday_identity_on_monday() {
        assert_eq!(first_monday(date(2024, 1, 8)), date(2024, 1, 8));
    }

    #[test]
    fn test_first_monday_idempotent() {
        for offset in 0..21 {
            let d = date(2024, 1, 1) + Duration::days(offset);
            assert_eq!(first_monday(first_monday(d)), first_monday(d));
        }
    }

    #[test]
    fn test_resolve_date_week_two_wednesday() {
        // Anchor 2024-01-08; (week 2, day 3) lands on 2024-01-17
        let resolved = resolve_date(2, 3, date(2024, 1, 8)).unwrap();
        assert_eq!(resolved, date(2024, 1, 17));
    }

    #[test]
    fn test_resolve_coordinates_first_week() {
        let anchor = date(2024, 1, 8);
        assert_eq!(resolve_coordinates(anchor, anchor).unwrap(), (1, 1));
        assert_eq!(
            resolve_coordinates(date(2024, 1, 14), anchor).unwrap(),
            (1, 7)
        );
        assert_eq!(
            resolve_coordinates(date(2024, 1, 15), anchor).unwrap(),
            (2, 1)
        );
    }

    #[test]
    fn test_round_trip_over_eight_weeks() {
        let anchor = date(2024, 1, 8);
        for offset in 0..56 {
            let d = anchor + Duration::days(offset);
            let (week, dow) = resolve_coordinates(d, anchor).unwrap();
            assert_eq!(resolve_date(week, dow, anchor).unwrap(), d);
        }
    }

    #[test]
    fn test_date_before_anchor_rejected() {
        let anchor = date(2024, 1, 8);
        assert!(resolve_coordinates(date(2024, 1, 7), anchor).is_err());
    }

    #[test]
    fn test_invalid_relative_coordinates_rejected() {
        let anchor = date(2024, 1, 8);
        assert!(resolve_date(0, 3, anchor).is_err());
        assert!(resolve_date(1, 0, anchor).is_err());
        assert!(resolve_date(1, 8, anchor).is_err());
    }

    #[test]
    fn test_resolve_slot_prefers_explicit_date() {
        let anchor = date(2024, 1, 8);
        let explicit = ScheduleSlot::Explicit {
            date: date(2024, 3, 1),
        };
        assert_eq!(resolve_slot(&explicit, anchor).unwrap(), date(2024, 3, 1));

        let relative = ScheduleSlot::Relative {
            week: 2,
            day_of_week: 3,
        };
        assert_eq!(resolve_slot(&relative, anchor).unwrap(), date(2024, 1, 17));
    }

    #[test]
    fn test_needs_repair() {
        assert!(needs_repair(date(2024, 1, 10)));
        assert!(!needs_repair(date(2024, 1, 8)));
    }
}
