use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::calendar::{CalendarDay, stay_nights};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayAvailability {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_unavailable_date: Option<NaiveDate>,
    pub nights: u32,
}

/// Calendar rows indexed by date for per-night lookups.
pub struct NightIndex<'a> {
    by_date: HashMap<NaiveDate, &'a CalendarDay>,
}

impl<'a> NightIndex<'a> {
    pub fn new(days: &'a [CalendarDay]) -> Self {
        Self {
            by_date: days.iter().map(|d| (d.date, d)).collect(),
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&'a CalendarDay> {
        self.by_date.get(&date).copied()
    }

    /// A night is bookable only when its row exists and is `AVAILABLE`.
    /// Dates outside the loaded window have no row and fail closed.
    pub fn is_available(&self, date: NaiveDate) -> bool {
        self.get(date).is_some_and(CalendarDay::is_available)
    }
}

/// Check every night of `[check_in, check_out)` against the loaded calendar.
pub fn evaluate_stay_availability(
    days: &[CalendarDay],
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> StayAvailability {
    let nights = stay_nights(check_in, check_out);
    if nights.is_empty() {
        return StayAvailability {
            available: false,
            first_unavailable_date: None,
            nights: 0,
        };
    }

    let index = NightIndex::new(days);
    let first_unavailable_date = nights.iter().copied().find(|d| !index.is_available(*d));
    StayAvailability {
        available: first_unavailable_date.is_none(),
        first_unavailable_date,
        nights: u32::try_from(nights.len()).unwrap_or(u32::MAX),
    }
}

/// First unavailable date strictly between `start` and `end`, used when a
/// guest extends a selection from an already chosen check-in.
pub fn first_unavailable_between(
    days: &[CalendarDay],
    start: NaiveDate,
    end: NaiveDate,
) -> Option<NaiveDate> {
    let index = NightIndex::new(days);
    start
        .iter_days()
        .skip(1)
        .take_while(|d| *d < end)
        .find(|d| !index.is_available(*d))
}

impl std::fmt::Display for StayAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.nights == 0 {
            return write!(f, "Invalid stay: check-out must be after check-in");
        }
        if self.available {
            write!(f, "Available for all {} nights", self.nights)
        } else if let Some(date) = self.first_unavailable_date {
            write!(
                f,
                "Not available: night of {date} cannot be booked ({} nights requested)",
                self.nights
            )
        } else {
            write!(f, "Not available")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::calendar::{DayStatus, EventType};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn day(d: &str, status: DayStatus) -> CalendarDay {
        CalendarDay {
            id: format!("day-{d}"),
            villa_id: "v1".into(),
            date: date(d),
            status,
            price: None,
            note: None,
            event_type: None,
            reservation_id: None,
        }
    }

    fn june(statuses: &[DayStatus]) -> Vec<CalendarDay> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, s)| day(&format!("2024-06-{:02}", i + 1), *s))
            .collect()
    }

    #[test]
    fn all_available_nights_make_stay_available() {
        let days = june(&[DayStatus::Available; 4]);
        let result = evaluate_stay_availability(&days, date("2024-06-01"), date("2024-06-04"));
        assert!(result.available);
        assert_eq!(result.nights, 3);
        assert_eq!(result.first_unavailable_date, None);
    }

    #[test]
    fn blocked_middle_night_reports_that_date() {
        use DayStatus::{Available, Blocked};
        let days = june(&[Available, Available, Blocked, Available, Available]);
        let result = evaluate_stay_availability(&days, date("2024-06-01"), date("2024-06-05"));
        assert!(!result.available);
        assert_eq!(result.first_unavailable_date, Some(date("2024-06-03")));
    }

    #[test]
    fn pending_and_reserved_block_too() {
        for status in [DayStatus::Pending, DayStatus::Reserved] {
            let days = june(&[DayStatus::Available, status]);
            let result =
                evaluate_stay_availability(&days, date("2024-06-01"), date("2024-06-03"));
            assert!(!result.available, "{status} should block");
        }
    }

    #[test]
    fn checkout_date_status_is_not_checked() {
        let days = june(&[DayStatus::Available, DayStatus::Available, DayStatus::Reserved]);
        let result = evaluate_stay_availability(&days, date("2024-06-01"), date("2024-06-03"));
        assert!(result.available);
    }

    #[test]
    fn event_annotations_do_not_block() {
        let mut days = june(&[DayStatus::Available; 3]);
        days[0].event_type = Some(EventType::Checkin);
        days[1].event_type = Some(EventType::Checkout);
        let result = evaluate_stay_availability(&days, date("2024-06-01"), date("2024-06-03"));
        assert!(result.available);
    }

    #[test]
    fn missing_row_fails_closed() {
        let days = june(&[DayStatus::Available; 2]);
        let result = evaluate_stay_availability(&days, date("2024-06-01"), date("2024-06-04"));
        assert!(!result.available);
        assert_eq!(result.first_unavailable_date, Some(date("2024-06-03")));
    }

    #[test]
    fn zero_or_negative_stay_is_unavailable() {
        let days = june(&[DayStatus::Available; 3]);
        let same = evaluate_stay_availability(&days, date("2024-06-02"), date("2024-06-02"));
        assert!(!same.available);
        assert_eq!(same.nights, 0);
        let inverted = evaluate_stay_availability(&days, date("2024-06-03"), date("2024-06-01"));
        assert!(!inverted.available);
    }

    #[test]
    fn single_night_only_checks_that_date() {
        let days = june(&[DayStatus::Available, DayStatus::Blocked]);
        let result = evaluate_stay_availability(&days, date("2024-06-01"), date("2024-06-02"));
        assert!(result.available);
        assert_eq!(result.nights, 1);
    }

    #[test]
    fn interior_check_skips_endpoints() {
        use DayStatus::{Available, Blocked};
        let days = june(&[Blocked, Available, Available, Blocked]);
        assert_eq!(
            first_unavailable_between(&days, date("2024-06-01"), date("2024-06-04")),
            None
        );
        let days = june(&[Available, Available, Blocked, Available]);
        assert_eq!(
            first_unavailable_between(&days, date("2024-06-01"), date("2024-06-04")),
            Some(date("2024-06-03"))
        );
    }
}
