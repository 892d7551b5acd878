use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::availability::{NightIndex, first_unavailable_between};
use crate::domain::calendar::{CalendarDay, night_count};
use crate::error::{BookingError, Result};

/// Interactive check-in/check-out picking. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaySelection {
    #[default]
    NoDatesSelected,
    StartSelected {
        start: NaiveDate,
    },
    RangeSelected {
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl StaySelection {
    /// Feed one clicked date into the selection.
    ///
    /// On rejection the error says why and the selection is left as it was.
    pub fn select(
        &mut self,
        date: NaiveDate,
        calendar: &[CalendarDay],
        minimum_stay: u32,
    ) -> Result<()> {
        let next = match *self {
            Self::NoDatesSelected | Self::RangeSelected { .. } => Self::StartSelected { start: date },
            Self::StartSelected { start } if date < start => Self::StartSelected { start: date },
            Self::StartSelected { start } => {
                let nights = night_count(start, date);
                if nights < i64::from(minimum_stay.max(1)) {
                    return Err(BookingError::bad_request(format!(
                        "minimum stay is {minimum_stay} nights, selected {nights}"
                    )));
                }
                // The anchor night itself, then every night up to the new check-out.
                let blocked = (!NightIndex::new(calendar).is_available(start))
                    .then_some(start)
                    .or_else(|| first_unavailable_between(calendar, start, date));
                if let Some(blocked) = blocked {
                    return Err(BookingError::Availability { date: blocked });
                }
                Self::RangeSelected { start, end: date }
            }
        };
        *self = next;
        Ok(())
    }

    pub fn range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match *self {
            Self::RangeSelected { start, end } => Some((start, end)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::calendar::DayStatus;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn june(statuses: &[DayStatus]) -> Vec<CalendarDay> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, s)| CalendarDay {
                id: format!("d{i}"),
                villa_id: "v1".into(),
                date: date(&format!("2024-06-{:02}", i + 1)),
                status: *s,
                price: None,
                note: None,
                event_type: None,
                reservation_id: None,
            })
            .collect()
    }

    #[test]
    fn first_click_selects_start() {
        let mut sel = StaySelection::default();
        sel.select(date("2024-06-02"), &[], 1).unwrap();
        assert_eq!(
            sel,
            StaySelection::StartSelected {
                start: date("2024-06-02")
            }
        );
    }

    #[test]
    fn earlier_click_reanchors_start() {
        let mut sel = StaySelection::StartSelected {
            start: date("2024-06-05"),
        };
        sel.select(date("2024-06-02"), &[], 1).unwrap();
        assert_eq!(
            sel,
            StaySelection::StartSelected {
                start: date("2024-06-02")
            }
        );
    }

    #[test]
    fn valid_later_click_completes_range() {
        let days = june(&[DayStatus::Available; 5]);
        let mut sel = StaySelection::StartSelected {
            start: date("2024-06-01"),
        };
        sel.select(date("2024-06-04"), &days, 2).unwrap();
        assert_eq!(sel.range(), Some((date("2024-06-01"), date("2024-06-04"))));
    }

    #[test]
    fn blocked_interior_rejects_and_keeps_start() {
        use DayStatus::{Available, Blocked};
        let days = june(&[Available, Available, Blocked, Available, Available]);
        let mut sel = StaySelection::StartSelected {
            start: date("2024-06-01"),
        };
        let err = sel.select(date("2024-06-05"), &days, 1).unwrap_err();
        assert!(matches!(err, BookingError::Availability { date: d } if d == date("2024-06-03")));
        assert_eq!(
            sel,
            StaySelection::StartSelected {
                start: date("2024-06-01")
            }
        );
    }

    #[test]
    fn below_minimum_stay_is_rejected() {
        let days = june(&[DayStatus::Available; 5]);
        let mut sel = StaySelection::StartSelected {
            start: date("2024-06-01"),
        };
        assert!(sel.select(date("2024-06-02"), &days, 3).is_err());
        assert!(sel.range().is_none());
    }

    #[test]
    fn same_date_as_start_is_rejected() {
        let days = june(&[DayStatus::Available; 5]);
        let mut sel = StaySelection::StartSelected {
            start: date("2024-06-01"),
        };
        assert!(sel.select(date("2024-06-01"), &days, 1).is_err());
    }

    #[test]
    fn click_after_range_restarts() {
        let mut sel = StaySelection::RangeSelected {
            start: date("2024-06-01"),
            end: date("2024-06-04"),
        };
        sel.select(date("2024-06-10"), &[], 1).unwrap();
        assert_eq!(
            sel,
            StaySelection::StartSelected {
                start: date("2024-06-10")
            }
        );
    }
}
