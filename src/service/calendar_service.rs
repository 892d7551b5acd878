//! Calendar service: validated reads and writes of calendar days.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::calendar::{
    CalendarDay, CalendarDayChanges, CalendarDayDraft, CalendarDayPatch, DateRange, DayStatus,
    DeletedDay, NewCalendarDay, parse_date,
};
use crate::domain::patch::Patch;
use crate::domain::seasonal_price::resolve_seasonal_price;
use crate::error::{BookingError, Result};
use crate::ports::booking_store::BookingStore;

/// Longest range accepted by the bulk operations.
pub const MAX_RANGE_DAYS: i64 = 366;

/// Raw calendar listing request. Empty strings count as absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CalendarQuery {
    pub villa_id: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Outcome of a bulk operation over a date range. Each date lands in
/// exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RangeReport {
    pub updated: Vec<NaiveDate>,
    pub created: Vec<NaiveDate>,
    pub skipped: Vec<NaiveDate>,
    pub failed: Vec<DateFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateFailure {
    pub date: NaiveDate,
    pub category: &'static str,
    pub message: String,
}

impl RangeReport {
    fn fail(&mut self, date: NaiveDate, error: &BookingError) {
        warn!(%date, error = %error, "Range operation failed for date");
        self.failed.push(DateFailure {
            date,
            category: error.kind().category(),
            message: error.to_string(),
        });
    }

    pub fn total(&self) -> usize {
        self.updated.len() + self.created.len() + self.skipped.len() + self.failed.len()
    }
}

impl std::fmt::Display for RangeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} updated, {} created, {} skipped, {} failed",
            self.updated.len(),
            self.created.len(),
            self.skipped.len(),
            self.failed.len()
        )?;
        for failure in &self.failed {
            writeln!(f, "- {} [{}] {}", failure.date, failure.category, failure.message)?;
        }
        Ok(())
    }
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn bounded_range(start: &str, end: &str) -> Result<DateRange> {
    let range = DateRange::new(parse_date(start)?, parse_date(end)?)?;
    if range.len_days() > MAX_RANGE_DAYS {
        return Err(BookingError::bad_request(format!(
            "range of {} days exceeds the {MAX_RANGE_DAYS}-day limit",
            range.len_days()
        )));
    }
    Ok(range)
}

/// Orchestrates calendar reads and writes over a [`BookingStore`].
///
/// Every mutating method validates its input and the referenced villa and
/// reservation before the first store write.
#[derive(Clone)]
pub struct CalendarService {
    store: Arc<dyn BookingStore>,
}

impl CalendarService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Days of one villa ordered by date, optionally restricted to an
    /// inclusive range and a status.
    pub async fn list_days(&self, query: &CalendarQuery) -> Result<Vec<CalendarDay>> {
        let villa_id = present(Some(&query.villa_id))
            .ok_or_else(|| BookingError::bad_request("villa_id is required"))?;
        let range = match (
            present(query.start_date.as_deref()),
            present(query.end_date.as_deref()),
        ) {
            (None, None) => None,
            (Some(start), Some(end)) => Some(DateRange::new(parse_date(start)?, parse_date(end)?)?),
            _ => {
                return Err(BookingError::bad_request(
                    "start_date and end_date must be given together",
                ));
            }
        };
        let status = present(query.status.as_deref())
            .map(str::parse::<DayStatus>)
            .transpose()?;

        self.store.find_villa_by_id(villa_id).await?;
        let mut days = self.store.list_calendar_days(villa_id, range, status).await?;
        days.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        debug!(villa_id, count = days.len(), "Listed calendar days");
        Ok(days)
    }

    pub async fn create_day(&self, input: NewCalendarDay) -> Result<CalendarDay> {
        let draft = input.validate()?;
        self.store.find_villa_by_id(&draft.villa_id).await?;
        if let Some(reservation_id) = &draft.reservation_id {
            self.ensure_reservation(reservation_id, &draft.villa_id).await?;
        }
        self.ensure_date_free(&draft.villa_id, draft.date, None).await?;

        let day = self.store.create_calendar_day(&draft).await?;
        info!(id = %day.id, villa_id = %day.villa_id, date = %day.date, "Calendar day created");
        Ok(day)
    }

    pub async fn update_day(&self, id: &str, patch: CalendarDayPatch) -> Result<CalendarDay> {
        let current = self.store.find_calendar_day(id).await?;
        let changes = patch.validate(&current.villa_id)?;
        if changes.is_empty() {
            return Ok(current);
        }
        if let Patch::Value(reservation_id) = &changes.reservation_id {
            self.ensure_reservation(reservation_id, &current.villa_id)
                .await?;
        }
        if let Some(date) = changes.date.filter(|d| *d != current.date) {
            self.ensure_date_free(&current.villa_id, date, Some(id))
                .await?;
        }

        let day = self.store.update_calendar_day(id, &changes).await?;
        info!(id, villa_id = %day.villa_id, date = %day.date, "Calendar day updated");
        Ok(day)
    }

    pub async fn delete_day(&self, id: &str) -> Result<DeletedDay> {
        let day = self.store.find_calendar_day(id).await?;
        self.store.delete_calendar_day(id).await?;
        info!(id, villa_id = %day.villa_id, date = %day.date, "Calendar day deleted");
        Ok(DeletedDay::from(&day))
    }

    /// Apply one patch to every date of an inclusive range, creating rows
    /// for dates that have none. Each date succeeds or fails on its own.
    pub async fn update_range(
        &self,
        villa_id: &str,
        start: &str,
        end: &str,
        patch: CalendarDayPatch,
    ) -> Result<RangeReport> {
        if patch.date.is_present() {
            return Err(BookingError::bad_request(
                "date cannot be part of a range update",
            ));
        }
        if patch.is_empty() {
            return Err(BookingError::bad_request("range update has no changes"));
        }
        let range = bounded_range(start, end)?;
        let changes = patch.validate(villa_id)?;

        self.store.find_villa_by_id(villa_id).await?;
        if let Patch::Value(reservation_id) = &changes.reservation_id {
            self.ensure_reservation(reservation_id, villa_id).await?;
        }

        let existing = self
            .store
            .list_calendar_days(villa_id, Some(range), None)
            .await?;
        let mut report = RangeReport::default();
        for date in range.days() {
            match existing.iter().find(|d| d.date == date) {
                Some(day) => match self.store.update_calendar_day(&day.id, &changes).await {
                    Ok(_) => report.updated.push(date),
                    Err(e) => report.fail(date, &e),
                },
                None => {
                    let draft = draft_from_changes(villa_id, date, &changes);
                    match self.store.create_calendar_day(&draft).await {
                        Ok(_) => report.created.push(date),
                        Err(e) => report.fail(date, &e),
                    }
                }
            }
        }

        info!(
            villa_id,
            updated = report.updated.len(),
            created = report.created.len(),
            failed = report.failed.len(),
            "Calendar range updated"
        );
        Ok(report)
    }

    /// Write seasonal nightly prices onto calendar dates that have no price.
    ///
    /// Dates that already carry a price are skipped. Dates no active season
    /// covers are reported as failures.
    pub async fn project_seasonal_prices(
        &self,
        villa_id: &str,
        start: &str,
        end: &str,
    ) -> Result<RangeReport> {
        let range = bounded_range(start, end)?;
        self.store.find_villa_by_id(villa_id).await?;
        let seasons = self.store.list_seasonal_prices(villa_id, true).await?;
        let existing = self
            .store
            .list_calendar_days(villa_id, Some(range), None)
            .await?;

        let mut report = RangeReport::default();
        for date in range.days() {
            let day = existing.iter().find(|d| d.date == date);
            if day.is_some_and(|d| d.price.is_some()) {
                report.skipped.push(date);
                continue;
            }
            let Some(season) = resolve_seasonal_price(date, &seasons) else {
                report.fail(date, &BookingError::Pricing { date });
                continue;
            };

            match day {
                Some(day) => {
                    let changes = CalendarDayChanges {
                        price: Patch::Value(season.nightly_price),
                        ..CalendarDayChanges::default()
                    };
                    match self.store.update_calendar_day(&day.id, &changes).await {
                        Ok(_) => report.updated.push(date),
                        Err(e) => report.fail(date, &e),
                    }
                }
                None => {
                    let draft = CalendarDayDraft {
                        villa_id: villa_id.to_string(),
                        date,
                        status: DayStatus::Available,
                        price: Some(season.nightly_price),
                        note: None,
                        event_type: None,
                        reservation_id: None,
                    };
                    match self.store.create_calendar_day(&draft).await {
                        Ok(_) => report.created.push(date),
                        Err(e) => report.fail(date, &e),
                    }
                }
            }
        }

        info!(
            villa_id,
            updated = report.updated.len(),
            created = report.created.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Seasonal prices projected"
        );
        Ok(report)
    }

    async fn ensure_reservation(&self, reservation_id: &str, villa_id: &str) -> Result<()> {
        let reservation = match self.store.find_reservation_by_id(reservation_id).await {
            Ok(reservation) => reservation,
            Err(BookingError::NotFound { .. }) => {
                return Err(BookingError::bad_request(format!(
                    "reservation {reservation_id} does not exist"
                )));
            }
            Err(e) => return Err(e),
        };
        if reservation.villa_id != villa_id {
            return Err(BookingError::bad_request(format!(
                "reservation {reservation_id} belongs to another villa"
            )));
        }
        Ok(())
    }

    /// Conflict when another row of the villa already holds `date`.
    async fn ensure_date_free(
        &self,
        villa_id: &str,
        date: NaiveDate,
        except_id: Option<&str>,
    ) -> Result<()> {
        let taken = self
            .store
            .list_calendar_days(villa_id, Some(DateRange::new(date, date)?), None)
            .await?
            .into_iter()
            .any(|d| Some(d.id.as_str()) != except_id);
        if taken {
            return Err(BookingError::Conflict {
                reason: format!("villa {villa_id} already has a calendar day on {date}"),
            });
        }
        Ok(())
    }
}

fn draft_from_changes(villa_id: &str, date: NaiveDate, changes: &CalendarDayChanges) -> CalendarDayDraft {
    let mut draft = CalendarDayDraft {
        villa_id: villa_id.to_string(),
        date,
        status: changes.status.unwrap_or_default(),
        price: None,
        note: None,
        event_type: None,
        reservation_id: None,
    };
    changes.price.clone().apply_to(&mut draft.price);
    changes.note.clone().apply_to(&mut draft.note);
    changes.event_type.clone().apply_to(&mut draft.event_type);
    changes.reservation_id.clone().apply_to(&mut draft.reservation_id);
    draft
}
