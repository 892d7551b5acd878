use async_trait::async_trait;

use crate::domain::calendar::{
    CalendarDay, CalendarDayChanges, CalendarDayDraft, DateRange, DayStatus,
};
use crate::domain::seasonal_price::SeasonalPrice;
use crate::domain::villa::{Reservation, Villa};
use crate::error::Result;

/// Data-access port for the hosted relational store.
///
/// Implementations report a missing row as `BookingError::NotFound` and a
/// duplicate `(villa_id, date)` as `BookingError::Conflict`; no
/// storage-specific error shape leaks past this trait.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_villa_by_id(&self, id: &str) -> Result<Villa>;

    async fn find_reservation_by_id(&self, id: &str) -> Result<Reservation>;

    /// Rows for one villa, filtered by an inclusive date range and status.
    async fn list_calendar_days(
        &self,
        villa_id: &str,
        range: Option<DateRange>,
        status: Option<DayStatus>,
    ) -> Result<Vec<CalendarDay>>;

    async fn find_calendar_day(&self, id: &str) -> Result<CalendarDay>;

    async fn create_calendar_day(&self, draft: &CalendarDayDraft) -> Result<CalendarDay>;

    async fn update_calendar_day(
        &self,
        id: &str,
        changes: &CalendarDayChanges,
    ) -> Result<CalendarDay>;

    async fn delete_calendar_day(&self, id: &str) -> Result<()>;

    async fn list_seasonal_prices(
        &self,
        villa_id: &str,
        active_only: bool,
    ) -> Result<Vec<SeasonalPrice>>;
}
