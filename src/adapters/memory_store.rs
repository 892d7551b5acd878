use std::collections::HashMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::calendar::{
    CalendarDay, CalendarDayChanges, CalendarDayDraft, DateRange, DayStatus,
};
use crate::domain::seasonal_price::SeasonalPrice;
use crate::domain::villa::{Reservation, Villa};
use crate::error::{BookingError, Result};
use crate::ports::booking_store::BookingStore;

/// Initial data for the memory backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub villas: Vec<Villa>,
    #[serde(default)]
    pub reservations: Vec<Reservation>,
    #[serde(default)]
    pub calendar_days: Vec<CalendarDay>,
    #[serde(default)]
    pub seasonal_prices: Vec<SeasonalPrice>,
}

impl SeedData {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BookingError::Config(format!("failed to read seed file {}: {e}", path.display()))
        })?;
        Ok(serde_yml::from_str(&content)?)
    }
}

#[derive(Default)]
struct Tables {
    villas: HashMap<String, Villa>,
    reservations: HashMap<String, Reservation>,
    days: HashMap<String, CalendarDay>,
    seasonal_prices: Vec<SeasonalPrice>,
    next_day_id: u64,
}

impl Tables {
    fn date_taken(&self, villa_id: &str, date: chrono::NaiveDate, except_id: Option<&str>) -> bool {
        self.days.values().any(|d| {
            d.villa_id == villa_id && d.date == date && Some(d.id.as_str()) != except_id
        })
    }
}

/// In-process store with the same constraints as the hosted database:
/// one calendar row per `(villa_id, date)`.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedData) -> Result<Self> {
        let store = Self::new();
        for villa in seed.villas {
            store.insert_villa(villa)?;
        }
        for reservation in seed.reservations {
            store.insert_reservation(reservation)?;
        }
        for day in seed.calendar_days {
            store.insert_day(day)?;
        }
        for price in seed.seasonal_prices {
            store.insert_seasonal_price(price)?;
        }
        Ok(store)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.inner.read().map_err(|_| {
            tracing::error!("Memory store lock poisoned on read");
            BookingError::StoreUnavailable {
                reason: "memory store lock poisoned".into(),
            }
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.inner.write().map_err(|_| {
            tracing::error!("Memory store lock poisoned on write");
            BookingError::StoreUnavailable {
                reason: "memory store lock poisoned".into(),
            }
        })
    }

    pub fn insert_villa(&self, villa: Villa) -> Result<()> {
        self.write()?.villas.insert(villa.id.clone(), villa);
        Ok(())
    }

    pub fn insert_reservation(&self, reservation: Reservation) -> Result<()> {
        self.write()?
            .reservations
            .insert(reservation.id.clone(), reservation);
        Ok(())
    }

    /// Insert a fully formed row, keeping its id. Rejects a second row for
    /// the same villa and date.
    pub fn insert_day(&self, day: CalendarDay) -> Result<()> {
        let mut tables = self.write()?;
        if tables.date_taken(&day.villa_id, day.date, Some(&day.id)) {
            return Err(duplicate(&day.villa_id, day.date));
        }
        tables.days.insert(day.id.clone(), day);
        Ok(())
    }

    pub fn insert_seasonal_price(&self, price: SeasonalPrice) -> Result<()> {
        price.validate()?;
        self.write()?.seasonal_prices.push(price);
        Ok(())
    }
}

fn duplicate(villa_id: &str, date: chrono::NaiveDate) -> BookingError {
    BookingError::Conflict {
        reason: format!("calendar day already exists for villa {villa_id} on {date}"),
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn find_villa_by_id(&self, id: &str) -> Result<Villa> {
        self.read()?
            .villas
            .get(id)
            .cloned()
            .ok_or_else(|| BookingError::not_found("Villa", id))
    }

    async fn find_reservation_by_id(&self, id: &str) -> Result<Reservation> {
        self.read()?
            .reservations
            .get(id)
            .cloned()
            .ok_or_else(|| BookingError::not_found("Reservation", id))
    }

    async fn list_calendar_days(
        &self,
        villa_id: &str,
        range: Option<DateRange>,
        status: Option<DayStatus>,
    ) -> Result<Vec<CalendarDay>> {
        let tables = self.read()?;
        let mut days: Vec<CalendarDay> = tables
            .days
            .values()
            .filter(|d| d.villa_id == villa_id)
            .filter(|d| range.is_none_or(|r| r.contains(d.date)))
            .filter(|d| status.is_none_or(|s| d.status == s))
            .cloned()
            .collect();
        days.sort_by_key(|d| d.date);
        Ok(days)
    }

    async fn find_calendar_day(&self, id: &str) -> Result<CalendarDay> {
        self.read()?
            .days
            .get(id)
            .cloned()
            .ok_or_else(|| BookingError::not_found("Calendar day", id))
    }

    async fn create_calendar_day(&self, draft: &CalendarDayDraft) -> Result<CalendarDay> {
        let mut tables = self.write()?;
        if tables.date_taken(&draft.villa_id, draft.date, None) {
            return Err(duplicate(&draft.villa_id, draft.date));
        }
        // Seeded rows may already use generated-looking ids.
        let id = loop {
            tables.next_day_id += 1;
            let candidate = format!("day-{}", tables.next_day_id);
            if !tables.days.contains_key(&candidate) {
                break candidate;
            }
        };
        let day = CalendarDay {
            id,
            villa_id: draft.villa_id.clone(),
            date: draft.date,
            status: draft.status,
            price: draft.price,
            note: draft.note.clone(),
            event_type: draft.event_type,
            reservation_id: draft.reservation_id.clone(),
        };
        tables.days.insert(day.id.clone(), day.clone());
        Ok(day)
    }

    async fn update_calendar_day(
        &self,
        id: &str,
        changes: &CalendarDayChanges,
    ) -> Result<CalendarDay> {
        let mut tables = self.write()?;
        let mut day = tables
            .days
            .get(id)
            .cloned()
            .ok_or_else(|| BookingError::not_found("Calendar day", id))?;
        changes.apply_to(&mut day);
        if tables.date_taken(&day.villa_id, day.date, Some(id)) {
            return Err(duplicate(&day.villa_id, day.date));
        }
        tables.days.insert(id.to_string(), day.clone());
        Ok(day)
    }

    async fn delete_calendar_day(&self, id: &str) -> Result<()> {
        self.write()?
            .days
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| BookingError::not_found("Calendar day", id))
    }

    async fn list_seasonal_prices(
        &self,
        villa_id: &str,
        active_only: bool,
    ) -> Result<Vec<SeasonalPrice>> {
        let tables = self.read()?;
        let mut prices: Vec<SeasonalPrice> = tables
            .seasonal_prices
            .iter()
            .filter(|p| p.villa_id == villa_id && (!active_only || p.is_active))
            .cloned()
            .collect();
        prices.sort_by_key(|p| p.start_date);
        Ok(prices)
    }
}
