use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::adapters::memory_store::MemoryStore;
use crate::domain::calendar::{
    CalendarDay, CalendarDayChanges, CalendarDayDraft, DateRange, DayStatus,
};
use crate::domain::seasonal_price::SeasonalPrice;
use crate::domain::villa::{Reservation, Villa};
use crate::error::Result;
use crate::ports::booking_store::BookingStore;

type CreateFn = Box<dyn Fn(&CalendarDayDraft) -> Option<Result<CalendarDay>> + Send + Sync>;
type UpdateFn =
    Box<dyn Fn(&str, &CalendarDayChanges) -> Option<Result<CalendarDay>> + Send + Sync>;

/// A [`MemoryStore`] whose writes can be intercepted and counted.
///
/// An override returning `None` falls through to the inner store.
pub struct MockBookingStore {
    inner: MemoryStore,
    create_fn: Mutex<CreateFn>,
    update_fn: Mutex<UpdateFn>,
    writes: AtomicUsize,
}

impl Default for MockBookingStore {
    fn default() -> Self {
        Self::new(seeded_store())
    }
}

impl MockBookingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            create_fn: Mutex::new(Box::new(|_| None)),
            update_fn: Mutex::new(Box::new(|_, _| None)),
            writes: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_create(
        self,
        f: impl Fn(&CalendarDayDraft) -> Option<Result<CalendarDay>> + Send + Sync + 'static,
    ) -> Self {
        *self.create_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_update(
        self,
        f: impl Fn(&str, &CalendarDayChanges) -> Option<Result<CalendarDay>> + Send + Sync + 'static,
    ) -> Self {
        *self.update_fn.lock().unwrap() = Box::new(f);
        self
    }

    /// Create, update and delete calls seen so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BookingStore for MockBookingStore {
    async fn find_villa_by_id(&self, id: &str) -> Result<Villa> {
        self.inner.find_villa_by_id(id).await
    }

    async fn find_reservation_by_id(&self, id: &str) -> Result<Reservation> {
        self.inner.find_reservation_by_id(id).await
    }

    async fn list_calendar_days(
        &self,
        villa_id: &str,
        range: Option<DateRange>,
        status: Option<DayStatus>,
    ) -> Result<Vec<CalendarDay>> {
        self.inner.list_calendar_days(villa_id, range, status).await
    }

    async fn find_calendar_day(&self, id: &str) -> Result<CalendarDay> {
        self.inner.find_calendar_day(id).await
    }

    async fn create_calendar_day(&self, draft: &CalendarDayDraft) -> Result<CalendarDay> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let overridden = (self.create_fn.lock().unwrap())(draft);
        match overridden {
            Some(result) => result,
            None => self.inner.create_calendar_day(draft).await,
        }
    }

    async fn update_calendar_day(
        &self,
        id: &str,
        changes: &CalendarDayChanges,
    ) -> Result<CalendarDay> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let overridden = (self.update_fn.lock().unwrap())(id, changes);
        match overridden {
            Some(result) => result,
            None => self.inner.update_calendar_day(id, changes).await,
        }
    }

    async fn delete_calendar_day(&self, id: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_calendar_day(id).await
    }

    async fn list_seasonal_prices(
        &self,
        villa_id: &str,
        active_only: bool,
    ) -> Result<Vec<SeasonalPrice>> {
        self.inner.list_seasonal_prices(villa_id, active_only).await
    }
}

// ---------- Builders ----------

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_villa(id: &str, name: &str, cleaning_fee: i64) -> Villa {
    Villa {
        id: id.into(),
        name: name.into(),
        cleaning_fee: Decimal::from(cleaning_fee),
        short_stay_day_limit: None,
        minimum_stay: None,
        currency_id: None,
    }
}

/// An available day without a price.
pub fn calendar_day(id: &str, villa_id: &str, day: &str) -> CalendarDay {
    CalendarDay {
        id: id.into(),
        villa_id: villa_id.into(),
        date: date(day),
        status: DayStatus::Available,
        price: None,
        note: None,
        event_type: None,
        reservation_id: None,
    }
}

pub fn priced_day(id: &str, villa_id: &str, day: &str, price: i64, status: DayStatus) -> CalendarDay {
    CalendarDay {
        price: Some(Decimal::from(price)),
        status,
        ..calendar_day(id, villa_id, day)
    }
}

pub fn make_season(
    id: &str,
    villa_id: &str,
    start: &str,
    end: &str,
    nightly: i64,
    created_month: u32,
) -> SeasonalPrice {
    SeasonalPrice {
        id: id.into(),
        villa_id: villa_id.into(),
        season_name: format!("Season {id}"),
        start_date: date(start),
        end_date: date(end),
        nightly_price: Decimal::from(nightly),
        weekly_price: None,
        currency_id: None,
        description: None,
        is_active: true,
        created_at: Utc
            .with_ymd_and_hms(2024, created_month, 1, 0, 0, 0)
            .unwrap(),
    }
}

/// Two villas with a June 2024 calendar for `v1`:
///
/// - 06-01 100, 06-02 120, 06-03 110, then 100 per night to 06-14
/// - 06-07 is RESERVED under `r1`
/// - 06-10 has no price
/// - 06-15 and 06-16 exist without a price, inside the `s1` summer season (150)
/// - `s2` (130, created later) overlaps `s1` in the first half of July
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();

    let mut mare = make_villa("v1", "Villa Mare", 50);
    mare.short_stay_day_limit = Some(7);
    mare.minimum_stay = Some(2);
    mare.currency_id = Some("EUR".into());
    store.insert_villa(mare).unwrap();
    store.insert_villa(make_villa("v2", "Villa Monte", 80)).unwrap();

    store
        .insert_reservation(Reservation {
            id: "r1".into(),
            villa_id: "v1".into(),
            check_in: Some(date("2024-06-07")),
            check_out: Some(date("2024-06-08")),
        })
        .unwrap();
    store
        .insert_reservation(Reservation {
            id: "r2".into(),
            villa_id: "v2".into(),
            check_in: None,
            check_out: None,
        })
        .unwrap();

    for day in 1..=14u32 {
        let iso = format!("2024-06-{day:02}");
        let id = format!("v1-{day:02}");
        let price = match day {
            2 => 120,
            3 => 110,
            _ => 100,
        };
        let mut row = priced_day(&id, "v1", &iso, price, DayStatus::Available);
        if day == 7 {
            row.status = DayStatus::Reserved;
            row.reservation_id = Some("r1".into());
        }
        if day == 10 {
            row.price = None;
        }
        store.insert_day(row).unwrap();
    }
    store.insert_day(calendar_day("v1-15", "v1", "2024-06-15")).unwrap();
    store.insert_day(calendar_day("v1-16", "v1", "2024-06-16")).unwrap();

    store
        .insert_seasonal_price(make_season("s1", "v1", "2024-06-15", "2024-09-01", 150, 1))
        .unwrap();
    store
        .insert_seasonal_price(make_season("s2", "v1", "2024-07-01", "2024-07-16", 130, 3))
        .unwrap();

    store
}
