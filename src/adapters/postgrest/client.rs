use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::types::StoreConfig;
use crate::domain::calendar::{
    CalendarDay, CalendarDayChanges, CalendarDayDraft, DateRange, DayStatus,
};
use crate::domain::seasonal_price::SeasonalPrice;
use crate::domain::villa::{Reservation, Villa};
use crate::error::{BookingError, Result};
use crate::ports::booking_store::BookingStore;

use super::rate_limiter::RateLimiter;
use super::rows::{CalendarDayRow, PostgrestErrorBody, ReservationRow, SeasonalPriceRow, VillaRow};

const VILLAS: &str = "villas";
const RESERVATIONS: &str = "reservations";
const CALENDAR_DAYS: &str = "calendar_days";
const SEASONAL_PRICES: &str = "seasonal_prices";

const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// `BookingStore` backed by a PostgREST endpoint (for example Supabase's
/// `/rest/v1`). Reads are retried on transient failures; writes are sent once.
pub struct PostgrestStore {
    http: Client,
    rate_limiter: RateLimiter,
    base_url: Url,
    api_key: Option<String>,
    max_retries: u32,
    timeout_secs: u64,
}

impl PostgrestStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let mut base_url = Url::parse(config.base_url.trim())?;
        // `Url::join` drops the last path segment unless it ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http,
            rate_limiter: RateLimiter::new(config.rate_limit_per_second),
            base_url,
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            timeout_secs: config.request_timeout_secs,
        })
    }

    fn table_url(&self, table: &str, filters: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base_url.join(table)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (column, filter) in filters {
                pairs.append_pair(column, filter);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder
                .header("apikey", key)
                .header("Authorization", format!("Bearer {key}"));
        }
        builder
    }

    fn transport_error(&self, error: reqwest::Error) -> BookingError {
        if error.is_timeout() {
            BookingError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            BookingError::Http(error)
        }
    }

    fn decode<T: DeserializeOwned>(table: &str, body: &str) -> Result<Vec<T>> {
        trace!(table, body, "Store raw response");
        serde_json::from_str(body).map_err(|e| BookingError::Store {
            reason: format!("{table} response could not be decoded: {e}"),
        })
    }

    /// GET with retries on 429, 5xx, timeouts and connection failures.
    async fn select<T: DeserializeOwned>(&self, table: &str, url: Url) -> Result<Vec<T>> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = RETRY_BACKOFF * attempt;
                debug!(table, attempt, delay_ms = delay.as_millis(), "Retrying store read");
                tokio::time::sleep(delay).await;
            }
            self.rate_limiter.wait().await;
            debug!(url = %url, "Store GET");

            let error = match self.request(Method::GET, url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .map_err(|e| self.transport_error(e))?;
                    if status.is_success() {
                        return Self::decode(table, &body);
                    }
                    map_status(status, &body, table)
                }
                Err(e) => self.transport_error(e),
            };

            if !error.is_retryable() {
                return Err(error);
            }
            warn!(table, attempt, error = %error, "Store read failed");
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| BookingError::StoreUnavailable {
            reason: "all retries exhausted".into(),
        }))
    }

    /// Single write returning the affected rows (`Prefer: return=representation`).
    async fn write<T, B>(
        &self,
        method: Method,
        table: &str,
        url: Url,
        body: Option<&B>,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        self.rate_limiter.wait().await;
        debug!(method = %method, url = %url, "Store write");

        let mut builder = self
            .request(method, url)
            .header("Prefer", "return=representation");
        if let Some(body) = body {
            // Encoding failures surface as Json, not Http.
            builder = builder.json(&serde_json::to_value(body)?);
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(map_status(status, &text, table));
        }
        Self::decode(table, &text)
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        entity: &'static str,
        id: &str,
    ) -> Result<T> {
        let url = self.table_url(
            table,
            &[("id", format!("eq.{id}")), ("limit", "1".into())],
        )?;
        self.select(table, url)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::not_found(entity, id))
    }
}

/// Map a non-success PostgREST response onto the store error taxonomy.
pub(crate) fn map_status(status: StatusCode, body: &str, table: &str) -> BookingError {
    let parsed = PostgrestErrorBody::parse(body);
    let reason = parsed.describe(&format!("{table} returned HTTP {status}"));
    // Postgres error codes take precedence over the HTTP status.
    match parsed.code.as_deref() {
        Some("23505") => return BookingError::Conflict { reason },
        Some("23503" | "23502" | "22P02" | "22007") => return BookingError::BadRequest { reason },
        _ => {}
    }
    match status.as_u16() {
        409 => BookingError::Conflict { reason },
        400 => BookingError::BadRequest { reason },
        429 | 500..=599 => BookingError::StoreUnavailable { reason },
        _ => BookingError::Store { reason },
    }
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = BookingError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl BookingStore for PostgrestStore {
    async fn find_villa_by_id(&self, id: &str) -> Result<Villa> {
        let row: VillaRow = self.select_one(VILLAS, "Villa", id).await?;
        Ok(row.into())
    }

    async fn find_reservation_by_id(&self, id: &str) -> Result<Reservation> {
        let row: ReservationRow = self.select_one(RESERVATIONS, "Reservation", id).await?;
        Ok(row.into())
    }

    async fn list_calendar_days(
        &self,
        villa_id: &str,
        range: Option<DateRange>,
        status: Option<DayStatus>,
    ) -> Result<Vec<CalendarDay>> {
        let mut filters = vec![("villa_id", format!("eq.{villa_id}"))];
        if let Some(range) = range {
            filters.push(("date", format!("gte.{}", range.start)));
            filters.push(("date", format!("lte.{}", range.end)));
        }
        if let Some(status) = status {
            filters.push(("status", format!("eq.{status}")));
        }
        filters.push(("order", "date.asc,id.asc".into()));

        let url = self.table_url(CALENDAR_DAYS, &filters)?;
        let rows: Vec<CalendarDayRow> = self.select(CALENDAR_DAYS, url).await?;
        debug!(villa_id, count = rows.len(), "Calendar days fetched");
        collect(rows)
    }

    async fn find_calendar_day(&self, id: &str) -> Result<CalendarDay> {
        let row: CalendarDayRow = self.select_one(CALENDAR_DAYS, "Calendar day", id).await?;
        row.try_into()
    }

    async fn create_calendar_day(&self, draft: &CalendarDayDraft) -> Result<CalendarDay> {
        let url = self.table_url(CALENDAR_DAYS, &[])?;
        let rows: Vec<CalendarDayRow> = self
            .write(Method::POST, CALENDAR_DAYS, url, Some(draft))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BookingError::Store {
                reason: "insert returned no representation".into(),
            })?
            .try_into()
    }

    async fn update_calendar_day(
        &self,
        id: &str,
        changes: &CalendarDayChanges,
    ) -> Result<CalendarDay> {
        if changes.is_empty() {
            return self.find_calendar_day(id).await;
        }
        let url = self.table_url(CALENDAR_DAYS, &[("id", format!("eq.{id}"))])?;
        let rows: Vec<CalendarDayRow> = self
            .write(Method::PATCH, CALENDAR_DAYS, url, Some(changes))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BookingError::not_found("Calendar day", id))?
            .try_into()
    }

    async fn delete_calendar_day(&self, id: &str) -> Result<()> {
        let url = self.table_url(CALENDAR_DAYS, &[("id", format!("eq.{id}"))])?;
        let rows: Vec<CalendarDayRow> = self
            .write(Method::DELETE, CALENDAR_DAYS, url, None::<&()>)
            .await?;
        if rows.is_empty() {
            return Err(BookingError::not_found("Calendar day", id));
        }
        Ok(())
    }

    async fn list_seasonal_prices(
        &self,
        villa_id: &str,
        active_only: bool,
    ) -> Result<Vec<SeasonalPrice>> {
        let mut filters = vec![("villa_id", format!("eq.{villa_id}"))];
        if active_only {
            filters.push(("is_active", "is.true".into()));
        }
        filters.push(("order", "start_date.asc".into()));

        let url = self.table_url(SEASONAL_PRICES, &filters)?;
        let rows: Vec<SeasonalPriceRow> = self.select(SEASONAL_PRICES, url).await?;
        Ok(rows.into_iter().map(SeasonalPrice::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base_url: &str) -> PostgrestStore {
        let config = StoreConfig {
            base_url: base_url.into(),
            ..StoreConfig::default()
        };
        PostgrestStore::new(&config).unwrap()
    }

    #[test]
    fn table_url_keeps_base_path() {
        let store = store("https://db.example.com/rest/v1");
        let url = store
            .table_url(CALENDAR_DAYS, &[("villa_id", "eq.v1".into())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://db.example.com/rest/v1/calendar_days?villa_id=eq.v1"
        );
    }

    #[test]
    fn table_url_repeats_column_filters() {
        let store = store("https://db.example.com/rest/v1/");
        let url = store
            .table_url(
                CALENDAR_DAYS,
                &[
                    ("date", "gte.2024-06-01".into()),
                    ("date", "lte.2024-06-30".into()),
                ],
            )
            .unwrap();
        assert_eq!(url.query(), Some("date=gte.2024-06-01&date=lte.2024-06-30"));
    }

    #[test]
    fn map_status_unique_violation_is_conflict() {
        let err = map_status(
            StatusCode::CONFLICT,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#,
            CALENDAR_DAYS,
        );
        assert!(matches!(err, BookingError::Conflict { .. }));
    }

    #[test]
    fn map_status_foreign_key_is_bad_request() {
        let err = map_status(
            StatusCode::CONFLICT,
            r#"{"code":"23503","message":"insert violates foreign key"}"#,
            CALENDAR_DAYS,
        );
        assert!(matches!(err, BookingError::BadRequest { .. }));
    }

    #[test]
    fn map_status_server_errors_are_retryable() {
        let err = map_status(StatusCode::SERVICE_UNAVAILABLE, "", CALENDAR_DAYS);
        assert!(matches!(err, BookingError::StoreUnavailable { .. }));
        assert!(err.is_retryable());
        let err = map_status(StatusCode::TOO_MANY_REQUESTS, "", CALENDAR_DAYS);
        assert!(err.is_retryable());
    }

    #[test]
    fn map_status_unauthorized_is_store_error() {
        let err = map_status(StatusCode::UNAUTHORIZED, r#"{"message":"JWT expired"}"#, VILLAS);
        assert!(matches!(err, BookingError::Store { ref reason } if reason == "JWT expired"));
        assert!(!err.is_retryable());
    }
}
