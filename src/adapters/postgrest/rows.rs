//! Wire shapes of the hosted database tables and their conversion into
//! domain types. Column names are snake_case; ids may be text or integers.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::calendar::{CalendarDay, DayStatus, EventType};
use crate::domain::seasonal_price::SeasonalPrice;
use crate::domain::villa::{Reservation, Villa};
use crate::error::{BookingError, Result};

fn id_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    id_to_string(value).ok_or_else(|| serde::de::Error::custom("id must be a string or integer"))
}

fn optional_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(id_to_string))
}

fn optional_count(value: Option<i64>) -> Option<u32> {
    value.and_then(|n| u32::try_from(n).ok())
}

#[derive(Debug, Deserialize)]
pub struct VillaRow {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cleaning_fee: Option<Decimal>,
    #[serde(default)]
    pub short_stay_day_limit: Option<i64>,
    #[serde(default)]
    pub minimum_stay: Option<i64>,
    #[serde(default, deserialize_with = "optional_id")]
    pub currency_id: Option<String>,
}

impl From<VillaRow> for Villa {
    fn from(row: VillaRow) -> Self {
        Self {
            id: row.id,
            name: row.name.unwrap_or_default(),
            cleaning_fee: row.cleaning_fee.unwrap_or_default(),
            short_stay_day_limit: optional_count(row.short_stay_day_limit),
            minimum_stay: optional_count(row.minimum_stay),
            currency_id: row.currency_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReservationRow {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    #[serde(deserialize_with = "required_id")]
    pub villa_id: String,
    #[serde(default)]
    pub check_in: Option<NaiveDate>,
    #[serde(default)]
    pub check_out: Option<NaiveDate>,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Self {
            id: row.id,
            villa_id: row.villa_id,
            check_in: row.check_in,
            check_out: row.check_out,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CalendarDayRow {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    #[serde(deserialize_with = "required_id")]
    pub villa_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default, deserialize_with = "optional_id")]
    pub reservation_id: Option<String>,
}

impl TryFrom<CalendarDayRow> for CalendarDay {
    type Error = BookingError;

    fn try_from(row: CalendarDayRow) -> Result<Self> {
        // A bad enum value in a stored row is a data problem, not the caller's.
        let status = row
            .status
            .as_deref()
            .map(str::parse::<DayStatus>)
            .transpose()
            .map_err(|e| BookingError::Store {
                reason: format!("calendar day {}: {e}", row.id),
            })?
            .ok_or_else(|| BookingError::Store {
                reason: format!("calendar day {} has no status", row.id),
            })?;
        let event_type = row
            .event_type
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<EventType>)
            .transpose()
            .map_err(|e| BookingError::Store {
                reason: format!("calendar day {}: {e}", row.id),
            })?;
        Ok(Self {
            id: row.id,
            villa_id: row.villa_id,
            date: row.date,
            status,
            price: row.price,
            note: row.note,
            event_type,
            reservation_id: row.reservation_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SeasonalPriceRow {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    #[serde(deserialize_with = "required_id")]
    pub villa_id: String,
    #[serde(default)]
    pub season_name: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub nightly_price: Decimal,
    #[serde(default)]
    pub weekly_price: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_id")]
    pub currency_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl From<SeasonalPriceRow> for SeasonalPrice {
    fn from(row: SeasonalPriceRow) -> Self {
        Self {
            id: row.id,
            villa_id: row.villa_id,
            season_name: row.season_name.unwrap_or_default(),
            start_date: row.start_date,
            end_date: row.end_date,
            nightly_price: row.nightly_price,
            weekly_price: row.weekly_price,
            currency_id: row.currency_id,
            description: row.description,
            is_active: row.is_active.unwrap_or(true),
            created_at: row.created_at,
        }
    }
}

/// Error body returned by PostgREST.
#[derive(Debug, Default, Deserialize)]
pub struct PostgrestErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl PostgrestErrorBody {
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    pub fn describe(&self, fallback: &str) -> String {
        match (&self.message, &self.details) {
            (Some(m), Some(d)) => format!("{m} ({d})"),
            (Some(m), None) => m.clone(),
            _ => fallback.to_string(),
        }
    }
}
