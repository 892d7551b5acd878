use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::patch::Patch;
use crate::error::{BookingError, Result};

/// Boundary date format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        BookingError::bad_request(format!("invalid date '{raw}', expected YYYY-MM-DD"))
    })
}

/// Booking state of a villa on one date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayStatus {
    #[default]
    Available,
    Pending,
    Reserved,
    Blocked,
}

impl DayStatus {
    pub const ALL: [Self; 4] = [Self::Available, Self::Pending, Self::Reserved, Self::Blocked];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Pending => "PENDING",
            Self::Reserved => "RESERVED",
            Self::Blocked => "BLOCKED",
        }
    }
}

impl std::fmt::Display for DayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DayStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                BookingError::bad_request(format!(
                    "invalid status '{s}', expected one of AVAILABLE, PENDING, RESERVED, BLOCKED"
                ))
            })
    }
}

/// Annotation on a calendar day. Does not affect availability by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Checkin,
    Checkout,
    SpecialOffer,
}

impl EventType {
    pub const ALL: [Self; 3] = [Self::Checkin, Self::Checkout, Self::SpecialOffer];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checkin => "CHECKIN",
            Self::Checkout => "CHECKOUT",
            Self::SpecialOffer => "SPECIAL_OFFER",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                BookingError::bad_request(format!(
                    "invalid event type '{s}', expected one of CHECKIN, CHECKOUT, SPECIAL_OFFER"
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub id: String,
    pub villa_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub status: DayStatus,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub event_type: Option<EventType>,
    #[serde(default)]
    pub reservation_id: Option<String>,
}

impl CalendarDay {
    pub fn is_available(&self) -> bool {
        self.status == DayStatus::Available
    }
}

/// Identifying fields of a deleted calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedDay {
    pub id: String,
    pub villa_id: String,
    pub date: NaiveDate,
}

impl From<&CalendarDay> for DeletedDay {
    fn from(day: &CalendarDay) -> Self {
        Self {
            id: day.id.clone(),
            villa_id: day.villa_id.clone(),
            date: day.date,
        }
    }
}

/// Inclusive date range used for calendar queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(BookingError::bad_request(format!(
                "end date {end} is before start date {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(|d| *d <= self.end)
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Nights of a stay: `[check_in, check_out)`. Empty when `check_out <= check_in`.
pub fn stay_nights(check_in: NaiveDate, check_out: NaiveDate) -> Vec<NaiveDate> {
    check_in.iter_days().take_while(|d| *d < check_out).collect()
}

/// Number of nights between the two dates; zero or negative for an invalid stay.
pub fn night_count(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days()
}

// ---------- Raw inputs at the boundary ----------

/// Create payload as received from a caller, before validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NewCalendarDay {
    pub villa_id: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
    pub price: Option<Value>,
    pub note: Option<String>,
    pub event_type: Option<Value>,
    pub reservation_id: Option<String>,
}

/// Partial update payload as received from a caller, before validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CalendarDayPatch {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub villa_id: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub date: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub status: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub price: Patch<Value>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub note: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub event_type: Patch<Value>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub reservation_id: Patch<String>,
}

// ---------- Validated forms handed to the store ----------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDayDraft {
    pub villa_id: String,
    pub date: NaiveDate,
    pub status: DayStatus,
    pub price: Option<Decimal>,
    pub note: Option<String>,
    pub event_type: Option<EventType>,
    pub reservation_id: Option<String>,
}

/// Validated changes. `date` and `status` are not nullable, so they are
/// plain options where `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CalendarDayChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DayStatus>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub price: Patch<Decimal>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub note: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub event_type: Patch<EventType>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub reservation_id: Patch<String>,
}

impl CalendarDayChanges {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.status.is_none()
            && self.price.is_absent()
            && self.note.is_absent()
            && self.event_type.is_absent()
            && self.reservation_id.is_absent()
    }

    pub fn apply_to(&self, day: &mut CalendarDay) {
        if let Some(date) = self.date {
            day.date = date;
        }
        if let Some(status) = self.status {
            day.status = status;
        }
        self.price.clone().apply_to(&mut day.price);
        self.note.clone().apply_to(&mut day.note);
        self.event_type.clone().apply_to(&mut day.event_type);
        self.reservation_id.clone().apply_to(&mut day.reservation_id);
    }
}

/// Parse a price that must be a non-negative number. Numeric strings are
/// accepted since form inputs often arrive as text.
pub fn parse_price(raw: &Value) -> Result<Decimal> {
    let text = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => {
            return Err(BookingError::bad_request(format!(
                "price must be a number, got {other}"
            )));
        }
    };
    let price = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| BookingError::bad_request(format!("price must be a number, got '{text}'")))?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(BookingError::bad_request(format!(
            "price must be non-negative, got {price}"
        )));
    }
    Ok(price)
}

/// Normalize an event type given either as a single string or as a list.
///
/// An empty list clears the event; a list of more than one entry is rejected
/// since a day carries at most one event.
pub fn parse_event_type(raw: &Value) -> Result<Option<EventType>> {
    match raw {
        Value::Null => Ok(None),
        Value::String(s) => s.parse().map(Some),
        Value::Array(items) => match items.as_slice() {
            [] => Ok(None),
            [single] => parse_event_type(single),
            _ => Err(BookingError::bad_request(
                "a calendar day carries at most one event type",
            )),
        },
        other => Err(BookingError::bad_request(format!(
            "event type must be a string, got {other}"
        ))),
    }
}

impl NewCalendarDay {
    /// Field-level validation. Existence of the villa and reservation is
    /// checked by the calendar service.
    pub fn validate(&self) -> Result<CalendarDayDraft> {
        let villa_id = self
            .villa_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BookingError::bad_request("villa_id is required"))?
            .to_string();
        let date = self
            .date
            .as_deref()
            .ok_or_else(|| BookingError::bad_request("date is required"))
            .and_then(parse_date)?;
        let status = self
            .status
            .as_deref()
            .map(DayStatus::from_str)
            .transpose()?
            .unwrap_or_default();
        let price = self.price.as_ref().map(parse_price).transpose()?;
        let event_type = match &self.event_type {
            Some(raw) => parse_event_type(raw)?,
            None => None,
        };

        Ok(CalendarDayDraft {
            villa_id,
            date,
            status,
            price,
            note: self.note.clone(),
            event_type,
            reservation_id: self.reservation_id.clone(),
        })
    }
}

impl CalendarDayPatch {
    pub fn is_empty(&self) -> bool {
        self.villa_id.is_absent()
            && self.date.is_absent()
            && self.status.is_absent()
            && self.price.is_absent()
            && self.note.is_absent()
            && self.event_type.is_absent()
            && self.reservation_id.is_absent()
    }

    /// Field-level validation. `current_villa_id` is the owner of the row
    /// being updated; the villa cannot be changed.
    pub fn validate(&self, current_villa_id: &str) -> Result<CalendarDayChanges> {
        match &self.villa_id {
            Patch::Absent => {}
            Patch::Null => return Err(BookingError::bad_request("villa_id cannot be null")),
            Patch::Value(id) if id != current_villa_id => {
                return Err(BookingError::bad_request("villa_id cannot be changed"));
            }
            Patch::Value(_) => {}
        }

        let date = match &self.date {
            Patch::Absent => None,
            Patch::Null => return Err(BookingError::bad_request("date cannot be null")),
            Patch::Value(raw) => Some(parse_date(raw)?),
        };
        let status = match &self.status {
            Patch::Absent => None,
            Patch::Null => return Err(BookingError::bad_request("status cannot be null")),
            Patch::Value(raw) => Some(raw.parse()?),
        };
        let price = self.price.clone().try_map(|raw| parse_price(&raw))?;
        let event_type = match &self.event_type {
            Patch::Absent => Patch::Absent,
            Patch::Null => Patch::Null,
            Patch::Value(raw) => parse_event_type(raw)?.into(),
        };

        Ok(CalendarDayChanges {
            date,
            status,
            price,
            note: self.note.clone(),
            event_type,
            reservation_id: self.reservation_id.clone(),
        })
    }
}

impl std::fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let price = self
            .price
            .map_or_else(|| "-".to_string(), |p| p.round_dp(2).to_string());
        let event = self.event_type.map_or("-", EventType::as_str);
        write!(
            f,
            "{:<12} {:<10} {:>10} {:<14}",
            self.date, self.status, price, event
        )?;
        if let Some(note) = &self.note {
            write!(f, " {note}")?;
        }
        Ok(())
    }
}
