use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// A villa-scoped nightly rate for `[start_date, end_date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalPrice {
    pub id: String,
    pub villa_id: String,
    pub season_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub nightly_price: Decimal,
    /// Informational only; never used in stay totals.
    #[serde(default)]
    pub weekly_price: Option<Decimal>,
    #[serde(default)]
    pub currency_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl SeasonalPrice {
    pub fn validate(&self) -> Result<()> {
        if self.start_date >= self.end_date {
            return Err(BookingError::bad_request(format!(
                "season '{}' must start before it ends ({} >= {})",
                self.season_name, self.start_date, self.end_date
            )));
        }
        if self.nightly_price <= Decimal::ZERO {
            return Err(BookingError::bad_request(format!(
                "season '{}' nightly price must be positive",
                self.season_name
            )));
        }
        Ok(())
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date < self.end_date
    }
}

/// Pick the seasonal row that prices `date`.
///
/// Only active, well-formed rows covering the date are considered. When
/// several overlap, the most recently created one wins, then the highest id.
pub fn resolve_seasonal_price(date: NaiveDate, prices: &[SeasonalPrice]) -> Option<&SeasonalPrice> {
    prices
        .iter()
        .filter(|p| p.is_active && p.covers(date) && p.validate().is_ok())
        .max_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        })
}
