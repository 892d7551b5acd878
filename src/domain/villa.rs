use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The subset of a villa record the booking core needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Villa {
    pub id: String,
    pub name: String,
    /// Charged only on short stays.
    #[serde(default)]
    pub cleaning_fee: Decimal,
    /// Stays with fewer nights than this are short stays.
    #[serde(default)]
    pub short_stay_day_limit: Option<u32>,
    #[serde(default)]
    pub minimum_stay: Option<u32>,
    #[serde(default)]
    pub currency_id: Option<String>,
}

impl Villa {
    pub fn short_stay_limit_or(&self, default: u32) -> u32 {
        self.short_stay_day_limit
            .filter(|n| *n >= 1)
            .unwrap_or(default)
    }

    pub fn minimum_stay_nights(&self) -> u32 {
        self.minimum_stay.filter(|n| *n >= 1).unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub villa_id: String,
    #[serde(default)]
    pub check_in: Option<NaiveDate>,
    #[serde(default)]
    pub check_out: Option<NaiveDate>,
}
