use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::availability::NightIndex;
use crate::domain::calendar::{CalendarDay, EventType, stay_nights};
use crate::domain::money::{add_amounts, round_for_display, sum_amounts};
use crate::domain::seasonal_price::{SeasonalPrice, resolve_seasonal_price};
use crate::error::{BookingError, Result};

pub const DEFAULT_SHORT_STAY_DAY_LIMIT: u32 = 7;

/// Where a night's price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Calendar,
    Season,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPrice {
    pub date: NaiveDate,
    pub price: Decimal,
    pub is_special_offer: bool,
    pub event_type: Option<EventType>,
    pub source: PriceSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceCalculationResult {
    /// Lodging subtotal, cleaning fee excluded.
    pub total_amount: Decimal,
    pub applied_cleaning_fee: Decimal,
    pub final_total: Decimal,
    pub is_short_stay: bool,
    pub total_days: u32,
    pub daily_prices: Vec<DailyPrice>,
    pub average_price: Decimal,
}

/// Stay-level pricing inputs taken from the villa record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayCharges {
    pub cleaning_fee: Decimal,
    pub short_stay_day_limit: Option<u32>,
}

impl StayCharges {
    pub fn short_stay_limit(&self) -> u32 {
        self.short_stay_day_limit
            .filter(|n| *n >= 1)
            .unwrap_or(DEFAULT_SHORT_STAY_DAY_LIMIT)
    }
}

/// Price every night of `[check_in, check_out)`.
///
/// The calendar row's price is authoritative. A night without one is priced
/// from `seasons` (pass an empty slice to disable the fallback); if neither
/// yields a price the whole calculation fails with that date.
pub fn calculate_price(
    days: &[CalendarDay],
    seasons: &[SeasonalPrice],
    check_in: NaiveDate,
    check_out: NaiveDate,
    charges: StayCharges,
) -> Result<PriceCalculationResult> {
    if check_out <= check_in {
        return Err(BookingError::bad_request(format!(
            "check-out {check_out} must be after check-in {check_in}"
        )));
    }
    if charges.cleaning_fee.is_sign_negative() && !charges.cleaning_fee.is_zero() {
        return Err(BookingError::bad_request("cleaning fee must be non-negative"));
    }

    let index = NightIndex::new(days);
    let mut daily_prices = Vec::new();
    for night in stay_nights(check_in, check_out) {
        let row = index.get(night);
        let event_type = row.and_then(|d| d.event_type);
        let (price, source) = match row.and_then(|d| d.price) {
            Some(price) => (price, PriceSource::Calendar),
            None => resolve_seasonal_price(night, seasons)
                .map(|s| (s.nightly_price, PriceSource::Season))
                .ok_or(BookingError::Pricing { date: night })?,
        };
        daily_prices.push(DailyPrice {
            date: night,
            price,
            is_special_offer: event_type == Some(EventType::SpecialOffer),
            event_type,
            source,
        });
    }

    let total_amount = sum_amounts(daily_prices.iter().map(|d| d.price))?;
    let total_days = u32::try_from(daily_prices.len())
        .map_err(|_| BookingError::bad_request("stay is too long"))?;
    let is_short_stay = total_days < charges.short_stay_limit();
    let applied_cleaning_fee = if is_short_stay {
        charges.cleaning_fee
    } else {
        Decimal::ZERO
    };
    let average_price = if total_days == 0 {
        Decimal::ZERO
    } else {
        total_amount / Decimal::from(total_days)
    };

    let final_total = add_amounts(total_amount, applied_cleaning_fee)?;

    Ok(PriceCalculationResult {
        total_amount,
        applied_cleaning_fee,
        final_total,
        is_short_stay,
        total_days,
        daily_prices,
        average_price,
    })
}

impl std::fmt::Display for PriceCalculationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:<12} {:>10}  {}", "Night", "Price", "Event")?;
        writeln!(f, "{}", "-".repeat(40))?;
        for day in &self.daily_prices {
            let event = day.event_type.map_or("-", EventType::as_str);
            let marker = if day.source == PriceSource::Season {
                " (season)"
            } else {
                ""
            };
            writeln!(
                f,
                "{:<12} {:>10}  {event}{marker}",
                day.date,
                round_for_display(day.price)
            )?;
        }
        writeln!(f, "{}", "-".repeat(40))?;
        writeln!(
            f,
            "Nights: {} | Avg/night: {}",
            self.total_days,
            round_for_display(self.average_price)
        )?;
        writeln!(f, "Lodging: {}", round_for_display(self.total_amount))?;
        if self.is_short_stay {
            writeln!(
                f,
                "Cleaning fee (short stay): {}",
                round_for_display(self.applied_cleaning_fee)
            )?;
        }
        write!(f, "Total: {}", round_for_display(self.final_total))
    }
}
