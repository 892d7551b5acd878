//! Booking service: availability, pricing and payment over a store snapshot.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::types::PricingConfig;
use crate::domain::availability::{self, StayAvailability};
use crate::domain::calendar::{CalendarDay, DateRange, night_count, parse_date};
use crate::domain::money::{convert, format_amount};
use crate::domain::payment::{self, PaymentCalculationResult, PaymentMode};
use crate::domain::pricing::{self, PriceCalculationResult, StayCharges};
use crate::domain::selection::StaySelection;
use crate::domain::villa::Villa;
use crate::error::{BookingError, Result};
use crate::ports::booking_store::BookingStore;

/// Overrides for the villa's own pricing parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChargeOverrides {
    pub cleaning_fee: Option<Decimal>,
    pub short_stay_day_limit: Option<u32>,
}

/// Exchange rate applied to the final amounts of a quote for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayCurrency {
    pub code: String,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertedAmounts {
    pub currency: String,
    pub final_total: Decimal,
    pub current_payment: Decimal,
    pub remaining_payment: Decimal,
}

/// Everything a guest sees before committing to a stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StayQuote {
    pub villa_id: String,
    pub villa_name: String,
    pub currency_id: Option<String>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub price: PriceCalculationResult,
    pub payment: PaymentCalculationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted: Option<ConvertedAmounts>,
}

impl std::fmt::Display for StayQuote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let currency = self.currency_id.as_deref();
        writeln!(
            f,
            "# {} ({} to {}, {} nights)\n",
            self.villa_name, self.check_in, self.check_out, self.price.total_days
        )?;
        writeln!(f, "{}", self.price)?;
        writeln!(f, "{}", self.payment)?;
        writeln!(
            f,
            "Due now: {}  Due later: {}",
            format_amount(self.payment.current_payment, currency),
            format_amount(self.payment.remaining_payment, currency)
        )?;
        if let Some(converted) = &self.converted {
            writeln!(
                f,
                "In {}: total {}, now {}, later {}",
                converted.currency,
                converted.final_total,
                converted.current_payment,
                converted.remaining_payment
            )?;
        }
        Ok(())
    }
}

fn parse_stay(check_in: &str, check_out: &str) -> Result<(NaiveDate, NaiveDate)> {
    Ok((parse_date(check_in)?, parse_date(check_out)?))
}

/// Orchestrates the pure booking computations.
///
/// Each call fetches a fresh calendar snapshot for the stay window, then
/// runs the synchronous evaluators over it. Nothing is cached.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    pricing: PricingConfig,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>, pricing: PricingConfig) -> Self {
        Self { store, pricing }
    }

    /// Calendar rows covering `[first, last]` inclusive.
    async fn snapshot(&self, villa_id: &str, first: NaiveDate, last: NaiveDate) -> Result<Vec<CalendarDay>> {
        let range = DateRange::new(first, last)?;
        let days = self
            .store
            .list_calendar_days(villa_id, Some(range), None)
            .await?;
        debug!(villa_id, %first, %last, rows = days.len(), "Calendar snapshot loaded");
        Ok(days)
    }

    pub async fn evaluate_stay_availability(
        &self,
        villa_id: &str,
        check_in: &str,
        check_out: &str,
    ) -> Result<StayAvailability> {
        let (check_in, check_out) = parse_stay(check_in, check_out)?;
        self.store.find_villa_by_id(villa_id).await?;
        if check_out <= check_in {
            return Ok(availability::evaluate_stay_availability(&[], check_in, check_out));
        }
        let days = self.snapshot(villa_id, check_in, check_out).await?;
        Ok(availability::evaluate_stay_availability(&days, check_in, check_out))
    }

    pub async fn calculate_price(
        &self,
        villa_id: &str,
        check_in: &str,
        check_out: &str,
        overrides: ChargeOverrides,
    ) -> Result<PriceCalculationResult> {
        let (check_in, check_out) = parse_stay(check_in, check_out)?;
        let villa = self.store.find_villa_by_id(villa_id).await?;
        self.price_stay(&villa, check_in, check_out, overrides).await
    }

    /// Split an already priced stay. Defaults to the configured advance rate.
    pub fn calculate_payment_split(
        &self,
        price: &PriceCalculationResult,
        mode: PaymentMode,
        advance_rate: Option<Decimal>,
    ) -> Result<PaymentCalculationResult> {
        payment::calculate_payment_split(
            price,
            mode,
            advance_rate.unwrap_or(self.pricing.advance_rate),
        )
    }

    /// Validate and price a stay end to end: minimum stay, availability of
    /// every night, nightly prices, then the payment split.
    pub async fn quote_stay(
        &self,
        villa_id: &str,
        check_in: &str,
        check_out: &str,
        mode: PaymentMode,
        advance_rate: Option<Decimal>,
        display: Option<DisplayCurrency>,
    ) -> Result<StayQuote> {
        let (check_in, check_out) = parse_stay(check_in, check_out)?;
        if check_out <= check_in {
            return Err(BookingError::bad_request(format!(
                "check-out {check_out} must be after check-in {check_in}"
            )));
        }
        let villa = self.store.find_villa_by_id(villa_id).await?;
        let nights = night_count(check_in, check_out);
        let minimum = villa.minimum_stay_nights();
        if nights < i64::from(minimum) {
            return Err(BookingError::bad_request(format!(
                "villa {villa_id} requires at least {minimum} nights, got {nights}"
            )));
        }

        let days = self.snapshot(villa_id, check_in, check_out).await?;
        let stay = availability::evaluate_stay_availability(&days, check_in, check_out);
        if let Some(date) = stay.first_unavailable_date {
            return Err(BookingError::Availability { date });
        }

        let price = self
            .price_from_snapshot(&villa, &days, check_in, check_out, ChargeOverrides::default())
            .await?;
        let payment = self.calculate_payment_split(&price, mode, advance_rate)?;
        let converted = display
            .map(|d| -> Result<ConvertedAmounts> {
                Ok(ConvertedAmounts {
                    final_total: convert(price.final_total, d.rate)?,
                    current_payment: convert(payment.current_payment, d.rate)?,
                    remaining_payment: convert(payment.remaining_payment, d.rate)?,
                    currency: d.code,
                })
            })
            .transpose()?;

        info!(
            villa_id,
            %check_in,
            %check_out,
            final_total = %price.final_total,
            "Stay quoted"
        );
        Ok(StayQuote {
            villa_id: villa.id,
            villa_name: villa.name,
            currency_id: villa.currency_id,
            check_in,
            check_out,
            price,
            payment,
            converted,
        })
    }

    /// Advance an interactive date selection by one clicked date, checking
    /// the villa's minimum stay and the nights the new range would cover.
    pub async fn select_date(
        &self,
        villa_id: &str,
        mut selection: StaySelection,
        date: &str,
    ) -> Result<StaySelection> {
        let date = parse_date(date)?;
        let villa = self.store.find_villa_by_id(villa_id).await?;
        let days = match selection {
            StaySelection::StartSelected { start } if date > start => {
                self.snapshot(villa_id, start, date).await?
            }
            _ => Vec::new(),
        };
        selection.select(date, &days, villa.minimum_stay_nights())?;
        Ok(selection)
    }

    async fn price_stay(
        &self,
        villa: &Villa,
        check_in: NaiveDate,
        check_out: NaiveDate,
        overrides: ChargeOverrides,
    ) -> Result<PriceCalculationResult> {
        if check_out <= check_in {
            return Err(BookingError::bad_request(format!(
                "check-out {check_out} must be after check-in {check_in}"
            )));
        }
        let days = self.snapshot(&villa.id, check_in, check_out).await?;
        self.price_from_snapshot(villa, &days, check_in, check_out, overrides)
            .await
    }

    async fn price_from_snapshot(
        &self,
        villa: &Villa,
        days: &[CalendarDay],
        check_in: NaiveDate,
        check_out: NaiveDate,
        overrides: ChargeOverrides,
    ) -> Result<PriceCalculationResult> {
        let seasons = if self.pricing.seasonal_fallback {
            self.store.list_seasonal_prices(&villa.id, true).await?
        } else {
            Vec::new()
        };
        let charges = StayCharges {
            cleaning_fee: overrides.cleaning_fee.unwrap_or(villa.cleaning_fee),
            short_stay_day_limit: Some(
                overrides
                    .short_stay_day_limit
                    .filter(|n| *n >= 1)
                    .unwrap_or_else(|| {
                        villa.short_stay_limit_or(self.pricing.default_short_stay_day_limit)
                    }),
            ),
        };
        pricing::calculate_price(days, &seasons, check_in, check_out, charges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::seeded_store;

    fn service() -> BookingService {
        BookingService::new(Arc::new(seeded_store()), PricingConfig::default())
    }

    #[tokio::test]
    async fn inverted_stay_is_unavailable_without_fetching() {
        let result = service()
            .evaluate_stay_availability("v1", "2024-06-04", "2024-06-01")
            .await
            .unwrap();
        assert!(!result.available);
        assert_eq!(result.nights, 0);
    }

    #[tokio::test]
    async fn unknown_villa_is_not_found() {
        let err = service()
            .evaluate_stay_availability("nope", "2024-06-01", "2024-06-04")
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound { .. }));
    }

    #[tokio::test]
    async fn payment_split_uses_configured_rate_by_default() {
        let service = service();
        let price = service
            .calculate_price("v1", "2024-06-01", "2024-06-04", ChargeOverrides::default())
            .await
            .unwrap();
        let split = service
            .calculate_payment_split(&price, PaymentMode::Advance, None)
            .unwrap();
        assert_eq!(split.current_payment, price.total_amount * Decimal::new(2, 1));
    }

    #[tokio::test]
    async fn select_date_anchors_then_extends() {
        let service = service();
        let selection = service
            .select_date("v1", StaySelection::default(), "2024-06-01")
            .await
            .unwrap();
        let selection = service
            .select_date("v1", selection, "2024-06-03")
            .await
            .unwrap();
        assert_eq!(
            selection.range(),
            Some((
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
            ))
        );
    }
}
