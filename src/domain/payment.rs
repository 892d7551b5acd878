use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money::{add_amounts, format_amount, mul_amount};
use crate::domain::pricing::PriceCalculationResult;
use crate::error::{BookingError, Result};

/// Share of the lodging subtotal collected up front in advance mode.
pub fn default_advance_rate() -> Decimal {
    Decimal::new(2, 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    Full,
    Advance,
}

impl FromStr for PaymentMode {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FULL" => Ok(Self::Full),
            "ADVANCE" => Ok(Self::Advance),
            other => Err(BookingError::bad_request(format!(
                "invalid payment mode '{other}', expected FULL or ADVANCE"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOption {
    FullPayment,
    SplitPayment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCalculationResult {
    pub payment_option: PaymentOption,
    pub current_payment: Decimal,
    pub remaining_payment: Decimal,
    pub summary: String,
}

pub fn validate_advance_rate(rate: Decimal) -> Result<Decimal> {
    if rate <= Decimal::ZERO || rate > Decimal::ONE {
        return Err(BookingError::bad_request(format!(
            "advance rate must be in (0, 1], got {rate}"
        )));
    }
    Ok(rate)
}

/// Split a priced stay into what is due now and what is due later.
///
/// In advance mode the rate applies to lodging only; the cleaning fee is
/// deferred in full to the remaining balance. Amounts are not rounded.
pub fn calculate_payment_split(
    price: &PriceCalculationResult,
    mode: PaymentMode,
    advance_rate: Decimal,
) -> Result<PaymentCalculationResult> {
    let (payment_option, current_payment, remaining_payment) = match mode {
        PaymentMode::Advance => {
            let rate = validate_advance_rate(advance_rate)?;
            (
                PaymentOption::SplitPayment,
                mul_amount(price.total_amount, rate)?,
                add_amounts(
                    mul_amount(price.total_amount, Decimal::ONE - rate)?,
                    price.applied_cleaning_fee,
                )?,
            )
        }
        PaymentMode::Full => (PaymentOption::FullPayment, price.final_total, Decimal::ZERO),
    };

    let summary = match payment_option {
        PaymentOption::FullPayment => {
            format!("Pay {} now", format_amount(current_payment, None))
        }
        PaymentOption::SplitPayment => format!(
            "Pay {} now, {} remaining",
            format_amount(current_payment, None),
            format_amount(remaining_payment, None)
        ),
    };

    Ok(PaymentCalculationResult {
        payment_option,
        current_payment,
        remaining_payment,
        summary,
    })
}

impl std::fmt::Display for PaymentCalculationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let option = match self.payment_option {
            PaymentOption::FullPayment => "Full payment",
            PaymentOption::SplitPayment => "Split payment",
        };
        write!(f, "{option}: {}", self.summary)
    }
}
