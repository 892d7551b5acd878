//! Display-time rounding. Calculations elsewhere keep full precision.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{BookingError, Result};

pub fn round_for_display(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn out_of_range() -> BookingError {
    BookingError::bad_request("amount out of range")
}

/// Overflow-checked `a + b`.
pub fn add_amounts(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b).ok_or_else(out_of_range)
}

/// Overflow-checked `amount * factor`.
pub fn mul_amount(amount: Decimal, factor: Decimal) -> Result<Decimal> {
    amount.checked_mul(factor).ok_or_else(out_of_range)
}

pub fn sum_amounts(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, add_amounts)
}

/// Convert an amount with an exchange rate, rounded to cents.
pub fn convert(amount: Decimal, rate: Decimal) -> Result<Decimal> {
    if rate <= Decimal::ZERO {
        return Err(BookingError::bad_request(format!(
            "exchange rate must be positive, got {rate}"
        )));
    }
    mul_amount(amount, rate).map(round_for_display)
}

pub fn format_amount(amount: Decimal, currency: Option<&str>) -> String {
    let rounded = round_for_display(amount);
    match currency {
        Some(code) => format!("{rounded:.2} {code}"),
        None => format!("{rounded:.2}"),
    }
}
