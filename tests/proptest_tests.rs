#![allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use chrono::{NaiveDate, TimeDelta};
use proptest::prelude::*;
use rust_decimal::Decimal;

use villa_booking::domain::availability::evaluate_stay_availability;
use villa_booking::domain::calendar::{CalendarDay, DayStatus, night_count, stay_nights};
use villa_booking::domain::payment::{PaymentMode, calculate_payment_split};
use villa_booking::domain::pricing::{StayCharges, calculate_price};
use villa_booking::domain::selection::StaySelection;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

const WINDOW: i64 = 40;

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

fn offset(days: i64) -> NaiveDate {
    base() + TimeDelta::days(days)
}

fn arb_status() -> impl Strategy<Value = DayStatus> {
    prop_oneof![
        3 => Just(DayStatus::Available),
        1 => Just(DayStatus::Pending),
        1 => Just(DayStatus::Reserved),
        1 => Just(DayStatus::Blocked),
    ]
}

/// A calendar over `WINDOW` consecutive days where some days have no row.
fn arb_calendar() -> impl Strategy<Value = Vec<CalendarDay>> {
    prop::collection::vec(
        (prop::bool::weighted(0.9), arb_status(), 1..2000_i64),
        WINDOW as usize,
    )
    .prop_map(|slots| {
        slots
            .into_iter()
            .enumerate()
            .filter(|(_, (present, _, _))| *present)
            .map(|(i, (_, status, price))| CalendarDay {
                id: format!("d{i}"),
                villa_id: "v".into(),
                date: offset(i as i64),
                status,
                price: Some(Decimal::from(price)),
                note: None,
                event_type: None,
                reservation_id: None,
            })
            .collect()
    })
}

/// A fully priced calendar with only available days.
fn arb_priced_calendar() -> impl Strategy<Value = Vec<CalendarDay>> {
    prop::collection::vec(1..2000_i64, WINDOW as usize).prop_map(|prices| {
        prices
            .into_iter()
            .enumerate()
            .map(|(i, price)| CalendarDay {
                id: format!("d{i}"),
                villa_id: "v".into(),
                date: offset(i as i64),
                status: DayStatus::Available,
                price: Some(Decimal::from(price)),
                note: None,
                event_type: None,
                reservation_id: None,
            })
            .collect()
    })
}

fn arb_stay() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (0..WINDOW - 1, 1..15_i64).prop_map(|(start, len)| {
        let end = (start + len).min(WINDOW);
        (offset(start), offset(end))
    })
}

// ---------------------------------------------------------------------------
// Stay nights and availability
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_nights_match_night_count(start in 0..365_i64, len in -5..60_i64) {
        let check_in = offset(start);
        let check_out = check_in + TimeDelta::days(len);
        let nights = stay_nights(check_in, check_out);
        prop_assert_eq!(nights.len() as i64, night_count(check_in, check_out).max(0));
        prop_assert!(nights.iter().all(|d| *d >= check_in && *d < check_out));
        prop_assert!(nights.windows(2).all(|w| w[1] - w[0] == TimeDelta::days(1)));
    }

    #[test]
    fn prop_available_iff_every_night_available(
        days in arb_calendar(),
        (check_in, check_out) in arb_stay(),
    ) {
        let result = evaluate_stay_availability(&days, check_in, check_out);
        let expected = stay_nights(check_in, check_out).iter().all(|night| {
            days.iter()
                .any(|d| d.date == *night && d.status == DayStatus::Available)
        });
        prop_assert_eq!(result.available, expected);
        prop_assert_eq!(result.first_unavailable_date.is_none(), expected);
        if let Some(blocked) = result.first_unavailable_date {
            prop_assert!(blocked >= check_in && blocked < check_out);
        }
    }

    #[test]
    fn prop_inverted_stay_never_available(days in arb_calendar(), start in 1..WINDOW, back in 0..10_i64) {
        let check_in = offset(start);
        let check_out = check_in - TimeDelta::days(back);
        let result = evaluate_stay_availability(&days, check_in, check_out);
        prop_assert!(!result.available);
        prop_assert_eq!(result.nights, 0);
    }
}

// ---------------------------------------------------------------------------
// Price aggregation
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_total_is_sum_of_nights(
        days in arb_priced_calendar(),
        (check_in, check_out) in arb_stay(),
        fee in 0..500_i64,
        limit in 1..14_u32,
    ) {
        let charges = StayCharges {
            cleaning_fee: Decimal::from(fee),
            short_stay_day_limit: Some(limit),
        };
        let result = calculate_price(&days, &[], check_in, check_out, charges).unwrap();

        let expected: Decimal = days
            .iter()
            .filter(|d| d.date >= check_in && d.date < check_out)
            .filter_map(|d| d.price)
            .sum();
        prop_assert_eq!(result.total_amount, expected);
        prop_assert_eq!(result.daily_prices.len() as i64, night_count(check_in, check_out));
        prop_assert_eq!(result.is_short_stay, result.total_days < limit);
        let fee_due = if result.is_short_stay { Decimal::from(fee) } else { Decimal::ZERO };
        prop_assert_eq!(result.applied_cleaning_fee, fee_due);
        prop_assert_eq!(result.final_total, result.total_amount + fee_due);
    }

    #[test]
    fn prop_average_between_min_and_max(
        days in arb_priced_calendar(),
        (check_in, check_out) in arb_stay(),
    ) {
        let charges = StayCharges { cleaning_fee: Decimal::ZERO, short_stay_day_limit: None };
        let result = calculate_price(&days, &[], check_in, check_out, charges).unwrap();
        let min = result.daily_prices.iter().map(|d| d.price).min().unwrap();
        let max = result.daily_prices.iter().map(|d| d.price).max().unwrap();
        prop_assert!(result.average_price >= min && result.average_price <= max);
    }
}

// ---------------------------------------------------------------------------
// Payment split
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_split_parts_add_up_to_final_total(
        days in arb_priced_calendar(),
        (check_in, check_out) in arb_stay(),
        fee in 0..500_i64,
        rate_pct in 1..=100_i64,
    ) {
        let charges = StayCharges { cleaning_fee: Decimal::from(fee), short_stay_day_limit: None };
        let price = calculate_price(&days, &[], check_in, check_out, charges).unwrap();
        let rate = Decimal::new(rate_pct, 2);

        let advance = calculate_payment_split(&price, PaymentMode::Advance, rate).unwrap();
        prop_assert_eq!(advance.current_payment, price.total_amount * rate);
        prop_assert_eq!(advance.current_payment + advance.remaining_payment, price.final_total);

        let full = calculate_payment_split(&price, PaymentMode::Full, rate).unwrap();
        prop_assert_eq!(full.current_payment, price.final_total);
        prop_assert_eq!(full.remaining_payment, Decimal::ZERO);
    }

    #[test]
    fn prop_out_of_range_rate_rejected(
        days in arb_priced_calendar(),
        rate_pct in prop_oneof![-100..=0_i64, 101..500_i64],
    ) {
        let charges = StayCharges { cleaning_fee: Decimal::ZERO, short_stay_day_limit: None };
        let price = calculate_price(&days, &[], offset(0), offset(3), charges).unwrap();
        let split = calculate_payment_split(&price, PaymentMode::Advance, Decimal::new(rate_pct, 2));
        prop_assert!(split.is_err());
    }
}

// ---------------------------------------------------------------------------
// Stay selection
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_selected_range_is_bookable(
        days in arb_calendar(),
        clicks in prop::collection::vec(0..WINDOW, 1..12),
        minimum_stay in 0..4_u32,
    ) {
        let mut selection = StaySelection::default();
        for click in clicks {
            let before = selection;
            if selection.select(offset(click), &days, minimum_stay).is_err() {
                prop_assert_eq!(selection, before);
            }
            if let Some((start, end)) = selection.range() {
                prop_assert!(start < end);
                prop_assert!(night_count(start, end) >= i64::from(minimum_stay.max(1)));
                prop_assert!(evaluate_stay_availability(&days, start, end).available);
            }
        }
    }
}
