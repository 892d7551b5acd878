//! Service layer: validation and orchestration over the [`BookingStore`] port.
//!
//! [`CalendarService`] owns calendar reads and writes; [`BookingService`]
//! runs the availability, pricing and payment computations.
//!
//! [`BookingStore`]: crate::ports::booking_store::BookingStore

pub mod booking_service;
pub mod calendar_service;

pub use booking_service::{
    BookingService, ChargeOverrides, ConvertedAmounts, DisplayCurrency, StayQuote,
};
pub use calendar_service::{CalendarQuery, CalendarService, DateFailure, RangeReport};
