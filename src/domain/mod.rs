pub mod availability;
pub mod calendar;
pub mod money;
pub mod patch;
pub mod payment;
pub mod pricing;
pub mod seasonal_price;
pub mod selection;
pub mod villa;
