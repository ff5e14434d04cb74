//! Receipt and order metrics for restaurant managers.
//!
//! [`summary`] holds the pure aggregations; [`AnalyticsService`] loads a
//! restaurant's orders for the relevant UTC window and applies them.

pub mod period;
mod service;
pub mod summary;

pub use period::{DayRange, MAX_DAILY_RANGE_DAYS, Window};
pub use service::AnalyticsService;
pub use summary::{
    DailyReceipt, DayOrdersAmount, MonthOrdersAmount, MonthReceipt, PopularProduct,
    POPULAR_PRODUCTS_LIMIT,
};
