use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Utc};
use common::RestaurantId;
use domain::{Actor, DomainError, SessionAuthenticator, deadline::within};
use store::{Order, Store};

use crate::period::{self, DayRange, Window};
use crate::summary::{
    self, DailyReceipt, DayOrdersAmount, MonthOrdersAmount, MonthReceipt, PopularProduct,
};

/// Read-only metrics over the calling manager's restaurant.
///
/// Every method takes the current instant so results are reproducible;
/// windows are computed in UTC.
#[derive(Clone)]
pub struct AnalyticsService<S> {
    store: S,
    sessions: SessionAuthenticator<S>,
    timeout: Duration,
}

impl<S: Store + Clone> AnalyticsService<S> {
    pub fn new(store: S, sessions: SessionAuthenticator<S>, timeout: Duration) -> Self {
        Self {
            store,
            sessions,
            timeout,
        }
    }

    pub async fn month_receipt(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<MonthReceipt, DomainError> {
        let (restaurant_id, this_month, last_month) = self.months(token, now).await?;
        let orders = self.orders_between(restaurant_id, last_month.from, this_month.to).await?;
        Ok(summary::month_receipt(&orders, this_month, last_month))
    }

    pub async fn month_orders_amount(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<MonthOrdersAmount, DomainError> {
        let (restaurant_id, this_month, last_month) = self.months(token, now).await?;
        let orders = self.orders_between(restaurant_id, last_month.from, this_month.to).await?;
        Ok(summary::month_amount(
            &orders,
            this_month,
            last_month,
            summary::placed,
        ))
    }

    pub async fn month_canceled_orders_amount(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<MonthOrdersAmount, DomainError> {
        let (restaurant_id, this_month, last_month) = self.months(token, now).await?;
        let orders = self.orders_between(restaurant_id, last_month.from, this_month.to).await?;
        Ok(summary::month_amount(
            &orders,
            this_month,
            last_month,
            summary::cancelled,
        ))
    }

    pub async fn day_orders_amount(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<DayOrdersAmount, DomainError> {
        let restaurant_id = self.restaurant(token).await?;
        let today = now.date_naive();
        let yesterday = today
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| DomainError::InvalidInput("date is out of range".to_string()))?;
        let (today, yesterday) = (period::day(today)?, period::day(yesterday)?);

        let orders = self.orders_between(restaurant_id, yesterday.from, today.to).await?;
        Ok(summary::day_amount(&orders, today, yesterday))
    }

    /// Receipt per day over an inclusive range of at most seven days.
    /// Missing bounds default to the week ending today.
    pub async fn daily_receipt_in_period(
        &self,
        token: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<Vec<DailyReceipt>, DomainError> {
        let restaurant_id = self.restaurant(token).await?;
        let range = DayRange::resolve(from, to, now.date_naive())?;
        let window = range.window()?;

        let orders = self.orders_between(restaurant_id, window.from, window.to).await?;
        Ok(summary::daily_receipt(&orders, range))
    }

    /// The restaurant's best sellers of all time up to the end of today.
    pub async fn popular_products(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<PopularProduct>, DomainError> {
        let restaurant_id = self.restaurant(token).await?;
        let until = period::day(now.date_naive())?.to;

        let orders = self
            .orders_between(restaurant_id, DateTime::UNIX_EPOCH, until)
            .await?;
        Ok(summary::popular_products(&orders))
    }

    async fn restaurant(&self, token: &str) -> Result<RestaurantId, DomainError> {
        match self.sessions.authenticate(token).await? {
            Actor::Manager { restaurant_id, .. } => Ok(restaurant_id),
            Actor::Customer { .. } => Err(DomainError::Forbidden {
                action: "view restaurant metrics",
            }),
        }
    }

    async fn months(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(RestaurantId, Window, Window), DomainError> {
        let restaurant_id = self.restaurant(token).await?;
        let today = now.date_naive();
        Ok((
            restaurant_id,
            period::month(today)?,
            period::previous_month(today)?,
        ))
    }

    async fn orders_between(
        &self,
        restaurant_id: RestaurantId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Order>, DomainError> {
        let orders = within(
            self.timeout,
            "orders.placed_between",
            self.store
                .restaurant_orders_placed_between(restaurant_id, from, to),
        )
        .await?;
        metrics::counter!("analytics_orders_scanned_total").increment(orders.len() as u64);
        tracing::debug!(%restaurant_id, %from, %to, orders = orders.len(), "Loaded orders for metrics");
        Ok(orders)
    }
}
