//! Pure aggregations over a restaurant's orders.
//!
//! Nothing here touches a store; callers pass in the orders of the
//! window they care about.

use std::collections::HashMap;

use chrono::NaiveDate;
use common::{Money, OrderStatus, ProductId};
use serde::Serialize;
use store::Order;

use crate::period::{DayRange, Window};

/// How many products [`popular_products`] reports.
pub const POPULAR_PRODUCTS_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthReceipt {
    pub receipt: Money,
    pub diff_from_last_month: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthOrdersAmount {
    pub amount: u64,
    pub diff_from_last_month: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayOrdersAmount {
    pub amount: u64,
    pub diff_from_yesterday: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyReceipt {
    pub date: NaiveDate,
    pub receipt: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularProduct {
    pub product: String,
    pub amount: u64,
}

/// Percentage change from `previous` to `current`, rounded to two
/// decimals. Zero when there is nothing to compare against.
pub fn percent_diff(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    let diff = (current - previous) / previous * 100.0;
    (diff * 100.0).round() / 100.0
}

fn counts_toward_receipt(order: &Order) -> bool {
    order.status != OrderStatus::Cancelled
}

/// Sum of totals of non-cancelled orders placed within `window`.
pub fn receipt(orders: &[Order], window: Window) -> Money {
    orders
        .iter()
        .filter(|o| window.contains(o.placed_at) && counts_toward_receipt(o))
        .map(|o| o.total)
        .sum()
}

/// Number of orders placed within `window`, cancelled ones included.
pub fn placed(orders: &[Order], window: Window) -> u64 {
    orders
        .iter()
        .filter(|o| window.contains(o.placed_at))
        .count() as u64
}

/// Number of orders placed within `window` that ended up cancelled.
pub fn cancelled(orders: &[Order], window: Window) -> u64 {
    orders
        .iter()
        .filter(|o| window.contains(o.placed_at) && o.status == OrderStatus::Cancelled)
        .count() as u64
}

pub fn month_receipt(orders: &[Order], this_month: Window, last_month: Window) -> MonthReceipt {
    let current = receipt(orders, this_month);
    let previous = receipt(orders, last_month);
    MonthReceipt {
        receipt: current,
        diff_from_last_month: percent_diff(current.cents() as f64, previous.cents() as f64),
    }
}

/// Orders placed this month against last month, using `count` to decide
/// which orders are counted.
pub fn month_amount(
    orders: &[Order],
    this_month: Window,
    last_month: Window,
    count: fn(&[Order], Window) -> u64,
) -> MonthOrdersAmount {
    let current = count(orders, this_month);
    let previous = count(orders, last_month);
    MonthOrdersAmount {
        amount: current,
        diff_from_last_month: percent_diff(current as f64, previous as f64),
    }
}

pub fn day_amount(orders: &[Order], today: Window, yesterday: Window) -> DayOrdersAmount {
    let current = placed(orders, today);
    let previous = placed(orders, yesterday);
    DayOrdersAmount {
        amount: current,
        diff_from_yesterday: percent_diff(current as f64, previous as f64),
    }
}

/// One entry per day of `range`, in date order, including days with no
/// receipt.
pub fn daily_receipt(orders: &[Order], range: DayRange) -> Vec<DailyReceipt> {
    let mut by_day: HashMap<NaiveDate, Money> = HashMap::new();
    for order in orders.iter().filter(|o| counts_toward_receipt(o)) {
        let slot = by_day.entry(order.placed_at.date_naive()).or_default();
        *slot = *slot + order.total;
    }

    range
        .days()
        .map(|date| DailyReceipt {
            date,
            receipt: by_day.get(&date).copied().unwrap_or_default(),
        })
        .collect()
}

/// The most ordered products by quantity across non-cancelled orders.
///
/// Ties go to the product whose name sorts first. A product is reported
/// under the name it had on its most recent order.
pub fn popular_products(orders: &[Order]) -> Vec<PopularProduct> {
    let mut tally: HashMap<ProductId, (String, u64, chrono::DateTime<chrono::Utc>)> =
        HashMap::new();

    for order in orders.iter().filter(|o| counts_toward_receipt(o)) {
        for line in &order.items {
            let entry = tally
                .entry(line.product_id)
                .or_insert_with(|| (line.product_name.clone(), 0, order.placed_at));
            entry.1 += u64::from(line.quantity);
            if order.placed_at > entry.2 {
                entry.0 = line.product_name.clone();
                entry.2 = order.placed_at;
            }
        }
    }

    let mut products: Vec<PopularProduct> = tally
        .into_values()
        .map(|(product, amount, _)| PopularProduct { product, amount })
        .collect();
    products.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.product.cmp(&b.product)));
    products.truncate(POPULAR_PRODUCTS_LIMIT);
    products
}
