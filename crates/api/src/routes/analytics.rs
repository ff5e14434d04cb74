//! Restaurant metrics endpoints. Manager only.

use std::sync::Arc;

use analytics::{DailyReceipt, DayOrdersAmount, MonthOrdersAmount, MonthReceipt, PopularProduct};
use axum::Json;
use axum::extract::{Query, State};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::BearerToken;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct PeriodParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// GET /metrics/month-receipt
pub async fn month_receipt<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
) -> Result<Json<MonthReceipt>, ApiError> {
    Ok(Json(
        state
            .analytics
            .month_receipt(token.as_str(), Utc::now())
            .await?,
    ))
}

/// GET /metrics/month-orders-amount
pub async fn month_orders_amount<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
) -> Result<Json<MonthOrdersAmount>, ApiError> {
    Ok(Json(
        state
            .analytics
            .month_orders_amount(token.as_str(), Utc::now())
            .await?,
    ))
}

/// GET /metrics/day-orders-amount
pub async fn day_orders_amount<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
) -> Result<Json<DayOrdersAmount>, ApiError> {
    Ok(Json(
        state
            .analytics
            .day_orders_amount(token.as_str(), Utc::now())
            .await?,
    ))
}

/// GET /metrics/month-canceled-orders-amount
pub async fn month_canceled_orders_amount<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
) -> Result<Json<MonthOrdersAmount>, ApiError> {
    Ok(Json(
        state
            .analytics
            .month_canceled_orders_amount(token.as_str(), Utc::now())
            .await?,
    ))
}

/// GET /metrics/daily-receipt-in-period?from=YYYY-MM-DD&to=YYYY-MM-DD
pub async fn daily_receipt_in_period<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
    Query(params): Query<PeriodParams>,
) -> Result<Json<Vec<DailyReceipt>>, ApiError> {
    Ok(Json(
        state
            .analytics
            .daily_receipt_in_period(token.as_str(), params.from, params.to, Utc::now())
            .await?,
    ))
}

/// GET /metrics/popular-products
pub async fn popular_products<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
) -> Result<Json<Vec<PopularProduct>>, ApiError> {
    Ok(Json(
        state
            .analytics
            .popular_products(token.as_str(), Utc::now())
            .await?,
    ))
}
