//! Order placement, queries and lifecycle transitions.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{AccountId, OrderId, OrderStatus, ProductId, RestaurantId};
use domain::{PlaceOrder, Transition};
use serde::{Deserialize, Serialize};
use store::{Order, OrderLine, OrderQuery, Store};

use super::{PageResponse, parse_id};
use crate::AppState;
use crate::error::ApiError;
use crate::extract::BearerToken;

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ListOrdersParams {
    pub status: Option<String>,
    pub customer_name: Option<String>,
    pub order_id: Option<String>,
    pub page_index: Option<usize>,
}

impl ListOrdersParams {
    fn into_query(self) -> Result<OrderQuery, ApiError> {
        let mut query = OrderQuery::new().page(self.page_index.unwrap_or(0));
        if let Some(status) = self.status.filter(|s| !s.is_empty()) {
            let status: OrderStatus = status
                .parse()
                .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
            query = query.status(status);
        }
        if let Some(name) = self.customer_name.filter(|s| !s.trim().is_empty()) {
            query = query.customer_name(name.trim());
        }
        if let Some(id) = self.order_id.filter(|s| !s.is_empty()) {
            query = query.order_id(parse_id(&id)?);
        }
        Ok(query)
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub customer_id: AccountId,
    pub customer_name: String,
    pub restaurant_id: RestaurantId,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub total_in_cents: i64,
    pub placed_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price_in_cents: i64,
}

impl From<OrderLine> for OrderItemResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            product_id: line.product_id,
            product_name: line.product_name,
            quantity: line.quantity,
            price_in_cents: line.unit_price.cents(),
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            customer_id: o.customer_id,
            customer_name: o.customer_name,
            restaurant_id: o.restaurant_id,
            status: o.status,
            items: o.items.into_iter().map(OrderItemResponse::from).collect(),
            total_in_cents: o.total.cents(),
            placed_at: o.placed_at,
            approved_at: o.approved_at,
            dispatched_at: o.dispatched_at,
            delivered_at: o.delivered_at,
            cancelled_at: o.cancelled_at,
        }
    }
}

// -- Handlers --

/// POST /restaurants/{id}/orders: place an order as the calling customer.
#[tracing::instrument(skip(state, token, req))]
pub async fn place<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
    Path(id): Path<String>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let restaurant_id: RestaurantId = parse_id(&id)?;
    let cmd = req
        .items
        .into_iter()
        .fold(PlaceOrder::new(restaurant_id), |cmd, item| {
            cmd.item(item.product_id, item.quantity)
        });

    let order = state
        .services
        .orders
        .place_order(token.as_str(), cmd)
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders: the caller's orders, newest first.
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<PageResponse<OrderResponse>>, ApiError> {
    let page = state
        .services
        .orders
        .list_orders(token.as_str(), params.into_query()?)
        .await?;
    Ok(Json(PageResponse::from_page(page, OrderResponse::from)))
}

/// GET /orders/{id}: one order, for its customer or restaurant.
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .services
        .orders
        .get_order(token.as_str(), parse_id(&id)?)
        .await?;
    Ok(Json(order.into()))
}

/// PATCH /orders/{id}/approve
pub async fn approve<S: Store + Clone + 'static>(
    state: State<Arc<AppState<S>>>,
    token: BearerToken,
    id: Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    transition(state, token, id, Transition::Approve).await
}

/// PATCH /orders/{id}/cancel
pub async fn cancel<S: Store + Clone + 'static>(
    state: State<Arc<AppState<S>>>,
    token: BearerToken,
    id: Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    transition(state, token, id, Transition::Cancel).await
}

/// PATCH /orders/{id}/dispatch
pub async fn dispatch<S: Store + Clone + 'static>(
    state: State<Arc<AppState<S>>>,
    token: BearerToken,
    id: Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    transition(state, token, id, Transition::Dispatch).await
}

/// PATCH /orders/{id}/deliver
pub async fn deliver<S: Store + Clone + 'static>(
    state: State<Arc<AppState<S>>>,
    token: BearerToken,
    id: Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    transition(state, token, id, Transition::Deliver).await
}

async fn transition<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
    Path(id): Path<String>,
    transition: Transition,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .services
        .orders
        .transition(token.as_str(), parse_id(&id)?, transition)
        .await?;
    Ok(Json(order.into()))
}
