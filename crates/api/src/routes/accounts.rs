//! Registration and profile endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{AccountId, RestaurantId, Role};
use domain::{RegisterCustomer, RegisterRestaurant, UpdateProfile};
use serde::{Deserialize, Serialize};
use store::{Account, Restaurant, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::BearerToken;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRestaurantRequest {
    pub restaurant_name: String,
    pub manager_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCustomerRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: String,
    pub description: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantResponse {
    pub id: RestaurantId,
    pub name: String,
    pub description: Option<String>,
    pub manager_id: AccountId,
    pub created_at: DateTime<Utc>,
}

impl From<Restaurant> for RestaurantResponse {
    fn from(r: Restaurant) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            manager_id: r.manager_id,
            created_at: r.created_at,
        }
    }
}

/// An account as shown to its owner. Never carries the credential.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for ProfileResponse {
    fn from(a: Account) -> Self {
        Self {
            role: a.role(),
            id: a.id,
            name: a.name,
            email: a.email,
            phone: a.phone,
            created_at: a.created_at,
        }
    }
}

// -- Handlers --

/// POST /restaurants: register a restaurant and its manager.
#[tracing::instrument(skip(state, req))]
pub async fn register_restaurant<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterRestaurantRequest>,
) -> Result<(StatusCode, Json<RestaurantResponse>), ApiError> {
    let restaurant = state
        .services
        .restaurants
        .register_restaurant(RegisterRestaurant {
            restaurant_name: req.restaurant_name,
            manager_name: req.manager_name,
            email: req.email,
            phone: req.phone,
            password: req.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(restaurant.into())))
}

/// POST /customers: register a customer.
#[tracing::instrument(skip(state, req))]
pub async fn register_customer<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterCustomerRequest>,
) -> Result<(StatusCode, Json<ProfileResponse>), ApiError> {
    let account = state
        .services
        .restaurants
        .register_customer(RegisterCustomer {
            name: req.name,
            email: req.email,
            phone: req.phone,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(account.into())))
}

/// GET /me: the caller's own account.
pub async fn profile<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
) -> Result<Json<ProfileResponse>, ApiError> {
    let account = state
        .services
        .restaurants
        .get_profile(token.as_str())
        .await?;
    Ok(Json(account.into()))
}

/// GET /managed-restaurant: the restaurant the calling manager runs.
pub async fn managed_restaurant<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let restaurant = state
        .services
        .restaurants
        .get_managed_restaurant(token.as_str())
        .await?;
    Ok(Json(restaurant.into()))
}

/// PUT /profile: update the managed restaurant's name and description.
#[tracing::instrument(skip(state, token, req))]
pub async fn update_profile<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let restaurant = state
        .services
        .restaurants
        .update_profile(
            token.as_str(),
            UpdateProfile {
                name: req.name,
                description: req.description,
            },
        )
        .await?;
    Ok(Json(restaurant.into()))
}
