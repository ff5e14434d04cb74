//! Menu endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{ProductId, RestaurantId};
use domain::{NewProduct, ProductChange, UpdateMenu};
use serde::{Deserialize, Serialize};
use store::{Product, Store};

use super::parse_id;
use crate::AppState;
use crate::error::ApiError;
use crate::extract::BearerToken;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_in_cents: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductChangeRequest {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price_in_cents: i64,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateMenuRequest {
    pub new_products: Vec<NewProductRequest>,
    pub updated_products: Vec<ProductChangeRequest>,
    pub deleted_product_ids: Vec<ProductId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price_in_cents: i64,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price_in_cents: p.price.cents(),
        }
    }
}

/// GET /restaurants/{id}/menu: a restaurant's products. Public.
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let restaurant_id: RestaurantId = parse_id(&id)?;
    let menu = state.services.restaurants.get_menu(restaurant_id).await?;
    Ok(Json(menu.into_iter().map(ProductResponse::from).collect()))
}

/// PUT /menu: apply a batch of edits to the caller's menu.
#[tracing::instrument(skip(state, token, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
    Json(req): Json<UpdateMenuRequest>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let cmd = UpdateMenu {
        new_products: req
            .new_products
            .into_iter()
            .map(|p| NewProduct {
                name: p.name,
                description: p.description,
                price_in_cents: p.price_in_cents,
            })
            .collect(),
        updated_products: req
            .updated_products
            .into_iter()
            .map(|p| ProductChange {
                id: p.id,
                name: p.name,
                description: p.description,
                price_in_cents: p.price_in_cents,
            })
            .collect(),
        deleted_product_ids: req.deleted_product_ids,
    };

    let menu = state
        .services
        .restaurants
        .update_menu(token.as_str(), cmd)
        .await?;
    Ok(Json(menu.into_iter().map(ProductResponse::from).collect()))
}
