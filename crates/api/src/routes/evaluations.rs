//! Evaluation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{AccountId, EvaluationId, OrderId};
use domain::SubmitEvaluation;
use serde::{Deserialize, Serialize};
use store::{Evaluation, Store};

use super::{PageResponse, parse_id};
use crate::AppState;
use crate::error::ApiError;
use crate::extract::BearerToken;

#[derive(Deserialize)]
pub struct SubmitEvaluationRequest {
    pub rating: u8,
    pub comment: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ListEvaluationsParams {
    pub page_index: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    pub id: EvaluationId,
    pub order_id: OrderId,
    pub customer_id: AccountId,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Evaluation> for EvaluationResponse {
    fn from(e: Evaluation) -> Self {
        Self {
            id: e.id,
            order_id: e.order_id,
            customer_id: e.customer_id,
            rating: e.rating,
            comment: e.comment,
            created_at: e.created_at,
        }
    }
}

/// POST /orders/{id}/evaluation: rate a delivered order.
#[tracing::instrument(skip(state, token, req))]
pub async fn submit<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
    Path(id): Path<String>,
    Json(req): Json<SubmitEvaluationRequest>,
) -> Result<(StatusCode, Json<EvaluationResponse>), ApiError> {
    let cmd = SubmitEvaluation {
        rating: req.rating,
        comment: req.comment,
    };
    let evaluation = state
        .services
        .evaluations
        .submit(token.as_str(), parse_id(&id)?, cmd)
        .await?;
    Ok((StatusCode::CREATED, Json(evaluation.into())))
}

/// GET /evaluations: the calling manager's restaurant evaluations.
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
    Query(params): Query<ListEvaluationsParams>,
) -> Result<Json<PageResponse<EvaluationResponse>>, ApiError> {
    let page = state
        .services
        .evaluations
        .list_for_restaurant(token.as_str(), params.page_index)
        .await?;
    Ok(Json(PageResponse::from_page(page, EvaluationResponse::from)))
}
