//! Sign-in endpoints: manager passwords and customer authentication links.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use common::AccountId;
use domain::IssuedSession;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{BearerToken, SESSION_COOKIE};

// -- Request types --

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LinkRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ConsumeLinkParams {
    pub code: String,
    pub redirect: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub account_id: AccountId,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedSession> for SessionResponse {
    fn from(s: IssuedSession) -> Self {
        Self {
            token: s.token,
            account_id: s.account_id,
            expires_at: s.expires_at,
        }
    }
}

// -- Handlers --

/// POST /sessions: sign a manager in with email and password.
#[tracing::instrument(skip(state, req))]
pub async fn login<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let session = state
        .services
        .sessions
        .login(&req.email, &req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// DELETE /sessions: revoke the caller's session.
pub async fn sign_out<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    token: BearerToken,
) -> Result<Response, ApiError> {
    state.services.sessions.sign_out(token.as_str()).await?;

    let expired = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, header_value(&expired)?)],
    )
        .into_response())
}

/// POST /authenticate: email a sign-in link to a customer.
///
/// Answers the same way whether or not the email belongs to a customer.
#[tracing::instrument(skip(state, req))]
pub async fn request_link<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<LinkRequest>,
) -> Result<StatusCode, ApiError> {
    state.services.links.request_link(&req.email).await?;
    Ok(StatusCode::ACCEPTED)
}

/// GET /auth-links/authenticate: exchange a link code for a session.
///
/// A browser following the emailed link (which carries `redirect`) gets
/// the session as a cookie and is sent on to the configured front end.
/// Other clients get the session as JSON.
#[tracing::instrument(skip(state, params))]
pub async fn consume_link<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ConsumeLinkParams>,
) -> Result<Response, ApiError> {
    let session = state.services.links.consume(&params.code).await?;

    if params.redirect.is_none() {
        return Ok((StatusCode::OK, Json(SessionResponse::from(session))).into_response());
    }

    let cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.token,
        state.session_ttl.num_seconds()
    );
    Ok((
        StatusCode::SEE_OTHER,
        [
            (LOCATION, header_value(&state.redirect_url)?),
            (SET_COOKIE, header_value(&cookie)?),
        ],
    )
        .into_response())
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|e| {
        ApiError::Domain(domain::DomainError::InvalidInput(format!(
            "header value: {e}"
        )))
    })
}
