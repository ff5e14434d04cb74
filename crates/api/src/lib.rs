//! HTTP API server with observability for the food-ordering backend.
//!
//! Provides REST endpoints for registration, sign-in, menus, orders,
//! evaluations and restaurant metrics, with structured logging (tracing)
//! and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use analytics::AnalyticsService;
use axum::Router;
use axum::routing::{get, patch, post, put};
use domain::{DomainSettings, LinkSender, Services};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub services: Services<S>,
    pub analytics: AnalyticsService<S>,
    /// Where a browser lands after following an authentication link.
    pub redirect_url: String,
    pub session_ttl: chrono::Duration,
}

/// Wires every service to `store`.
pub fn create_state<S: Store + Clone + 'static>(
    store: S,
    settings: &DomainSettings,
    sender: Arc<dyn LinkSender>,
) -> Arc<AppState<S>> {
    let services = Services::new(store.clone(), settings, sender);
    let analytics =
        AnalyticsService::new(store, services.sessions.clone(), settings.store_timeout);

    Arc::new(AppState {
        services,
        analytics,
        redirect_url: settings.auth.redirect_url.clone(),
        session_ttl: settings.auth.session_ttl,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        // Accounts and profile
        .route("/restaurants", post(routes::accounts::register_restaurant::<S>))
        .route("/customers", post(routes::accounts::register_customer::<S>))
        .route("/me", get(routes::accounts::profile::<S>))
        .route(
            "/managed-restaurant",
            get(routes::accounts::managed_restaurant::<S>),
        )
        .route("/profile", put(routes::accounts::update_profile::<S>))
        // Sign-in
        .route(
            "/sessions",
            post(routes::auth::login::<S>).delete(routes::auth::sign_out::<S>),
        )
        .route("/authenticate", post(routes::auth::request_link::<S>))
        .route(
            "/auth-links/authenticate",
            get(routes::auth::consume_link::<S>),
        )
        // Menu
        .route("/restaurants/{id}/menu", get(routes::menu::get::<S>))
        .route("/menu", put(routes::menu::update::<S>))
        // Orders
        .route("/restaurants/{id}/orders", post(routes::orders::place::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/approve", patch(routes::orders::approve::<S>))
        .route("/orders/{id}/cancel", patch(routes::orders::cancel::<S>))
        .route("/orders/{id}/dispatch", patch(routes::orders::dispatch::<S>))
        .route("/orders/{id}/deliver", patch(routes::orders::deliver::<S>))
        // Evaluations
        .route(
            "/orders/{id}/evaluation",
            post(routes::evaluations::submit::<S>),
        )
        .route("/evaluations", get(routes::evaluations::list::<S>))
        // Restaurant metrics
        .route(
            "/metrics/month-receipt",
            get(routes::analytics::month_receipt::<S>),
        )
        .route(
            "/metrics/month-orders-amount",
            get(routes::analytics::month_orders_amount::<S>),
        )
        .route(
            "/metrics/day-orders-amount",
            get(routes::analytics::day_orders_amount::<S>),
        )
        .route(
            "/metrics/month-canceled-orders-amount",
            get(routes::analytics::month_canceled_orders_amount::<S>),
        )
        .route(
            "/metrics/daily-receipt-in-period",
            get(routes::analytics::daily_receipt_in_period::<S>),
        )
        .route(
            "/metrics/popular-products",
            get(routes::analytics::popular_products::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
