//! HTTP API server with observability for the waitlist slot-filling engine.
//!
//! Provides REST endpoints for filling open slots, inbound customer replies,
//! waitlist intake and offer inspection, with structured logging (tracing)
//! and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use slot_store::SlotStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: SlotStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::ops::health::<S>))
        .route("/slots/fill", post(routes::slots::fill::<S>))
        .route("/webhooks/inbound", post(routes::webhooks::inbound::<S>))
        .route("/sweep", post(routes::offers::sweep::<S>))
        .route("/offers/{id}", get(routes::offers::get::<S>))
        .route(
            "/offers/{id}/acceptances",
            get(routes::offers::acceptances::<S>),
        )
        .route("/waitlist", post(routes::waitlist::create::<S>))
        .route("/waitlist/{id}", get(routes::waitlist::get::<S>))
        .route("/waitlist/{id}/cancel", post(routes::waitlist::cancel::<S>))
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
