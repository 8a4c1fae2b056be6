//! HTTP API server with observability for the sales service.
//!
//! Provides REST endpoints for sale management, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use application::{EventPublisher, LoggingEventPublisher, SaleService};
use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use sale_store::SaleRepository;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::sales::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R: SaleRepository + 'static>(
    state: Arc<AppState<R>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/api/sales",
            post(routes::sales::create::<R>).get(routes::sales::list::<R>),
        )
        .route(
            "/api/sales/{id}",
            get(routes::sales::get::<R>)
                .put(routes::sales::update::<R>)
                .delete(routes::sales::delete::<R>),
        )
        .route(
            "/api/sales/by-number/{sale_number}",
            get(routes::sales::get_by_number::<R>),
        )
        .route("/api/sales/{id}/cancel", post(routes::sales::cancel::<R>))
        .route(
            "/api/sales/{id}/items/{product_id}/cancel",
            post(routes::sales::cancel_item::<R>),
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

/// Creates application state that logs sale events.
pub fn create_default_state<R: SaleRepository + 'static>(repository: R) -> Arc<AppState<R>> {
    create_state(repository, Arc::new(LoggingEventPublisher::new()))
}

/// Creates application state with the given event publisher.
pub fn create_state<R: SaleRepository + 'static>(
    repository: R,
    publisher: Arc<dyn EventPublisher>,
) -> Arc<AppState<R>> {
    Arc::new(AppState {
        sale_service: SaleService::new(repository, publisher),
    })
}
