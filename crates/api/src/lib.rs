//! HTTP API server for the marketplace.
//!
//! Exposes transaction and invoice endpoints behind token authentication,
//! with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod compose;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use domain::{InvoiceService, RequestContext, TransactionService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::JwtVerifier;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub transactions: TransactionService<S>,
    pub invoices: InvoiceService<S>,
    pub verifier: JwtVerifier,
    pub request_timeout: Duration,
}

impl<S: Store> AppState<S> {
    /// Context for one request, expiring after the configured timeout.
    pub fn context(&self) -> RequestContext {
        RequestContext::with_timeout(self.request_timeout)
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/transactions",
            get(routes::transactions::list::<S>).post(routes::transactions::create::<S>),
        )
        .route(
            "/transactions/{id}",
            get(routes::transactions::get::<S>).patch(routes::transactions::update::<S>),
        )
        .route("/invoices", axum::routing::post(routes::invoices::create::<S>))
        .route(
            "/invoices/{id}",
            get(routes::invoices::get::<S>).patch(routes::invoices::update::<S>),
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
