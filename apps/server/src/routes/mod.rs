//! # HTTP Routes
//!
//! One module per resource; [`router`] wires them together.

mod customers;
mod health;
mod payments;
mod sale_orders;
mod statements;

use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// `?customerId=` filter shared by the list endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CustomerFilter {
    pub customer_id: Option<i64>,
}

impl CustomerFilter {
    /// The requested customer; zero or below lists everyone.
    pub fn customer(&self) -> Option<i64> {
        self.customer_id.filter(|id| *id > 0)
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/statements", get(statements::list))
        .route("/api/statements/sync", get(statements::sync_all))
        .route(
            "/api/customers",
            get(customers::list).post(customers::create),
        )
        .route(
            "/api/customers/{id}",
            get(customers::get).put(customers::update),
        )
        .route(
            "/api/customers/{id}/statements/sync",
            post(statements::sync_customer),
        )
        .route(
            "/api/sale-orders",
            get(sale_orders::list).post(sale_orders::create),
        )
        .route(
            "/api/sale-orders/{id}",
            get(sale_orders::get)
                .put(sale_orders::update)
                .delete(sale_orders::delete),
        )
        .route("/api/payments", get(payments::list).post(payments::create))
        .route("/api/payments/batch", post(payments::create_batch))
        .route(
            "/api/payments/{id}",
            get(payments::get)
                .put(payments::update)
                .delete(payments::delete),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
