//! Sale order CRUD.
//!
//! Every successful mutation schedules a background rebuild for the customer
//! it touched, after the write has committed.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use tally_core::validation::validate_sale_order;
use tally_core::{SaleOrder, SaleOrderInput};

use super::CustomerFilter;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `GET /api/sale-orders[?customerId=]`
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<CustomerFilter>,
) -> ApiResult<Json<Vec<SaleOrder>>> {
    Ok(Json(state.db.sale_orders().list(filter.customer()).await?))
}

/// `POST /api/sale-orders`
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<SaleOrderInput>,
) -> ApiResult<(StatusCode, Json<SaleOrder>)> {
    validate_sale_order(&input)?;

    let order = state.db.sale_orders().insert(&input).await?;
    info!(order_id = order.id, code = %order.code, customer_id = order.customer_id, "Sale order created");

    state.orchestrator.schedule_customer(order.customer_id);
    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /api/sale-orders/{id}`
pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<SaleOrder>> {
    state
        .db
        .sale_orders()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Sale order", id))
}

/// `PUT /api/sale-orders/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<SaleOrderInput>,
) -> ApiResult<Json<SaleOrder>> {
    validate_sale_order(&input)?;

    let updated = state
        .db
        .sale_orders()
        .update(id, &input)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale order", id))?;

    state
        .orchestrator
        .schedule_customers([updated.previous_customer_id, updated.current.customer_id]);
    Ok(Json(updated.current))
}

/// `DELETE /api/sale-orders/{id}`
pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let customer_id = state
        .db
        .sale_orders()
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale order", id))?;

    info!(order_id = id, customer_id, "Sale order deleted");
    state.orchestrator.schedule_customer(customer_id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::routes::test_support::{app, create_customer, send};

    fn order(customer: i64, amount: i64) -> Value {
        json!({
            "customerId": customer,
            "createTime": "2024-03-02T09:30:00",
            "orderAmount": amount,
        })
    }

    #[tokio::test]
    async fn test_create_generates_daily_code() {
        let (app, _) = app().await;
        let customer = create_customer(&app, "C001", "Acme").await;

        let (status, first) =
            send(&app, Method::POST, "/api/sale-orders", Some(order(customer, 1000))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["code"], "S2403020001");

        let (_, second) =
            send(&app, Method::POST, "/api/sale-orders", Some(order(customer, 2000))).await;
        assert_eq!(second["code"], "S2403020002");
    }

    #[tokio::test]
    async fn test_invalid_orders_are_rejected() {
        let (app, _) = app().await;
        let customer = create_customer(&app, "C001", "Acme").await;

        let (status, _) =
            send(&app, Method::POST, "/api/sale-orders", Some(order(customer, -5))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) =
            send(&app, Method::POST, "/api/sale-orders", Some(order(999, 100))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "INVALID_REFERENCE");
    }

    #[tokio::test]
    async fn test_moving_order_rebuilds_both_customers() {
        let (app, state) = app().await;
        let a = create_customer(&app, "C001", "Acme").await;
        let b = create_customer(&app, "C002", "Globex").await;

        let (_, created) = send(&app, Method::POST, "/api/sale-orders", Some(order(a, 700))).await;
        let id = created["id"].as_i64().unwrap();
        state.orchestrator.wait_idle().await;

        let (status, moved) =
            send(&app, Method::PUT, &format!("/api/sale-orders/{id}"), Some(order(b, 700))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved["customerId"], b);
        assert_eq!(moved["code"], created["code"]);
        state.orchestrator.wait_idle().await;

        let (_, ledger_a) =
            send(&app, Method::GET, &format!("/api/statements?customerId={a}"), None).await;
        let (_, ledger_b) =
            send(&app, Method::GET, &format!("/api/statements?customerId={b}"), None).await;
        assert_eq!(ledger_a["total"], 0);
        assert_eq!(ledger_b["total"], 1);
        assert_eq!(ledger_b["records"][0]["balance"], 700);
    }

    #[tokio::test]
    async fn test_delete_and_filter() {
        let (app, state) = app().await;
        let a = create_customer(&app, "C001", "Acme").await;
        let b = create_customer(&app, "C002", "Globex").await;

        let (_, keep) = send(&app, Method::POST, "/api/sale-orders", Some(order(a, 100))).await;
        send(&app, Method::POST, "/api/sale-orders", Some(order(b, 200))).await;

        let (_, listed) =
            send(&app, Method::GET, &format!("/api/sale-orders?customerId={a}"), None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let id = keep["id"].as_i64().unwrap();
        let uri = format!("/api/sale-orders/{id}");
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        state.orchestrator.wait_idle().await;

        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, ledger) =
            send(&app, Method::GET, &format!("/api/statements?customerId={a}"), None).await;
        assert_eq!(ledger["total"], 0);
    }
}
