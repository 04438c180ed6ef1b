//! Customer CRUD.
//!
//! Customer edits never touch the ledger directly; rows carry a snapshot of
//! code and name that refreshes on the customer's next reconciliation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use tally_core::validation::validate_customer;
use tally_core::{Customer, CustomerInput};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `GET /api/customers`
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.db.customers().list().await?))
}

/// `POST /api/customers`
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CustomerInput>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    validate_customer(&input)?;

    let customer = state.db.customers().insert(&input).await?;
    info!(customer_id = customer.id, code = %customer.code, "Customer created");

    Ok((StatusCode::CREATED, Json(customer)))
}

/// `GET /api/customers/{id}`
pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Customer>> {
    state
        .db
        .customers()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Customer", id))
}

/// `PUT /api/customers/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CustomerInput>,
) -> ApiResult<Json<Customer>> {
    validate_customer(&input)?;

    state
        .db
        .customers()
        .update(id, &input)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Customer", id))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::test_support::{app, create_customer, send};

    #[tokio::test]
    async fn test_customer_crud() {
        let (app, _) = app().await;
        let id = create_customer(&app, "C001", "Acme").await;

        let (status, body) = send(&app, Method::GET, &format!("/api/customers/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Acme");
        assert_eq!(body["isActive"], true);

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/api/customers/{id}"),
            Some(json!({ "code": "C001", "name": "Acme Ltd", "city": "Lahore" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Acme Ltd");
        assert_eq!(body["city"], "Lahore");

        let (status, body) = send(&app, Method::GET, "/api/customers", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_customer_errors() {
        let (app, _) = app().await;
        create_customer(&app, "C001", "Acme").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/customers",
            Some(json!({ "code": "C001", "name": "Copycat" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/customers",
            Some(json!({ "code": "C002", "name": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::GET, "/api/customers/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rename_reaches_ledger_on_next_sync() {
        let (app, state) = app().await;
        let id = create_customer(&app, "C001", "Acme").await;
        send(
            &app,
            Method::POST,
            "/api/payments",
            Some(json!({ "customerId": id, "paymentDate": "2024-01-15", "amount": 500 })),
        )
        .await;
        state.orchestrator.wait_idle().await;

        send(
            &app,
            Method::PUT,
            &format!("/api/customers/{id}"),
            Some(json!({ "code": "C001", "name": "Acme Ltd" })),
        )
        .await;

        let (_, body) = send(&app, Method::GET, "/api/statements", None).await;
        assert_eq!(body["records"][0]["customerName"], "Acme");

        send(&app, Method::POST, &format!("/api/customers/{id}/statements/sync"), None).await;

        let (_, body) = send(&app, Method::GET, "/api/statements", None).await;
        assert_eq!(body["records"][0]["customerName"], "Acme Ltd");
    }
}
