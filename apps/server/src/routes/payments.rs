//! Payment CRUD plus batch entry.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use tally_core::validation::validate_payment;
use tally_core::{Payment, PaymentInput, ValidationError};

use super::CustomerFilter;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `GET /api/payments[?customerId=]`
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<CustomerFilter>,
) -> ApiResult<Json<Vec<Payment>>> {
    Ok(Json(state.db.payments().list(filter.customer()).await?))
}

/// `POST /api/payments`
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<PaymentInput>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    validate_payment(&input)?;

    let payment = state.db.payments().insert(&input).await?;
    info!(payment_id = payment.id, code = %payment.code, customer_id = payment.customer_id, "Payment created");

    state.orchestrator.schedule_customer(payment.customer_id);
    Ok((StatusCode::CREATED, Json(payment)))
}

/// `POST /api/payments/batch`
///
/// All payments commit together; each distinct customer is rebuilt once.
pub async fn create_batch(
    State(state): State<AppState>,
    Json(inputs): Json<Vec<PaymentInput>>,
) -> ApiResult<(StatusCode, Json<Vec<Payment>>)> {
    if inputs.is_empty() {
        return Err(ValidationError::Required {
            field: "payments".to_string(),
        }
        .into());
    }
    for input in &inputs {
        validate_payment(input)?;
    }

    let payments = state.db.payments().insert_batch(&inputs).await?;

    state
        .orchestrator
        .schedule_customers(payments.iter().map(|p| p.customer_id));
    Ok((StatusCode::CREATED, Json(payments)))
}

/// `GET /api/payments/{id}`
pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Payment>> {
    state
        .db
        .payments()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Payment", id))
}

/// `PUT /api/payments/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<PaymentInput>,
) -> ApiResult<Json<Payment>> {
    validate_payment(&input)?;

    let updated = state
        .db
        .payments()
        .update(id, &input)
        .await?
        .ok_or_else(|| ApiError::not_found("Payment", id))?;

    state
        .orchestrator
        .schedule_customers([updated.previous_customer_id, updated.current.customer_id]);
    Ok(Json(updated.current))
}

/// `DELETE /api/payments/{id}`
pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let customer_id = state
        .db
        .payments()
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Payment", id))?;

    info!(payment_id = id, customer_id, "Payment deleted");
    state.orchestrator.schedule_customer(customer_id);
    Ok(StatusCode::NO_CONTENT)
}
