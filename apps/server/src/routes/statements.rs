//! Statement query and manual reconciliation endpoints.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use tally_core::validation::statement_query;
use tally_core::StatementPage;
use tally_sync::{BatchSummary, ReconcileSummary};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Raw `GET /api/statements` query string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementParams {
    pub customer_id: Option<i64>,
    /// Inclusive, `YYYY-MM-DD`
    pub start_time: Option<String>,
    /// Inclusive, `YYYY-MM-DD`
    pub end_time: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
struct SyncAllResponse {
    message: &'static str,
    #[serde(flatten)]
    summary: BatchSummary,
}

/// `GET /api/statements`
pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<StatementParams>, QueryRejection>,
) -> ApiResult<Json<StatementPage>> {
    let Query(params) = params.map_err(|rejection| ApiError::validation(rejection.body_text()))?;

    let query = statement_query(
        params.customer_id,
        params.start_time.as_deref(),
        params.end_time.as_deref(),
        params.page,
        params.page_size,
    )?;

    Ok(Json(state.db.statements().list(&query).await?))
}

/// `GET /api/statements/sync`
///
/// Runs a full pass and holds the request until it finishes.
pub async fn sync_all(State(state): State<AppState>) -> Response {
    match state.orchestrator.reconcile_all().await {
        Ok(summary) => Json(SyncAllResponse {
            message: "Statements synced successfully",
            summary,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "Manual statement sync failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to sync statements",
                    "message": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// `POST /api/customers/{id}/statements/sync`
pub async fn sync_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
) -> ApiResult<Json<ReconcileSummary>> {
    Ok(Json(state.orchestrator.reconcile_customer(customer_id).await?))
}
