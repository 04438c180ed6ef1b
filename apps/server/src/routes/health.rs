use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let database = state.db.health_check().await;
    Json(json!({ "status": "ok", "database": database }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use crate::routes::test_support::{app, send};

    #[tokio::test]
    async fn test_health_reports_database() {
        let (app, _) = app().await;

        let (status, body) = send(&app, Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], true);
    }
}
