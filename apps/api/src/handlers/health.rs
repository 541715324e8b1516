//! Liveness and database check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::warn;
use ts_rs::TS;

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HealthResponse {
    pub status: String,
    pub database: bool,
}

/// `GET /health`. 503 when the database does not answer.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db().health_check().await;

    if database {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                database,
            }),
        )
    } else {
        warn!("Health check failed: database unavailable");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable".to_string(),
                database,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing;

    #[tokio::test]
    async fn test_health_reports_database() {
        let state = testing::state().await;
        let (status, Json(body)) = health(state.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.database);

        state.db().close().await;
        let (status, Json(body)) = health(state).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "unavailable");
    }
}
