//! Category endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use ts_rs::TS;

use super::ApiJson;
use crate::error::ApiError;
use crate::state::AppState;
use stockbook_core::Category;

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryRequest {
    pub name: String,
}

/// `GET /api/categories`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.db().categories().list().await?))
}

/// `POST /api/categories`
pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.db().categories().create(&body.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /api/categories/{id}`
pub async fn rename(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.db().categories().rename(&id, &body.name).await?))
}

/// `DELETE /api/categories/{id}`. Products keep existing, uncategorized.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.db().categories().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
