//! Service endpoints. Selling a service moves no stock.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use ts_rs::TS;

use super::products::SellRequest;
use super::{ApiJson, ApiQuery};
use crate::error::ApiError;
use crate::state::AppState;
use stockbook_core::{Service, ServiceDetail};
use stockbook_db::ServiceInput;

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ServiceRequest {
    pub name: String,
    pub default_price_cents: i64,
}

impl From<ServiceRequest> for ServiceInput {
    fn from(req: ServiceRequest) -> Self {
        ServiceInput {
            name: req.name,
            default_price_cents: req.default_price_cents,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct ServiceQuery {
    pub search: Option<String>,
}

/// `GET /api/services?search=`
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ServiceQuery>,
) -> Result<Json<Vec<Service>>, ApiError> {
    Ok(Json(state.db().services().list(query.search.as_deref()).await?))
}

/// `POST /api/services`
pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ServiceRequest>,
) -> Result<(StatusCode, Json<Service>), ApiError> {
    let service = state.db().services().create(&body.into()).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

/// `GET /api/services/{id}`
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ServiceDetail>, ApiError> {
    Ok(Json(state.db().services().get_detail(&id).await?))
}

/// `PUT /api/services/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ServiceRequest>,
) -> Result<Json<Service>, ApiError> {
    Ok(Json(state.db().services().update(&id, &body.into()).await?))
}

/// `DELETE /api/services/{id}`
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.db().services().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/services/{id}/sell`
pub async fn sell(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SellRequest>,
) -> Result<Json<ServiceDetail>, ApiError> {
    let detail = state
        .db()
        .ledger()
        .sell_service(&id, body.amount, body.sold_price_cents)
        .await?;
    Ok(Json(detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::handlers::testing;

    #[tokio::test]
    async fn test_sell_service_accumulates_revenue() {
        let state = testing::state().await;
        let (_, Json(repair)) = create(
            state.clone(),
            ApiJson(ServiceRequest {
                name: "Repair".to_string(),
                default_price_cents: 1500,
            }),
        )
        .await
        .unwrap();

        let body = SellRequest {
            amount: 2,
            sold_price_cents: 1200,
        };
        sell(state.clone(), Path(repair.id.clone()), ApiJson(body))
            .await
            .unwrap();
        let Json(detail) = sell(state.clone(), Path(repair.id.clone()), ApiJson(body))
            .await
            .unwrap();

        assert_eq!(detail.service.total_sold, 4);
        assert_eq!(detail.service.revenue_cents, 4800);
        assert_eq!(detail.history.len(), 2);

        let Json(all) = list(state, ApiQuery(ServiceQuery::default())).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_service() {
        let state = testing::state().await;
        let body = SellRequest {
            amount: 1,
            sold_price_cents: 100,
        };

        let err = sell(
            state.clone(),
            Path("9b2f4c1e-7d3a-4e8b-a5c6-0f1e2d3c4b5a".to_string()),
            ApiJson(body),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = sell(state, Path("missing".to_string()), ApiJson(body))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
