//! Sell-history listing and correction.

use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use ts_rs::TS;

use super::ApiQuery;
use crate::error::ApiError;
use crate::state::AppState;
use stockbook_core::SellHistory;
use stockbook_db::HistoryFilter;

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HistoryQuery {
    pub product_id: Option<String>,
    pub service_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

impl From<HistoryQuery> for HistoryFilter {
    fn from(query: HistoryQuery) -> Self {
        HistoryFilter {
            product_id: query.product_id,
            service_id: query.service_id,
            from: query.from,
            to: query.to,
            limit: query.limit,
        }
    }
}

/// `GET /api/sell-history?productId=&serviceId=&from=&to=&limit=`
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> Result<Json<Vec<SellHistory>>, ApiError> {
    Ok(Json(state.db().sell_history().list(&query.into()).await?))
}

/// `DELETE /api/sell-history/{id}`. Returns the removed row.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SellHistory>, ApiError> {
    Ok(Json(state.db().sell_history().delete(&id).await?))
}
