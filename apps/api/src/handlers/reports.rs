//! Summary report endpoint.

use axum::extract::State;
use axum::Json;

use super::{ApiQuery, DateRangeQuery};
use crate::error::ApiError;
use crate::state::AppState;
use stockbook_core::ledger::SummaryReport;

/// `GET /api/reports/summary?from=&to=`
pub async fn summary(
    State(state): State<AppState>,
    ApiQuery(range): ApiQuery<DateRangeQuery>,
) -> Result<Json<SummaryReport>, ApiError> {
    Ok(Json(state.db().reports().summary(range.from, range.to).await?))
}
